//! Structured-data (SDATA) literal parser.
//!
//! Test logs embed values in an object-literal notation:
//!
//! ```text
//! { enabled := true, port := 5060, name := "peer", ids := { 1, 2 },
//!   payload := '48656C6C6F'O (Hello), state := CONNECTED (1), peer := omit }
//! ```
//!
//! Braces are used for both keyed and unkeyed aggregates, so the parser
//! only learns which one it is looking at from the first member after the
//! opening `{`: a bare identifier starts a map, anything else a list. That
//! decision is carried as an explicit [`ParserState`] rather than looked up
//! ahead.
//!
//! The parser fails loudly: any shape not covered by the grammar is a
//! [`SyntaxError`] carrying the byte offset where parsing stopped.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::SyntaxError;

/// A decoded SDATA value.
///
/// Integers are signed 64-bit; literals outside that range are rejected
/// rather than silently widened to floating point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// Octet string with the plain-text rendering the logger printed next to
    /// it, if any.
    HexString {
        hex: String,
        plain: Option<String>,
    },
    /// Enumerated value; `value` is the raw parenthesized text.
    Enum {
        name: String,
        value: String,
    },
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn empty_map() -> Self {
        Value::Map(IndexMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up `key` if this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// True for null, empty strings and empty aggregates.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// What the parser knows about the aggregate it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Expecting a standalone value.
    Undetermined,
    /// Just consumed `{`; the first member decides map versus list.
    InAggregate,
}

const QUOTES: [char; 2] = ['"', '\''];
const UNBOUND: &str = "<unbound>";
const OMIT: &str = "omit";

/// Deepest `{ .. }` nesting the parser descends into.
pub const MAX_NESTING: usize = 128;

/// Parse one SDATA value from the start of `input`.
///
/// Returns the value and the unconsumed remainder of `input`.
pub fn parse_value(input: &str) -> Result<(Value, &str), SyntaxError> {
    Parser { source: input }.value(input, ParserState::Undetermined, 0)
}

/// Parse `input` as exactly one SDATA value, allowing only surrounding
/// whitespace.
pub fn parse(input: &str) -> Result<Value, SyntaxError> {
    let parser = Parser { source: input };
    let (value, rest) = parser.value(input, ParserState::Undetermined, 0)?;
    let rest = rest.trim_start();
    if !rest.is_empty() {
        return Err(parser.error("unexpected trailing input", rest));
    }
    Ok(value)
}

struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>, at: &'a str) -> SyntaxError {
        SyntaxError::new(message, self.source.len() - at.len())
    }

    fn value(
        &self,
        input: &'a str,
        state: ParserState,
        depth: usize,
    ) -> Result<(Value, &'a str), SyntaxError> {
        let s = skip_separators(input);
        let Some(c) = s.chars().next() else {
            return Err(self.error("unexpected end of input", s));
        };

        match (state, c) {
            (ParserState::InAggregate, '}') => Ok((Value::empty_map(), &s[1..])),
            (ParserState::Undetermined, '{') if depth >= MAX_NESTING => Err(self.error(
                format!("aggregates nested deeper than {MAX_NESTING} levels"),
                s,
            )),
            (ParserState::Undetermined, '{') => {
                self.value(&s[1..], ParserState::InAggregate, depth + 1)
            }
            (ParserState::InAggregate, c) if c.is_ascii_alphabetic() => self.map(s, depth),
            (ParserState::InAggregate, _) => self.list(s, depth),
            (ParserState::Undetermined, '<') if s.starts_with(UNBOUND) => {
                Ok((Value::Null, &s[UNBOUND.len()..]))
            }
            (ParserState::Undetermined, c) if c.is_ascii_alphabetic() => self.word(s),
            (ParserState::Undetermined, c) if c.is_ascii_digit() || c == '-' => self.number(s),
            (ParserState::Undetermined, c) if QUOTES.contains(&c) => self.stringlike(s),
            (ParserState::Undetermined, c) => {
                Err(self.error(format!("unexpected character '{c}'"), s))
            }
        }
    }

    /// Bool, nil sentinel or enumerated value.
    fn word(&self, s: &'a str) -> Result<(Value, &'a str), SyntaxError> {
        let (ident, rest) = identifier(s);
        if ident.eq_ignore_ascii_case("true") {
            return Ok((Value::Bool(true), rest));
        }
        if ident.eq_ignore_ascii_case("false") {
            return Ok((Value::Bool(false), rest));
        }
        if ident == OMIT {
            return Ok((Value::Null, rest));
        }

        let after_ws = rest.trim_start();
        if !after_ws.starts_with('(') {
            return Err(self.error(
                format!("expected '(' after enumerated value '{ident}'"),
                after_ws,
            ));
        }
        let (value, rest) = self.parenthesized(after_ws)?;
        Ok((
            Value::Enum {
                name: ident.to_string(),
                value: value.to_string(),
            },
            rest,
        ))
    }

    fn number(&self, s: &'a str) -> Result<(Value, &'a str), SyntaxError> {
        let sign = usize::from(s.starts_with('-'));
        let int_end = sign + digit_run(&s[sign..]);
        if int_end == sign {
            return Err(self.error("expected digits", &s[sign..]));
        }

        let mut end = int_end;
        let mut real = false;
        if s[int_end..].starts_with('.') {
            let frac = digit_run(&s[int_end + 1..]);
            if frac > 0 {
                end = int_end + 1 + frac;
                real = true;
            }
        }

        let literal = &s[..end];
        let value = if real {
            literal
                .parse()
                .map(Value::Real)
                .map_err(|_| self.error(format!("invalid real '{literal}'"), s))?
        } else {
            literal
                .parse()
                .map(Value::Integer)
                .map_err(|_| self.error(format!("integer '{literal}' out of range"), s))?
        };
        Ok((value, &s[end..]))
    }

    /// Quoted string, optionally an octet string with its plain rendering.
    fn stringlike(&self, s: &'a str) -> Result<(Value, &'a str), SyntaxError> {
        let (text, rest) = self.string(s)?;

        let after_ws = rest.trim_start();
        let mut chars = after_ws.chars();
        let is_octets = chars.next() == Some('O') && !chars.next().is_some_and(is_ident_char);
        if !is_octets {
            return Ok((Value::String(text.to_string()), rest));
        }

        let rest = &after_ws[1..];
        let after_ws = rest.trim_start();
        if after_ws.starts_with('(') {
            let (plain, rest) = self.parenthesized(after_ws)?;
            Ok((
                Value::HexString {
                    hex: text.to_string(),
                    plain: Some(plain.to_string()),
                },
                rest,
            ))
        } else {
            Ok((
                Value::HexString {
                    hex: text.to_string(),
                    plain: None,
                },
                rest,
            ))
        }
    }

    /// Quoted text between matching delimiters, returned verbatim.
    ///
    /// A backslash skips the next character and a doubled delimiter is a
    /// literal quote; neither closes the string. This is not a stack of open
    /// quote characters: the other quote character is plain text inside the
    /// string, and a repeated delimiter never opens a nested string.
    fn string(&self, s: &'a str) -> Result<(&'a str, &'a str), SyntaxError> {
        let mut chars = s.char_indices();
        let Some((_, delim)) = chars.next() else {
            return Err(self.error("expected string", s));
        };

        let mut escaped = false;
        let mut pending_close: Option<usize> = None;
        for (i, c) in chars {
            if let Some(close) = pending_close.take() {
                if c == delim {
                    continue;
                }
                return Ok((&s[1..close], &s[close + 1..]));
            }
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == delim {
                pending_close = Some(i);
            }
        }

        match pending_close {
            Some(close) => Ok((&s[1..close], &s[close + 1..])),
            None => Err(self.error(format!("unterminated string starting with {delim}"), s)),
        }
    }

    /// Text inside balanced parentheses starting at `s`.
    fn parenthesized(&self, s: &'a str) -> Result<(&'a str, &'a str), SyntaxError> {
        let mut depth = 0usize;
        let mut escaped = false;
        for (i, c) in s.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((&s[1..i], &s[i + 1..]));
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses", s))
    }

    /// Keyed aggregate members up to and including the closing `}`.
    fn map(&self, s: &'a str, depth: usize) -> Result<(Value, &'a str), SyntaxError> {
        let mut entries = IndexMap::new();
        let mut rest = s;
        loop {
            rest = skip_separators(rest);
            match rest.chars().next() {
                Some('}') => return Ok((Value::Map(entries), &rest[1..])),
                Some(c) if c.is_ascii_alphabetic() => {
                    let (key, after_key) = identifier(rest);
                    let after_key = after_key.trim_start();
                    let Some(after_assign) = after_key.strip_prefix(":=") else {
                        return Err(self.error(format!("expected ':=' after key '{key}'"), after_key));
                    };
                    let (value, after_value) = self.value(after_assign, ParserState::Undetermined, depth)?;
                    entries.insert(key.to_string(), value);
                    rest = after_value;
                }
                Some(c) => return Err(self.error(format!("expected key, found '{c}'"), rest)),
                None => return Err(self.error("unterminated map", rest)),
            }
        }
    }

    /// Unkeyed aggregate members up to and including the closing `}`.
    fn list(&self, s: &'a str, depth: usize) -> Result<(Value, &'a str), SyntaxError> {
        let mut items = Vec::new();
        let mut rest = s;
        loop {
            rest = skip_separators(rest);
            match rest.chars().next() {
                Some('}') => return Ok((Value::List(items), &rest[1..])),
                Some(_) => {
                    let (item, after_item) = self.value(rest, ParserState::Undetermined, depth)?;
                    items.push(item);
                    rest = after_item;
                }
                None => return Err(self.error("unterminated list", rest)),
            }
        }
    }
}

fn skip_separators(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_whitespace() || c == ',')
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

fn digit_run(s: &str) -> usize {
    s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        entries.into_iter().collect()
    }

    #[test]
    fn test_parse_full_map() {
        let input = r#"{ true := true, false := false, string := "Read me", integer := 42, real := 42.0, list := { "a", "b" }, nested := { k := "v" }, blob := '48656C6C6F'O (Hello), undef := <unbound>, also := omit }"#;
        let expected = map(vec![
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("string", "Read me".into()),
            ("integer", Value::Integer(42)),
            ("real", Value::Real(42.0)),
            ("list", Value::List(vec!["a".into(), "b".into()])),
            ("nested", map(vec![("k", "v".into())])),
            (
                "blob",
                Value::HexString {
                    hex: "48656C6C6F".to_string(),
                    plain: Some("Hello".to_string()),
                },
            ),
            ("undef", Value::Null),
            ("also", Value::Null),
        ]);
        assert_eq!(parse(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_multiline_map_without_commas() {
        let input = "{\n    empty_object := {}\n    integer := 42,\n    a_nested := {\n        map := \"this one is\"\n    }\n    also_undefined := omit,\n}";
        let expected = map(vec![
            ("empty_object", Value::empty_map()),
            ("integer", Value::Integer(42)),
            ("a_nested", map(vec![("map", "this one is".into())])),
            ("also_undefined", Value::Null),
        ]);
        assert_eq!(parse(input).unwrap(), expected);
    }

    #[test]
    fn test_empty_aggregate_is_map() {
        assert_eq!(parse("{}").unwrap(), Value::empty_map());
        assert_eq!(parse("{ }").unwrap(), Value::empty_map());
    }

    #[test]
    fn test_list_of_numbers() {
        assert_eq!(
            parse("{ 1, -2, 3.5 }").unwrap(),
            Value::List(vec![Value::Integer(1), Value::Integer(-2), Value::Real(3.5)])
        );
    }

    #[test]
    fn test_list_of_maps() {
        let value = parse("{ { a := 1 }, { a := 2 } }").unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                map(vec![("a", Value::Integer(1))]),
                map(vec![("a", Value::Integer(2))]),
            ])
        );
    }

    #[test]
    fn test_remainder_is_returned() {
        let (value, rest) = parse_value("42, tail").unwrap();
        assert_eq!(value, Value::Integer(42));
        assert_eq!(rest, ", tail");

        let (value, rest) = parse_value("{ a := 1 } trailing").unwrap();
        assert_eq!(value, map(vec![("a", Value::Integer(1))]));
        assert_eq!(rest, " trailing");
    }

    #[test]
    fn test_standalone_scalars() {
        assert_eq!(parse("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(parse("False").unwrap(), Value::Bool(false));
        assert_eq!(parse("omit").unwrap(), Value::Null);
        assert_eq!(parse("<unbound>").unwrap(), Value::Null);
        assert_eq!(parse("-17").unwrap(), Value::Integer(-17));
        assert_eq!(parse("'single'").unwrap(), Value::String("single".to_string()));
    }

    #[test]
    fn test_enumerated_value() {
        assert_eq!(
            parse("{ state := CONNECTED (1) }").unwrap(),
            map(vec![(
                "state",
                Value::Enum {
                    name: "CONNECTED".to_string(),
                    value: "1".to_string(),
                },
            )])
        );
    }

    #[test]
    fn test_enum_value_keeps_nested_and_escaped_parens() {
        let (value, rest) = parse_value(r"reason(outer (inner) \) done) x").unwrap();
        assert_eq!(
            value,
            Value::Enum {
                name: "reason".to_string(),
                value: r"outer (inner) \) done".to_string(),
            }
        );
        assert_eq!(rest, " x");
    }

    #[test]
    fn test_identifier_prefixed_with_keyword_is_enum() {
        let value = parse("omitted(3)").unwrap();
        assert_eq!(
            value,
            Value::Enum {
                name: "omitted".to_string(),
                value: "3".to_string(),
            }
        );
    }

    #[test]
    fn test_string_escapes_are_kept_verbatim() {
        assert_eq!(
            parse(r#""say \"hi\"""#).unwrap(),
            Value::String(r#"say \"hi\""#.to_string())
        );
        assert_eq!(
            parse(r#""doubled "" quote""#).unwrap(),
            Value::String(r#"doubled "" quote"#.to_string())
        );
        assert_eq!(
            parse(r#""it's fine""#).unwrap(),
            Value::String("it's fine".to_string())
        );
        assert_eq!(
            parse(r#"'say "hi" "twice"'"#).unwrap(),
            Value::String(r#"say "hi" "twice""#.to_string())
        );
    }

    #[test]
    fn test_hex_string_without_plain_rendering() {
        assert_eq!(
            parse("{ raw := '0A0B'O, n := 1 }").unwrap(),
            map(vec![
                (
                    "raw",
                    Value::HexString {
                        hex: "0A0B".to_string(),
                        plain: None,
                    },
                ),
                ("n", Value::Integer(1)),
            ])
        );
    }

    #[test]
    fn test_string_followed_by_key_starting_with_o() {
        assert_eq!(
            parse("{ a := \"x\"\n Other := 2 }").unwrap(),
            map(vec![("a", "x".into()), ("Other", Value::Integer(2))])
        );
    }

    #[test]
    fn test_repeated_key_last_write_wins() {
        assert_eq!(
            parse("{ a := 1, a := 2 }").unwrap(),
            map(vec![("a", Value::Integer(2))])
        );
    }

    #[test]
    fn test_map_equality_ignores_order() {
        assert_eq!(
            parse("{ a := 1, b := 2 }").unwrap(),
            parse("{ b := 2, a := 1 }").unwrap()
        );
    }

    #[test]
    fn test_missing_assignment_is_syntax_error() {
        let err = parse("{ a 1 }").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("':='"));
    }

    #[test]
    fn test_unknown_shape_is_syntax_error() {
        let err = parse("{ a := @ }").unwrap_err();
        assert_eq!(err.offset, 7);
        assert!(parse("bare").is_err());
        assert!(parse("-").is_err());
    }

    #[test]
    fn test_unterminated_inputs() {
        assert!(parse("{ a := 1").is_err());
        assert!(parse("{ 1, 2").is_err());
        assert!(parse("\"open").is_err());
        assert!(parse("e(unclosed").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let nested = |depth: usize| format!("{}1{}", "{".repeat(depth), "}".repeat(depth));

        assert!(parse(&nested(MAX_NESTING)).is_ok());

        let err = parse(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(err.message.contains("nested deeper"));
        assert_eq!(err.offset, MAX_NESTING);

        let err = parse(&nested(100_000)).unwrap_err();
        assert_eq!(err.offset, MAX_NESTING);
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = parse("99999999999999999999").unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_trailing_input_rejected_by_parse() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let value = parse("{ a := '41'O (A), b := { 1 }, c := omit, d := X (2) }").unwrap();
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "a": { "hex": "41", "plain": "A" },
                "b": [1],
                "c": null,
                "d": { "name": "X", "value": "2" }
            })
        );
    }

    #[test]
    fn test_accessors() {
        let value = parse("{ a := { b := \"c\" }, n := 3, l := { 1 } }").unwrap();
        assert_eq!(value.get("a").and_then(|a| a.get("b")).and_then(Value::as_str), Some("c"));
        assert_eq!(value.get("n").and_then(Value::as_i64), Some(3));
        assert_eq!(value.get("l").and_then(Value::as_list).map(<[Value]>::len), Some(1));
        assert!(value.get("missing").is_none());
        assert!(Value::Null.is_empty());
        assert!(!Value::Integer(0).is_empty());
    }
}
