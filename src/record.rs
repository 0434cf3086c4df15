//! Log record model and header grammar.
//!
//! A record header has a fixed field order, separated by single whitespace
//! characters:
//!
//! ```text
//! DATE        TIME            APPLICATION EVENT_TYPE SOURCE_INDICATOR             [CONTENT]
//! 2014/Oct/24 19:16:48.062933 111         SYSCALL    ExampleTest.ttcn:313(func:X) open(0x7F323232) = -1
//! ```
//!
//! The content is everything after the source indicator, newlines included.
//! [`line_begins_with_record_header`] applies the very same grammar as a
//! prefix match, which is what the [`crate::framer`] uses to find record
//! boundaries.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::FormatError;

// Verbose-mode regex fragments. The header fragment contains every named
// group except `content`, so it can be reused for the prefix predicate.
// The scope runs to the first `)` and may contain spaces.
const DATE_PATTERN: &str = r"
    \d{4} / (?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) / (?:[0-2][0-9]|3[01])
";

// Subsecond digits are not fixed in width.
const TIME_PATTERN: &str = r"
    \d\d? : \d\d? : \d\d? \. \d+
";

const SOURCE_PATTERN: &str = r"
    (?P<source_file> [^:\s]+ )
    :
    (?P<source_line> \d+ )
    \( (?P<source_scope> [^)\n]+ ) \)
";

fn header_pattern() -> String {
    format!(
        r"
        (?P<date> {DATE_PATTERN} )
        \s
        (?P<time> {TIME_PATTERN} )
        \s
        (?P<application> \S+ )
        \s
        (?P<event_type> \S+ )
        \s
        {SOURCE_PATTERN}
        "
    )
}

static RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?xs) \A {} (?: \s? (?P<content> .* ) )? \z",
        header_pattern()
    ))
    .expect("record grammar is a valid regex")
});

static HEADER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?x) \A {}", header_pattern()))
        .expect("header grammar is a valid regex")
});

static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?x) \A {SOURCE_PATTERN} \z"))
        .expect("source indicator grammar is a valid regex")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?x) \A {DATE_PATTERN} \z")).expect("date grammar is a valid regex")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?x) \A {TIME_PATTERN} \z")).expect("time grammar is a valid regex")
});

/// Returns true if `line` starts with a complete record header.
pub fn line_begins_with_record_header(line: &str) -> bool {
    HEADER_PREFIX_RE.is_match(line)
}

/// Where in the test sources a record was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    file: String,
    line: u32,
    scope: String,
}

impl SourceLocation {
    /// Parse a standalone `FILE:LINE(SCOPE)` indicator.
    pub fn parse(indicator: &str) -> Result<Self, FormatError> {
        let caps = SOURCE_RE
            .captures(indicator)
            .ok_or_else(|| FormatError::InvalidSourceIndicator(indicator.to_string()))?;
        Self::from_parts(
            &caps["source_file"],
            &caps["source_line"],
            &caps["source_scope"],
        )
    }

    fn from_parts(file: &str, line: &str, scope: &str) -> Result<Self, FormatError> {
        let line = line
            .parse()
            .map_err(|_| FormatError::InvalidLineNumber(line.to_string()))?;
        Ok(Self {
            file: file.to_string(),
            line,
            scope: scope.to_string(),
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.file, self.line, self.scope)
    }
}

/// One logical log entry.
///
/// A `LogRecord` only exists fully populated: parsing either yields every
/// header field or fails with a [`FormatError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    date: String,
    time: String,
    application: String,
    event_type: String,
    source: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl LogRecord {
    /// Parse one record's text (its lines joined with `\n`).
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        if text.trim().is_empty() {
            return Err(FormatError::Empty);
        }

        let Some(caps) = RECORD_RE.captures(text) else {
            return Err(diagnose(text));
        };

        let source = SourceLocation::from_parts(
            &caps["source_file"],
            &caps["source_line"],
            &caps["source_scope"],
        )?;

        Ok(Self {
            date: caps["date"].to_string(),
            time: caps["time"].to_string(),
            application: caps["application"].to_string(),
            event_type: caps["event_type"].to_string(),
            source,
            content: caps
                .name("content")
                .map(|m| m.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }

    /// Parse a record from the line group produced by the framer.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, FormatError> {
        let text = lines
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        Self::parse(&text)
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Free text after the header, or `""` if the record has none.
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

impl FromStr for LogRecord {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Work out which header field made `text` fail the record grammar.
fn diagnose(text: &str) -> FormatError {
    let fields: Vec<&str> = text.split_whitespace().take(5).collect();
    if fields.len() < 5 {
        return FormatError::NotEnoughFields {
            found: fields.len(),
        };
    }
    if !DATE_RE.is_match(fields[0]) {
        return FormatError::InvalidDate(fields[0].to_string());
    }
    if !TIME_RE.is_match(fields[1]) {
        return FormatError::InvalidTime(fields[1].to_string());
    }
    if !SOURCE_RE.is_match(fields[4]) {
        return FormatError::InvalidSourceIndicator(fields[4].to_string());
    }
    FormatError::Malformed
}
