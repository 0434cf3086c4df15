//! Structured data embedded in record content.
//!
//! [`SegregateSdata`] cuts the `{ key := value, ... }` literal out of the
//! content and [`ParseSdata`] decodes it into a [`Value`] tree.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value, sdata};

pub const STRUCTURED_DATA_NAMESPACE: &str = "hu.analyzer.sdata";
/// The raw literal text, as found in the record.
pub const STRUCTURED_DATA_AS_STRING: &str = "hu.analyzer.sdata.string";
/// The decoded value tree.
pub const STRUCTURED_DATA: &str = "hu.analyzer.sdata.data";

// From the first `{` to the last `}`, as long as a `:=` sits in between.
static STRUCTURED_DATA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(?P<sdata>\{.*:=.*\})").expect("sdata pattern is a valid regex")
});

#[derive(Debug, Default)]
pub struct SegregateSdata;

impl Stage for SegregateSdata {
    fn process(
        &self,
        record: Option<&LogRecord>,
        _state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        let caps = record.and_then(|r| STRUCTURED_DATA_PATTERN.captures(r.content()));
        Ok(match caps {
            Some(caps) => PipelineStageResult::from_structured([(
                STRUCTURED_DATA_AS_STRING,
                Value::from(&caps["sdata"]),
            )]),
            None => PipelineStageResult::new(),
        })
    }
}

/// Decodes the literal isolated by [`SegregateSdata`].
///
/// A literal the grammar does not cover fails the record.
#[derive(Debug, Default)]
pub struct ParseSdata;

impl Stage for ParseSdata {
    fn process(
        &self,
        _record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        let raw = state.get(STRUCTURED_DATA_AS_STRING);
        let Some(text) = raw.as_str() else {
            return Ok(PipelineStageResult::new());
        };

        let value = sdata::parse(text).context("malformed structured data")?;
        Ok(PipelineStageResult::from_structured([(STRUCTURED_DATA, value)]))
    }
}
