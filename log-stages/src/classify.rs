//! Coarse record classification.

use once_cell::sync::Lazy;
use regex::Regex;
use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value};

pub const RECORD_CLASS: &str = "record_class";

static COMPONENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)component type (?P<component_type>[^\s.]+(?:\.[^.]+)?)")
        .expect("component class pattern is a valid regex")
});

// Braces holding something key- or list-like, or nothing at all.
static STRUCTURED_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{(?:.*[:,].*|\s*)\}").expect("structured class pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    Component,
    Structured,
    Other,
}

impl RecordClass {
    pub fn of(record: &LogRecord) -> Self {
        if COMPONENT_CLASS.is_match(record.content()) {
            RecordClass::Component
        } else if STRUCTURED_CLASS.is_match(record.content()) {
            RecordClass::Structured
        } else {
            RecordClass::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordClass::Component => "component",
            RecordClass::Structured => "structured",
            RecordClass::Other => "other",
        }
    }
}

/// Stores the [`RecordClass`] of every record under [`RECORD_CLASS`].
#[derive(Debug, Default)]
pub struct ClassifyRecord;

impl Stage for ClassifyRecord {
    fn process(
        &self,
        record: Option<&LogRecord>,
        _state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        Ok(match record {
            Some(record) => PipelineStageResult::from_structured([(
                RECORD_CLASS,
                Value::from(RecordClass::of(record).as_str()),
            )]),
            None => PipelineStageResult::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_classes() {
        let cases = [
            ("Component type Example.PTC_CT was created", RecordClass::Component),
            ("Sent on sip_port: { port := 5060 }", RecordClass::Structured),
            ("Matching: { 1, 2 }", RecordClass::Structured),
            ("Empty: {  }", RecordClass::Structured),
            ("Setting verdict to pass", RecordClass::Other),
            ("Text with {braces} only", RecordClass::Other),
        ];
        for (content, expected) in cases {
            assert_eq!(RecordClass::of(&record(content)), expected, "{content}");
        }
    }

    #[test]
    fn test_stage_stores_class_name() {
        let result = ClassifyRecord
            .process(Some(&record("Setting verdict to pass")), &PipelineStageResult::new())
            .unwrap();
        assert_eq!(result.get(RECORD_CLASS), Value::from("other"));
        assert!(ClassifyRecord.process(None, &PipelineStageResult::new()).unwrap().is_empty());
    }
}
