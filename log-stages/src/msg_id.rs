//! Message identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value};

pub const MSG_ID: &str = "message_id";

static MESSAGE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)id\s+(?P<object_id>\d+)$").expect("message id pattern is a valid regex")
});

/// Records the `id <digits>` trailer some message records end with.
#[derive(Debug, Default)]
pub struct IdentifyMessage;

impl Stage for IdentifyMessage {
    fn process(
        &self,
        record: Option<&LogRecord>,
        _state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        let caps = record.and_then(|r| MESSAGE_ID.captures(r.content()));
        Ok(match caps {
            Some(caps) => {
                PipelineStageResult::from_structured([(MSG_ID, Value::from(&caps["object_id"]))])
            }
            None => PipelineStageResult::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_trailing_id_is_recorded() {
        let result = IdentifyMessage
            .process(Some(&record("Sent on sip_port to system: { } id 42")), &PipelineStageResult::new())
            .unwrap();
        assert_eq!(result.get(MSG_ID), Value::from("42"));
    }

    #[test]
    fn test_id_must_end_the_content() {
        let result = IdentifyMessage
            .process(Some(&record("id 42 is not at the end")), &PipelineStageResult::new())
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_probe_without_record() {
        assert!(IdentifyMessage.process(None, &PipelineStageResult::new()).unwrap().is_empty());
    }
}
