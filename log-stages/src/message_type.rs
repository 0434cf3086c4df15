//! Message type of SIP abstract service primitives.

use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value};

use crate::msg_id::MSG_ID;
use crate::sdata::STRUCTURED_DATA;

pub const MESSAGE_TYPE: &str = "message_type";

/// Reads `internalMessage.description` from identified messages that carry
/// an `aspRequest`.
///
/// Only the first `aspsSip` entry is considered.
#[derive(Debug, Default)]
pub struct IdentifyMessageType;

impl Stage for IdentifyMessageType {
    fn process(
        &self,
        _record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        if !state.contains_key(MSG_ID) || !state.contains_key(STRUCTURED_DATA) {
            return Ok(PipelineStageResult::new());
        }

        let sdata = state.get(STRUCTURED_DATA);
        let Some(asp) = sdata
            .get("aspsSip")
            .and_then(Value::as_list)
            .and_then(|asps| asps.first())
        else {
            return Ok(PipelineStageResult::new());
        };

        let request = asp.get("aspRequest");
        let internal = sdata.get("internalMessage");
        let (Some(request), Some(internal)) = (request, internal) else {
            return Ok(PipelineStageResult::new());
        };
        if request.is_empty() || internal.is_empty() {
            return Ok(PipelineStageResult::new());
        }

        let description = internal.get("description").cloned().unwrap_or(Value::Null);
        Ok(PipelineStageResult::from_structured([(MESSAGE_TYPE, description)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testlog_pipelines::sdata;

    fn state(literal: &str) -> PipelineStageResult {
        PipelineStageResult::from_structured([
            (MSG_ID, Value::from("17")),
            (STRUCTURED_DATA, sdata::parse(literal).unwrap()),
        ])
    }

    #[test]
    fn test_request_yields_description() {
        let state = state(
            r#"{ aspsSip := { { aspRequest := { method := INVITE_E (0) } } },
                 internalMessage := { description := "INVITE" } }"#,
        );
        let result = IdentifyMessageType.process(None, &state).unwrap();
        assert_eq!(result.get(MESSAGE_TYPE), Value::from("INVITE"));
    }

    #[test]
    fn test_response_is_ignored() {
        let state = state(
            r#"{ aspsSip := { { aspResponse := { status := 200 } } },
                 internalMessage := { description := "OK" } }"#,
        );
        assert!(IdentifyMessageType.process(None, &state).unwrap().is_empty());
    }

    #[test]
    fn test_empty_internal_message_is_ignored() {
        let state = state(
            r#"{ aspsSip := { { aspRequest := { method := INVITE_E (0) } } },
                 internalMessage := {} }"#,
        );
        assert!(IdentifyMessageType.process(None, &state).unwrap().is_empty());
    }

    #[test]
    fn test_requires_message_id() {
        let state = PipelineStageResult::from_structured([(
            STRUCTURED_DATA,
            sdata::parse(r#"{ internalMessage := { description := "INVITE" } }"#).unwrap(),
        )]);
        assert!(IdentifyMessageType.process(None, &state).unwrap().is_empty());
    }
}
