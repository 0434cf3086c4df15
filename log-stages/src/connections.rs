//! Connection endpoints from port events.

use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value};
use tracing::debug;

use crate::sdata::STRUCTURED_DATA;

pub const CONNECTION_NAMESPACE: &str = "conn";

/// Extracts remote and local endpoint names and ports.
///
/// Endpoints come either from a `connOpened` event or from a structured
/// record that carries `remName`/`locName` at the top level. The result only
/// describes the current record.
#[derive(Debug, Default)]
pub struct IdentifyConnectionsByPort;

impl Stage for IdentifyConnectionsByPort {
    fn process(
        &self,
        _record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        let data = state.get(STRUCTURED_DATA);

        let endpoints = match data.get("connOpened") {
            Some(opened) => opened,
            None if data.get("remName").is_some() && data.get("locName").is_some() => &data,
            None => return Ok(PipelineStageResult::new()),
        };

        let field = |key: &str| endpoints.get(key).cloned().unwrap_or(Value::Null);
        let connection: Value = [
            ("rem_name", field("remName")),
            ("rem_port", field("remPort")),
            ("loc_name", field("locName")),
            ("loc_port", field("locPort")),
        ]
        .into_iter()
        .collect();

        debug!(connection = ?connection, "identified connection");
        Ok(PipelineStageResult::from_structured([(
            CONNECTION_NAMESPACE,
            connection,
        )]))
    }
}
