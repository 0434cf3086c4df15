//! JSON Lines output of pipeline results.

use std::io::{self, Write};

use serde_json::json;
use testlog_pipelines::{LogRecord, PipelineStageResult, Stage};

/// Render one record and the results accumulated for it.
pub fn render(record: &LogRecord, state: &PipelineStageResult) -> serde_json::Result<String> {
    serde_json::to_string(&json!({
        "record": record,
        "results": state,
    }))
}

/// Writes `{"record": ..., "results": ...}` to stdout for every record.
///
/// Contributes nothing to the results. Place it after the stages whose
/// findings should be visible.
#[derive(Debug, Default)]
pub struct EmitJsonLines;

impl Stage for EmitJsonLines {
    fn process(
        &self,
        record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        if let Some(record) = record {
            let line = render(record, state)?;
            let mut out = io::stdout().lock();
            writeln!(out, "{line}")?;
        }
        Ok(PipelineStageResult::new())
    }
}
