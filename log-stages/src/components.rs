//! Component lifecycle records.
//!
//! Test executors log the component reference and type of every component
//! they create. [`TagComponentIds`] marks such records and
//! [`ExtractComponentIds`] pulls out the identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use testlog_pipelines::{LogRecord, PipelineStageResult, Stage, Value};

pub const COMPONENT_NAMESPACE: &str = "hu.analyzer.component";

static COMPONENT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)component\sreference:\s(?P<component_id>\d+)")
        .expect("component id pattern is a valid regex")
});

static COMPONENT_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)type:\s(?P<component_type>\w+(?:\.\w+))")
        .expect("component type pattern is a valid regex")
});

/// Tags records that mention a component reference.
#[derive(Debug, Default)]
pub struct TagComponentIds;

impl Stage for TagComponentIds {
    fn process(
        &self,
        record: Option<&LogRecord>,
        _state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        Ok(match record {
            Some(r) if COMPONENT_ID.is_match(r.content()) => {
                PipelineStageResult::from_tags([COMPONENT_NAMESPACE])
            }
            _ => PipelineStageResult::new(),
        })
    }
}

/// Extracts `{id, type}` from records tagged by [`TagComponentIds`].
///
/// `type` is null when the record names no qualified component type.
#[derive(Debug, Default)]
pub struct ExtractComponentIds;

impl Stage for ExtractComponentIds {
    fn process(
        &self,
        record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        let Some(record) = record else {
            return Ok(PipelineStageResult::new());
        };
        if !state.has_tag(COMPONENT_NAMESPACE) {
            return Ok(PipelineStageResult::new());
        }
        let Some(id) = COMPONENT_ID.captures(record.content()) else {
            anyhow::bail!("record tagged as component has no component reference");
        };

        let component_type = COMPONENT_TYPE
            .captures(record.content())
            .map_or(Value::Null, |caps| Value::from(&caps["component_type"]));

        let component: Value = [
            ("type", component_type),
            ("id", Value::from(&id["component_id"])),
        ]
        .into_iter()
        .collect();
        Ok(PipelineStageResult::from_structured([(
            COMPONENT_NAMESPACE,
            component,
        )]))
    }
}
