//! The capability every analysis stage implements.

use crate::record::LogRecord;
use crate::result::PipelineStageResult;

/// A unit of analysis that reads a record plus what earlier stages found.
///
/// `process` must not rely on state kept in `self` between records: stage
/// instances are created once per pipeline and reused for every record, and
/// anything a stage learns about a record belongs in the returned result.
///
/// The pipeline probes every stage once at construction time by calling
/// `process(None, &PipelineStageResult::new())`. Stages should treat a
/// missing record as "nothing to do" and return an empty result.
pub trait Stage {
    /// Inspect `record` and return this stage's contribution.
    ///
    /// The returned result holds only what this stage adds; the pipeline
    /// merges it into the running accumulator.
    fn process(
        &self,
        record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult>;
}

/// A stage backed by a plain function or closure.
///
/// # Example
///
/// ```
/// use testlog_pipelines::{PipelineStageResult, Stage, fn_stage};
///
/// let tagger = fn_stage(|record, _state| {
///     Ok(match record {
///         Some(r) if r.event_type() == "SYSCALL" => PipelineStageResult::from_tags(["syscall"]),
///         _ => PipelineStageResult::new(),
///     })
/// });
/// assert!(tagger.process(None, &PipelineStageResult::new()).unwrap().is_empty());
/// ```
pub struct FnStage<F> {
    func: F,
}

pub fn fn_stage<F>(func: F) -> FnStage<F>
where
    F: Fn(Option<&LogRecord>, &PipelineStageResult) -> anyhow::Result<PipelineStageResult>,
{
    FnStage { func }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(Option<&LogRecord>, &PipelineStageResult) -> anyhow::Result<PipelineStageResult>,
{
    fn process(
        &self,
        record: Option<&LogRecord>,
        state: &PipelineStageResult,
    ) -> anyhow::Result<PipelineStageResult> {
        (self.func)(record, state)
    }
}
