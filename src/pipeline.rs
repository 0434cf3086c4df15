//! Pipeline engine.
//!
//! A [`Pipeline`] holds one instance of every configured stage, in
//! dependency order. Each record is pushed through the whole stage chain
//! before the next one is looked at; every record starts from an empty
//! [`PipelineStageResult`] and nothing carries over between records.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::config::PipelineConfiguration;
use crate::error::{ConfigurationError, PipelineError, StageExecutionError};
use crate::framer::{RecordFramer, gather_records};
use crate::record::LogRecord;
use crate::registry::{StageRegistry, panic_message};
use crate::result::PipelineStageResult;
use crate::stage::Stage;

/// Snapshots of one record's accumulator as it moved through the pipeline.
///
/// `snapshots[0]` is the empty starting accumulator and `snapshots[i]` is
/// the accumulator after stage `i-1`. Length is `stage_names.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTrace {
    pub stage_names: Vec<String>,
    pub snapshots: Vec<PipelineStageResult>,
}

impl RecordTrace {
    /// Accumulator right after the named stage ran.
    pub fn after(&self, stage: &str) -> Option<&PipelineStageResult> {
        let index = self.stage_names.iter().position(|s| s == stage)?;
        self.snapshots.get(index + 1)
    }

    /// What the named stage added on top of its predecessors.
    pub fn contribution(&self, stage: &str) -> Option<PipelineStageResult> {
        let index = self.stage_names.iter().position(|s| s == stage)?;
        let before = self.snapshots.get(index)?;
        let after = self.snapshots.get(index + 1)?;

        let tags = after.tags().into_iter().skip(before.tags().len());
        let mut added = PipelineStageResult::from_tags(tags);
        let previous = before.structured();
        for (key, value) in after.structured() {
            if previous.get(&key) != Some(&value) {
                added = added.with_entry(key, value);
            }
        }
        Some(added)
    }
}

/// A dependency-ordered chain of named stages.
pub struct Pipeline {
    stages: Vec<(String, Box<dyn Stage>)>,
}

impl Pipeline {
    /// Instantiate every configured stage from `registry`.
    ///
    /// Stages are ordered by their dependencies and probed once; every stage
    /// that cannot be built is reported together, before any record is seen.
    pub fn new(
        config: &PipelineConfiguration,
        registry: &StageRegistry,
    ) -> Result<Self, ConfigurationError> {
        let mut stages = Vec::new();
        let mut problems = Vec::new();

        for definition in config.stages_in_order()? {
            match registry.instantiate_checked(definition.handle()) {
                Ok(stage) => stages.push((definition.name().to_string(), stage)),
                Err(e) => problems.push(format!("{}: {e}", definition.name())),
            }
        }

        if !problems.is_empty() {
            return Err(ConfigurationError::Invalid(problems));
        }

        let pipeline = Self { stages };
        info!(stages = ?pipeline.stage_names(), "pipeline constructed");
        Ok(pipeline)
    }

    /// Build a pipeline from stages already in execution order.
    pub fn from_stages<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = (S, Box<dyn Stage>)>,
        S: Into<String>,
    {
        Self {
            stages: stages
                .into_iter()
                .map(|(name, stage)| (name.into(), stage))
                .collect(),
        }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `record`, merging each contribution in turn.
    ///
    /// The first failing stage aborts this record; its error carries the
    /// stage name. A stage that panics counts as failing.
    pub fn process(&self, record: &LogRecord) -> Result<PipelineStageResult, StageExecutionError> {
        let mut state = PipelineStageResult::new();
        for (name, stage) in &self.stages {
            state = run_stage(name, stage.as_ref(), record, &state)?;
        }
        Ok(state)
    }

    /// Like [`Pipeline::process`], also capturing the accumulator after
    /// every stage.
    pub fn process_traced(
        &self,
        record: &LogRecord,
    ) -> Result<(PipelineStageResult, RecordTrace), StageExecutionError> {
        let mut snapshots = Vec::with_capacity(self.stages.len() + 1);
        let mut state = PipelineStageResult::new();
        snapshots.push(state.clone());

        for (name, stage) in &self.stages {
            state = run_stage(name, stage.as_ref(), record, &state)?;
            snapshots.push(state.clone());
        }

        let trace = RecordTrace {
            stage_names: self.stage_names().into_iter().map(str::to_string).collect(),
            snapshots,
        };
        Ok((state, trace))
    }

    /// Frame `lines` into records and run each through the pipeline.
    ///
    /// One item per framed record, in input order. A record that fails to
    /// parse or to process yields an `Err` and the stream carries on with
    /// the next record, so the caller decides whether to stop.
    pub fn process_lines<I>(&self, lines: I) -> ProcessLines<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        ProcessLines {
            pipeline: self,
            records: gather_records(lines),
        }
    }
}

fn run_stage(
    name: &str,
    stage: &dyn Stage,
    record: &LogRecord,
    state: &PipelineStageResult,
) -> Result<PipelineStageResult, StageExecutionError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage.process(Some(record), state)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(stage = name, panic = %message, "stage panicked");
            Err(anyhow::anyhow!("panicked with {message}"))
        });
    let contribution = outcome.map_err(|source| StageExecutionError {
        stage: name.to_string(),
        source,
    })?;
    debug!(
        stage = name,
        tags = contribution.tags().len(),
        keys = contribution.structured().len(),
        "stage processed record"
    );
    Ok(state.merge(&contribution))
}

/// Lazy record stream returned by [`Pipeline::process_lines`].
pub struct ProcessLines<'p, I> {
    pipeline: &'p Pipeline,
    records: RecordFramer<I>,
}

impl<I, S> Iterator for ProcessLines<'_, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<(LogRecord, PipelineStageResult), PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.records.next()?;
        Some(process_group(self.pipeline, &lines))
    }
}

fn process_group(
    pipeline: &Pipeline,
    lines: &[String],
) -> Result<(LogRecord, PipelineStageResult), PipelineError> {
    let record = LogRecord::from_lines(lines)?;
    let result = pipeline.process(&record)?;
    Ok((record, result))
}
