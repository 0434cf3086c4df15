//! # testlog-pipelines
//!
//! A record-at-a-time analysis pipeline for test-execution logs.
//!
//! Test runs write line-oriented logs where every record starts with a fixed
//! header (date, time, application, event type, source location) and may
//! continue over several lines. This library turns such a log into typed
//! records and pushes each record through a dependency-ordered chain of
//! analysis stages.
//!
//! ## Overview
//!
//! - **Framing**: [`gather_records`] groups raw lines into one buffer per record
//! - **Parsing**: [`LogRecord::parse`] validates the header grammar
//! - **Structured data**: [`sdata::parse_value`] decodes the `{ key := value }`
//!   literals some records carry
//! - **Stages**: anything implementing [`Stage`], looked up by handle in a
//!   [`StageRegistry`]
//! - **Pipelines**: [`Pipeline`] orders configured stages by their
//!   dependencies and folds their results into a [`PipelineStageResult`]
//!
//! ## Example
//!
//! ```
//! use testlog_pipelines::{Pipeline, PipelineStageResult, Stage, fn_stage};
//!
//! let syscalls: Box<dyn Stage> = Box::new(fn_stage(|record, _state| {
//!     Ok(match record {
//!         Some(r) if r.event_type() == "SYSCALL" => PipelineStageResult::from_tags(["syscall"]),
//!         _ => PipelineStageResult::new(),
//!     })
//! }));
//! let pipeline = Pipeline::from_stages([("syscalls", syscalls)]);
//!
//! let log = [
//!     "2014/Oct/24 19:16:48.062933 111 SYSCALL Test.ttcn:313(function:F) open(0x7F323232) = -1",
//!     "2014/Oct/24 19:16:48.070001 111 PORTEVENT Test.ttcn:320(function:F) message sent",
//! ];
//!
//! let tagged: Vec<bool> = pipeline
//!     .process_lines(log)
//!     .map(|item| item.map(|(_, result)| result.has_tag("syscall")))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(tagged, vec![true, false]);
//! ```

pub mod config;
pub mod error;
pub mod framer;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod result;
pub mod sdata;
pub mod stage;
pub mod toposort;

pub use config::{PipelineConfiguration, StageDefinition};
pub use error::{
    ConfigurationError, FormatError, PipelineError, RecursionError, StageExecutionError,
    SyntaxError,
};
pub use framer::{RecordFramer, gather_records};
pub use pipeline::{Pipeline, ProcessLines, RecordTrace};
pub use record::{LogRecord, SourceLocation, line_begins_with_record_header};
pub use registry::{StageFactory, StageHandle, StageRegistry};
pub use result::PipelineStageResult;
pub use sdata::Value;
pub use stage::{FnStage, Stage, fn_stage};
pub use toposort::{MAX_DEPTH, topological_sort};
