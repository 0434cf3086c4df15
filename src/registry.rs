//! Lookup table from stage handles to stage constructors.
//!
//! Configuration names stages by a two-part handle (module and class). The
//! registry maps each handle to a factory; it is populated once at startup
//! and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::result::PipelineStageResult;
use crate::stage::Stage;

/// Two-part stage identifier, displayed as `module.class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageHandle {
    module: String,
    class: String,
}

impl StageHandle {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: class.into(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn class(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

/// Constructor for one stage type.
pub type StageFactory = Box<dyn Fn() -> anyhow::Result<Box<dyn Stage>>>;

/// Registry of every stage type a pipeline may be built from.
#[derive(Default)]
pub struct StageRegistry {
    factories: HashMap<StageHandle, StageFactory>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `module.class`, replacing any earlier entry.
    pub fn register<F>(&mut self, module: &str, class: &str, factory: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Stage>> + 'static,
    {
        self.factories
            .insert(StageHandle::new(module, class), Box::new(factory));
        self
    }

    /// Register a stage type that needs no constructor arguments.
    pub fn register_default<S>(&mut self, module: &str, class: &str) -> &mut Self
    where
        S: Stage + Default + 'static,
    {
        self.register(module, class, || Ok(Box::new(S::default()) as Box<dyn Stage>))
    }

    pub fn contains(&self, handle: &StageHandle) -> bool {
        self.factories.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered handles, sorted for stable listings.
    pub fn handles(&self) -> Vec<&StageHandle> {
        let mut handles: Vec<_> = self.factories.keys().collect();
        handles.sort_by(|a, b| (a.module(), a.class()).cmp(&(b.module(), b.class())));
        handles
    }

    /// Construct the stage registered under `handle`.
    pub fn instantiate(&self, handle: &StageHandle) -> Result<Box<dyn Stage>, String> {
        let factory = self
            .factories
            .get(handle)
            .ok_or_else(|| format!("{handle}: no such stage type is registered"))?;
        factory().map_err(|e| format!("{handle}: could not be instantiated: {e:#}"))
    }

    /// Construct the stage and check that it behaves like one.
    ///
    /// The probe runs `process` without a record on an empty accumulator. An
    /// error or a panic during the probe rejects the stage.
    pub fn instantiate_checked(&self, handle: &StageHandle) -> Result<Box<dyn Stage>, String> {
        let stage = self.instantiate(handle)?;
        let empty = PipelineStageResult::new();
        let probe = panic::catch_unwind(AssertUnwindSafe(|| stage.process(None, &empty)));
        match probe {
            Ok(Ok(_)) => Ok(stage),
            Ok(Err(e)) => Err(format!("{handle}: not a pipeline stage: {e:#}")),
            Err(payload) => Err(format!(
                "{handle}: not a pipeline stage: panicked with {}",
                panic_message(payload.as_ref())
            )),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("'{s}'")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("'{s}'")
    } else {
        "a non-string payload".to_string()
    }
}
