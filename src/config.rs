//! Pipeline configuration: which stages run, and what they depend on.
//!
//! Configuration files are YAML mappings from stage name to stage settings:
//!
//! ```yaml
//! segregate_sdata:
//!   module: log_stages::sdata
//!   class: SegregateSdata
//! parse_sdata:
//!   module: log_stages::sdata
//!   class: ParseSdata
//!   depends_on: segregate_sdata
//! ```
//!
//! `depends_on` may be absent, a single name, or a list of names. Problems
//! are collected across all stages and reported together.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigurationError;
use crate::registry::{StageHandle, StageRegistry};
use crate::toposort::topological_sort;

/// One configured stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDefinition {
    name: String,
    handle: StageHandle,
    dependencies: Vec<String>,
}

impl StageDefinition {
    /// Duplicate dependency names are dropped; first occurrence wins.
    pub fn new<I, S>(name: impl Into<String>, handle: StageHandle, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let dependencies = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|d: &String| seen.insert(d.clone()))
            .collect();
        Self {
            name: name.into(),
            handle,
            dependencies,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &StageHandle {
        &self.handle
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStageConfig {
    module: String,
    class: String,
    #[serde(default)]
    depends_on: Option<DependsOn>,
}

impl RawStageConfig {
    fn into_definition(self, name: String) -> StageDefinition {
        let dependencies = match self.depends_on {
            None => Vec::new(),
            Some(DependsOn::One(dep)) => vec![dep],
            Some(DependsOn::Many(deps)) => deps,
        };
        StageDefinition::new(name, StageHandle::new(self.module, self.class), dependencies)
    }
}

/// A validated set of stage definitions.
#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    stages: Vec<StageDefinition>,
}

impl PipelineConfiguration {
    /// Check a set of definitions for structural problems.
    ///
    /// Rejects an empty set, duplicate stage names and dependencies on stages
    /// that are not part of the set.
    pub fn new(stages: Vec<StageDefinition>) -> Result<Self, ConfigurationError> {
        if stages.is_empty() {
            return Err(ConfigurationError::Empty);
        }

        let mut problems = Vec::new();
        let mut names = HashSet::new();
        for stage in &stages {
            if !names.insert(stage.name()) {
                problems.push(format!("{}: duplicate stage name", stage.name()));
            }
        }
        for stage in &stages {
            for dep in stage.dependencies() {
                if !names.contains(dep.as_str()) {
                    problems.push(format!("{}: depends on unknown stage '{dep}'", stage.name()));
                }
            }
        }

        if !problems.is_empty() {
            return Err(ConfigurationError::Invalid(problems));
        }
        Ok(Self { stages })
    }

    /// Parse a YAML stage mapping.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigurationError> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)?;

        let mut problems = Vec::new();
        let mut stages = Vec::new();
        for (key, value) in mapping {
            let Some(name) = key.as_str().map(str::to_string) else {
                problems.push(format!("{key:?}: stage names must be strings"));
                continue;
            };
            match serde_yaml::from_value::<RawStageConfig>(value) {
                Ok(raw) => stages.push(raw.into_definition(name)),
                Err(e) => problems.push(format!("{name}: {e}")),
            }
        }

        if !problems.is_empty() {
            return Err(ConfigurationError::Invalid(problems));
        }
        Self::new(stages)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded pipeline configuration");
        Self::from_yaml_str(&text)
    }

    /// Definitions in configuration order.
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Definitions ordered so that every stage follows its dependencies.
    pub fn stages_in_order(&self) -> Result<Vec<StageDefinition>, ConfigurationError> {
        let by_name: HashMap<&str, &StageDefinition> =
            self.stages.iter().map(|s| (s.name(), s)).collect();

        let order = topological_sort(self.stages.iter().map(|s| s.name()), |name| {
            by_name
                .get(name)
                .copied()
                .map(|s| s.dependencies().iter().map(String::as_str).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .map_err(|source| ConfigurationError::Dependencies {
            source,
            cycle: self.find_cycle(),
        })?;

        Ok(order
            .into_iter()
            .filter_map(|name| by_name.get(name).map(|s| (*s).clone()))
            .collect())
    }

    /// Check every stage against `registry`: it must be registered,
    /// constructible, and survive the probe call.
    pub fn validate(&self, registry: &StageRegistry) -> Result<(), ConfigurationError> {
        let problems: Vec<String> = self
            .stages
            .iter()
            .filter_map(|stage| {
                registry
                    .instantiate_checked(stage.handle())
                    .err()
                    .map(|e| format!("{}: {e}", stage.name()))
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::Invalid(problems))
        }
    }

    /// Find one dependency cycle, reported as a closed path of names.
    fn find_cycle(&self) -> Vec<String> {
        fn visit<'a>(
            name: &'a str,
            by_name: &HashMap<&'a str, &'a StageDefinition>,
            path: &mut Vec<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> Option<Vec<String>> {
            if let Some(start) = path.iter().position(|n| *n == name) {
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Some(cycle);
            }
            if done.contains(name) {
                return None;
            }
            path.push(name);
            if let Some(stage) = by_name.get(name).copied() {
                for dep in stage.dependencies() {
                    if let Some(cycle) = visit(dep, by_name, path, done) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            done.insert(name);
            None
        }

        let by_name: HashMap<&str, &StageDefinition> =
            self.stages.iter().map(|s| (s.name(), s)).collect();
        let mut done = HashSet::new();
        for stage in &self.stages {
            let mut path = Vec::new();
            if let Some(cycle) = visit(stage.name(), &by_name, &mut path, &mut done) {
                return cycle;
            }
        }
        Vec::new()
    }
}
