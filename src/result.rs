//! Accumulated findings of a pipeline run over one record.
//!
//! A [`PipelineStageResult`] is a persistent value: building or merging one
//! never changes an existing instance, and every accessor hands out an owned
//! copy. Copies of the underlying `im` collections share structure, so the
//! isolation costs a pointer bump rather than a deep clone.

use im::{OrdMap, Vector};
use serde::Serialize;

use crate::sdata::Value;

/// Tags and structured data contributed by zero or more stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStageResult {
    tags: Vector<String>,
    structured: OrdMap<String, Value>,
}

impl PipelineStageResult {
    /// An empty result; stages return this when they have nothing to add.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            structured: OrdMap::new(),
        }
    }

    pub fn from_structured<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            tags: Vector::new(),
            structured: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A copy of this result with `tag` appended.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        let mut tags = self.tags.clone();
        tags.push_back(tag.into());
        Self {
            tags,
            structured: self.structured.clone(),
        }
    }

    /// A copy of this result with `key` set to `value`.
    pub fn with_entry(&self, key: impl Into<String>, value: Value) -> Self {
        Self {
            tags: self.tags.clone(),
            structured: self.structured.update(key.into(), value),
        }
    }

    /// Tags in emission order, duplicates included.
    pub fn tags(&self) -> Vector<String> {
        self.tags.clone()
    }

    /// Structured data keyed by namespace.
    pub fn structured(&self) -> OrdMap<String, Value> {
        self.structured.clone()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.structured.contains_key(key)
    }

    /// The value stored under `key`; a missing key reads as an empty map.
    pub fn get(&self, key: &str) -> Value {
        self.structured
            .get(key)
            .cloned()
            .unwrap_or_else(Value::empty_map)
    }

    /// Walk `path` through nested maps, starting at a namespace key.
    ///
    /// Any missing step, including stepping into a non-map value, reads as
    /// an empty map.
    pub fn lookup(&self, path: &[&str]) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return Value::empty_map();
        };
        let Some(mut current) = self.structured.get(*first) else {
            return Value::empty_map();
        };
        for key in rest {
            match current.get(key) {
                Some(next) => current = next,
                None => return Value::empty_map(),
            }
        }
        current.clone()
    }

    /// True when no stage contributed anything.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.structured.is_empty()
    }

    /// Fold a stage's output into this running result.
    ///
    /// Tags are concatenated in order. Top-level structured keys from `other`
    /// replace same-named keys here wholesale; nested content is not merged.
    pub fn merge(&self, other: &PipelineStageResult) -> PipelineStageResult {
        let mut tags = self.tags.clone();
        tags.append(other.tags.clone());

        let mut structured = self.structured.clone();
        for (key, value) in other.structured.iter() {
            structured.insert(key.clone(), value.clone());
        }

        PipelineStageResult { tags, structured }
    }
}
