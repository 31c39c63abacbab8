//! Feature schema and request validation.

use crate::error::{PredictError, StartupError};
use crate::types::RawFeatureInput;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Ordered, immutable list of the feature names the model was trained on.
///
/// Defines both the set of accepted request keys and the column order of
/// every feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated name lists.
    pub fn new(names: Vec<String>) -> Result<Self, StartupError> {
        if names.is_empty() {
            return Err(StartupError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(StartupError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self {
            names: names.into(),
        })
    }

    /// Load a schema from a JSON array of feature names.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StartupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let names: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| StartupError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reject inputs carrying keys outside the schema.
    ///
    /// The error lists every offending key, sorted, so the caller can fix
    /// the whole request at once.
    pub fn validate(&self, input: &RawFeatureInput) -> Result<(), PredictError> {
        let known: HashSet<&str> = self.names.iter().map(String::as_str).collect();
        let mut unknown: Vec<String> = input
            .keys()
            .filter(|key| !known.contains(key.as_str()))
            .cloned()
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        unknown.sort();
        Err(PredictError::UnknownFeature(unknown))
    }
}
