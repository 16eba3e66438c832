//! Class index to label mapping.
//!
//! The training side writes `{"label": index, ...}`; it is inverted here to
//! `index -> label`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::module::error::ClassifyError;

/// Labels indexed by class index. Covers `0..len()` with no gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Load a `{"label": index}` JSON file.
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        if !path.is_file() {
            return Err(ClassifyError::Missing {
                kind: "class indices",
                path: path.to_path_buf(),
            });
        }
        let src = fs::read_to_string(path).map_err(|source| ClassifyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&src)
    }

    pub fn from_json(src: &str) -> Result<Self, ClassifyError> {
        let raw: BTreeMap<String, usize> = serde_json::from_str(src)?;
        Self::from_indices(raw)
    }

    /// Invert `label -> index` pairs. Every index in `0..n` must appear exactly once.
    pub fn from_indices<I>(pairs: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let mut slots: BTreeMap<usize, String> = BTreeMap::new();
        for (label, index) in pairs {
            if let Some(first) = slots.get(&index) {
                return Err(ClassifyError::DuplicateIndex {
                    index,
                    first: first.clone(),
                    second: label,
                });
            }
            slots.insert(index, label);
        }
        let len = slots.len();
        if let Some(missing) = (0..len).find(|i| !slots.contains_key(i)) {
            return Err(ClassifyError::MissingIndex { len, missing });
        }
        Ok(Self {
            labels: slots.into_values().collect(),
        })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Check the mapping names exactly as many classes as the model outputs.
    pub fn ensure_width(&self, outputs: usize) -> Result<(), ClassifyError> {
        if self.len() != outputs {
            return Err(ClassifyError::WidthMismatch {
                labels: self.len(),
                outputs,
            });
        }
        Ok(())
    }
}
