use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CodecFile {
    classes: Vec<String>,
}

/// Bidirectional mapping between disease labels and class indices.
/// The index of a label is its position in `classes`.
#[derive(Debug, Clone)]
pub struct LabelCodec {
    classes: Vec<String>,
    indices: HashMap<String, usize>,
}

impl LabelCodec {
    pub fn new(classes: Vec<String>) -> Result<Self, AppError> {
        if classes.is_empty() {
            return Err(AppError::InvalidCodec("no classes".to_string()));
        }
        let mut indices = HashMap::with_capacity(classes.len());
        for (i, label) in classes.iter().enumerate() {
            if indices.insert(label.clone(), i).is_some() {
                return Err(AppError::InvalidCodec(format!("duplicate label '{}'", label)));
            }
        }
        Ok(Self { classes, indices })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let file: CodecFile = serde_json::from_str(&data)?;
        let codec = Self::new(file.classes)?;
        debug!("Loaded label codec from {}: {} classes", path.display(), codec.len());
        Ok(codec)
    }

    pub fn decode(&self, index: usize) -> Result<&str, AppError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(AppError::Decode { index, classes: self.classes.len() })
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    /// Confirms `encode(decode(k)) == k` for every class index.
    pub fn check_round_trip(&self) -> Result<(), AppError> {
        for k in 0..self.classes.len() {
            let label = self.decode(k)?;
            if self.encode(label) != Some(k) {
                return Err(AppError::InvalidCodec(format!("label '{}' does not encode back to {}", label, k)));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
