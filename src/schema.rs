use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered list of symptom names that fixes the layout of every feature vector.
///
/// Position `i` in the schema is column `i` of the model's weight matrix, so the
/// order here must be exactly the order the model was trained with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, AppError> {
        if names.is_empty() {
            return Err(AppError::InvalidSchema("schema has no features".to_string()));
        }
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(AppError::InvalidSchema(format!("duplicate feature '{}'", name)));
            }
        }
        Ok(Self { names, positions })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let schema: FeatureSchema = serde_json::from_str(&data)?;
        debug!("Loaded feature schema from {}: {} features", path.display(), schema.len());
        Ok(schema)
    }

    /// Exact, case-sensitive lookup.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = AppError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positions_follow_order() {
        let schema = FeatureSchema::new(names(&["fever", "cough", "fatigue"])).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("fever"), Some(0));
        assert_eq!(schema.position("fatigue"), Some(2));
        assert_eq!(schema.position("Fever"), None);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(matches!(
            FeatureSchema::new(names(&["fever", "fever"])),
            Err(AppError::InvalidSchema(_))
        ));
        assert!(matches!(FeatureSchema::new(Vec::new()), Err(AppError::InvalidSchema(_))));
    }

    #[test]
    fn test_deserializes_from_plain_array() {
        let schema: FeatureSchema = serde_json::from_str(r#"["fever","cough"]"#).unwrap();
        assert_eq!(schema.names(), &["fever".to_string(), "cough".to_string()]);
        assert_eq!(schema.position("cough"), Some(1));

        let err = serde_json::from_str::<FeatureSchema>(r#"["fever","fever"]"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_features.json");
        std::fs::write(&path, r#"["fever","cough","fatigue"]"#).unwrap();
        let schema = FeatureSchema::load(&path).unwrap();
        assert_eq!(schema.len(), 3);
    }
}
