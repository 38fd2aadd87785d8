use crate::schema::FeatureSchema;
use nalgebra::DVector;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Dense 0/1 encoding of which schema symptoms are present.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: DVector<f64>,
}

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self { values: DVector::zeros(len) }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn as_dvector(&self) -> &DVector<f64> {
        &self.values
    }

    /// Number of positions set to 1.
    pub fn active(&self) -> usize {
        self.values.iter().filter(|v| **v > 0.5).count()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self { values: DVector::from_vec(values) }
    }
}

pub struct Featurizer {
    schema: Arc<FeatureSchema>,
}

impl Featurizer {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Builds the feature vector for one request and returns it together with
    /// the names that matched nothing in the schema. Each distinct unknown
    /// name is reported once, in the order it was first seen.
    pub fn extract<S: AsRef<str>>(&self, symptoms: &[S]) -> (FeatureVector, Vec<String>) {
        let mut vector = FeatureVector::zeros(self.schema.len());
        let mut unrecognized = Vec::new();
        let mut seen = HashSet::new();

        for symptom in symptoms {
            let symptom = symptom.as_ref();
            match self.schema.position(symptom) {
                Some(i) => vector.values[i] = 1.0,
                None => {
                    if seen.insert(symptom) {
                        warn!("Symptom '{}' not recognized and will be ignored", symptom);
                        unrecognized.push(symptom.to_string());
                    }
                }
            }
        }

        (vector, unrecognized)
    }
}
