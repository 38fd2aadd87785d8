use crate::error::AppError;
use crate::features::FeatureVector;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Anything that turns a feature vector into exactly one class index.
pub trait ScoringModel: Send + Sync {
    fn predict(&self, x: &FeatureVector) -> Result<usize, AppError>;

    fn predict_batch(&self, xs: &[FeatureVector]) -> Result<Vec<usize>, AppError> {
        xs.iter().map(|x| self.predict(x)).collect()
    }

    /// Width of the vectors this model accepts.
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Feature names the model was trained on, when the artifact records them.
    fn feature_order(&self) -> Option<&[String]> {
        None
    }
}

/// On-disk form of a fitted linear classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearWeights {
    /// One row per class, or a single row for a binary model.
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_order: Option<Vec<String>>,
}

/// Multinomial (or binary) logistic-regression decision rule.
///
/// Only the decision function is evaluated; the predicted class is the arg max
/// of `coef * x + intercept`, the lowest index winning ties. A single-row model
/// predicts class 1 when its score is strictly positive.
#[derive(Clone, Debug)]
pub struct LinearModel {
    coef: DMatrix<f64>,
    intercept: DVector<f64>,
    feature_order: Option<Vec<String>>,
}

impl LinearModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let weights: LinearWeights = serde_json::from_str(&data)?;
        let model = Self::from_weights(weights)?;
        debug!(
            "Loaded linear model from {}: {} classes x {} features",
            path.display(),
            model.n_classes(),
            model.n_features()
        );
        Ok(model)
    }

    pub fn from_weights(weights: LinearWeights) -> Result<Self, AppError> {
        let rows = weights.coef.len();
        if rows == 0 {
            return Err(AppError::InvalidModel("coef has no rows".to_string()));
        }
        let cols = weights.coef[0].len();
        if cols == 0 {
            return Err(AppError::InvalidModel("coef has no columns".to_string()));
        }
        if let Some(i) = weights.coef.iter().position(|row| row.len() != cols) {
            return Err(AppError::InvalidModel(format!(
                "coef row {} has {} columns, expected {}",
                i,
                weights.coef[i].len(),
                cols
            )));
        }
        if weights.intercept.len() != rows {
            return Err(AppError::InvalidModel(format!(
                "{} intercepts for {} coef rows",
                weights.intercept.len(),
                rows
            )));
        }
        let finite = weights.coef.iter().flatten().chain(weights.intercept.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(AppError::InvalidModel("non-finite weight".to_string()));
        }
        if let Some(order) = &weights.feature_order {
            if order.len() != cols {
                return Err(AppError::InvalidModel(format!(
                    "feature_order lists {} names for {} columns",
                    order.len(),
                    cols
                )));
            }
        }

        let flat: Vec<f64> = weights.coef.into_iter().flatten().collect();
        Ok(Self {
            coef: DMatrix::from_row_slice(rows, cols, &flat),
            intercept: DVector::from_vec(weights.intercept),
            feature_order: weights.feature_order,
        })
    }

    fn check_width(&self, x: &FeatureVector) -> Result<(), AppError> {
        if x.len() != self.coef.ncols() {
            return Err(AppError::SchemaMismatch(format!(
                "feature vector has {} entries, model expects {}",
                x.len(),
                self.coef.ncols()
            )));
        }
        Ok(())
    }

    fn decide(&self, mut scores: impl Iterator<Item = f64>) -> usize {
        if self.coef.nrows() == 1 {
            let z = scores.next().unwrap_or(0.0);
            return usize::from(z > 0.0);
        }
        let mut best = 0usize;
        let mut best_score = f64::NEG_INFINITY;
        for (i, s) in scores.enumerate() {
            if s > best_score {
                best_score = s;
                best = i;
            }
        }
        best
    }
}

impl ScoringModel for LinearModel {
    fn predict(&self, x: &FeatureVector) -> Result<usize, AppError> {
        self.check_width(x)?;
        let scores = &self.coef * x.as_dvector() + &self.intercept;
        Ok(self.decide(scores.iter().copied()))
    }

    fn predict_batch(&self, xs: &[FeatureVector]) -> Result<Vec<usize>, AppError> {
        if xs.is_empty() {
            return Ok(Vec::new());
        }
        for x in xs {
            self.check_width(x)?;
        }
        let columns: Vec<DVector<f64>> = xs.iter().map(|x| x.as_dvector().clone()).collect();
        let scores = &self.coef * DMatrix::from_columns(&columns);
        Ok((0..scores.ncols())
            .map(|j| {
                let col = scores.column(j);
                self.decide(col.iter().zip(self.intercept.iter()).map(|(s, b)| s + b))
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    fn n_classes(&self) -> usize {
        match self.coef.nrows() {
            1 => 2,
            k => k,
        }
    }

    fn feature_order(&self) -> Option<&[String]> {
        self.feature_order.as_deref()
    }
}
