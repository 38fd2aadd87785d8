use crate::codec::LabelCodec;
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::features::{FeatureVector, Featurizer};
use crate::model::{LinearModel, ScoringModel};
use crate::schema::FeatureSchema;
use crate::types::{Prediction, SymptomRequest};
use std::sync::Arc;
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Owns the schema / model / codec triple and runs vectorize, score, decode.
///
/// Everything inside is read-only after construction, so one engine behind an
/// `Arc` serves any number of concurrent requests without locking.
pub struct DiagnosisEngine {
    featurizer: Featurizer,
    model: Arc<dyn ScoringModel>,
    codec: LabelCodec,
    strict_symptoms: bool,
}

impl DiagnosisEngine {
    /// Cross-checks the three artifacts before accepting them. Any disagreement
    /// means they were not produced by the same training run.
    pub fn new(
        schema: FeatureSchema,
        model: Arc<dyn ScoringModel>,
        codec: LabelCodec,
    ) -> Result<Self, AppError> {
        if model.n_features() != schema.len() {
            return Err(AppError::SchemaMismatch(format!(
                "schema has {} features, model expects {}",
                schema.len(),
                model.n_features()
            )));
        }
        if let Some(order) = model.feature_order() {
            if let Some(i) = order.iter().zip(schema.names()).position(|(a, b)| a != b) {
                return Err(AppError::SchemaMismatch(format!(
                    "feature {} is '{}' in the schema but '{}' in the model",
                    i,
                    schema.names()[i],
                    order[i]
                )));
            }
        }
        if model.n_classes() != codec.len() {
            return Err(AppError::SchemaMismatch(format!(
                "model scores {} classes, codec holds {} labels",
                model.n_classes(),
                codec.len()
            )));
        }
        codec.check_round_trip()?;

        Ok(Self {
            featurizer: Featurizer::new(Arc::new(schema)),
            model,
            codec,
            strict_symptoms: false,
        })
    }

    pub fn load(config: &EngineConfig) -> Result<Self, AppError> {
        let schema = FeatureSchema::load(&config.features_path)?;
        let model = LinearModel::load(&config.model_path)?;
        let codec = LabelCodec::load(&config.labels_path)?;
        let engine = Self::new(schema, Arc::new(model), codec)?.with_strict_symptoms(config.strict_symptoms);
        info!(
            "Diagnosis engine ready: {} features, {} classes, strict_symptoms={}",
            engine.schema().len(),
            engine.codec.len(),
            engine.strict_symptoms
        );
        Ok(engine)
    }

    pub fn with_strict_symptoms(mut self, strict: bool) -> Self {
        self.strict_symptoms = strict;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.featurizer.schema()
    }

    pub fn classes(&self) -> &[String] {
        self.codec.classes()
    }

    pub fn predict(&self, request: &SymptomRequest) -> Result<Prediction, AppError> {
        let request_id = Uuid::new_v4();
        let _span = info_span!("predict", %request_id).entered();

        debug!(
            symptoms = request.symptoms().len(),
            duration = ?request.duration(),
            severity = ?request.severity(),
            "Received prediction request"
        );

        let (vector, unrecognized) = self.vectorize(request)?;
        let class_index = self.model.predict(&vector)?;
        let disease = self.codec.decode(class_index)?.to_string();

        info!(class_index, disease = %disease, unrecognized = unrecognized.len(), "Prediction complete");
        Ok(Prediction { disease, class_index, unrecognized })
    }

    /// Scores several requests with one model call. Results come back in
    /// request order and equal what `predict` returns for each.
    pub fn predict_batch(&self, requests: &[SymptomRequest]) -> Result<Vec<Prediction>, AppError> {
        let mut vectors = Vec::with_capacity(requests.len());
        let mut unrecognized = Vec::with_capacity(requests.len());
        for request in requests {
            let (vector, unknown) = self.vectorize(request)?;
            vectors.push(vector);
            unrecognized.push(unknown);
        }

        let indices = self.model.predict_batch(&vectors)?;
        indices
            .into_iter()
            .zip(unrecognized)
            .map(|(class_index, unrecognized)| {
                let disease = self.codec.decode(class_index)?.to_string();
                Ok(Prediction { disease, class_index, unrecognized })
            })
            .collect()
    }

    fn vectorize(&self, request: &SymptomRequest) -> Result<(FeatureVector, Vec<String>), AppError> {
        let (vector, unrecognized) = self.featurizer.extract(request.symptoms());
        if self.strict_symptoms && !unrecognized.is_empty() {
            return Err(AppError::UnknownSymptoms(unrecognized));
        }
        debug!(active = vector.active(), width = vector.len(), "Built feature vector");
        Ok((vector, unrecognized))
    }
}
