use std::env;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub bind_addr: String,
    pub features_path: String,
    pub model_path: String,
    pub labels_path: String,
    /// Reject requests naming symptoms outside the schema instead of ignoring them.
    pub strict_symptoms: bool,
    pub max_batch: usize,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("DIAGNOSIS_BIND").unwrap_or_else(|| {
            let port: u16 = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(5000);
            format!("0.0.0.0:{}", port)
        });

        Self {
            bind_addr,
            features_path: lookup("DIAGNOSIS_FEATURES")
                .unwrap_or_else(|| "./artifacts/model_features.json".to_string()),
            model_path: lookup("DIAGNOSIS_MODEL").unwrap_or_else(|| "./artifacts/model.json".to_string()),
            labels_path: lookup("DIAGNOSIS_LABELS")
                .unwrap_or_else(|| "./artifacts/label_encoder.json".to_string()),
            strict_symptoms: lookup("DIAGNOSIS_STRICT_SYMPTOMS").map(|v| parse_flag(&v)).unwrap_or(false),
            max_batch: lookup("DIAGNOSIS_MAX_BATCH").and_then(|v| v.parse().ok()).unwrap_or(256),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
