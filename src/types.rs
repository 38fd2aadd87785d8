use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of a predict call. Callers send either a bare array of symptom names
/// or an object carrying them under `symptoms`.
#[derive(Debug, Clone, PartialEq)]
pub enum SymptomRequest {
    List(Vec<String>),
    Form(SymptomForm),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SymptomForm {
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    /// Free-form context from the symptom questionnaire; not a model input.
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub severity: Option<Value>,
}

impl SymptomRequest {
    pub fn symptoms(&self) -> &[String] {
        match self {
            SymptomRequest::List(list) => list,
            SymptomRequest::Form(form) => form.symptoms.as_deref().unwrap_or(&[]),
        }
    }

    pub fn duration(&self) -> Option<&Value> {
        match self {
            SymptomRequest::List(_) => None,
            SymptomRequest::Form(form) => form.duration.as_ref(),
        }
    }

    pub fn severity(&self) -> Option<&Value> {
        match self {
            SymptomRequest::List(_) => None,
            SymptomRequest::Form(form) => form.severity.as_ref(),
        }
    }
}

// Dispatch on the JSON shape first. A derived untagged enum would let the
// struct visitor fill `SymptomForm` positionally from any array.
impl<'de> Deserialize<'de> for SymptomRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            list @ Value::Array(_) => serde_json::from_value(list)
                .map(SymptomRequest::List)
                .map_err(|e| de::Error::custom(format!("symptom list must hold only strings: {}", e))),
            form @ Value::Object(_) => serde_json::from_value(form)
                .map(SymptomRequest::Form)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected an array of symptom names or an object with `symptoms`, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub disease: String,
    pub class_index: usize,
    pub unrecognized: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictResponse {
    pub predicted_disease: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_symptoms: Vec<String>,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self { predicted_disease: p.disease, unrecognized_symptoms: p.unrecognized }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomsResponse {
    pub symptoms: Vec<String>,
}
