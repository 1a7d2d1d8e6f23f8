use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::news_prediction::count_vectorizer::CountVectorizer;
use crate::news_prediction::onnx_classifier::OnnxClassifier;

/// Raw class id produced by the classifier (0/1 for the shipped model).
pub type Label = i64;

/// Errors raised while loading the artifacts at startup
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse vectorizer parameters: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid token pattern: {0}")]
    TokenPattern(#[from] regex::Error),

    #[error("Invalid vectorizer: {0}")]
    InvalidVectorizer(String),

    #[error("Failed to load ONNX model from {}: {source}", .path.display())]
    Onnx {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    #[error("Invalid classifier: {0}")]
    InvalidClassifier(String),
}

/// Errors raised while serving a single prediction
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("text must be a string, got {0}")]
    NonTextInput(&'static str),

    #[error("Failed to build input tensor: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Inference failed: {0}")]
    Onnx(#[from] ort::Error),

    #[error("Classifier returned no label")]
    EmptyOutput,

    #[error("Classifier session is unavailable")]
    SessionPoisoned,
}

/// Maps one raw text to a fixed-dimension feature vector.
pub trait FeatureTransform: Send + Sync {
    fn transform(&self, text: &str) -> Result<Vec<f32>, PredictionError>;
}

/// Maps one feature vector to a class label.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &[f32]) -> Result<Label, PredictionError>;
}

/// The loaded transform and classifier. Built once before the server binds
/// and never mutated afterwards.
pub struct PredictionModel {
    transform: Box<dyn FeatureTransform>,
    classifier: Box<dyn Classifier>,
}

impl PredictionModel {
    pub fn new(transform: Box<dyn FeatureTransform>, classifier: Box<dyn Classifier>) -> Self {
        PredictionModel { transform, classifier }
    }

    /// Loads both artifacts. Fails if either is missing or does not deserialize.
    pub fn load(vectorizer_path: &Path, classifier_path: &Path) -> Result<Self, ArtifactError> {
        let vectorizer = CountVectorizer::from_file(vectorizer_path)?;
        info!(
            path = %vectorizer_path.display(),
            vocabulary_size = vectorizer.vocabulary_size(),
            "Loaded count vectorizer"
        );

        let classifier = OnnxClassifier::from_file(classifier_path)?;
        info!(path = %classifier_path.display(), "Loaded ONNX classifier");

        Ok(PredictionModel::new(Box::new(vectorizer), Box::new(classifier)))
    }

    /// Classifies the `text` value of a request. Anything but a JSON string is
    /// rejected before the transform runs.
    pub fn predict(&self, text: &Value) -> Result<Label, PredictionError> {
        let text = text
            .as_str()
            .ok_or_else(|| PredictionError::NonTextInput(json_kind(text)))?;
        let features = self.transform.transform(text)?;
        self.classifier.classify(&features)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::test_support::stub_model;
    use super::*;

    #[test]
    fn test_predict_is_deterministic() {
        let (model, _, _) = stub_model();
        let text = json!("The president made an official statement today.");
        let first = model.predict(&text).unwrap();
        for _ in 0..10 {
            assert_eq!(model.predict(&text).unwrap(), first);
        }
        assert_eq!(first, 1);
    }

    #[test]
    fn test_predict_accepts_empty_text() {
        let (model, transform_calls, _) = stub_model();
        assert_eq!(model.predict(&json!("")).unwrap(), 0);
        assert_eq!(transform_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_predict_rejects_non_string_before_transform() {
        let (model, transform_calls, classifier_calls) = stub_model();
        for value in [json!(42), json!(null), json!(["a"]), json!({"a": 1})] {
            let err = model.predict(&value).unwrap_err();
            assert!(matches!(err, PredictionError::NonTextInput(_)), "got {:?}", err);
        }
        assert_eq!(transform_calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_fails_when_vectorizer_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = PredictionModel::load(
            &dir.path().join("count_vectorizer.json"),
            &dir.path().join("basic_classifier.onnx"),
        );
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_load_fails_when_classifier_missing() {
        let dir = tempfile::tempdir().unwrap();
        let vectorizer_path = dir.path().join("count_vectorizer.json");
        std::fs::write(&vectorizer_path, r#"{"vocabulary": {"official": 0, "statement": 1}}"#).unwrap();

        let classifier_path = dir.path().join("basic_classifier.onnx");
        match PredictionModel::load(&vectorizer_path, &classifier_path) {
            Err(ArtifactError::NotFound(path)) => assert_eq!(path, classifier_path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("model loaded without a classifier"),
        }
    }

    #[test]
    fn test_load_and_predict_with_exported_artifacts() {
        let model_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/news_prediction/test_model");
        let model = PredictionModel::load(
            &model_dir.join("count_vectorizer.json"),
            &model_dir.join("basic_classifier.onnx"),
        )
        .unwrap();

        let statement = json!("The president made an official statement today.");
        let first = model.predict(&statement).unwrap();
        assert!(first == 0 || first == 1);
        for _ in 0..5 {
            assert_eq!(model.predict(&statement).unwrap(), first);
        }

        assert_eq!(model.predict(&json!("BREAKING: Aliens, aliens everywhere")).unwrap(), 1);
        assert_eq!(model.predict(&json!("")).unwrap(), 0);
    }

    #[test]
    fn test_load_fails_on_corrupt_vectorizer() {
        let dir = tempfile::tempdir().unwrap();
        let vectorizer_path = dir.path().join("count_vectorizer.json");
        std::fs::write(&vectorizer_path, b"\x80\x04\x95 not json").unwrap();
        let result = PredictionModel::load(&vectorizer_path, &dir.path().join("basic_classifier.onnx"));
        assert!(result.is_err());
    }
}
