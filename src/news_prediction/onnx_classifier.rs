use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::{inputs, session::Session, value::Tensor};
use tracing::debug;

use crate::news_prediction::news_prediction::{ArtifactError, Classifier, Label, PredictionError};

/// Binary classifier exported to ONNX (e.g. with skl2onnx).
/// Input 0 takes a `(1, n_features)` float tensor, output 0 is the label.
pub struct OnnxClassifier {
    // Session::run needs &mut, so one inference holds the lock at a time
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    pub fn from_file(model_path: &Path) -> Result<Self, ArtifactError> {
        if !model_path.exists() {
            return Err(ArtifactError::NotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|source| ArtifactError::Onnx {
                path: model_path.to_path_buf(),
                source,
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ArtifactError::InvalidClassifier("model declares no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ArtifactError::InvalidClassifier("model declares no outputs".to_string()))?;
        debug!(input = %input_name, output = %output_name, "ONNX classifier signature");

        Ok(OnnxClassifier {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, features: &[f32]) -> Result<Label, PredictionError> {
        let input_array = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let input_value = Tensor::from_array(input_array.into_dyn())?;

        let mut session = self.session.lock().map_err(|_| PredictionError::SessionPoisoned)?;
        let outputs = session.run(inputs![self.input_name.as_str() => input_value])?;
        let output = &outputs[self.output_name.as_str()];

        // Label tensors come back as int64, probability tensors as float
        if let Ok((_shape, labels)) = output.try_extract_tensor::<i64>() {
            return labels.first().copied().ok_or(PredictionError::EmptyOutput);
        }
        let (_shape, probabilities) = output.try_extract_tensor::<f32>()?;
        label_from_probabilities(probabilities).ok_or(PredictionError::EmptyOutput)
    }
}

/// Picks the class of the first row. A single value is read as P(class 1);
/// otherwise argmax over the first two columns, ties going to class 0.
fn label_from_probabilities(probabilities: &[f32]) -> Option<Label> {
    match probabilities {
        [] => None,
        [p_one] => Some(if *p_one >= 0.5 { 1 } else { 0 }),
        [p_zero, p_one, ..] => Some(if p_zero >= p_one { 0 } else { 1 }),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn test_model(file_name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("src/news_prediction/test_model")
            .join(file_name)
    }

    #[test]
    fn test_classify_reads_int64_label() {
        let classifier = OnnxClassifier::from_file(&test_model("basic_classifier.onnx")).unwrap();
        assert_eq!(classifier.input_name, "float_input");
        assert_eq!(classifier.output_name, "label");

        // column 0 pushes class 1, column 1 pushes class 0, the intercept favours class 0
        assert_eq!(classifier.classify(&[2.0, 0.0]).unwrap(), 1);
        assert_eq!(classifier.classify(&[0.0, 1.0]).unwrap(), 0);
        assert_eq!(classifier.classify(&[0.0, 0.0]).unwrap(), 0);
        for _ in 0..5 {
            assert_eq!(classifier.classify(&[2.0, 0.0]).unwrap(), 1);
        }
    }

    #[test]
    fn test_classify_falls_back_to_probabilities() {
        let classifier = OnnxClassifier::from_file(&test_model("probability_classifier.onnx")).unwrap();
        assert_eq!(classifier.output_name, "probabilities");
        assert_eq!(classifier.classify(&[3.0, 1.0]).unwrap(), 1);
        assert_eq!(classifier.classify(&[0.0, 4.0]).unwrap(), 0);
    }

    #[test]
    fn test_classify_rejects_wrong_feature_count() {
        let classifier = OnnxClassifier::from_file(&test_model("basic_classifier.onnx")).unwrap();
        let result = classifier.classify(&[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(PredictionError::Onnx(_))), "got {:?}", result);
    }

    #[test]
    fn test_label_from_probabilities() {
        assert_eq!(label_from_probabilities(&[]), None);
        assert_eq!(label_from_probabilities(&[0.7]), Some(1));
        assert_eq!(label_from_probabilities(&[0.2]), Some(0));
        assert_eq!(label_from_probabilities(&[0.9, 0.1]), Some(0));
        assert_eq!(label_from_probabilities(&[0.3, 0.7]), Some(1));
        assert_eq!(label_from_probabilities(&[0.5, 0.5]), Some(0));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic_classifier.onnx");
        assert!(matches!(OnnxClassifier::from_file(&path), Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic_classifier.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();
        assert!(OnnxClassifier::from_file(&path).is_err());
    }
}
