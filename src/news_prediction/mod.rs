pub mod count_vectorizer;
pub mod news_prediction;
pub mod onnx_classifier;
