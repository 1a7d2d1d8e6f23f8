use serde::{Deserialize, Serialize};

use crate::news_prediction::news_prediction::Label;

pub const NO_TEXT_PROVIDED: &str = "No text provided";

/// Body sent by callers of `POST /predict`. The server reads the body as raw
/// JSON so it can tell a missing `text` apart from a non-string one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictResponse {
    pub prediction: Label,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse { error: error.into() }
    }
}
