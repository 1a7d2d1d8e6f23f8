use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::news_prediction::news_prediction::{ArtifactError, FeatureTransform, PredictionError};

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Fitted parameters of sklearn's CountVectorizer, exported to JSON after training.
#[derive(Debug, Deserialize)]
struct CountVectorizerParams {
    vocabulary: HashMap<String, usize>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default = "default_token_pattern")]
    token_pattern: String,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    binary: bool,
    #[serde(default)]
    stop_words: Option<Vec<String>>,
}

fn default_lowercase() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Bag-of-words counter over a fixed vocabulary.
#[derive(Debug)]
pub struct CountVectorizer {
    vocabulary: HashMap<String, usize>,
    lowercase: bool,
    token_pattern: Regex,
    min_n: usize,
    max_n: usize,
    binary: bool,
    stop_words: HashSet<String>,
}

impl CountVectorizer {
    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }
        let json_str = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json_str)
    }

    pub fn from_json(json_str: &str) -> Result<Self, ArtifactError> {
        let params: CountVectorizerParams = serde_json::from_str(json_str)?;

        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ArtifactError::InvalidVectorizer(format!(
                "ngram_range ({}, {}) is not a valid range",
                min_n, max_n
            )));
        }

        let token_pattern = Regex::new(&params.token_pattern)?;
        // One capture group selects the token, like sklearn. More is ambiguous.
        if token_pattern.captures_len() > 2 {
            return Err(ArtifactError::InvalidVectorizer(format!(
                "token_pattern {:?} has more than one capture group",
                params.token_pattern
            )));
        }

        // Columns must be exactly 0..len, each used once
        let num_features = params.vocabulary.len();
        let mut seen = vec![false; num_features];
        for (term, &index) in &params.vocabulary {
            if index >= num_features {
                return Err(ArtifactError::InvalidVectorizer(format!(
                    "term {:?} maps to column {} but the vocabulary has {} entries",
                    term, index, num_features
                )));
            }
            if seen[index] {
                return Err(ArtifactError::InvalidVectorizer(format!(
                    "column {} is assigned to more than one term",
                    index
                )));
            }
            seen[index] = true;
        }

        Ok(CountVectorizer {
            vocabulary: params.vocabulary,
            lowercase: params.lowercase,
            token_pattern,
            min_n,
            max_n,
            binary: params.binary,
            stop_words: params.stop_words.unwrap_or_default().into_iter().collect(),
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn tokenize<'a>(&self, doc: &'a str) -> Vec<&'a str> {
        let tokens: Vec<&str> = if self.token_pattern.captures_len() == 2 {
            self.token_pattern
                .captures_iter(doc)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .collect()
        } else {
            self.token_pattern.find_iter(doc).map(|m| m.as_str()).collect()
        };
        tokens
            .into_iter()
            .filter(|token| !self.stop_words.contains(*token))
            .collect()
    }

    /// Counts vocabulary terms (and their word n-grams) in `text`.
    pub fn count_terms(&self, text: &str) -> Vec<f32> {
        let doc: Cow<str> = if self.lowercase {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };
        let tokens = self.tokenize(&doc);

        let mut features = vec![0.0f32; self.vocabulary.len()];
        for n in self.min_n..=self.max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&term) {
                    features[index] += 1.0;
                }
            }
        }

        if self.binary {
            for count in features.iter_mut() {
                *count = count.min(1.0);
            }
        }
        features
    }
}

impl FeatureTransform for CountVectorizer {
    fn transform(&self, text: &str) -> Result<Vec<f32>, PredictionError> {
        Ok(self.count_terms(text))
    }
}
