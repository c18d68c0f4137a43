//! Classifier seam.
//!
//! The crate produces feature vectors; turning one into a verdict belongs
//! to an external model artifact. [`ClassifierHandle`] is the explicit,
//! lazily-initialized handle an embedding service passes to the scanner:
//! the loader runs on the first prediction, its outcome (predictor or load
//! failure) is cached for the process lifetime, and tests substitute stub
//! predictors without touching any global state.

use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureVector;

/// Binary classification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Benign,
    Malicious,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Benign => write!(f, "benign"),
            Label::Malicious => write!(f, "malicious"),
        }
    }
}

/// Prediction failures.
#[derive(Debug, Clone, Error)]
pub enum PredictError {
    /// The model artifact could not be loaded. Cached: subsequent calls
    /// re-report the same failure without re-running the loader.
    #[error("model load failed: {0}")]
    Load(String),

    /// The loaded model rejected this feature vector.
    #[error("prediction failed: {0}")]
    Predict(String),
}

/// A loaded model able to label one feature vector at a time.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Label, PredictError>;
}

type Loader = Box<dyn Fn() -> Result<Box<dyn Predictor>, PredictError> + Send + Sync>;

/// Lazily-initialized handle to a classifier artifact.
pub struct ClassifierHandle {
    loader: Loader,
    cell: OnceCell<Result<Box<dyn Predictor>, PredictError>>,
}

impl ClassifierHandle {
    /// Build a handle around a loader closure. The closure runs at most
    /// once, on the first prediction.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Predictor>, PredictError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Build a handle around an already-constructed predictor. Used by
    /// tests to substitute stubs.
    pub fn from_predictor<P: Predictor + 'static>(predictor: P) -> Self {
        let handle = Self::new(|| Err(PredictError::Load("unreachable".to_string())));
        let _ = handle.cell.set(Ok(Box::new(predictor)));
        handle
    }

    /// True once the loader has run (successfully or not).
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Label, PredictError> {
        match self.cell.get_or_init(|| (self.loader)()) {
            Ok(predictor) => predictor.predict(features),
            Err(e) => Err(e.clone()),
        }
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
