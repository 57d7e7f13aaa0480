//! heartml - Heart disease risk pipeline
//!
//! This crate implements the full lifecycle for a binary heart disease
//! classifier over the UCI Cleveland dataset:
//! - CSV ingest, schema validation, and cleaning
//! - Feature preprocessing (imputation, standardization, one-hot encoding)
//! - Cross-validated training of competing model candidates
//! - Holdout evaluation, model selection, and JSON artifact persistence
//! - An HTTP prediction service with Prometheus-style metrics
//!
//! # Modules
//!
//! ## Data & Features
//! - [`data`] - Dataset download, CSV ingest, validation, cleaning, EDA
//! - [`features`] - Feature schema and the fitted preprocessor
//!
//! ## Modeling
//! - [`training`] - Models, cross-validation, metrics, and the train engine
//! - [`pipeline`] - Fitted preprocessor + model bundle with JSON persistence
//! - [`tracking`] - Experiment run records
//!
//! ## Services
//! - [`server`] - HTTP prediction service
//! - [`monitoring`] - Prediction counters and latency histogram
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data pipeline
pub mod data;
pub mod features;

// Modeling
pub mod pipeline;
pub mod tracking;
pub mod training;

// Infrastructure
pub mod monitoring;

// Services
pub mod cli;
pub mod server;

pub use error::{HeartmlError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{HeartmlError, Result};

    // Features
    pub use crate::features::{FeatureSpec, Preprocessor};

    // Training
    pub use crate::training::{
        default_candidates, Candidate, ClassificationMetrics, LogisticRegression, RandomForest,
        TrainConfig, TrainEngine, TrainingReport, TrainingSummary,
    };

    // Pipeline
    pub use crate::pipeline::{ModelKind, Pipeline, Record};

    // Experiment tracking
    pub use crate::tracking::{Experiment, ExperimentTracker, Run, RunStatus};

    // Monitoring
    pub use crate::monitoring::{MetricsSnapshot, PredictionMetrics};

    // Server
    pub use crate::server::{create_router, AppState, ServerConfig};
}
