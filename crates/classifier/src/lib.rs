pub mod artifact;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod processing;
pub mod serialization;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::{ClassifierBackend, Normalization};
pub use catalog::LabelCatalog;
pub use config::{ClassifierConfig, DETECTION_THRESHOLD, INPUT_SIZE};
pub use processing::post::{DecisionEngine, Detection};
pub use processing::pre::PreProcessor;
pub use serialization::{DamageEntry, DamageReport};
pub use service::{DetectionService, Prediction};
