use std::env;

pub use common::Environment;

/// Spatial resolution the backbone was trained on. Preprocessing must
/// produce exactly this shape.
pub const INPUT_SIZE: (u32, u32) = (224, 224);

/// Minimum per-class probability for a label to count as triggered.
/// The comparison is inclusive: a score equal to the threshold triggers.
pub const DETECTION_THRESHOLD: f32 = 0.2;

#[cfg(feature = "onnx-backend")]
const DEFAULT_MODEL_PATH: &str = "model/damage_model.onnx";
#[cfg(all(feature = "torch-backend", not(feature = "onnx-backend")))]
const DEFAULT_MODEL_PATH: &str = "model/damage_model.safetensors";
#[cfg(not(any(feature = "onnx-backend", feature = "torch-backend")))]
const DEFAULT_MODEL_PATH: &str = "model/damage_model.bin";

const DEFAULT_CATALOG_PATH: &str = "model/class_names.json";

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub environment: Environment,
    pub model_path: String,
    pub catalog_path: String,
}

impl ClassifierConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let environment = Environment::from_env();

        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());

        let catalog_path =
            env::var("CLASS_NAMES_PATH").unwrap_or_else(|_| DEFAULT_CATALOG_PATH.to_string());

        Self {
            environment,
            model_path,
            catalog_path,
        }
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            model_path: "model/damage_model.onnx".to_string(),
            catalog_path: "model/class_names.json".to_string(),
        }
    }
}
