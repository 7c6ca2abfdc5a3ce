use super::{ClassifierBackend, Normalization};
use crate::config::INPUT_SIZE;
use crate::error::{InferenceError, ModelLoadError};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::Path;

/// Backbone over an exported ONNX graph. The graph ends in a per-class
/// sigmoid, so the output is already a probability vector; its declared
/// input convention is plain 0-1 rescale.
pub struct OnnxBackbone {
    session: Session,
    input_name: String,
    output_name: String,
    num_classes: usize,
}

impl OnnxBackbone {
    fn run(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, InferenceError> {
        let tensor =
            TensorRef::from_array_view(input.view()).map_err(|e| InferenceError::InputTensor {
                message: e.to_string(),
            })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| InferenceError::Execution {
                message: e.to_string(),
            })?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::Output {
                message: e.to_string(),
            })?;

        Ok(scores.iter().copied().collect())
    }
}

impl ClassifierBackend for OnnxBackbone {
    fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::Missing {
                path: path.to_path_buf(),
            });
        }

        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let session = (|| {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(4)?
                .commit_from_file(path)
        })()
        .map_err(|e: ort::Error| ModelLoadError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| ModelLoadError::Load {
                path: path.to_path_buf(),
                message: "model declares no inputs".to_string(),
            })?;

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| ModelLoadError::Load {
                path: path.to_path_buf(),
                message: "model declares no outputs".to_string(),
            })?;

        let mut backbone = Self {
            session,
            input_name,
            output_name,
            num_classes: 0,
        };

        // Probe with a zero tensor to pin the output width before any
        // request is accepted.
        let probe = Array::zeros(IxDyn(&[
            1,
            3,
            INPUT_SIZE.1 as usize,
            INPUT_SIZE.0 as usize,
        ]));
        let scores = backbone
            .run(&probe)
            .map_err(|e| ModelLoadError::Probe {
                message: e.to_string(),
            })?;

        if scores.is_empty() {
            return Err(ModelLoadError::Probe {
                message: "probe inference produced an empty output".to_string(),
            });
        }
        backbone.num_classes = scores.len();

        tracing::info!(
            model = %path.display(),
            classes = backbone.num_classes,
            input = %backbone.input_name,
            output = %backbone.output_name,
            "ONNX model loaded"
        );

        Ok(backbone)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn normalization(&self) -> Normalization {
        Normalization::UnitScale
    }

    fn score(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, InferenceError> {
        let scores = self.run(input)?;

        if scores.len() != self.num_classes {
            return Err(InferenceError::Output {
                message: format!(
                    "expected {} class scores, got {}",
                    self.num_classes,
                    scores.len()
                ),
            });
        }

        Ok(scores)
    }
}
