use crate::error::{InferenceError, ModelLoadError};
use ndarray::{Array, IxDyn};
use std::path::Path;

#[cfg(feature = "onnx-backend")]
pub mod onnx;

#[cfg(feature = "torch-backend")]
pub mod torch;

/// Input normalization convention a backbone was trained with. The
/// preprocessor is constructed from this declaration, so preprocessing
/// cannot drift from the backbone that consumes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Plain 0-1 rescale (pixel / 255).
    UnitScale,
    /// 0-1 rescale followed by per-channel ImageNet mean/std.
    Imagenet,
}

/// A loaded, immutable scoring function: batch-1 image tensor in,
/// per-class probability vector out.
///
/// Implementations must produce independent per-class probabilities in
/// [0, 1] (multi-label; never a softmax distribution) and must behave as
/// pure inference: no parameter updates, no training-mode behavior.
pub trait ClassifierBackend {
    fn load(path: &Path) -> Result<Self, ModelLoadError>
    where
        Self: Sized;

    /// Output width, pinned at load time. Must match the label catalog.
    fn num_classes(&self) -> usize;

    /// The normalization convention this backbone's weights expect.
    fn normalization(&self) -> Normalization;

    /// Run inference on an NCHW [1, 3, H, W] tensor.
    fn score(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, InferenceError>;
}
