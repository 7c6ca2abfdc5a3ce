use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read label catalog {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("label catalog {} is not a flat JSON array of strings: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("label catalog is empty")]
    Empty,

    #[error("label catalog contains duplicate class name {name:?}")]
    Duplicate { name: String },
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file {} not found", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to load model from {}: {}", .path.display(), .message)]
    Load { path: PathBuf, message: String },

    #[error("checkpoint {} has no classifier head parameter", .path.display())]
    MissingHead { path: PathBuf },

    #[error("model probe inference failed: {message}")]
    Probe { message: String },
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to open image {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ImagePreprocessError {
    #[error(transparent)]
    Load(#[from] ImageLoadError),

    #[error("failed to decode image {}: {}", .path.display(), .source)]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to resize image {}: {}", .path.display(), .message)]
    Resize { path: PathBuf, message: String },

    #[error("failed to assemble input tensor for {}: {}", .path.display(), .message)]
    Tensor { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to build model input tensor: {message}")]
    InputTensor { message: String },

    #[error("model execution failed: {message}")]
    Execution { message: String },

    #[error("model output malformed: {message}")]
    Output { message: String },
}

#[derive(Debug, Error)]
pub enum ResultPersistError {
    #[error("failed to create result folder {}: {}", .folder.display(), .source)]
    CreateDir {
        folder: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image path {} has no file name", .path.display())]
    BadImagePath { path: PathBuf },

    #[error("failed to copy {} to {}: {}", .from.display(), .to.display(), .source)]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Startup failures. Any of these prevents the service from being
/// constructed; there is no partially initialized state.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error(transparent)]
    Model(#[from] ModelLoadError),

    #[error("model outputs {model} classes but the label catalog lists {catalog}")]
    ClassCountMismatch { model: usize, catalog: usize },
}

/// Per-request failures. These never escape `DetectionService::predict`;
/// they surface only through `try_predict`.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Preprocess(#[from] ImagePreprocessError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Pipeline stage the failure belongs to, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            PredictError::Preprocess(ImagePreprocessError::Load(_)) => "image-load",
            PredictError::Preprocess(_) => "preprocess",
            PredictError::Inference(_) => "inference",
        }
    }
}
