use super::{ClassifierBackend, Normalization};
use crate::error::{InferenceError, ModelLoadError};
use candle_core::{D, DType, Device, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, ops};
use ndarray::{Array, IxDyn};
use std::collections::HashMap;
use std::path::Path;

/// Well-known checkpoint container keys, probed in order. A checkpoint
/// whose parameters carry none of these prefixes is treated as the bare
/// parameter mapping itself.
const CONTAINER_KEYS: [&str; 2] = ["model_state_dict", "state_dict"];

/// Strided conv stack: (parameter prefix, in channels, out channels).
/// Each block is a 3x3 convolution with stride 2 and padding 1, followed
/// by ReLU.
const BLOCKS: [(&str, usize, usize); 4] = [
    ("features.0", 3, 32),
    ("features.1", 32, 64),
    ("features.2", 64, 128),
    ("features.3", 128, 256),
];

const HEAD_WEIGHT: &str = "classifier.weight";
const HEAD_BIAS: &str = "classifier.bias";
const FEATURE_DIM: usize = 256;

/// Backbone over a PyTorch-style checkpoint (`.safetensors`, or `.pth`
/// via the pickle reader). Emits logits and applies an explicit
/// element-wise sigmoid; its declared input convention is ImageNet
/// mean/std.
pub struct TorchBackbone {
    blocks: Vec<Conv2d>,
    head: Linear,
    num_classes: usize,
    device: Device,
}

fn load_err(path: &Path, message: impl Into<String>) -> ModelLoadError {
    ModelLoadError::Load {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn read_parameters(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>, ModelLoadError> {
    let is_safetensors = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("safetensors"));

    if is_safetensors {
        candle_core::safetensors::load(path, device).map_err(|e| load_err(path, e.to_string()))
    } else {
        let pairs =
            candle_core::pickle::read_all(path).map_err(|e| load_err(path, e.to_string()))?;
        Ok(pairs.into_iter().collect())
    }
}

/// Unwrap the parameter mapping from a recognized container prefix, if one
/// is present; otherwise the mapping is already bare.
fn unwrap_container(params: HashMap<String, Tensor>) -> HashMap<String, Tensor> {
    for key in CONTAINER_KEYS {
        let prefix = format!("{key}.");
        if params.keys().any(|k| k.starts_with(&prefix)) {
            return params
                .into_iter()
                .filter_map(|(name, tensor)| {
                    name.strip_prefix(&prefix)
                        .map(|stripped| (stripped.to_string(), tensor))
                })
                .collect();
        }
    }
    params
}

/// Fetch a declared parameter by name. Parameters missing from the
/// checkpoint are zero-filled with a warning rather than failing the load;
/// a shape conflict on a present parameter is fatal.
fn fetch(
    params: &HashMap<String, Tensor>,
    name: &str,
    dims: &[usize],
    device: &Device,
    path: &Path,
) -> Result<Tensor, ModelLoadError> {
    match params.get(name) {
        Some(tensor) => {
            let tensor = tensor
                .to_dtype(DType::F32)
                .map_err(|e| load_err(path, format!("parameter {name}: {e}")))?;
            if tensor.dims() != dims {
                return Err(load_err(
                    path,
                    format!(
                        "parameter {name} has shape {:?}, expected {:?}",
                        tensor.dims(),
                        dims
                    ),
                ));
            }
            Ok(tensor)
        }
        None => {
            tracing::warn!(parameter = name, "checkpoint parameter missing, zero-filled");
            Tensor::zeros(dims, DType::F32, device).map_err(|e| load_err(path, e.to_string()))
        }
    }
}

impl ClassifierBackend for TorchBackbone {
    fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::Missing {
                path: path.to_path_buf(),
            });
        }

        let device = Device::Cpu;
        let params = unwrap_container(read_parameters(path, &device)?);

        // The head is required: its weight defines the output width.
        let head_weight = params
            .get(HEAD_WEIGHT)
            .ok_or_else(|| ModelLoadError::MissingHead {
                path: path.to_path_buf(),
            })?
            .to_dtype(DType::F32)
            .map_err(|e| load_err(path, format!("parameter {HEAD_WEIGHT}: {e}")))?;

        let (num_classes, in_features) = head_weight.dims2().map_err(|_| {
            load_err(
                path,
                format!(
                    "parameter {HEAD_WEIGHT} must be rank 2, got shape {:?}",
                    head_weight.dims()
                ),
            )
        })?;
        if in_features != FEATURE_DIM {
            return Err(load_err(
                path,
                format!("parameter {HEAD_WEIGHT} has {in_features} input features, expected {FEATURE_DIM}"),
            ));
        }

        let head_bias = fetch(&params, HEAD_BIAS, &[num_classes], &device, path)?;
        let head = Linear::new(head_weight, Some(head_bias));

        let mut blocks = Vec::with_capacity(BLOCKS.len());
        let mut declared = vec![HEAD_WEIGHT.to_string(), HEAD_BIAS.to_string()];
        for (name, c_in, c_out) in BLOCKS {
            let weight = fetch(
                &params,
                &format!("{name}.weight"),
                &[c_out, c_in, 3, 3],
                &device,
                path,
            )?;
            let bias = fetch(&params, &format!("{name}.bias"), &[c_out], &device, path)?;
            blocks.push(Conv2d::new(
                weight,
                Some(bias),
                Conv2dConfig {
                    padding: 1,
                    stride: 2,
                    ..Default::default()
                },
            ));
            declared.push(format!("{name}.weight"));
            declared.push(format!("{name}.bias"));
        }

        let ignored = params.keys().filter(|k| !declared.contains(*k)).count();
        if ignored > 0 {
            tracing::debug!(ignored, "checkpoint parameters unknown to the architecture, ignored");
        }

        tracing::info!(
            model = %path.display(),
            classes = num_classes,
            "checkpoint loaded"
        );

        Ok(Self {
            blocks,
            head,
            num_classes,
            device,
        })
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn normalization(&self) -> Normalization {
        Normalization::Imagenet
    }

    fn score(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, InferenceError> {
        let shape = input.shape();
        if shape.len() != 4 {
            return Err(InferenceError::InputTensor {
                message: format!("expected an NCHW tensor, got shape {shape:?}"),
            });
        }
        let data = input.as_slice().ok_or_else(|| InferenceError::InputTensor {
            message: "input tensor is not contiguous".to_string(),
        })?;

        let exec = |e: candle_core::Error| InferenceError::Execution {
            message: e.to_string(),
        };

        let mut xs = Tensor::from_slice(
            data,
            (shape[0], shape[1], shape[2], shape[3]),
            &self.device,
        )
        .map_err(|e| InferenceError::InputTensor {
            message: e.to_string(),
        })?;

        for conv in &self.blocks {
            xs = conv.forward(&xs).map_err(exec)?.relu().map_err(exec)?;
        }

        // Global average pool over the spatial dims, then the linear head.
        let pooled = xs
            .mean(D::Minus1)
            .and_then(|t| t.mean(D::Minus1))
            .map_err(exec)?;
        let logits = self.head.forward(&pooled).map_err(exec)?;
        let probs = ops::sigmoid(&logits).map_err(exec)?;

        probs
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| InferenceError::Output {
                message: e.to_string(),
            })
    }
}
