use anyhow::Context;
use classifier::{ClassifierConfig, DetectionService, logging::setup_logging};
use std::path::Path;

#[cfg(all(feature = "onnx-backend", not(feature = "torch-backend")))]
use classifier::backend::onnx::OnnxBackbone as Backbone;

#[cfg(feature = "torch-backend")]
use classifier::backend::torch::TorchBackbone as Backbone;

#[cfg(not(any(feature = "onnx-backend", feature = "torch-backend")))]
compile_error!("At least one backend feature must be enabled: 'onnx-backend' or 'torch-backend'");

fn main() -> anyhow::Result<()> {
    let config = ClassifierConfig::from_env();

    setup_logging(&config);

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let mut args = std::env::args().skip(1);
    let image_path = args
        .next()
        .context("usage: classifier <image-path> [result-folder]")?;
    let result_folder = args.next().unwrap_or_else(|| "static/results".to_string());

    tracing::info!("Loading classification backbone");
    let service = DetectionService::<Backbone>::initialize(&config)?;
    tracing::info!("Service initialized");

    let report = service.predict(Path::new(&image_path), Path::new(&result_folder));

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
