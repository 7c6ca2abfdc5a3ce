use crate::artifact;
use crate::backend::ClassifierBackend;
use crate::catalog::LabelCatalog;
use crate::config::{ClassifierConfig, DETECTION_THRESHOLD, INPUT_SIZE};
use crate::error::{InferenceError, InitError, PredictError};
use crate::processing::{
    post::{DecisionEngine, Detection},
    pre::PreProcessor,
};
use crate::serialization::DamageReport;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Typed outcome of a successful pipeline run. `result_path` falls back to
/// the original image path when artifact persistence fails.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub result_path: PathBuf,
    pub detections: Vec<Detection>,
}

/// The orchestrated pipeline: preprocess, score, decide, persist.
///
/// Construction is the initialization phase; every load failure or a
/// class-count mismatch refuses the service outright. Afterwards all state
/// is read-only. The backbone sits behind a mutex so scoring serializes
/// while preprocessing and persistence run without contention, making the
/// service shareable across threads.
pub struct DetectionService<B: ClassifierBackend> {
    backend: Mutex<B>,
    catalog: LabelCatalog,
    preprocessor: PreProcessor,
    engine: DecisionEngine,
}

impl<B: ClassifierBackend> DetectionService<B> {
    /// Load the label catalog and the backbone, then verify they agree on
    /// the class count.
    pub fn initialize(config: &ClassifierConfig) -> Result<Self, InitError> {
        let catalog = LabelCatalog::load(Path::new(&config.catalog_path))?;
        tracing::info!(
            catalog = %config.catalog_path,
            classes = catalog.len(),
            "label catalog loaded"
        );

        let backend = B::load(Path::new(&config.model_path))?;

        Self::from_parts(backend, catalog)
    }

    pub fn from_parts(backend: B, catalog: LabelCatalog) -> Result<Self, InitError> {
        if backend.num_classes() != catalog.len() {
            return Err(InitError::ClassCountMismatch {
                model: backend.num_classes(),
                catalog: catalog.len(),
            });
        }

        let preprocessor = PreProcessor::new(INPUT_SIZE, backend.normalization());
        let engine = DecisionEngine::new(DETECTION_THRESHOLD);

        Ok(Self {
            backend: Mutex::new(backend),
            catalog,
            preprocessor,
            engine,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// The typed pipeline. Preprocessing and inference failures propagate;
    /// artifact persistence failure is non-fatal and substitutes the
    /// original image path.
    pub fn try_predict(
        &self,
        image_path: &Path,
        result_folder: &Path,
    ) -> Result<Prediction, PredictError> {
        let tensor = self.preprocessor.preprocess(image_path)?;

        let scores = {
            let mut backend = self.backend.lock().map_err(|_| {
                PredictError::Inference(InferenceError::Execution {
                    message: "backbone mutex poisoned".to_string(),
                })
            })?;
            backend.score(&tensor)?
        };

        let detections = self.engine.decide(&scores, &self.catalog);
        tracing::debug!(
            image = %image_path.display(),
            triggered = detections.len(),
            "threshold decision complete"
        );

        let result_path = match artifact::persist(image_path, result_folder) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    image = %image_path.display(),
                    "artifact persistence failed, returning original path"
                );
                image_path.to_path_buf()
            }
        };

        Ok(Prediction {
            result_path,
            detections,
        })
    }

    /// The fail-soft external operation: a per-request failure is logged
    /// with its stage and converted into a degraded report. Callers never
    /// observe an error for a single bad image.
    pub fn predict(&self, image_path: &Path, result_folder: &Path) -> DamageReport {
        match self.try_predict(image_path, result_folder) {
            Ok(prediction) => DamageReport::new(
                &prediction.result_path,
                &prediction.detections,
                self.engine.threshold(),
            ),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    stage = e.stage(),
                    image = %image_path.display(),
                    "prediction failed"
                );
                DamageReport::degraded()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Normalization;
    use crate::error::{ModelLoadError, PredictError};
    use ndarray::{Array, IxDyn};
    use std::path::PathBuf;

    /// Frozen backbone returning canned scores.
    struct FakeBackend {
        scores: Vec<f32>,
    }

    impl ClassifierBackend for FakeBackend {
        fn load(path: &Path) -> Result<Self, ModelLoadError> {
            Err(ModelLoadError::Missing {
                path: path.to_path_buf(),
            })
        }

        fn num_classes(&self) -> usize {
            self.scores.len()
        }

        fn normalization(&self) -> Normalization {
            Normalization::UnitScale
        }

        fn score(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            Ok(self.scores.clone())
        }
    }

    fn catalog(names: &[&str]) -> LabelCatalog {
        LabelCatalog::from_labels(names.iter().map(|n| n.to_string()).collect()).unwrap()
    }

    fn service(scores: Vec<f32>, names: &[&str]) -> DetectionService<FakeBackend> {
        DetectionService::from_parts(FakeBackend { scores }, catalog(names)).unwrap()
    }

    fn write_test_image(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let img = image::RgbImage::from_pixel(64, 48, image::Rgb([90, 120, 150]));
        img.save(&path).unwrap();
        path
    }

    /// Test that a backbone load failure refuses initialization
    #[test]
    fn test_model_load_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("class_names.json");
        std::fs::write(&catalog_path, r#"["A", "B"]"#).unwrap();

        let config = ClassifierConfig {
            environment: common::Environment::Development,
            model_path: dir.path().join("absent.onnx").display().to_string(),
            catalog_path: catalog_path.display().to_string(),
        };

        let result = DetectionService::<FakeBackend>::initialize(&config);

        assert!(matches!(
            result,
            Err(InitError::Model(ModelLoadError::Missing { .. }))
        ));
    }

    /// Test that a class-count mismatch refuses initialization
    #[test]
    fn test_class_count_mismatch_is_fatal() {
        let result =
            DetectionService::from_parts(FakeBackend { scores: vec![0.0; 3] }, catalog(&["A", "B"]));

        assert!(matches!(
            result,
            Err(InitError::ClassCountMismatch { model: 3, catalog: 2 })
        ));
    }

    /// Test the full pipeline on a valid image
    #[test]
    fn test_predict_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_test_image(&dir, "car.png");
        let results = dir.path().join("static").join("results");

        let service = service(vec![0.05, 0.85, 0.30], &["A", "B", "C"]);
        let report = service.predict(&image, &results);

        assert_eq!(
            report.result_image_path.as_deref(),
            Some(results.join("result_car.png").to_str().unwrap())
        );
        assert!(results.join("result_car.png").exists(), "folder should be created");

        assert_eq!(report.damage_info.len(), 2);
        assert_eq!(report.damage_info[0].class_name, "B");
        assert_eq!(report.damage_info[0].probability, "85.00%");
        assert_eq!(report.damage_info[1].class_name, "C");
        assert_eq!(report.damage_info[1].probability, "30.00%");
    }

    /// Test that a missing image yields the degraded report, not an error
    #[test]
    fn test_predict_missing_image_is_fail_soft() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("absent.png");
        let results = dir.path().join("results");

        let service = service(vec![0.9, 0.9], &["A", "B"]);
        let report = service.predict(&image, &results);

        assert!(report.result_image_path.is_none());
        assert!(report.damage_info.is_empty());
        assert!(!results.exists(), "no artifact folder for a failed request");
    }

    /// Test that try_predict exposes the typed failure the report hides
    #[test]
    fn test_try_predict_distinguishes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("absent.png");

        let service = service(vec![0.9], &["A"]);
        let result = service.try_predict(&image, dir.path());

        assert!(matches!(result, Err(PredictError::Preprocess(_))));
    }

    /// Test that nothing above threshold produces the sentinel entry
    #[test]
    fn test_predict_sentinel_when_nothing_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_test_image(&dir, "clean.png");
        let results = dir.path().join("results");

        let service = service(vec![0.1, 0.05, 0.19], &["A", "B", "C"]);
        let report = service.predict(&image, &results);

        assert!(report.result_image_path.is_some());
        assert_eq!(report.damage_info.len(), 1);
        assert!(report.damage_info[0].is_sentinel());
    }

    /// Test that repeat predictions are idempotent: same detections, same
    /// artifact path, one artifact on disk
    #[test]
    fn test_predict_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_test_image(&dir, "car.png");
        let results = dir.path().join("results");

        let service = service(vec![0.45, 0.75], &["A", "B"]);
        let first = service.predict(&image, &results);
        let second = service.predict(&image, &results);

        assert_eq!(first.result_image_path, second.result_image_path);
        assert_eq!(first.damage_info, second.damage_info);
        assert_eq!(std::fs::read_dir(&results).unwrap().count(), 1);
    }
}
