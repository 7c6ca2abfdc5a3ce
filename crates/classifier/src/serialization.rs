use crate::processing::post::Detection;
use serde::Serialize;
use std::path::Path;

/// One row of the outward-facing report. `probability` is a formatted
/// percentage; the sentinel row carries an empty string there, which is
/// what marks it as the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageEntry {
    pub class_name: String,
    pub probability: String,
}

impl DamageEntry {
    /// The "no label triggered" sentinel is the only entry with an empty
    /// probability field.
    pub fn is_sentinel(&self) -> bool {
        self.probability.is_empty()
    }
}

/// The unit returned to the caller. A `null` result path together with an
/// empty entry list means the pipeline failed for this request; a present
/// path with the sentinel entry means the pipeline ran and nothing
/// triggered.
#[derive(Debug, Clone, Serialize)]
pub struct DamageReport {
    pub result_image_path: Option<String>,
    pub damage_info: Vec<DamageEntry>,
}

impl DamageReport {
    pub fn new(result_path: &Path, detections: &[Detection], threshold: f32) -> Self {
        Self {
            result_image_path: Some(result_path.display().to_string()),
            damage_info: damage_info(detections, threshold),
        }
    }

    /// Degraded response for a failed request: no artifact, no entries.
    pub fn degraded() -> Self {
        Self {
            result_image_path: None,
            damage_info: Vec::new(),
        }
    }
}

pub fn format_probability(probability: f32) -> String {
    format!("{:.2}%", probability * 100.0)
}

pub fn no_detection_message(threshold: f32) -> String {
    format!("no label exceeded the prediction threshold ({threshold})")
}

fn damage_info(detections: &[Detection], threshold: f32) -> Vec<DamageEntry> {
    if detections.is_empty() {
        return vec![DamageEntry {
            class_name: no_detection_message(threshold),
            probability: String::new(),
        }];
    }

    detections
        .iter()
        .map(|detection| DamageEntry {
            class_name: detection.label.clone(),
            probability: format_probability(detection.probability),
        })
        .collect()
}
