//! Rule-based parameter repair between execution attempts

use super::ParameterExtractor;
use crate::core::types::{ParamValue, Parameters, Vec3};

/// Value substituted for a non-positive size
const SAFE_SIZE: f64 = 1.0;
/// Value substituted for a size above the configured maximum
const CLAMPED_SIZE: f64 = 10.0;

impl ParameterExtractor {
    /// Produce a repaired copy of `parameters` for another attempt.
    ///
    /// Which rules apply is decided by substrings of the failure message
    /// reported by the previous attempt. The input map is never modified.
    pub fn adjust_parameters(&self, parameters: &Parameters, error_message: &str) -> Parameters {
        let mut adjusted = parameters.clone();
        let message = error_message.to_lowercase();

        if message.contains("radius") {
            self.repair_size(&mut adjusted, "radius");
        }
        if message.contains("height") {
            self.repair_size(&mut adjusted, "height");
        }
        if message.contains("dimension") || message.contains("size") {
            if let Some(ParamValue::Vector(dims)) = adjusted.get("dimensions").cloned() {
                let [x, y, z] = dims.components().map(|c| self.repaired(c));
                adjusted.insert("dimensions".into(), ParamValue::Vector(Vec3::new(x, y, z)));
            }
        }
        if message.contains("factor") || message.contains("scale") {
            if let Some(factor) = adjusted.get("factor").and_then(|v| v.as_f64()) {
                if factor <= 0.0 {
                    adjusted.insert("factor".into(), ParamValue::Real(SAFE_SIZE));
                }
            }
        }
        if message.contains("layer") {
            // Falls back to the active layer
            adjusted.remove("layer");
        }
        if message.contains("material") {
            adjusted.remove("material");
        }
        if ["overlap", "occupied", "collision", "intersect"]
            .iter()
            .any(|cue| message.contains(cue))
        {
            if let Some(ParamValue::Vector(center)) = adjusted.get("center").cloned() {
                let shifted = center + Vec3::new(self.relative_offset, 0.0, 0.0);
                adjusted.insert("center".into(), ParamValue::Vector(shifted));
            }
        }

        if adjusted != *parameters {
            tracing::debug!("adjusted parameters after {:?}: {:?}", error_message, adjusted);
        }
        adjusted
    }

    fn repair_size(&self, parameters: &mut Parameters, key: &str) {
        if let Some(value) = parameters.get(key).and_then(|v| v.as_f64()) {
            let repaired = self.repaired(value);
            if repaired != value {
                parameters.insert(key.into(), ParamValue::Real(repaired));
            }
        }
    }

    /// Repaired sizes never exceed the configured maximum
    fn repaired(&self, value: f64) -> f64 {
        if value <= 0.0 {
            SAFE_SIZE.min(self.max_dimension)
        } else if value > self.max_dimension {
            CLAMPED_SIZE.min(self.max_dimension)
        } else {
            value
        }
    }
}
