//! Typed reads from a parameter map with declared defaults

use crate::core::types::{Parameters, Vec3};

/// Typed accessors over [`Parameters`].
///
/// A missing key or a value of the wrong type yields the default. Integers
/// promote to reals; nothing else is coerced.
pub trait ParameterAccess {
    fn number_or(&self, key: &str, default: f64) -> f64;
    fn vector_or(&self, key: &str, default: Vec3) -> Vec3;
    fn text_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str;
}

impl ParameterAccess for Parameters {
    fn number_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    fn vector_or(&self, key: &str, default: Vec3) -> Vec3 {
        self.get(key).and_then(|v| v.as_vec3()).unwrap_or(default)
    }

    fn text_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).and_then(|v| v.as_str()).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ParamValue;

    #[test]
    fn test_defaults_on_missing_and_mismatch() {
        let mut params = Parameters::new();
        params.insert("radius".into(), ParamValue::Text("big".into()));
        params.insert("count".into(), ParamValue::Integer(4));
        params.insert("layer".into(), ParamValue::Text("Walls".into()));

        assert_eq!(params.number_or("radius", 1.0), 1.0);
        assert_eq!(params.number_or("count", 0.0), 4.0);
        assert_eq!(params.number_or("height", 2.5), 2.5);
        assert_eq!(params.vector_or("layer", Vec3::ORIGIN), Vec3::ORIGIN);
        assert_eq!(params.text_or("layer", "Default"), "Walls");
        assert_eq!(params.text_or("count", "none"), "none");
    }
}
