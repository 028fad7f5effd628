//! Core type definitions used throughout the pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of an entity living in the host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 3D point or vector in model units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ORIGIN: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every component is strictly positive
    pub fn all_positive(&self) -> bool {
        self.x > 0.0 && self.y > 0.0 && self.z > 0.0
    }

    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A typed parameter value pulled out of an utterance or an AI reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Real(f64),
    Vector(Vec3),
    Text(String),
}

impl ParamValue {
    /// Numeric view; integers promote to reals, everything else is `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            ParamValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value from a provider reply.
    ///
    /// Arrays of three numbers and `{x, y, z}` objects become vectors;
    /// anything without a typed counterpart is dropped.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(ParamValue::Integer(i)),
                None => n.as_f64().map(ParamValue::Real),
            },
            Value::String(s) => Some(ParamValue::Text(s.clone())),
            Value::Array(items) if items.len() == 3 => {
                let coords: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                coords.map(|c| ParamValue::Vector(Vec3::new(c[0], c[1], c[2])))
            }
            Value::Object(map) => {
                let x = map.get("x").and_then(Value::as_f64)?;
                let y = map.get("y").and_then(Value::as_f64)?;
                let z = map.get("z").and_then(Value::as_f64)?;
                Some(ParamValue::Vector(Vec3::new(x, y, z)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Real(r) => write!(f, "{}", r),
            ParamValue::Vector(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parameter name -> value. Ordered so prompts and logs are deterministic.
pub type Parameters = BTreeMap<String, ParamValue>;

/// Outcome of one pipeline run; the only type handed back to the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingResult {
    Success(String),
    Error(String),
    Warning(String),
    Partial(String),
}

impl ProcessingResult {
    pub fn message(&self) -> &str {
        match self {
            ProcessingResult::Success(m)
            | ProcessingResult::Error(m)
            | ProcessingResult::Warning(m)
            | ProcessingResult::Partial(m) => m,
        }
    }

    /// Success or Warning: the requested work was carried out
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success(_) | ProcessingResult::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProcessingResult::Error(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingResult::Success(_) => "success",
            ProcessingResult::Error(_) => "error",
            ProcessingResult::Warning(_) => "warning",
            ProcessingResult::Partial(_) => "partial",
        }
    }
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.message())
    }
}
