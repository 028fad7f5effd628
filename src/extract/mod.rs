//! Parameter extraction from utterances
//!
//! Each parameter a template declares is looked up with a small,
//! domain-specific matcher. A parameter that cannot be found is simply left
//! out of the result; downstream code reads it through
//! [`ParameterAccess`] with a default.

pub mod accessors;
pub mod repair;

use crate::command::catalog::CommandTemplate;
use crate::context::store::operation_tag;
use crate::context::ConversationContext;
use crate::core::error::Result;
use crate::core::text::{padded_words, words};
use crate::core::types::{EntityId, ParamValue, Parameters, Vec3};
use regex::Regex;

pub use accessors::ParameterAccess;

const NUM: &str = r"-?\d+(?:\.\d+)?";
const UNIT: &str = r"(?:units?|mm|cm|m|meters?|inch(?:es)?|in|ft|feet)";

/// Colour and material words recognized without a "material" cue
const MATERIAL_WORDS: &[&str] = &[
    "red", "green", "blue", "yellow", "white", "black", "gray", "grey", "orange", "purple",
    "pink", "brown", "gold", "silver", "glass", "wood", "wooden", "steel", "metal", "concrete",
    "stone", "plastic",
];

/// Words that can follow "layer" without naming one
const LAYER_STOP_WORDS: &[&str] = &[
    "at", "with", "and", "in", "on", "of", "to", "the", "a", "an", "by", "near", "next", "above", "below",
];

const LAYOUT_WORDS: &[&str] = &["grid", "row", "line", "circle", "ring", "stack", "column"];

/// Relative phrases and the unit direction they imply
const RELATIVE_PHRASES: &[(&str, [f64; 3])] = &[
    (" next to ", [1.0, 0.0, 0.0]),
    (" beside ", [1.0, 0.0, 0.0]),
    (" right of ", [1.0, 0.0, 0.0]),
    (" left of ", [-1.0, 0.0, 0.0]),
    (" above ", [0.0, 0.0, 1.0]),
    (" on top of ", [0.0, 0.0, 1.0]),
    (" below ", [0.0, 0.0, -1.0]),
    (" under ", [0.0, 0.0, -1.0]),
    (" behind ", [0.0, 1.0, 0.0]),
    (" in front of ", [0.0, -1.0, 0.0]),
];

/// Compiled matchers, built once per extractor
#[derive(Debug)]
struct Patterns {
    coordinates: Regex,
    radius: Regex,
    radius_before: Regex,
    diameter: Regex,
    height: Regex,
    height_before: Regex,
    dimensions: Regex,
    width: Regex,
    length: Regex,
    material: Regex,
    layer: Regex,
    layer_before: Regex,
    uuid: Regex,
    offset: Regex,
    direction: Regex,
    direction_before: Regex,
    factor: Regex,
    factor_suffix: Regex,
    angle: Regex,
    count: Regex,
    spacing: Regex,
}

impl Patterns {
    fn compile() -> Result<Self> {
        let triple = format!(r"\(?\s*({n})\s*,\s*({n})\s*,\s*({n})\s*\)?", n = NUM);
        let cue = r"\s*(?:of|=|:|is)?\s*";
        Ok(Self {
            coordinates: Regex::new(&format!(
                r"(?i)\b(?:at|position|centered\s+at|center(?:ed)?)\s*{}",
                triple
            ))?,
            radius: Regex::new(&format!(r"(?i)\bradius{}({})", cue, NUM))?,
            radius_before: Regex::new(&format!(r"(?i)({})\s*{}?\s+radius\b", NUM, UNIT))?,
            diameter: Regex::new(&format!(r"(?i)\bdiameter{}({})", cue, NUM))?,
            height: Regex::new(&format!(r"(?i)\bheight{}({})", cue, NUM))?,
            height_before: Regex::new(&format!(r"(?i)({})\s*{}?\s+(?:tall|high)\b", NUM, UNIT))?,
            dimensions: Regex::new(&format!(
                r"(?i)({n})\s*{u}?\s*(?:x|×|\*|by)\s*({n})\s*{u}?\s*(?:x|×|\*|by)\s*({n})",
                n = NUM,
                u = UNIT
            ))?,
            width: Regex::new(&format!(r"(?i)\bwidth{}({})", cue, NUM))?,
            length: Regex::new(&format!(r"(?i)\b(?:length|depth){}({})", cue, NUM))?,
            material: Regex::new(
                r"(?i)\b(?:made\s+of|material|colou?r(?:ed)?)\s+(?:of\s+|is\s+)?([a-z]+)",
            )?,
            layer: Regex::new(r#"(?i)\blayer\s+(?:named\s+|called\s+)?['"]?([a-z0-9_\-]+)['"]?"#)?,
            layer_before: Regex::new(r#"(?i)\bon\s+(?:the\s+)?['"]?([a-z0-9_\-]+)['"]?\s+layer\b"#)?,
            uuid: Regex::new(
                r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
            )?,
            offset: Regex::new(&format!(r"(?i)\b(?:by|to)\s*{}", triple))?,
            direction: Regex::new(&format!(
                r"(?i)\b(up|down|left|right|forwards?|backwards?|back)\s+(?:by\s+)?({})",
                NUM
            ))?,
            direction_before: Regex::new(&format!(
                r"(?i)({})\s*{}?\s+(up|down|left|right|forwards?|backwards?|back)\b",
                NUM, UNIT
            ))?,
            factor: Regex::new(&format!(
                r"(?i)\b(?:by|factor\s+(?:of\s+)?)\s*({})\s*(%)?(\s*,)?",
                NUM
            ))?,
            factor_suffix: Regex::new(&format!(r"(?i)\b({})\s*(?:x|times)(?:\s|$|[.,!?])", NUM))?,
            angle: Regex::new(&format!(r"(?i)({})\s*(?:degrees?|deg\b|°)", NUM))?,
            count: Regex::new(
                r"(?i)\b(\d+)\s+(?:objects|spheres|balls|boxes|cubes|cylinders|copies|items|pieces)\b",
            )?,
            spacing: Regex::new(&format!(
                r"(?i)(?:\b(?:spacing|spaced)\s*(?:of|by|at)?\s*({n})|({n})\s*{u}?\s+apart\b)",
                n = NUM,
                u = UNIT
            ))?,
        })
    }
}

/// Pulls typed parameter values out of an utterance for a template
#[derive(Debug)]
pub struct ParameterExtractor {
    patterns: Patterns,
    relative_offset: f64,
    max_dimension: f64,
}

impl ParameterExtractor {
    pub fn new(relative_offset: f64, max_dimension: f64) -> Result<Self> {
        Ok(Self {
            patterns: Patterns::compile()?,
            relative_offset,
            max_dimension,
        })
    }

    /// Extract every parameter `template` declares. Keys absent from the
    /// template are never produced.
    pub fn extract(
        &self,
        input: &str,
        template: &CommandTemplate,
        context: &ConversationContext,
    ) -> Parameters {
        let mut parameters = Parameters::new();

        for name in &template.parameters {
            if let Some(value) = self.extract_parameter(input, name, context) {
                parameters.insert(name.clone(), value);
            }
        }

        tracing::debug!("extracted {:?} for {}", parameters, template.name);
        parameters
    }

    fn extract_parameter(
        &self,
        input: &str,
        name: &str,
        context: &ConversationContext,
    ) -> Option<ParamValue> {
        match name.to_lowercase().as_str() {
            "center" | "position" => self.extract_point(input, context).map(ParamValue::Vector),
            "radius" => self.extract_radius(input).map(ParamValue::Real),
            "height" => self.extract_height(input).map(ParamValue::Real),
            "dimensions" | "size" => self.extract_dimensions(input).map(ParamValue::Vector),
            "material" => self.extract_material(input).map(ParamValue::Text),
            "layer" => self.extract_layer(input).map(ParamValue::Text),
            "objectid" => self.extract_object_ref(input, context).map(|id| ParamValue::Text(id.to_string())),
            "operation" => extract_operation(input).map(|op| ParamValue::Text(op.into())),
            "offset" => self.extract_offset(input).map(ParamValue::Vector),
            "factor" => self.extract_factor(input).map(ParamValue::Real),
            "angle" => first_number(&self.patterns.angle, input).map(ParamValue::Real),
            "layout" => find_word(input, LAYOUT_WORDS).map(ParamValue::Text),
            "count" => self
                .patterns
                .count
                .captures(input)
                .and_then(|c| c[1].parse::<i64>().ok())
                .map(ParamValue::Integer),
            "spacing" => self.extract_spacing(input).map(ParamValue::Real),
            _ => None,
        }
    }

    /// "at 5,10,0", "at the origin", or a phrase relative to the last created object
    fn extract_point(&self, input: &str, context: &ConversationContext) -> Option<Vec3> {
        if let Some(point) = capture_triple(&self.patterns.coordinates, input) {
            return Some(point);
        }

        if words(input).iter().any(|w| w == "origin") {
            return Some(Vec3::ORIGIN);
        }

        let last = context.last_created.as_ref()?;
        let padded = padded_words(input);
        RELATIVE_PHRASES
            .iter()
            .find(|(phrase, _)| padded.contains(phrase))
            .map(|(_, dir)| last.position + Vec3::new(dir[0], dir[1], dir[2]) * self.relative_offset)
    }

    fn extract_radius(&self, input: &str) -> Option<f64> {
        first_number(&self.patterns.radius, input)
            .or_else(|| first_number(&self.patterns.radius_before, input))
            .or_else(|| first_number(&self.patterns.diameter, input).map(|d| d / 2.0))
    }

    fn extract_height(&self, input: &str) -> Option<f64> {
        first_number(&self.patterns.height, input)
            .or_else(|| first_number(&self.patterns.height_before, input))
    }

    /// "5x3x2", "5 by 3 by 2", or "width 5 length 3 height 2"
    fn extract_dimensions(&self, input: &str) -> Option<Vec3> {
        if let Some(dims) = capture_triple(&self.patterns.dimensions, input) {
            return Some(dims);
        }

        let w = first_number(&self.patterns.width, input)?;
        let l = first_number(&self.patterns.length, input)?;
        let h = first_number(&self.patterns.height, input)?;
        Some(Vec3::new(w, l, h))
    }

    fn extract_material(&self, input: &str) -> Option<String> {
        if let Some(caps) = self.patterns.material.captures(input) {
            return Some(caps[1].to_lowercase());
        }
        find_word(input, MATERIAL_WORDS)
    }

    /// "on the Walls layer" first, then "layer Walls"; connective words are never names
    fn extract_layer(&self, input: &str) -> Option<String> {
        self.patterns
            .layer_before
            .captures_iter(input)
            .chain(self.patterns.layer.captures_iter(input))
            .map(|caps| caps[1].to_string())
            .find(|name| !LAYER_STOP_WORDS.contains(&name.to_lowercase().as_str()))
    }

    /// Explicit id, then "it"/"that" -> last created, then a single selection.
    /// With nothing selected the last created object is the implicit target.
    fn extract_object_ref(&self, input: &str, context: &ConversationContext) -> Option<EntityId> {
        if let Some(m) = self.patterns.uuid.find(input) {
            return EntityId::parse(m.as_str());
        }

        let refers_back = words(input)
            .iter()
            .any(|w| matches!(w.as_str(), "it" | "that" | "this" | "last" | "previous"));
        if refers_back {
            if let Some(last) = &context.last_created {
                return Some(last.id);
            }
        }

        match context.selected_entities.len() {
            0 => context.last_created.as_ref().map(|last| last.id),
            1 => context.selected_entities.iter().next().copied(),
            _ => None,
        }
    }

    /// "by 1,2,3" / "to 1,2,3", or a direction phrase like "up 5" / "5 units left"
    fn extract_offset(&self, input: &str) -> Option<Vec3> {
        if let Some(offset) = capture_triple(&self.patterns.offset, input) {
            return Some(offset);
        }

        let (dir, amount) = if let Some(caps) = self.patterns.direction.captures(input) {
            (caps[1].to_lowercase(), caps[2].parse::<f64>().ok()?)
        } else {
            let caps = self.patterns.direction_before.captures(input)?;
            (caps[2].to_lowercase(), caps[1].parse::<f64>().ok()?)
        };

        let unit = match dir.as_str() {
            "up" => Vec3::new(0.0, 0.0, 1.0),
            "down" => Vec3::new(0.0, 0.0, -1.0),
            "left" => Vec3::new(-1.0, 0.0, 0.0),
            "right" => Vec3::new(1.0, 0.0, 0.0),
            d if d.starts_with("forward") => Vec3::new(0.0, 1.0, 0.0),
            _ => Vec3::new(0.0, -1.0, 0.0),
        };
        Some(unit * amount)
    }

    /// Scale factor; only meaningful when the utterance is a scale request
    fn extract_factor(&self, input: &str) -> Option<f64> {
        if extract_operation(input) != Some("scale") {
            return None;
        }

        if let Some(caps) = self.patterns.factor.captures(input) {
            // "by 1,2,3" is an offset, not a factor
            if caps.get(3).is_none() {
                let value: f64 = caps[1].parse().ok()?;
                return Some(if caps.get(2).is_some() { value / 100.0 } else { value });
            }
        }

        first_number(&self.patterns.factor_suffix, input)
    }

    fn extract_spacing(&self, input: &str) -> Option<f64> {
        let caps = self.patterns.spacing.captures(input)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Modification verb of the utterance, excluding creation
fn extract_operation(input: &str) -> Option<&'static str> {
    operation_tag(input).filter(|op| *op != "create")
}

fn first_number(re: &Regex, input: &str) -> Option<f64> {
    re.captures(input).and_then(|caps| caps[1].parse().ok())
}

fn capture_triple(re: &Regex, input: &str) -> Option<Vec3> {
    let caps = re.captures(input)?;
    let x = caps[1].parse().ok()?;
    let y = caps[2].parse().ok()?;
    let z = caps[3].parse().ok()?;
    Some(Vec3::new(x, y, z))
}

fn find_word(input: &str, vocabulary: &[&str]) -> Option<String> {
    words(input)
        .into_iter()
        .find(|w| vocabulary.contains(&w.as_str()))
}
