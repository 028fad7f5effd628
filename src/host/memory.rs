//! In-memory scene used by the CLI and tests

use super::SceneHost;
use crate::command::dispatch::{CommandHandler, DispatchOutcome, DispatchTable};
use crate::core::error::Result;
use crate::core::types::{EntityId, Parameters, Vec3};
use crate::extract::ParameterAccess;
use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_LAYER: &str = "Default";

/// One object placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: EntityId,
    pub kind: String,
    pub position: Vec3,
    pub layer: String,
    pub parameters: Parameters,
}

#[derive(Debug)]
struct SceneState {
    objects: AHashMap<EntityId, SceneObject>,
    /// Insertion order, for stable summaries
    order: Vec<EntityId>,
    layers: Vec<String>,
    active_layer: String,
    selection: Vec<EntityId>,
}

impl SceneState {
    fn has_layer(&self, name: &str) -> Option<String> {
        self.layers.iter().find(|l| l.eq_ignore_ascii_case(name)).cloned()
    }
}

/// Shared handle to an in-memory scene. Clones see the same objects.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    state: Arc<Mutex<SceneState>>,
    max_dimension: f64,
}

impl MemoryScene {
    pub fn new(max_dimension: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SceneState {
                objects: AHashMap::new(),
                order: Vec::new(),
                layers: vec![DEFAULT_LAYER.to_string()],
                active_layer: DEFAULT_LAYER.to_string(),
                selection: Vec::new(),
            })),
            max_dimension,
        }
    }

    pub async fn add_layer(&self, name: &str) {
        let mut state = self.state.lock().await;
        if state.has_layer(name).is_none() {
            state.layers.push(name.to_string());
        }
    }

    pub async fn set_active_layer(&self, name: &str) {
        self.add_layer(name).await;
        self.state.lock().await.active_layer = name.to_string();
    }

    pub async fn select(&self, ids: &[EntityId]) {
        self.state.lock().await.selection = ids.to_vec();
    }

    pub async fn object(&self, id: EntityId) -> Option<SceneObject> {
        self.state.lock().await.objects.get(&id).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    /// Objects in creation order
    pub async fn objects(&self) -> Vec<SceneObject> {
        let state = self.state.lock().await;
        state.order.iter().filter_map(|id| state.objects.get(id).cloned()).collect()
    }

    /// Handlers for every built-in command, bound to this scene
    pub fn dispatch_table(&self) -> DispatchTable {
        DispatchTable::new()
            .with("CreateSphere", Arc::new(ShapeCommand::new(self.clone(), ShapeKind::Sphere)))
            .with("CreateBox", Arc::new(ShapeCommand::new(self.clone(), ShapeKind::Box)))
            .with("CreateCylinder", Arc::new(ShapeCommand::new(self.clone(), ShapeKind::Cylinder)))
            .with("ModifyObject", Arc::new(ModifyCommand { scene: self.clone() }))
            .with("ArrangeObjects", Arc::new(ArrangeCommand { scene: self.clone() }))
    }

    /// Place an object; returns the failure message when the scene refuses it
    async fn place(&self, kind: &str, parameters: &Parameters) -> std::result::Result<SceneObject, String> {
        let mut state = self.state.lock().await;

        let layer = match parameters.get("layer").and_then(|v| v.as_str()) {
            Some(requested) => state
                .has_layer(requested)
                .ok_or_else(|| format!("Layer '{}' does not exist", requested))?,
            None => state.active_layer.clone(),
        };

        let object = SceneObject {
            id: EntityId::new(),
            kind: kind.to_string(),
            position: parameters.vector_or("center", Vec3::ORIGIN),
            layer,
            parameters: parameters.clone(),
        };
        state.order.push(object.id);
        state.objects.insert(object.id, object.clone());
        Ok(object)
    }

    fn check_size(&self, name: &str, value: f64) -> std::result::Result<(), String> {
        if value > self.max_dimension {
            Err(format!("{} exceeds maximum of {}", name, self.max_dimension))
        } else if value <= 0.0 {
            Err(format!("{} must be positive", name))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

#[async_trait]
impl SceneHost for MemoryScene {
    async fn active_layer(&self) -> Result<String> {
        Ok(self.state.lock().await.active_layer.clone())
    }

    async fn selected_entities(&self) -> Result<Vec<EntityId>> {
        Ok(self.state.lock().await.selection.clone())
    }

    async fn scene_summary(&self) -> Result<String> {
        let state = self.state.lock().await;
        if state.objects.is_empty() {
            return Ok("Empty scene".into());
        }

        let mut counts: Vec<(String, usize)> = Vec::new();
        for id in &state.order {
            if let Some(object) = state.objects.get(id) {
                match counts.iter_mut().find(|(kind, _)| *kind == object.kind) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((object.kind.clone(), 1)),
                }
            }
        }
        let parts: Vec<String> = counts
            .iter()
            .map(|(kind, n)| format!("{} {}{}", n, kind, if *n == 1 { "" } else { "s" }))
            .collect();
        Ok(format!("{} object(s): {}", state.objects.len(), parts.join(", ")))
    }

    async fn layers(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().await.layers.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Sphere,
    Box,
    Cylinder,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
        }
    }
}

/// Creates a primitive, filling in defaults for missing sizes
pub struct ShapeCommand {
    scene: MemoryScene,
    kind: ShapeKind,
}

impl ShapeCommand {
    pub fn new(scene: MemoryScene, kind: ShapeKind) -> Self {
        Self { scene, kind }
    }

    fn describe(&self, parameters: &Parameters) -> std::result::Result<String, String> {
        let scene = &self.scene;
        match self.kind {
            ShapeKind::Sphere => {
                let radius = parameters.number_or("radius", 1.0);
                scene.check_size("radius", radius)?;
                Ok(format!("radius {}", radius))
            }
            ShapeKind::Cylinder => {
                let radius = parameters.number_or("radius", 1.0);
                let height = parameters.number_or("height", 1.0);
                scene.check_size("radius", radius)?;
                scene.check_size("height", height)?;
                Ok(format!("radius {} and height {}", radius, height))
            }
            ShapeKind::Box => {
                let dims = parameters.vector_or("dimensions", Vec3::new(1.0, 1.0, 1.0));
                for c in dims.components() {
                    scene.check_size("dimension", c)?;
                }
                Ok(format!("dimensions {} x {} x {}", dims.x, dims.y, dims.z))
            }
        }
    }
}

#[async_trait]
impl CommandHandler for ShapeCommand {
    async fn execute(&self, parameters: &Parameters) -> Result<DispatchOutcome> {
        let detail = match self.describe(parameters) {
            Ok(detail) => detail,
            Err(reason) => return Ok(DispatchOutcome::failed(reason)),
        };

        match self.scene.place(self.kind.name(), parameters).await {
            Ok(object) => Ok(DispatchOutcome::created(
                object.id,
                format!(
                    "Created {} with {} at {} on layer {}",
                    self.kind.name(),
                    detail,
                    object.position,
                    object.layer
                ),
            )),
            Err(reason) => Ok(DispatchOutcome::failed(reason)),
        }
    }
}

/// Moves, scales or rotates one object
pub struct ModifyCommand {
    scene: MemoryScene,
}

#[async_trait]
impl CommandHandler for ModifyCommand {
    async fn execute(&self, parameters: &Parameters) -> Result<DispatchOutcome> {
        let mut state = self.scene.state.lock().await;

        let target = match parameters.get("objectId").and_then(|v| v.as_str()) {
            Some(raw) => EntityId::parse(raw),
            None if state.selection.len() == 1 => state.selection.first().copied(),
            None => None,
        };
        let Some(object) = target.and_then(|id| state.objects.get_mut(&id)) else {
            return Ok(DispatchOutcome::failed("Target object not found"));
        };

        let message = match parameters.text_or("operation", "modify") {
            "move" => {
                let offset = parameters.vector_or("offset", Vec3::ORIGIN);
                object.position = object.position + offset;
                format!("Moved {} to {}", object.kind, object.position)
            }
            "scale" => {
                let factor = parameters.number_or("factor", 1.0);
                if factor <= 0.0 {
                    return Ok(DispatchOutcome::failed("scale factor must be positive"));
                }
                format!("Scaled {} by {}", object.kind, factor)
            }
            "rotate" => {
                let angle = parameters.number_or("angle", 0.0);
                format!("Rotated {} by {} degrees", object.kind, angle)
            }
            other => format!("Applied {} to {}", other, object.kind),
        };
        Ok(DispatchOutcome::done(message))
    }
}

/// Lays out several primitives in a row, grid or circle
pub struct ArrangeCommand {
    scene: MemoryScene,
}

#[async_trait]
impl CommandHandler for ArrangeCommand {
    async fn execute(&self, parameters: &Parameters) -> Result<DispatchOutcome> {
        let count = parameters.number_or("count", 3.0).round() as usize;
        let spacing = parameters.number_or("spacing", 2.0);
        let layout = parameters.text_or("layout", "row").to_string();
        if count == 0 || count > 100 {
            return Ok(DispatchOutcome::failed("count must be between 1 and 100"));
        }

        let side = (count as f64).sqrt().ceil() as usize;
        for i in 0..count {
            let position = match layout.as_str() {
                "grid" => Vec3::new((i % side) as f64 * spacing, (i / side) as f64 * spacing, 0.0),
                "circle" | "ring" => {
                    let angle = std::f64::consts::TAU * i as f64 / count as f64;
                    let r = spacing * count as f64 / std::f64::consts::TAU;
                    Vec3::new(r * angle.cos(), r * angle.sin(), 0.0)
                }
                "stack" | "column" => Vec3::new(0.0, 0.0, i as f64 * spacing),
                _ => Vec3::new(i as f64 * spacing, 0.0, 0.0),
            };
            let mut placed = Parameters::new();
            placed.insert("center".into(), crate::core::types::ParamValue::Vector(position));
            if let Err(reason) = self.scene.place("sphere", &placed).await {
                return Ok(DispatchOutcome::failed(reason));
            }
        }

        Ok(DispatchOutcome::done(format!("Arranged {} objects in a {}", count, layout)))
    }
}
