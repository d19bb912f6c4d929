//! Live-editable parameters
//!
//! [`ParamRegistry`] is a flat list of typed descriptors built once the scene
//! exists. Every write goes through [`ParamKind::sanitize`], so a value that
//! reaches the scene is always inside its descriptor's range.

use std::f32::consts::TAU;

use crate::config::SpinConfig;
use crate::error::ParamError;
use crate::gfx::resources::material::{Material, MaterialId, ShadingModel, Side};
use crate::gfx::scene::{BuiltScene, NodeId, Scene};
use crate::tween::{Ease, RotationAxis, TweenHandle, Tweener};

/// Inclusive range with an optional step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub min: f32,
    pub max: f32,
    pub step: Option<f32>,
}

impl Constraint {
    pub const fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    pub const fn stepped(min: f32, max: f32, step: f32) -> Self {
        Self {
            min,
            max,
            step: Some(step),
        }
    }

    /// Snaps to the step grid, then clamps. Non-finite input becomes `min`.
    pub fn apply(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let snapped = match self.step {
            Some(step) if step > 0.0 => (value / step).round() * step,
            _ => value,
        };
        snapped.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Scalar(Constraint),
    /// RGB, each channel in [0, 1]
    Color,
    Vector2([Constraint; 2]),
    Choice(Vec<&'static str>),
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Scalar(f32),
    Color([f32; 3]),
    Vector2([f32; 2]),
    Choice(usize),
}

impl ParamKind {
    fn expected(&self) -> &'static str {
        match self {
            ParamKind::Scalar(_) => "scalar",
            ParamKind::Color => "color",
            ParamKind::Vector2(_) => "vector2",
            ParamKind::Choice(_) => "choice",
            ParamKind::Action => "action",
        }
    }

    /// Brings `value` into range for this kind, or `None` on a kind mismatch
    pub fn sanitize(&self, value: ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (ParamKind::Scalar(constraint), ParamValue::Scalar(v)) => {
                Some(ParamValue::Scalar(constraint.apply(v)))
            }
            (ParamKind::Color, ParamValue::Color(rgb)) => {
                let unit = Constraint::new(0.0, 1.0);
                Some(ParamValue::Color(rgb.map(|c| unit.apply(c))))
            }
            (ParamKind::Vector2([x, y]), ParamValue::Vector2([vx, vy])) => {
                Some(ParamValue::Vector2([x.apply(vx), y.apply(vy)]))
            }
            (ParamKind::Choice(options), ParamValue::Choice(index)) if !options.is_empty() => {
                Some(ParamValue::Choice(index.min(options.len() - 1)))
            }
            _ => None,
        }
    }
}

/// Mutable state parameter setters and actions may touch
pub struct ParamContext<'a> {
    pub scene: &'a mut Scene,
    pub tweens: &'a mut Tweener,
    /// Rotations per second used by the spin action
    pub rotation_speed: &'a mut f32,
}

type Getter = Box<dyn Fn(&Scene, f32) -> Option<ParamValue>>;
type Setter = Box<dyn Fn(&mut ParamContext<'_>, ParamValue) -> bool>;
type ActionFn = Box<dyn Fn(&mut ParamContext<'_>) -> Option<TweenHandle>>;

enum Binding {
    Value { get: Getter, set: Setter },
    Action(ActionFn),
}

pub struct ParamDescriptor {
    pub folder: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    binding: Binding,
}

impl ParamDescriptor {
    pub fn value(
        folder: &'static str,
        label: &'static str,
        kind: ParamKind,
        get: impl Fn(&Scene, f32) -> Option<ParamValue> + 'static,
        set: impl Fn(&mut ParamContext<'_>, ParamValue) -> bool + 'static,
    ) -> Self {
        Self {
            folder,
            label,
            kind,
            binding: Binding::Value {
                get: Box::new(get),
                set: Box::new(set),
            },
        }
    }

    pub fn action(
        folder: &'static str,
        label: &'static str,
        run: impl Fn(&mut ParamContext<'_>) -> Option<TweenHandle> + 'static,
    ) -> Self {
        Self {
            folder,
            label,
            kind: ParamKind::Action,
            binding: Binding::Action(Box::new(run)),
        }
    }
}

/// A descriptor with its current value, ready for a panel to draw
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub index: usize,
    pub folder: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    /// `None` for actions and for parameters whose target is gone
    pub value: Option<ParamValue>,
}

/// Everything the debug panel shows for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PanelModel {
    pub title: String,
    pub entries: Vec<PanelEntry>,
}

impl PanelModel {
    /// Folder names in first-seen order
    pub fn folders(&self) -> Vec<&'static str> {
        let mut folders: Vec<&'static str> = Vec::new();
        for entry in &self.entries {
            if !folders.contains(&entry.folder) {
                folders.push(entry.folder);
            }
        }
        folders
    }
}

/// A change requested through the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEdit {
    Set { index: usize, value: ParamValue },
    Trigger { index: usize },
}

#[derive(Default)]
pub struct ParamRegistry {
    descriptors: Vec<ParamDescriptor>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ParamDescriptor) -> usize {
        self.descriptors.push(descriptor);
        self.descriptors.len() - 1
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.descriptors.iter()
    }

    pub fn find(&self, folder: &str, label: &str) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.folder == folder && d.label == label)
    }

    pub fn get(&self, index: usize, scene: &Scene, rotation_speed: f32) -> Option<ParamValue> {
        match &self.descriptors.get(index)?.binding {
            Binding::Value { get, .. } => get(scene, rotation_speed),
            Binding::Action(_) => None,
        }
    }

    /// Sanitizes and writes `value`; returns what was actually written
    pub fn set(
        &self,
        index: usize,
        ctx: &mut ParamContext<'_>,
        value: ParamValue,
    ) -> Result<ParamValue, ParamError> {
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(ParamError::Unknown(index))?;
        let mismatch = || ParamError::KindMismatch {
            label: descriptor.label,
            expected: descriptor.kind.expected(),
        };

        let Binding::Value { set, .. } = &descriptor.binding else {
            return Err(mismatch());
        };
        let value = descriptor.kind.sanitize(value).ok_or_else(mismatch)?;

        if !set(ctx, value) {
            return Err(ParamError::MissingTarget(descriptor.label));
        }
        log::debug!("{}/{} = {:?}", descriptor.folder, descriptor.label, value);
        Ok(value)
    }

    /// Runs an action parameter
    pub fn trigger(
        &self,
        index: usize,
        ctx: &mut ParamContext<'_>,
    ) -> Result<Option<TweenHandle>, ParamError> {
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(ParamError::Unknown(index))?;
        match &descriptor.binding {
            Binding::Action(run) => Ok(run(ctx)),
            Binding::Value { .. } => Err(ParamError::KindMismatch {
                label: descriptor.label,
                expected: descriptor.kind.expected(),
            }),
        }
    }

    pub fn apply(
        &self,
        edit: ParamEdit,
        ctx: &mut ParamContext<'_>,
    ) -> Result<Option<TweenHandle>, ParamError> {
        match edit {
            ParamEdit::Set { index, value } => self.set(index, ctx, value).map(|_| None),
            ParamEdit::Trigger { index } => self.trigger(index, ctx),
        }
    }

    pub fn snapshot(&self, title: &str, scene: &Scene, rotation_speed: f32) -> PanelModel {
        let entries = self
            .descriptors
            .iter()
            .enumerate()
            .map(|(index, d)| PanelEntry {
                index,
                folder: d.folder,
                label: d.label,
                kind: d.kind.clone(),
                value: self.get(index, scene, rotation_speed),
            })
            .collect();
        PanelModel {
            title: title.to_string(),
            entries,
        }
    }
}

/// Seconds for one full turn at `speed` rotations per second.
///
/// Non-positive or non-finite speeds use `fallback`, which also caps the result.
pub fn spin_duration(speed: f32, fallback: f32) -> f32 {
    if speed.is_finite() && speed > 0.0 {
        (1.0 / speed).min(fallback)
    } else {
        fallback
    }
}

/// Starts one eased full turn of `node` about Y
pub fn spin(
    tweens: &mut Tweener,
    scene: &Scene,
    node: NodeId,
    speed: f32,
    fallback: f32,
) -> Option<TweenHandle> {
    let duration = spin_duration(speed, fallback);
    tweens.rotate_by(scene, node, RotationAxis::Y, TAU, duration, Ease::QuadInOut)
}

pub const CUBE_FOLDER: &str = "Cube";
pub const MATERIAL_FOLDER: &str = "Material";
pub const SPHERE_FOLDER: &str = "Sphere";

const UNIT: Constraint = Constraint::new(0.0, 1.0);
const POSITION: Constraint = Constraint::stepped(-3.0, 3.0, 0.01);
const SHADING_CHOICES: [ShadingModel; 3] = [
    ShadingModel::Physical,
    ShadingModel::Toon,
    ShadingModel::Matcap,
];

fn material_scalar(
    label: &'static str,
    material: MaterialId,
    constraint: Constraint,
    get: fn(&Material) -> f32,
    set: fn(&mut Material, f32),
) -> ParamDescriptor {
    ParamDescriptor::value(
        MATERIAL_FOLDER,
        label,
        ParamKind::Scalar(constraint),
        move |scene, _| scene.material(material).map(|m| ParamValue::Scalar(get(m))),
        move |ctx, value| match (ctx.scene.material_mut(material), value) {
            (Some(m), ParamValue::Scalar(v)) => {
                set(m, v);
                true
            }
            _ => false,
        },
    )
}

fn material_color(
    folder: &'static str,
    label: &'static str,
    material: MaterialId,
    get: fn(&Material) -> [f32; 3],
    set: fn(&mut Material, [f32; 3]),
) -> ParamDescriptor {
    ParamDescriptor::value(
        folder,
        label,
        ParamKind::Color,
        move |scene, _| scene.material(material).map(|m| ParamValue::Color(get(m))),
        move |ctx, value| match (ctx.scene.material_mut(material), value) {
            (Some(m), ParamValue::Color(rgb)) => {
                set(m, rgb);
                true
            }
            _ => false,
        },
    )
}

fn node_position(label: &'static str, node: NodeId, axis: usize) -> ParamDescriptor {
    ParamDescriptor::value(
        CUBE_FOLDER,
        label,
        ParamKind::Scalar(POSITION),
        move |scene, _| {
            scene
                .node(node)
                .map(|n| ParamValue::Scalar(n.transform.position[axis]))
        },
        move |ctx, value| match (ctx.scene.node_mut(node), value) {
            (Some(n), ParamValue::Scalar(v)) => {
                n.transform.position[axis] = v;
                true
            }
            _ => false,
        },
    )
}

/// Registers the cube, material and sphere folders for a built scene
pub fn bind_scene_params(built: &BuiltScene, spin_config: &SpinConfig) -> ParamRegistry {
    let mut registry = ParamRegistry::new();
    let shared = built.shared_material;
    let cube = built.cube;
    let sphere_material = built.sphere_material;
    let fallback = spin_config.fallback_duration_secs;

    registry.push(material_color(
        CUBE_FOLDER,
        "color",
        shared,
        |m| m.color,
        |m, rgb| m.color = rgb,
    ));
    registry.push(node_position("posX", cube, 0));
    registry.push(node_position("posY", cube, 1));
    registry.push(node_position("posZ", cube, 2));
    registry.push(ParamDescriptor::value(
        CUBE_FOLDER,
        "rot/sec",
        ParamKind::Scalar(Constraint::stepped(0.1, 5.0, 0.1)),
        |_, speed| Some(ParamValue::Scalar(speed)),
        |ctx, value| match value {
            ParamValue::Scalar(v) => {
                *ctx.rotation_speed = v;
                true
            }
            _ => false,
        },
    ));
    registry.push(ParamDescriptor::action(CUBE_FOLDER, "spin", move |ctx| {
        spin(ctx.tweens, ctx.scene, cube, *ctx.rotation_speed, fallback)
    }));

    registry.push(material_scalar(
        "metalness",
        shared,
        Constraint::stepped(0.0, 1.0, 0.0001),
        |m| m.metalness,
        |m, v| m.metalness = v,
    ));
    registry.push(material_scalar(
        "roughness",
        shared,
        Constraint::stepped(0.0, 1.0, 0.0001),
        |m| m.roughness,
        |m, v| m.roughness = v,
    ));
    registry.push(material_scalar(
        "iridescence",
        shared,
        UNIT,
        |m| m.iridescence,
        |m, v| m.iridescence = v,
    ));
    registry.push(material_scalar(
        "iridescenceIOR",
        shared,
        Constraint::new(1.0, 2.333),
        |m| m.iridescence_ior,
        |m, v| m.iridescence_ior = v,
    ));
    let thickness = Constraint::stepped(1.0, 1000.0, 1.0);
    registry.push(ParamDescriptor::value(
        MATERIAL_FOLDER,
        "iridescenceThicknessRange",
        ParamKind::Vector2([thickness, thickness]),
        move |scene, _| {
            scene
                .material(shared)
                .map(|m| ParamValue::Vector2(m.iridescence_thickness_range))
        },
        move |ctx, value| match (ctx.scene.material_mut(shared), value) {
            (Some(m), ParamValue::Vector2(range)) => {
                m.iridescence_thickness_range = range;
                true
            }
            _ => false,
        },
    ));
    registry.push(material_scalar(
        "transmission",
        shared,
        UNIT,
        |m| m.transmission,
        |m, v| m.transmission = v,
    ));
    registry.push(material_scalar(
        "shininess",
        shared,
        Constraint::stepped(0.0, 1000.0, 1.0),
        |m| m.shininess,
        |m, v| m.shininess = v,
    ));
    registry.push(material_color(
        MATERIAL_FOLDER,
        "specularColor",
        shared,
        |m| m.specular_color,
        |m, rgb| m.specular_color = rgb,
    ));
    registry.push(material_scalar(
        "displacementScale",
        shared,
        Constraint::stepped(0.0, 1.0, 0.001),
        |m| m.displacement_scale,
        |m, v| m.displacement_scale = v,
    ));
    registry.push(ParamDescriptor::value(
        MATERIAL_FOLDER,
        "side",
        ParamKind::Choice(Side::ALL.iter().map(|s| s.label()).collect()),
        move |scene, _| {
            let side = scene.material(shared)?.side;
            let index = Side::ALL.iter().position(|s| *s == side)?;
            Some(ParamValue::Choice(index))
        },
        move |ctx, value| match (ctx.scene.material_mut(shared), value) {
            (Some(m), ParamValue::Choice(index)) => {
                m.side = Side::ALL[index];
                true
            }
            _ => false,
        },
    ));
    registry.push(ParamDescriptor::value(
        MATERIAL_FOLDER,
        "shading",
        ParamKind::Choice(SHADING_CHOICES.iter().map(|s| s.label()).collect()),
        move |scene, _| {
            let shading = scene.material(shared)?.shading;
            let index = SHADING_CHOICES
                .iter()
                .position(|s| *s == shading)
                .unwrap_or(0);
            Some(ParamValue::Choice(index))
        },
        move |ctx, value| match (ctx.scene.material_mut(shared), value) {
            (Some(m), ParamValue::Choice(index)) => {
                m.shading = SHADING_CHOICES[index];
                true
            }
            _ => false,
        },
    ));

    registry.push(ParamDescriptor::value(
        SPHERE_FOLDER,
        "opacity",
        ParamKind::Scalar(Constraint::stepped(0.0, 1.0, 0.01)),
        move |scene, _| {
            scene
                .material(sphere_material)
                .map(|m| ParamValue::Scalar(m.opacity))
        },
        move |ctx, value| match (ctx.scene.material_mut(sphere_material), value) {
            (Some(m), ParamValue::Scalar(v)) => {
                m.opacity = v;
                true
            }
            _ => false,
        },
    ));

    log::debug!("Bound {} parameters", registry.len());
    registry
}
