//! Time-based interpolation of node rotations
//!
//! A tween captures its start value on creation and writes the interpolated
//! value every [`Tweener::update`]. Overlapping tweens on the same field are
//! all stepped; the one updated last wins for that frame.

use std::collections::BTreeMap;

use crate::gfx::scene::{NodeId, Scene};

/// Easing curve applied to normalized progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Quadratic ease-in-out
    QuadInOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Rotation axis a tween drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

/// Cancellation token for a running tween
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

#[derive(Debug, Clone)]
struct Tween {
    node: NodeId,
    axis: RotationAxis,
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    ease: Ease,
}

impl Tween {
    fn value(&self) -> f32 {
        let progress = if self.duration > 0.0 {
            self.elapsed / self.duration
        } else {
            1.0
        };
        self.from + (self.to - self.from) * self.ease.apply(progress)
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[derive(Debug, Default)]
pub struct Tweener {
    tweens: BTreeMap<TweenHandle, Tween>,
    next_handle: u64,
}

impl Tweener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animates `node`'s rotation about `axis` by `delta` radians over `duration` seconds.
    ///
    /// Returns `None` if the node does not exist.
    pub fn rotate_by(
        &mut self,
        scene: &Scene,
        node: NodeId,
        axis: RotationAxis,
        delta: f32,
        duration: f32,
        ease: Ease,
    ) -> Option<TweenHandle> {
        let rotation = scene.node(node)?.transform.rotation;
        let from = match axis {
            RotationAxis::X => rotation.x,
            RotationAxis::Y => rotation.y,
            RotationAxis::Z => rotation.z,
        };

        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        self.tweens.insert(
            handle,
            Tween {
                node,
                axis,
                from,
                to: from + delta,
                duration: duration.max(0.0),
                elapsed: 0.0,
                ease,
            },
        );
        log::debug!("Tween {handle:?} on {node:?}: {delta} rad over {duration}s");
        Some(handle)
    }

    /// Advances every tween by `dt` seconds and writes the results into `scene`.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.tweens.retain(|_, tween| {
            tween.elapsed = (tween.elapsed + dt).min(tween.duration);
            let Some(node) = scene.node_mut(tween.node) else {
                return false;
            };
            let value = tween.value();
            match tween.axis {
                RotationAxis::X => node.transform.rotation.x = value,
                RotationAxis::Y => node.transform.rotation.y = value,
                RotationAxis::Z => node.transform.rotation.z = value,
            }
            !tween.is_finished()
        });
    }

    /// Stops a tween where it is; returns false if it already finished
    pub fn cancel(&mut self, handle: TweenHandle) -> bool {
        self.tweens.remove(&handle).is_some()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.tweens.len();
        self.tweens.clear();
        count
    }

    pub fn is_active(&self, handle: TweenHandle) -> bool {
        self.tweens.contains_key(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::gfx::camera::PerspectiveCamera;
    use crate::gfx::geometry::GeometryDesc;
    use crate::gfx::resources::material::Material;
    use cgmath::Vector3;
    use std::f32::consts::TAU;

    fn scene_with_node() -> (Scene, NodeId) {
        let mut scene = Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 1.0));
        let geometry = scene.add_geometry(GeometryDesc::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        });
        let material = scene.add_material(Material::physical("m"));
        let node = scene.add_node("cube", geometry, material, Vector3::new(0.0, 0.0, 0.0));
        (scene, node)
    }

    fn rotation_y(scene: &Scene, node: NodeId) -> f32 {
        scene.node(node).unwrap().transform.rotation.y
    }

    #[test]
    fn test_quad_in_out_curve() {
        assert_eq!(Ease::QuadInOut.apply(0.0), 0.0);
        assert_eq!(Ease::QuadInOut.apply(0.25), 0.125);
        assert_eq!(Ease::QuadInOut.apply(0.5), 0.5);
        assert_eq!(Ease::QuadInOut.apply(0.75), 0.875);
        assert_eq!(Ease::QuadInOut.apply(1.0), 1.0);
        assert_eq!(Ease::QuadInOut.apply(2.0), 1.0);
    }

    #[test]
    fn test_full_turn_lands_exactly() {
        let (mut scene, node) = scene_with_node();
        let mut tweener = Tweener::new();
        let handle = tweener
            .rotate_by(&scene, node, RotationAxis::Y, TAU, 2.0, Ease::QuadInOut)
            .unwrap();

        tweener.update(1.0, &mut scene);
        assert!((rotation_y(&scene, node) - TAU / 2.0).abs() < 1e-5);
        assert!(tweener.is_active(handle));

        tweener.update(5.0, &mut scene);
        assert_eq!(rotation_y(&scene, node), TAU);
        assert!(!tweener.is_active(handle));
    }

    #[test]
    fn test_cancel_freezes_rotation() {
        let (mut scene, node) = scene_with_node();
        let mut tweener = Tweener::new();
        let handle = tweener
            .rotate_by(&scene, node, RotationAxis::Y, TAU, 4.0, Ease::Linear)
            .unwrap();
        tweener.update(1.0, &mut scene);
        let frozen = rotation_y(&scene, node);

        assert!(tweener.cancel(handle));
        tweener.update(1.0, &mut scene);
        assert_eq!(rotation_y(&scene, node), frozen);
        assert!(!tweener.cancel(handle));
    }

    #[test]
    fn test_missing_node_yields_no_tween() {
        let (scene, _) = scene_with_node();
        let mut tweener = Tweener::new();
        let missing = NodeId(99);
        assert!(tweener
            .rotate_by(&scene, missing, RotationAxis::Y, 1.0, 1.0, Ease::Linear)
            .is_none());
    }

    #[test]
    fn test_cancel_all_counts_running() {
        let (scene, node) = scene_with_node();
        let mut tweener = Tweener::new();
        for _ in 0..3 {
            tweener.rotate_by(&scene, node, RotationAxis::Y, 1.0, 1.0, Ease::Linear);
        }
        assert_eq!(tweener.cancel_all(), 3);
        assert_eq!(tweener.active_count(), 0);
    }
}
