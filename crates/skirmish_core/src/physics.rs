//! Physics collaborator contract and a small deterministic reference world.
//!
//! Rigid-body integration, contact detection and raycasting belong to the
//! physics engine; gameplay only talks to it through [`PhysicsWorld`].
//! [`KinematicWorld`] implements the contract well enough for tests and the
//! headless runner: bodies move in straight lines with linear damping and
//! moving circles are swept against every other shape each step.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::geometry::Shape;
use crate::math::{Fixed, Vec2Fixed};

/// Opaque handle to a physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Integrated every step and swept for contacts.
    Dynamic,
    /// Never moves, physically solid.
    Static,
    /// Never moves, reports contacts but never physically responds.
    Sensor,
}

/// What gameplay object a body belongs to.
///
/// Attached at body creation so contacts and ray hits can be mapped back to
/// the registry without any side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyTag {
    /// The main body of a registered entity.
    Entity(EntityId),
    /// The shield sensor of the given building.
    Shield(EntityId),
}

/// Parameters for creating a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDesc {
    /// Owner tag.
    pub tag: BodyTag,
    /// Body kind.
    pub kind: BodyKind,
    /// Collision shape.
    pub shape: Shape,
    /// Initial position.
    pub position: Vec2Fixed,
    /// Initial velocity (units per tick).
    pub velocity: Vec2Fixed,
    /// Initial rotation (radians).
    pub rotation: Fixed,
    /// Fraction of velocity lost per tick, in `[0, 1]`.
    pub linear_damping: Fixed,
}

impl BodyDesc {
    /// Describe a body at rest.
    #[must_use]
    pub fn new(tag: BodyTag, kind: BodyKind, shape: Shape, position: Vec2Fixed) -> Self {
        Self {
            tag,
            kind,
            shape,
            position,
            velocity: Vec2Fixed::ZERO,
            rotation: Fixed::ZERO,
            linear_damping: Fixed::ZERO,
        }
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2Fixed) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Fixed) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set linear damping.
    #[must_use]
    pub fn with_damping(mut self, damping: Fixed) -> Self {
        self.linear_damping = damping;
        self
    }
}

/// One ray intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayHit {
    /// Body that was hit.
    pub body: BodyHandle,
    /// Owner tag of that body.
    pub tag: BodyTag,
    /// World-space hit point.
    pub point: Vec2Fixed,
    /// Distance from the ray origin.
    pub distance: Fixed,
}

/// A fine-grained contact between two bodies found during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// The body whose motion produced the contact.
    pub a: BodyHandle,
    /// The body it touched.
    pub b: BodyHandle,
    /// Owner tag of `a`.
    pub tag_a: BodyTag,
    /// Owner tag of `b`.
    pub tag_b: BodyTag,
    /// Position of `a` at the moment of contact.
    pub point: Vec2Fixed,
}

/// The physics engine as seen by gameplay code.
pub trait PhysicsWorld {
    /// Create a body and return its handle.
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Remove a body. Unknown handles are ignored.
    fn remove_body(&mut self, handle: BodyHandle);

    /// Owner tag of a body.
    fn tag(&self, handle: BodyHandle) -> Option<BodyTag>;

    /// Current position.
    fn position(&self, handle: BodyHandle) -> Option<Vec2Fixed>;

    /// Teleport a body.
    fn set_position(&mut self, handle: BodyHandle, position: Vec2Fixed);

    /// Current velocity.
    fn velocity(&self, handle: BodyHandle) -> Option<Vec2Fixed>;

    /// Set velocity.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2Fixed);

    /// Current rotation.
    fn rotation(&self, handle: BodyHandle) -> Option<Fixed>;

    /// Set rotation.
    fn set_rotation(&mut self, handle: BodyHandle, rotation: Fixed);

    /// Replace a body's collision shape.
    fn set_shape(&mut self, handle: BodyHandle, shape: Shape);

    /// Cast a ray and return every accepted hit ordered by distance.
    ///
    /// `direction` must be normalized. `filter` returns `true` for bodies
    /// the ray may hit.
    fn raycast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
        filter: &dyn Fn(BodyHandle, BodyTag) -> bool,
    ) -> Vec<RayHit>;

    /// Advance one tick.
    ///
    /// `resolver` is called once per contact and returns whether a physical
    /// collision response should be applied.
    fn step(&mut self, resolver: &mut dyn FnMut(&Contact) -> bool);
}

#[derive(Debug, Clone)]
struct Body {
    tag: BodyTag,
    kind: BodyKind,
    shape: Shape,
    position: Vec2Fixed,
    velocity: Vec2Fixed,
    rotation: Fixed,
    linear_damping: Fixed,
}

/// Deterministic straight-line physics world.
///
/// Bodies are stored in handle order and contacts are reported ordered by
/// sweep distance, then by handle, so identical inputs always produce
/// identical contact sequences.
#[derive(Debug, Clone, Default)]
pub struct KinematicWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u64,
}

impl KinematicWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Collision shape of a body.
    #[must_use]
    pub fn shape(&self, handle: BodyHandle) -> Option<&Shape> {
        self.bodies.get(&handle).map(|b| &b.shape)
    }
}

impl PhysicsWorld for KinematicWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle.max(1));
        self.next_handle = handle.0 + 1;
        self.bodies.insert(
            handle,
            Body {
                tag: desc.tag,
                kind: desc.kind,
                shape: desc.shape,
                position: desc.position,
                velocity: desc.velocity,
                rotation: desc.rotation,
                linear_damping: desc.linear_damping.clamp(Fixed::ZERO, Fixed::ONE),
            },
        );
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
    }

    fn tag(&self, handle: BodyHandle) -> Option<BodyTag> {
        self.bodies.get(&handle).map(|b| b.tag)
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2Fixed> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2Fixed) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2Fixed> {
        self.bodies.get(&handle).map(|b| b.velocity)
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2Fixed) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = velocity;
        }
    }

    fn rotation(&self, handle: BodyHandle) -> Option<Fixed> {
        self.bodies.get(&handle).map(|b| b.rotation)
    }

    fn set_rotation(&mut self, handle: BodyHandle, rotation: Fixed) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.rotation = rotation;
        }
    }

    fn set_shape(&mut self, handle: BodyHandle, shape: Shape) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.shape = shape;
        }
    }

    fn raycast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
        filter: &dyn Fn(BodyHandle, BodyTag) -> bool,
    ) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.kind != BodyKind::Sensor)
            .filter(|(&handle, body)| filter(handle, body.tag))
            .filter_map(|(&handle, body)| {
                let distance =
                    body.shape
                        .ray_intersection(body.position, origin, direction, max_distance)?;
                Some(RayHit {
                    body: handle,
                    tag: body.tag,
                    point: origin + direction.scale(distance),
                    distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.body.cmp(&b.body)));
        hits
    }

    fn step(&mut self, resolver: &mut dyn FnMut(&Contact) -> bool) {
        let movers: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.kind == BodyKind::Dynamic)
            .map(|(&handle, _)| handle)
            .collect();

        let mut reported: BTreeSet<(BodyHandle, BodyHandle)> = BTreeSet::new();

        for handle in movers {
            let Some(mover) = self.bodies.get(&handle) else {
                continue;
            };

            let velocity = mover.velocity.scale(Fixed::ONE - mover.linear_damping);
            let from = mover.position;
            let to = from + velocity;
            let radius = mover.shape.bounding_radius();
            let mover_tag = mover.tag;

            let mut touches: Vec<(Fixed, BodyHandle)> = self
                .bodies
                .iter()
                .filter(|(&other, _)| other != handle)
                .filter_map(|(&other, body)| {
                    let t = body.shape.sweep_circle(body.position, from, to, radius)?;
                    Some((t, other))
                })
                .collect();
            touches.sort();

            let mut final_position = to;
            let mut final_velocity = velocity;
            for (t, other) in touches {
                let pair = if handle < other {
                    (handle, other)
                } else {
                    (other, handle)
                };
                if !reported.insert(pair) {
                    continue;
                }
                let Some(other_body) = self.bodies.get(&other) else {
                    continue;
                };

                let contact = Contact {
                    a: handle,
                    b: other,
                    tag_a: mover_tag,
                    tag_b: other_body.tag,
                    point: from.lerp(to, t),
                };
                let respond = resolver(&contact);
                if respond && other_body.kind != BodyKind::Sensor {
                    final_position = contact.point;
                    final_velocity = Vec2Fixed::ZERO;
                    break;
                }
            }

            if let Some(mover) = self.bodies.get_mut(&handle) {
                mover.position = final_position;
                mover.velocity = final_velocity;
            }
        }
    }
}
