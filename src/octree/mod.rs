//! Octree spatial index and Barnes-Hut gravity aggregator.
//!
//! Bodies are indexed by bounding sphere: a body is recorded in every node
//! whose AABB overlaps the sphere, so a body straddling a split plane
//! appears in multiple children and queries can return duplicates;
//! callers deduplicate by id. Every node carries the total mass and
//! center of mass of its subtree, which is what the Barnes-Hut traversal
//! approximates far nodes with.
//!
//! One reader-writer lock at the root covers the whole tree: `insert`,
//! `remove`, `update`, and `clear` take the writer side; `query`,
//! `query_sphere`, and `calculate_gravity` the reader side.

use std::sync::{Arc, RwLock};

use ahash::{AHashMap, AHashSet};
use glam::DVec3;

use crate::body::{Body, BodyHandle, BodyId};
use crate::error::SimulationError;
use crate::forces::gravity::{G, MIN_DISTANCE_SQ};
use crate::math::Aabb;
use crate::pool::WorkPool;

/// Default direct-body capacity of a leaf before it splits.
pub const DEFAULT_MAX_BODIES_PER_LEAF: usize = 10;
/// Default division limit; guards against unbounded splitting for bodies
/// with close or identical positions.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Per-body payload cached in a leaf at placement time.
#[derive(Clone)]
struct NodeEntry {
    id: BodyId,
    position: DVec3,
    radius: f64,
    mass: f64,
    handle: BodyHandle,
}

impl NodeEntry {
    fn snapshot(handle: &BodyHandle) -> Self {
        let body = handle.read().expect("body lock poisoned");
        Self {
            id: body.id(),
            position: body.position(),
            radius: body.radius(),
            mass: body.mass(),
            handle: Arc::clone(handle),
        }
    }
}

/// Sphere recorded at placement time; removal descends with these values
/// even after the live body has moved.
#[derive(Clone, Copy)]
struct Placement {
    position: DVec3,
    radius: f64,
}

struct OctreeNode {
    bounds: Aabb,
    level: usize,
    bodies: Vec<NodeEntry>,
    children: Option<Box<[OctreeNode; 8]>>,
    total_mass: f64,
    center_of_mass: DVec3,
}

impl OctreeNode {
    fn new(bounds: Aabb, level: usize) -> Self {
        Self {
            bounds,
            level,
            bodies: Vec::new(),
            children: None,
            total_mass: 0.0,
            center_of_mass: DVec3::ZERO,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn insert(&mut self, entry: &NodeEntry, max_bodies: usize, max_depth: usize) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains_sphere(entry.position, entry.radius) {
                    child.insert(entry, max_bodies, max_depth);
                }
            }
            self.refresh_from_children();
        } else {
            self.bodies.push(entry.clone());
            if self.bodies.len() > max_bodies && self.level < max_depth {
                self.split(max_bodies, max_depth);
            } else {
                self.refresh_from_bodies();
            }
        }
    }

    /// Leaf overflow: create the 8 children, redistribute the direct
    /// bodies by the same octant-overlap test, clear the direct list.
    /// There is no reverse transition; internals stay split until `clear`.
    fn split(&mut self, max_bodies: usize, max_depth: usize) {
        let mut children = Box::new(
            self.bounds
                .octants()
                .map(|bounds| OctreeNode::new(bounds, self.level + 1)),
        );
        for entry in self.bodies.drain(..) {
            for child in children.iter_mut() {
                if child.bounds.contains_sphere(entry.position, entry.radius) {
                    child.insert(&entry, max_bodies, max_depth);
                }
            }
        }
        self.children = Some(children);
        self.refresh_from_children();
    }

    fn remove(&mut self, id: BodyId, position: DVec3, radius: f64) -> bool {
        let mut removed = false;
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains_sphere(position, radius) {
                    removed |= child.remove(id, position, radius);
                }
            }
            if removed {
                self.refresh_from_children();
            }
        } else {
            let before = self.bodies.len();
            self.bodies.retain(|entry| entry.id != id);
            removed = self.bodies.len() != before;
            if removed {
                self.refresh_from_bodies();
            }
        }
        removed
    }

    fn refresh_from_bodies(&mut self) {
        let mut mass = 0.0;
        let mut weighted = DVec3::ZERO;
        for entry in &self.bodies {
            mass += entry.mass;
            weighted += entry.position * entry.mass;
        }
        self.total_mass = mass;
        self.center_of_mass = if mass > 0.0 { weighted / mass } else { DVec3::ZERO };
    }

    fn refresh_from_children(&mut self) {
        let Some(children) = self.children.as_ref() else {
            return;
        };
        let mut mass = 0.0;
        let mut weighted = DVec3::ZERO;
        for child in children.iter() {
            mass += child.total_mass;
            weighted += child.center_of_mass * child.total_mass;
        }
        self.total_mass = mass;
        self.center_of_mass = if mass > 0.0 { weighted / mass } else { DVec3::ZERO };
    }

    fn query(&self, region: &Aabb, out: &mut Vec<BodyHandle>) {
        if !self.bounds.intersects(region) {
            return;
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query(region, out);
            }
        } else {
            out.extend(self.bodies.iter().map(|entry| Arc::clone(&entry.handle)));
        }
    }

    fn query_sphere(&self, center: DVec3, radius: f64, out: &mut Vec<BodyHandle>) {
        if !self.bounds.contains_sphere(center, radius) {
            return;
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_sphere(center, radius, out);
            }
        } else {
            out.extend(self.bodies.iter().map(|entry| Arc::clone(&entry.handle)));
        }
    }

    fn accumulate_gravity(
        &self,
        id: BodyId,
        position: DVec3,
        mass: f64,
        theta: f64,
        force: &mut DVec3,
        visited: &mut AHashSet<BodyId>,
    ) {
        if self.is_leaf() || self.total_mass == 0.0 {
            for entry in &self.bodies {
                // Skip the target itself and entries already accumulated
                // through another straddled leaf.
                if entry.id == id || !visited.insert(entry.id) {
                    continue;
                }
                *force += pair_force(position, mass, entry.position, entry.mass);
            }
            return;
        }

        let width = self.bounds.max.x - self.bounds.min.x;
        let delta = self.center_of_mass - position;
        let distance_sq = delta.length_squared();
        if distance_sq < MIN_DISTANCE_SQ {
            return;
        }
        if width * width < theta * theta * distance_sq {
            // Far enough: the whole subtree acts as one virtual particle
            // at its center of mass.
            *force += pair_force(position, mass, self.center_of_mass, self.total_mass);
        } else if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.total_mass > 0.0 {
                    child.accumulate_gravity(id, position, mass, theta, force, visited);
                }
            }
        }
    }

    fn collect_bounds(&self, out: &mut Vec<Aabb>, depth: usize, max_depth: Option<usize>) {
        if let Some(limit) = max_depth {
            if depth > limit {
                return;
            }
        }
        out.push(self.bounds);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_bounds(out, depth + 1, max_depth);
            }
        }
    }
}

/// Newton pair force on the body at `position` from a source particle.
/// Near-zero separations short-circuit to zero force (silent guard).
fn pair_force(position: DVec3, mass: f64, source_position: DVec3, source_mass: f64) -> DVec3 {
    let delta = source_position - position;
    let distance_sq = delta.length_squared();
    if distance_sq < MIN_DISTANCE_SQ {
        return DVec3::ZERO;
    }
    let distance = distance_sq.sqrt();
    delta * (G * mass * source_mass / (distance_sq * distance))
}

struct OctreeInner {
    root: OctreeNode,
    placements: AHashMap<BodyId, Placement>,
}

/// The spatial index owned by the world.
pub struct Octree {
    inner: RwLock<OctreeInner>,
    bounds: Aabb,
    max_bodies_per_leaf: usize,
    max_depth: usize,
}

impl Octree {
    pub fn new(bounds: Aabb) -> Self {
        Self::with_limits(bounds, DEFAULT_MAX_BODIES_PER_LEAF, DEFAULT_MAX_DEPTH)
    }

    pub fn with_limits(bounds: Aabb, max_bodies_per_leaf: usize, max_depth: usize) -> Self {
        Self {
            inner: RwLock::new(OctreeInner {
                root: OctreeNode::new(bounds, 0),
                placements: AHashMap::new(),
            }),
            bounds,
            max_bodies_per_leaf: max_bodies_per_leaf.max(1),
            max_depth: max_depth.max(1),
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn max_bodies_per_leaf(&self) -> usize {
        self.max_bodies_per_leaf
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of bodies currently tracked by the index.
    pub fn body_count(&self) -> usize {
        self.inner.read().expect("octree lock poisoned").placements.len()
    }

    /// Index a body by its current bounding sphere. A body entirely
    /// outside the root bounds stays tracked but unplaced until an update
    /// brings it back inside. The caller must not hold a lock on the body.
    pub fn insert(&self, body: &BodyHandle) {
        let entry = NodeEntry::snapshot(body);
        let mut inner = self.inner.write().expect("octree lock poisoned");
        inner.placements.insert(
            entry.id,
            Placement {
                position: entry.position,
                radius: entry.radius,
            },
        );
        if self.bounds.contains_sphere(entry.position, entry.radius) {
            inner
                .root
                .insert(&entry, self.max_bodies_per_leaf, self.max_depth);
        }
    }

    /// Remove a body from every octant it was placed in. Returns `false`
    /// when the body was never indexed.
    pub fn remove(&self, body: &BodyHandle) -> bool {
        let id = body.read().expect("body lock poisoned").id();
        self.remove_id(id)
    }

    pub fn remove_id(&self, id: BodyId) -> bool {
        let mut inner = self.inner.write().expect("octree lock poisoned");
        match inner.placements.remove(&id) {
            Some(placement) => {
                inner.root.remove(id, placement.position, placement.radius);
                true
            }
            None => false,
        }
    }

    /// Re-index a body after it moved: remove by the cached placement,
    /// insert by the live sphere, all under one writer acquisition so
    /// readers never observe the intermediate state.
    pub fn update(&self, body: &BodyHandle) {
        let entry = NodeEntry::snapshot(body);
        let mut inner = self.inner.write().expect("octree lock poisoned");
        if let Some(placement) = inner.placements.get(&entry.id).copied() {
            inner.root.remove(entry.id, placement.position, placement.radius);
        }
        inner.placements.insert(
            entry.id,
            Placement {
                position: entry.position,
                radius: entry.radius,
            },
        );
        if self.bounds.contains_sphere(entry.position, entry.radius) {
            inner
                .root
                .insert(&entry, self.max_bodies_per_leaf, self.max_depth);
        }
    }

    /// Schedule one `update` task per body on the pool and join. Each task
    /// takes the writer lock independently; mutations serialise through it.
    pub fn update_all(
        self: Arc<Self>,
        bodies: &[BodyHandle],
        pool: &WorkPool,
    ) -> Result<(), SimulationError> {
        for body in bodies {
            let octree = Arc::clone(&self);
            let body = Arc::clone(body);
            pool.submit(move || octree.update(&body))?;
        }
        pool.wait();
        Ok(())
    }

    /// Collect the bodies of every leaf reachable through nodes that
    /// intersect `region`. Duplicates are possible for straddling bodies;
    /// callers deduplicate by id.
    pub fn query(&self, region: &Aabb) -> Vec<BodyHandle> {
        let inner = self.inner.read().expect("octree lock poisoned");
        let mut out = Vec::new();
        inner.root.query(region, &mut out);
        out
    }

    /// As [`Octree::query`], pruning by sphere overlap instead.
    pub fn query_sphere(&self, center: DVec3, radius: f64) -> Vec<BodyHandle> {
        let inner = self.inner.read().expect("octree lock poisoned");
        let mut out = Vec::new();
        inner.root.query_sphere(center, radius, &mut out);
        out
    }

    /// Drop all bodies and children; reset aggregates and placements.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("octree lock poisoned");
        inner.root = OctreeNode::new(self.bounds, 0);
        inner.placements.clear();
    }

    /// Total gravitational force on `body` by Barnes-Hut traversal with
    /// opening angle `theta`. `theta = 0` degrades to direct summation.
    ///
    /// Pass a snapshot (clone) of the body rather than holding its lock.
    pub fn calculate_gravity(&self, body: &Body, theta: f64) -> DVec3 {
        let inner = self.inner.read().expect("octree lock poisoned");
        let mut force = DVec3::ZERO;
        let mut visited = AHashSet::new();
        inner.root.accumulate_gravity(
            body.id(),
            body.position(),
            body.mass(),
            theta,
            &mut force,
            &mut visited,
        );
        force
    }

    /// Bounds of every node down to `max_depth` (all of them when `None`),
    /// for structure overlays in external renderers.
    pub fn node_bounds(&self, max_depth: Option<usize>) -> Vec<Aabb> {
        let inner = self.inner.read().expect("octree lock poisoned");
        let mut out = Vec::new();
        inner.root.collect_bounds(&mut out, 0, max_depth);
        out
    }
}
