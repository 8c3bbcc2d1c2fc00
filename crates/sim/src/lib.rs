//! Peerball Simulation Core
//!
//! This crate contains one endpoint's local game simulation: a small 2D
//! rigid-body world holding two players and a ball on a walled field, the
//! per-endpoint Body State Store, and the Scoring Monitor.
//!
//! # Architecture Constraints
//!
//! The Simulation Core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Log
//!
//! Time enters only through the configured tick rate. Everything that talks
//! to a peer lives in `peerball-peer`; the wire schema lives in
//! `peerball-wire`.

#![deny(unsafe_code)]

pub mod scoring;
pub mod store;

use std::fmt;
use std::str::FromStr;

pub use scoring::{GoalEvent, MonitorState, Score, ScoringMonitor};
pub use store::{BodyStateStore, BodyUpdate};

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation timestep.
pub type Tick = u64;

/// A 2D vector `[x, y]` in field units (or field units per second).
pub type Vec2 = [f64; 2];

// ============================================================================
// Field Geometry (Normative)
// ============================================================================

pub const FIELD_WIDTH: f64 = 800.0;
pub const FIELD_HEIGHT: f64 = 600.0;

/// Thickness of the four boundary walls, centered on the field edges.
pub const WALL_THICKNESS: f64 = 50.0;

/// Side length of a player square.
pub const PLAYER_SIZE: f64 = 40.0;

pub const BALL_RADIUS: f64 = 20.0;

/// Goal sensor size `[width, height]`.
pub const GOAL_SIZE: Vec2 = [20.0, 100.0];

pub const GOAL1_CENTER: Vec2 = [50.0, 300.0];
pub const GOAL2_CENTER: Vec2 = [750.0, 300.0];

pub const PLAYER1_KICKOFF: Vec2 = [200.0, 300.0];
pub const PLAYER2_KICKOFF: Vec2 = [600.0, 300.0];
pub const BALL_KICKOFF: Vec2 = [400.0, 300.0];

// ============================================================================
// Material Constants
// ============================================================================

/// Mass per unit area.
pub const DENSITY: f64 = 0.001;

/// Fraction of velocity lost per reference tick (1/60 s).
pub const AIR_FRICTION: f64 = 0.1;

pub const PLAYER_RESTITUTION: f64 = 0.0;
pub const BALL_RESTITUTION: f64 = 0.8;

/// Rate at which `AIR_FRICTION` is defined; damping is rescaled for other rates.
pub const REFERENCE_TICK_RATE_HZ: f64 = 60.0;

/// Contact resolution passes per step.
const SOLVER_PASSES: usize = 2;

// ============================================================================
// Names
// ============================================================================

/// Error parsing a body label or goal name received from outside the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("unknown body label `{0}`")]
    UnknownLabel(String),
    #[error("unknown goal `{0}`")]
    UnknownGoal(String),
}

/// Identity of a simulated body. Labels are the only identity a body has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Player1,
    Player2,
    Ball,
}

impl Label {
    /// Every label, in canonical order.
    pub const ALL: [Label; 3] = [Label::Player1, Label::Player2, Label::Ball];

    /// Dense index used for fixed-size per-body storage.
    pub const fn index(self) -> usize {
        match self {
            Self::Player1 => 0,
            Self::Player2 => 1,
            Self::Ball => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
            Self::Ball => "ball",
        }
    }

    /// Canonical kickoff position.
    pub const fn kickoff(self) -> Vec2 {
        match self {
            Self::Player1 => PLAYER1_KICKOFF,
            Self::Player2 => PLAYER2_KICKOFF,
            Self::Ball => BALL_KICKOFF,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player1" => Ok(Self::Player1),
            "player2" => Ok(Self::Player2),
            "ball" => Ok(Self::Ball),
            other => Err(NameError::UnknownLabel(other.to_string())),
        }
    }
}

/// One of the two static goal sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    /// Left goal, defended by player1.
    Goal1,
    /// Right goal, defended by player2.
    Goal2,
}

impl Goal {
    pub const ALL: [Goal; 2] = [Goal::Goal1, Goal::Goal2];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goal1 => "goal1",
            Self::Goal2 => "goal2",
        }
    }

    pub const fn center(self) -> Vec2 {
        match self {
            Self::Goal1 => GOAL1_CENTER,
            Self::Goal2 => GOAL2_CENTER,
        }
    }

    /// The player credited when the ball enters this goal.
    pub const fn scorer(self) -> Label {
        match self {
            Self::Goal1 => Label::Player2,
            Self::Goal2 => Label::Player1,
        }
    }

    pub fn bounds(self) -> Bounds {
        Bounds::from_center(self.center(), [GOAL_SIZE[0] / 2.0, GOAL_SIZE[1] / 2.0])
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal1" => Ok(Self::Goal1),
            "goal2" => Ok(Self::Goal2),
            other => Err(NameError::UnknownGoal(other.to_string())),
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned bounding region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: [center[0] - half_extents[0], center[1] - half_extents[1]],
            max: [center[0] + half_extents[0], center[1] + half_extents[1]],
        }
    }

    /// Overlap test; touching edges count as overlapping.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }
}

/// Collision shape, centered on the body position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect { half_extents: Vec2 },
    Circle { radius: f64 },
}

impl Shape {
    fn area(&self) -> f64 {
        match *self {
            Self::Rect { half_extents } => 4.0 * half_extents[0] * half_extents[1],
            Self::Circle { radius } => std::f64::consts::PI * radius * radius,
        }
    }

    fn bounds_at(&self, center: Vec2) -> Bounds {
        match *self {
            Self::Rect { half_extents } => Bounds::from_center(center, half_extents),
            Self::Circle { radius } => Bounds::from_center(center, [radius, radius]),
        }
    }
}

// ============================================================================
// Step Input
// ============================================================================

/// Force applied to a body for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepForce {
    pub label: Label,
    pub force: Vec2,
}

// ============================================================================
// Bodies
// ============================================================================

#[derive(Debug, Clone)]
struct Body {
    label: Label,
    shape: Shape,
    position: Vec2,
    velocity: Vec2,
    /// Force accumulated since the last step.
    force: Vec2,
    inverse_mass: f64,
    restitution: f64,
}

impl Body {
    fn new(label: Label) -> Self {
        let (shape, restitution) = match label {
            Label::Player1 | Label::Player2 => (
                Shape::Rect {
                    half_extents: [PLAYER_SIZE / 2.0, PLAYER_SIZE / 2.0],
                },
                PLAYER_RESTITUTION,
            ),
            Label::Ball => (
                Shape::Circle {
                    radius: BALL_RADIUS,
                },
                BALL_RESTITUTION,
            ),
        };
        let mass = DENSITY * shape.area();

        Self {
            label,
            shape,
            position: label.kickoff(),
            velocity: [0.0, 0.0],
            force: [0.0, 0.0],
            inverse_mass: 1.0 / mass,
            restitution,
        }
    }
}

/// Immovable boundary wall.
#[derive(Debug, Clone)]
struct Wall {
    shape: Shape,
    position: Vec2,
}

impl Wall {
    fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            shape: Shape::Rect {
                half_extents: [size[0] / 2.0, size[1] / 2.0],
            },
            position: center,
        }
    }
}

fn standard_walls() -> Vec<Wall> {
    vec![
        Wall::new([FIELD_WIDTH / 2.0, 0.0], [FIELD_WIDTH, WALL_THICKNESS]),
        Wall::new([FIELD_WIDTH / 2.0, FIELD_HEIGHT], [FIELD_WIDTH, WALL_THICKNESS]),
        Wall::new([FIELD_WIDTH, FIELD_HEIGHT / 2.0], [WALL_THICKNESS, FIELD_HEIGHT]),
        Wall::new([0.0, FIELD_HEIGHT / 2.0], [WALL_THICKNESS, FIELD_HEIGHT]),
    ]
}

// ============================================================================
// World Implementation
// ============================================================================

/// One endpoint's physics world.
///
/// Gravity is disabled. The world always holds exactly one body per
/// [`Label`], four static walls and two goal sensors. Goals never collide;
/// they are only tested for overlap with [`World::ball_overlaps`].
#[derive(Debug, Clone)]
pub struct World {
    tick: Tick,
    tick_rate_hz: u32,
    dt_seconds: f64,
    /// Velocity multiplier applied once per step.
    damping: f64,
    /// Indexed by `Label::index()`.
    bodies: [Body; 3],
    walls: Vec<Wall>,
}

impl World {
    /// Create a world at tick 0 with every body at its kickoff position.
    ///
    /// # Panics
    /// If `tick_rate_hz` is zero.
    pub fn new(tick_rate_hz: u32) -> Self {
        assert!(tick_rate_hz > 0, "tick_rate_hz must be positive");

        let dt_seconds = 1.0 / f64::from(tick_rate_hz);
        Self {
            tick: 0,
            tick_rate_hz,
            dt_seconds,
            damping: (1.0 - AIR_FRICTION).powf(dt_seconds * REFERENCE_TICK_RATE_HZ),
            bodies: Label::ALL.map(Body::new),
            walls: standard_walls(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_seconds
    }

    pub fn position(&self, label: Label) -> Vec2 {
        self.bodies[label.index()].position
    }

    pub fn velocity(&self, label: Label) -> Vec2 {
        self.bodies[label.index()].velocity
    }

    /// Mass of a body, derived from its shape and `DENSITY`.
    pub fn mass(&self, label: Label) -> f64 {
        1.0 / self.bodies[label.index()].inverse_mass
    }

    pub fn bounds(&self, label: Label) -> Bounds {
        let body = &self.bodies[label.index()];
        body.shape.bounds_at(body.position)
    }

    /// Accumulate a force on a body; consumed by the next step.
    pub fn apply_force(&mut self, label: Label, force: Vec2) {
        let body = &mut self.bodies[label.index()];
        body.force = add(body.force, force);
    }

    /// Teleport a body. Velocity is preserved.
    pub fn set_position(&mut self, label: Label, position: Vec2) {
        self.bodies[label.index()].position = position;
    }

    pub fn set_velocity(&mut self, label: Label, velocity: Vec2) {
        self.bodies[label.index()].velocity = velocity;
    }

    /// Return every body to its kickoff position at rest, discarding any
    /// pending forces.
    pub fn reset_kickoff(&mut self) {
        for body in &mut self.bodies {
            body.position = body.label.kickoff();
            body.velocity = [0.0, 0.0];
            body.force = [0.0, 0.0];
        }
    }

    /// Bounding-region overlap between the ball and a goal sensor.
    pub fn ball_overlaps(&self, goal: Goal) -> bool {
        self.bounds(Label::Ball).overlaps(&goal.bounds())
    }

    /// Current positions of every body.
    pub fn body_state(&self) -> BodyStateStore {
        BodyStateStore::from_positions(
            self.position(Label::Player1),
            self.position(Label::Player2),
            self.position(Label::Ball),
        )
    }

    /// Advance simulation from tick T to T+1.
    ///
    /// `forces` are added to whatever was accumulated through
    /// [`World::apply_force`] and consumed by this step.
    ///
    /// # Panics
    /// If `tick != self.tick()`.
    pub fn advance(&mut self, tick: Tick, forces: &[StepForce]) {
        assert_eq!(
            tick, self.tick,
            "advance() tick mismatch: expected {}, got {}",
            self.tick, tick
        );

        for step_force in forces {
            self.apply_force(step_force.label, step_force.force);
        }

        self.integrate();
        for _ in 0..SOLVER_PASSES {
            self.resolve_body_contacts();
            self.resolve_wall_contacts();
        }

        self.tick += 1;
    }

    // ========================================================================
    // Internal Methods
    // ========================================================================

    /// Semi-implicit Euler with air friction.
    fn integrate(&mut self) {
        let dt = self.dt_seconds;
        for body in &mut self.bodies {
            let acceleration = scale(body.force, body.inverse_mass);
            body.velocity = scale(add(body.velocity, scale(acceleration, dt)), self.damping);
            body.position = add(body.position, scale(body.velocity, dt));
            body.force = [0.0, 0.0];
        }
    }

    fn resolve_body_contacts(&mut self) {
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let (left, right) = self.bodies.split_at_mut(j);
            resolve_pair(&mut left[i], &mut right[0]);
        }
    }

    fn resolve_wall_contacts(&mut self) {
        for body in &mut self.bodies {
            for wall in &self.walls {
                let Some(c) = contact(body.shape, body.position, wall.shape, wall.position) else {
                    continue;
                };
                body.position = sub(body.position, scale(c.normal, c.depth));

                // Walls have zero restitution; the body's own value wins.
                let approach = dot(body.velocity, c.normal);
                if approach > 0.0 {
                    let impulse = (1.0 + body.restitution) * approach;
                    body.velocity = sub(body.velocity, scale(c.normal, impulse));
                }
            }
        }
    }
}

// ============================================================================
// Contacts
// ============================================================================

/// Penetration between two shapes. `normal` points from the first shape
/// toward the second.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Contact {
    normal: Vec2,
    depth: f64,
}

fn contact(shape_a: Shape, pos_a: Vec2, shape_b: Shape, pos_b: Vec2) -> Option<Contact> {
    match (shape_a, shape_b) {
        (Shape::Rect { half_extents: ha }, Shape::Rect { half_extents: hb }) => {
            box_box(pos_a, ha, pos_b, hb)
        }
        (Shape::Circle { radius }, Shape::Rect { half_extents }) => {
            circle_box(pos_a, radius, pos_b, half_extents)
        }
        (Shape::Rect { half_extents }, Shape::Circle { radius }) => {
            circle_box(pos_b, radius, pos_a, half_extents).map(|c| Contact {
                normal: scale(c.normal, -1.0),
                depth: c.depth,
            })
        }
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pos_a, ra, pos_b, rb)
        }
    }
}

fn box_box(pos_a: Vec2, half_a: Vec2, pos_b: Vec2, half_b: Vec2) -> Option<Contact> {
    let d = sub(pos_b, pos_a);
    let overlap_x = half_a[0] + half_b[0] - d[0].abs();
    let overlap_y = half_a[1] + half_b[1] - d[1].abs();
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }

    // Separate along the axis of least penetration.
    if overlap_x < overlap_y {
        Some(Contact {
            normal: [sign(d[0]), 0.0],
            depth: overlap_x,
        })
    } else {
        Some(Contact {
            normal: [0.0, sign(d[1])],
            depth: overlap_y,
        })
    }
}

fn circle_box(center: Vec2, radius: f64, box_pos: Vec2, half: Vec2) -> Option<Contact> {
    let closest = [
        center[0].clamp(box_pos[0] - half[0], box_pos[0] + half[0]),
        center[1].clamp(box_pos[1] - half[1], box_pos[1] + half[1]),
    ];
    let d = sub(closest, center);
    let dist_sq = dot(d, d);

    if dist_sq == 0.0 {
        // Center inside the box: treat the circle as its bounding square.
        return box_box(center, [radius, radius], box_pos, half);
    }
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    Some(Contact {
        normal: scale(d, 1.0 / dist),
        depth: radius - dist,
    })
}

fn circle_circle(pos_a: Vec2, radius_a: f64, pos_b: Vec2, radius_b: f64) -> Option<Contact> {
    let d = sub(pos_b, pos_a);
    let dist_sq = dot(d, d);
    let reach = radius_a + radius_b;
    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist == 0.0 {
        [1.0, 0.0]
    } else {
        scale(d, 1.0 / dist)
    };
    Some(Contact {
        normal,
        depth: reach - dist,
    })
}

/// Positional correction weighted by inverse mass, then a normal impulse
/// using the larger restitution of the pair.
fn resolve_pair(a: &mut Body, b: &mut Body) {
    let Some(c) = contact(a.shape, a.position, b.shape, b.position) else {
        return;
    };
    let inverse_sum = a.inverse_mass + b.inverse_mass;
    if inverse_sum == 0.0 {
        return;
    }

    let correction = scale(c.normal, c.depth / inverse_sum);
    a.position = sub(a.position, scale(correction, a.inverse_mass));
    b.position = add(b.position, scale(correction, b.inverse_mass));

    let closing = dot(sub(b.velocity, a.velocity), c.normal);
    if closing < 0.0 {
        let restitution = a.restitution.max(b.restitution);
        let impulse = -(1.0 + restitution) * closing / inverse_sum;
        a.velocity = sub(a.velocity, scale(c.normal, impulse * a.inverse_mass));
        b.velocity = add(b.velocity, scale(c.normal, impulse * b.inverse_mass));
    }
}

// ============================================================================
// Vector Helpers
// ============================================================================

fn add(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] + b[0], a[1] + b[1]]
}

fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

fn scale(v: Vec2, s: f64) -> Vec2 {
    [v[0] * s, v[1] * s]
}

fn dot(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

fn sign(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_RATE_HZ: u32 = 60;

    fn run(world: &mut World, ticks: u64) {
        for _ in 0..ticks {
            let tick = world.tick();
            world.advance(tick, &[]);
        }
    }

    // ========================================================================
    // World API Tests
    // ========================================================================

    #[test]
    fn test_world_new_starts_at_kickoff() {
        let world = World::new(TICK_RATE_HZ);
        assert_eq!(world.tick(), 0);
        for label in Label::ALL {
            assert_eq!(world.position(label), label.kickoff());
            assert_eq!(world.velocity(label), [0.0, 0.0]);
        }
    }

    #[test]
    fn test_world_tick_rate() {
        let world = World::new(60);
        assert_eq!(world.tick_rate_hz(), 60);
        assert_eq!(world.dt_seconds(), 1.0 / 60.0);

        let world2 = World::new(30);
        assert_eq!(world2.tick_rate_hz(), 30);
    }

    #[test]
    #[should_panic(expected = "tick_rate_hz must be positive")]
    fn test_world_rejects_zero_tick_rate() {
        World::new(0);
    }

    #[test]
    fn test_advance_increments_tick() {
        let mut world = World::new(TICK_RATE_HZ);

        world.advance(0, &[]);
        assert_eq!(world.tick(), 1);

        world.advance(1, &[]);
        assert_eq!(world.tick(), 2);
    }

    #[test]
    #[should_panic(expected = "advance() tick mismatch")]
    fn test_advance_panics_on_tick_mismatch() {
        let mut world = World::new(TICK_RATE_HZ);
        world.advance(5, &[]);
    }

    #[test]
    fn test_world_at_rest_stays_at_rest() {
        let mut world = World::new(TICK_RATE_HZ);
        run(&mut world, 120);
        for label in Label::ALL {
            assert_eq!(world.position(label), label.kickoff());
        }
    }

    // ========================================================================
    // Forces and Integration
    // ========================================================================

    /// One tick of force moves the body by a non-zero amount bounded by
    /// `F / m * dt^2`.
    #[test]
    fn test_force_moves_player_bounded_amount() {
        const FORCE: f64 = 1000.0;
        let mut world = World::new(TICK_RATE_HZ);
        let mass = world.mass(Label::Player1);
        let dt = world.dt_seconds();

        world.advance(
            0,
            &[StepForce {
                label: Label::Player1,
                force: [FORCE, 0.0],
            }],
        );

        let moved = world.position(Label::Player1)[0] - PLAYER1_KICKOFF[0];
        assert!(moved > 0.0, "player did not move");
        assert!(moved <= FORCE / mass * dt * dt, "moved too far: {moved}");
        assert_eq!(world.position(Label::Player1)[1], PLAYER1_KICKOFF[1]);

        // Nothing else is touched by the force.
        assert_eq!(world.position(Label::Player2), PLAYER2_KICKOFF);
        assert_eq!(world.position(Label::Ball), BALL_KICKOFF);
    }

    #[test]
    fn test_displacement_proportional_to_force() {
        fn displacement(force: f64) -> f64 {
            let mut world = World::new(TICK_RATE_HZ);
            world.apply_force(Label::Player2, [0.0, -force]);
            world.advance(0, &[]);
            PLAYER2_KICKOFF[1] - world.position(Label::Player2)[1]
        }

        let single = displacement(500.0);
        let double = displacement(1000.0);
        assert!((double - 2.0 * single).abs() < 1e-9);
    }

    #[test]
    fn test_forces_consumed_by_step() {
        let mut world = World::new(TICK_RATE_HZ);
        world.apply_force(Label::Player1, [1000.0, 0.0]);
        world.advance(0, &[]);
        let speed_after_push = world.velocity(Label::Player1)[0];

        world.advance(1, &[]);
        // No new force: air friction only slows the body down.
        let speed_next = world.velocity(Label::Player1)[0];
        assert!(speed_next < speed_after_push);
        assert!((speed_next - speed_after_push * (1.0 - AIR_FRICTION)).abs() < 1e-9);
    }

    #[test]
    fn test_air_friction_rescaled_for_tick_rate() {
        let mut fast = World::new(60);
        let mut slow = World::new(30);
        fast.set_velocity(Label::Ball, [100.0, 0.0]);
        slow.set_velocity(Label::Ball, [100.0, 0.0]);

        run(&mut fast, 2);
        run(&mut slow, 1);

        // Same elapsed time, same decay.
        assert!((fast.velocity(Label::Ball)[0] - slow.velocity(Label::Ball)[0]).abs() < 1e-9);
    }

    #[test]
    fn test_set_position_preserves_velocity() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_velocity(Label::Ball, [30.0, -10.0]);
        world.set_position(Label::Ball, [420.0, 310.0]);

        assert_eq!(world.position(Label::Ball), [420.0, 310.0]);
        assert_eq!(world.velocity(Label::Ball), [30.0, -10.0]);
    }

    #[test]
    fn test_reset_kickoff() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_position(Label::Ball, [700.0, 100.0]);
        world.set_velocity(Label::Ball, [50.0, 50.0]);
        world.set_velocity(Label::Player1, [-20.0, 0.0]);
        world.apply_force(Label::Player2, [1000.0, 0.0]);

        world.reset_kickoff();
        for label in Label::ALL {
            assert_eq!(world.position(label), label.kickoff());
            assert_eq!(world.velocity(label), [0.0, 0.0]);
        }

        // The discarded force does not leak into the next step.
        world.advance(0, &[]);
        assert_eq!(world.position(Label::Player2), PLAYER2_KICKOFF);
    }

    // ========================================================================
    // Collisions
    // ========================================================================

    #[test]
    fn test_walls_contain_player() {
        let mut world = World::new(TICK_RATE_HZ);
        for tick in 0..300 {
            world.advance(
                tick,
                &[StepForce {
                    label: Label::Player1,
                    force: [-5000.0, -5000.0],
                }],
            );
        }

        let inner = Bounds {
            min: [WALL_THICKNESS / 2.0, WALL_THICKNESS / 2.0],
            max: [
                FIELD_WIDTH - WALL_THICKNESS / 2.0,
                FIELD_HEIGHT - WALL_THICKNESS / 2.0,
            ],
        };
        let player = world.bounds(Label::Player1);
        assert!(
            player.min[0] >= inner.min[0] - 1e-6 && player.min[1] >= inner.min[1] - 1e-6,
            "player escaped the field: {player:?}"
        );
    }

    #[test]
    fn test_ball_bounces_off_wall() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_position(Label::Ball, [700.0, 150.0]);
        world.set_velocity(Label::Ball, [900.0, 0.0]);

        let mut bounced = false;
        for tick in 0..60 {
            world.advance(tick, &[]);
            if world.velocity(Label::Ball)[0] < 0.0 {
                bounced = true;
                break;
            }
        }

        assert!(bounced, "ball never reversed direction");
        let right_edge = world.bounds(Label::Ball).max[0];
        assert!(right_edge <= FIELD_WIDTH - WALL_THICKNESS / 2.0 + 1e-6);
    }

    #[test]
    fn test_player_pushes_ball() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_position(Label::Player1, [330.0, 300.0]);
        world.set_velocity(Label::Player1, [600.0, 0.0]);

        run(&mut world, 10);

        assert!(world.velocity(Label::Ball)[0] > 0.0, "ball was not pushed");
        assert!(
            !world
                .bounds(Label::Player1)
                .overlaps(&Bounds::from_center(world.position(Label::Ball), [BALL_RADIUS - 1.0; 2])),
            "player and ball remain interpenetrated"
        );
    }

    #[test]
    fn test_players_separate_on_contact() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_position(Label::Player1, [390.0, 200.0]);
        world.set_position(Label::Player2, [410.0, 200.0]);

        world.advance(0, &[]);

        let gap = world.position(Label::Player2)[0] - world.position(Label::Player1)[0];
        assert!(gap >= PLAYER_SIZE - 1e-9, "players still overlap: gap {gap}");
    }

    #[test]
    fn test_box_box_contact_normal() {
        let c = box_box([0.0, 0.0], [10.0, 10.0], [15.0, 2.0], [10.0, 10.0]).unwrap();
        assert_eq!(c.normal, [1.0, 0.0]);
        assert_eq!(c.depth, 5.0);

        assert!(box_box([0.0, 0.0], [10.0, 10.0], [20.0, 0.0], [10.0, 10.0]).is_none());
    }

    #[test]
    fn test_circle_box_contact_normal() {
        let c = circle_box([0.0, 0.0], 10.0, [15.0, 0.0], [10.0, 10.0]).unwrap();
        assert_eq!(c.normal, [1.0, 0.0]);
        assert_eq!(c.depth, 5.0);

        // Mirrored argument order flips the normal.
        let flipped = contact(
            Shape::Rect {
                half_extents: [10.0, 10.0],
            },
            [15.0, 0.0],
            Shape::Circle { radius: 10.0 },
            [0.0, 0.0],
        )
        .unwrap();
        assert_eq!(flipped.normal, [-1.0, 0.0]);
    }

    #[test]
    fn test_circle_circle_contact() {
        let c = circle_circle([0.0, 0.0], 5.0, [0.0, 8.0], 5.0).unwrap();
        assert_eq!(c.normal, [0.0, 1.0]);
        assert_eq!(c.depth, 2.0);
        assert!(circle_circle([0.0, 0.0], 5.0, [0.0, 10.0], 5.0).is_none());
    }

    // ========================================================================
    // Bounds and Goals
    // ========================================================================

    #[test]
    fn test_bounds_overlap_is_inclusive() {
        let a = Bounds {
            min: [0.0, 0.0],
            max: [10.0, 10.0],
        };
        let touching = Bounds {
            min: [10.0, 0.0],
            max: [20.0, 10.0],
        };
        let apart = Bounds {
            min: [10.5, 0.0],
            max: [20.0, 10.0],
        };
        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&apart));
    }

    #[test]
    fn test_goal_geometry() {
        assert_eq!(
            Goal::Goal1.bounds(),
            Bounds {
                min: [40.0, 250.0],
                max: [60.0, 350.0]
            }
        );
        assert_eq!(Goal::Goal1.scorer(), Label::Player2);
        assert_eq!(Goal::Goal2.scorer(), Label::Player1);
    }

    #[test]
    fn test_ball_overlaps_goal() {
        let mut world = World::new(TICK_RATE_HZ);
        assert!(!world.ball_overlaps(Goal::Goal1));
        assert!(!world.ball_overlaps(Goal::Goal2));

        world.set_position(Label::Ball, GOAL2_CENTER);
        assert!(world.ball_overlaps(Goal::Goal2));
        assert!(!world.ball_overlaps(Goal::Goal1));
    }

    #[test]
    fn test_goals_are_sensors() {
        let mut world = World::new(TICK_RATE_HZ);
        world.set_position(Label::Ball, GOAL1_CENTER);
        world.advance(0, &[]);
        // No collision response: the ball stays where it was put.
        assert_eq!(world.position(Label::Ball), GOAL1_CENTER);
    }

    // ========================================================================
    // Names
    // ========================================================================

    #[test]
    fn test_label_names_roundtrip() {
        for label in Label::ALL {
            assert_eq!(label.as_str().parse::<Label>(), Ok(label));
        }
        assert_eq!(
            "referee".parse::<Label>(),
            Err(NameError::UnknownLabel("referee".to_string()))
        );
        assert!("Player1".parse::<Label>().is_err());
    }

    #[test]
    fn test_goal_names() {
        assert_eq!("goal1".parse::<Goal>(), Ok(Goal::Goal1));
        assert_eq!("goal2".parse::<Goal>(), Ok(Goal::Goal2));
        assert!("goal3".parse::<Goal>().is_err());
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    #[test]
    fn test_determinism_multiple_runs() {
        fn run_simulation() -> (BodyStateStore, [Vec2; 3]) {
            let mut world = World::new(TICK_RATE_HZ);
            world.set_position(Label::Player1, [330.0, 290.0]);
            for tick in 0..200 {
                let forces = if tick % 20 == 0 {
                    vec![
                        StepForce {
                            label: Label::Player1,
                            force: [3000.0, 500.0],
                        },
                        StepForce {
                            label: Label::Player2,
                            force: [-3000.0, 0.0],
                        },
                    ]
                } else {
                    Vec::new()
                };
                world.advance(tick, &forces);
            }
            (world.body_state(), Label::ALL.map(|label| world.velocity(label)))
        }

        assert_eq!(run_simulation(), run_simulation());
    }
}
