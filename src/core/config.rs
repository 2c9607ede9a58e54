//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

// === TASK SYSTEM ===

/// Priority penalty applied by `Task::reset`
///
/// Every time a task is abandoned (unreachable destination, vanished
/// target) its priority drops by this amount before it re-enters
/// scheduling, so a failing task yields to the rest of the queue instead
/// of retrying endlessly at the same priority.
pub const RESET_PRIORITY_PENALTY: i32 = 2;

/// Priority below which a reset logs a warning
///
/// The penalty has no floor: a task that keeps failing sinks toward the
/// bottom of the queue indefinitely. That matches the reference behavior;
/// the warning makes runaway decay visible without changing scheduling.
pub const PRIORITY_FLOOR_WARN: i32 = -20;

// === UNIT ACTIVITIES ===

/// Ticks a work activity occupies the unit
pub const WORK_DURATION_TICKS: u32 = 10;

/// Ticks an attack occupies the attacker
pub const ATTACK_DURATION_TICKS: u32 = 4;

/// Ticks a rest activity occupies the unit
pub const REST_DURATION_TICKS: u32 = 20;

/// Health removed from the victim per attack
pub const ATTACK_DAMAGE: f32 = 10.0;

/// Health restored per completed rest
pub const REST_HEAL: f32 = 5.0;

// === EXPERIENCE ===

/// Experience for completing a work activity
pub const WORK_EXPERIENCE: u32 = 10;

/// Extra experience for delivering a carried load to a workshop
pub const DELIVERY_EXPERIENCE: u32 = 15;

/// Experience for landing an attack
pub const ATTACK_EXPERIENCE: u32 = 20;

// === PATHFINDING ===

/// Upper bound on cubes expanded by one path search
///
/// Keeps a single move command from scanning an arbitrarily large world;
/// destinations beyond this frontier are treated as unreachable.
pub const PATH_SEARCH_LIMIT: usize = 10_000;
