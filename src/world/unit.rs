//! Unit state and the cooperative activity machine
//!
//! A unit performs at most one activity at a time. Activities are started
//! by commands (from a task or from default behavior) and advanced one
//! step per simulation tick; a unit is ready for a new instruction only
//! while idle. This cooperative structure is what makes task suspension
//! work: a suspend-point command occupies the unit for some number of
//! ticks, and the task's cursor stays parked until the unit is idle again.

use crate::core::types::{CubePos, FactionId, TaskId, UnitId};
use crate::world::objects::CarryKind;
use std::collections::VecDeque;

/// What a unit is currently doing
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Idle,
    /// Traversing a precomputed path, one cube per tick
    Moving { path: VecDeque<CubePos> },
    /// Working at a target cube for a fixed duration
    Working { target: CubePos, remaining: u32 },
    Attacking { remaining: u32 },
    Resting { remaining: u32 },
    /// Re-pathing toward a moving target until adjacent or the target dies
    Following { target: UnitId },
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub faction: FactionId,
    pub position: CubePos,
    pub health: f32,
    pub max_health: f32,
    pub experience: u32,
    pub carrying: Option<CarryKind>,
    pub alive: bool,
    /// Back-reference to the assigned task; maintained only by the
    /// scheduler/simulation layer, never set directly by program code.
    pub task: Option<TaskId>,
    pub followed: Option<UnitId>,
    pub default_behavior: bool,
    pub activity: Activity,
}

impl Unit {
    pub fn new(name: impl Into<String>, faction: FactionId, position: CubePos) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
            faction,
            position,
            health: 100.0,
            max_health: 100.0,
            experience: 0,
            carrying: None,
            alive: true,
            task: None,
            followed: None,
            default_behavior: true,
            activity: Activity::Idle,
        }
    }

    /// True while the unit can accept a new instruction
    pub fn is_ready_for_instruction(&self) -> bool {
        self.alive && self.activity == Activity::Idle
    }

    pub fn is_carrying(&self) -> bool {
        self.carrying.is_some()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// Apply damage; a unit at zero health dies and drops its activity
    pub fn take_damage(&mut self, amount: f32) {
        self.health -= amount;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.alive = false;
            self.activity = Activity::Idle;
            self.followed = None;
        }
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn gain_experience(&mut self, amount: u32) {
        self.experience += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_unit_is_ready() {
        let u = Unit::new("Brom", FactionId(0), CubePos::new(1, 1, 1));
        assert!(u.is_ready_for_instruction());
        assert!(!u.is_carrying());
        assert!(!u.has_task());
    }

    #[test]
    fn test_damage_kills_and_idles() {
        let mut u = Unit::new("Brom", FactionId(0), CubePos::new(1, 1, 1));
        u.activity = Activity::Resting { remaining: 5 };
        u.take_damage(150.0);
        assert!(!u.alive);
        assert_eq!(u.activity, Activity::Idle);
        assert!(!u.is_ready_for_instruction());
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut u = Unit::new("Brom", FactionId(0), CubePos::new(1, 1, 1));
        u.take_damage(10.0);
        u.heal(50.0);
        assert_eq!(u.health, u.max_health);
    }
}
