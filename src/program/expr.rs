//! Typed, side-effect-free expressions over task and world state
//!
//! Expressions come in three closed categories - positions, units and
//! booleans - each with its own evaluate function. Evaluation takes the
//! task's context through `EvalEnv` and returns `Option<V>`: `None` means
//! "no result here" (no enemy in the world, no walkable neighbor, unbound
//! variable), which consuming statements translate into a task abort, never
//! into a panic.
//!
//! Evaluating the same expression twice against an unchanged world yields
//! the same value, except for the explicitly randomized `Friend`/`Enemy`/
//! `Any` family, which picks a uniformly random eligible candidate per
//! call.

use crate::core::types::{CubePos, UnitId};
use crate::world::World;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Read-only context an expression is evaluated in
pub struct EvalEnv<'a> {
    pub world: &'a World,
    /// The unit executing the task
    pub unit: UnitId,
    /// The task's fixed selected cube
    pub selected: CubePos,
    /// The task's variable environment (name -> bound expression)
    pub variables: &'a ahash::AHashMap<String, Expr>,
}

impl<'a> EvalEnv<'a> {
    fn variable(&self, name: &str) -> Option<&Expr> {
        let bound = self.variables.get(name);
        if bound.is_none() {
            tracing::warn!(variable = name, "use of a variable before assignment");
        }
        bound
    }
}

/// Position-valued expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionExpr {
    Literal(CubePos),
    /// The executing unit's current cube
    Here,
    NearestTimber,
    NearestOre,
    NearestWorkshop,
    /// A walkable cube next to the operand position
    NextTo(Box<PositionExpr>),
    PositionOf(Box<UnitExpr>),
    /// The task's selected cube
    Selected,
    Var(String),
}

impl PositionExpr {
    pub fn evaluate(&self, env: &EvalEnv) -> Option<CubePos> {
        match self {
            PositionExpr::Literal(pos) => Some(*pos),
            PositionExpr::Here => env.world.unit(env.unit).map(|u| u.position),
            PositionExpr::NearestTimber => {
                let from = env.world.unit(env.unit)?.position;
                env.world
                    .nearest_carryable(crate::world::CarryKind::Timber, from)
            }
            PositionExpr::NearestOre => {
                let from = env.world.unit(env.unit)?.position;
                env.world
                    .nearest_carryable(crate::world::CarryKind::Ore, from)
            }
            PositionExpr::NearestWorkshop => {
                let from = env.world.unit(env.unit)?.position;
                env.world.nearest_workshop(from)
            }
            PositionExpr::NextTo(of) => {
                let pos = of.evaluate(env)?;
                // Fixed scan order keeps the result deterministic
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            let candidate = pos.offset(dx, dy, dz);
                            if env.world.terrain.is_walkable(candidate) {
                                return Some(candidate);
                            }
                        }
                    }
                }
                None
            }
            PositionExpr::PositionOf(of) => {
                let unit = of.evaluate(env)?;
                env.world.unit(unit).map(|u| u.position)
            }
            PositionExpr::Selected => Some(env.selected),
            PositionExpr::Var(name) => match env.variable(name)? {
                Expr::Position(p) => p.evaluate(env),
                other => {
                    tracing::warn!(
                        variable = name,
                        found = other.category_name(),
                        "position read of a non-position variable"
                    );
                    None
                }
            },
        }
    }
}

/// Unit-valued expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitExpr {
    /// The executing unit itself
    This,
    /// A uniformly random living faction-mate, excluding the executor
    Friend,
    /// A uniformly random living unit of another faction
    Enemy,
    /// A uniformly random living unit, excluding the executor
    Any,
    Var(String),
}

impl UnitExpr {
    pub fn evaluate(&self, env: &EvalEnv) -> Option<UnitId> {
        match self {
            UnitExpr::This => Some(env.unit),
            UnitExpr::Friend => {
                let me = env.world.unit(env.unit)?;
                let candidates: Vec<UnitId> = env
                    .world
                    .living_units_in_faction(me.faction)
                    .map(|u| u.id)
                    .filter(|&id| id != env.unit)
                    .collect();
                pick_random(candidates)
            }
            UnitExpr::Enemy => {
                let me = env.world.unit(env.unit)?;
                let candidates: Vec<UnitId> = env
                    .world
                    .living_units()
                    .filter(|u| u.faction != me.faction)
                    .map(|u| u.id)
                    .collect();
                pick_random(candidates)
            }
            UnitExpr::Any => {
                let candidates: Vec<UnitId> = env
                    .world
                    .living_units()
                    .map(|u| u.id)
                    .filter(|&id| id != env.unit)
                    .collect();
                pick_random(candidates)
            }
            UnitExpr::Var(name) => match env.variable(name)? {
                Expr::Unit(u) => u.evaluate(env),
                other => {
                    tracing::warn!(
                        variable = name,
                        found = other.category_name(),
                        "unit read of a non-unit variable"
                    );
                    None
                }
            },
        }
    }
}

/// Boolean-valued expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoolExpr {
    True,
    False,
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
    IsSolid(Box<PositionExpr>),
    IsPassable(Box<PositionExpr>),
    IsAlive(Box<UnitExpr>),
    IsFriend(Box<UnitExpr>),
    IsEnemy(Box<UnitExpr>),
    CarriesItem(Box<UnitExpr>),
    Var(String),
}

impl BoolExpr {
    pub fn evaluate(&self, env: &EvalEnv) -> Option<bool> {
        match self {
            BoolExpr::True => Some(true),
            BoolExpr::False => Some(false),
            BoolExpr::And(lhs, rhs) => {
                if !lhs.evaluate(env)? {
                    Some(false)
                } else {
                    rhs.evaluate(env)
                }
            }
            BoolExpr::Or(lhs, rhs) => {
                if lhs.evaluate(env)? {
                    Some(true)
                } else {
                    rhs.evaluate(env)
                }
            }
            BoolExpr::Not(inner) => inner.evaluate(env).map(|b| !b),
            BoolExpr::IsSolid(pos) => {
                let p = pos.evaluate(env)?;
                Some(env.world.terrain.is_solid(p))
            }
            BoolExpr::IsPassable(pos) => {
                let p = pos.evaluate(env)?;
                Some(env.world.terrain.is_passable(p))
            }
            BoolExpr::IsAlive(unit) => {
                let id = unit.evaluate(env)?;
                env.world.unit(id).map(|u| u.alive)
            }
            BoolExpr::IsFriend(unit) => {
                let id = unit.evaluate(env)?;
                let me = env.world.unit(env.unit)?;
                env.world.unit(id).map(|u| u.faction == me.faction)
            }
            BoolExpr::IsEnemy(unit) => {
                let id = unit.evaluate(env)?;
                let me = env.world.unit(env.unit)?;
                env.world.unit(id).map(|u| u.faction != me.faction)
            }
            BoolExpr::CarriesItem(unit) => {
                let id = unit.evaluate(env)?;
                env.world.unit(id).map(|u| u.is_carrying())
            }
            BoolExpr::Var(name) => match env.variable(name)? {
                Expr::Bool(b) => b.evaluate(env),
                other => {
                    tracing::warn!(
                        variable = name,
                        found = other.category_name(),
                        "boolean read of a non-boolean variable"
                    );
                    None
                }
            },
        }
    }
}

/// Category union, used by assignment, print and the variable environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Position(PositionExpr),
    Unit(UnitExpr),
    Bool(BoolExpr),
    /// A bare variable reference whose category is the bound expression's
    Var(String),
}

impl Expr {
    pub fn category_name(&self) -> &'static str {
        match self {
            Expr::Position(_) => "position",
            Expr::Unit(_) => "unit",
            Expr::Bool(_) => "boolean",
            Expr::Var(_) => "variable",
        }
    }

    /// Render the expression's current value for the print statement
    pub fn describe(&self, env: &EvalEnv) -> String {
        match self {
            Expr::Position(p) => match p.evaluate(env) {
                Some(pos) => pos.to_string(),
                None => "no value".to_string(),
            },
            Expr::Unit(u) => match u.evaluate(env) {
                Some(id) => env
                    .world
                    .unit(id)
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| "no value".to_string()),
                None => "no value".to_string(),
            },
            Expr::Bool(b) => match b.evaluate(env) {
                Some(v) => v.to_string(),
                None => "no value".to_string(),
            },
            Expr::Var(name) => match env.variable(name) {
                Some(bound) => bound.clone().describe(env),
                None => "no value".to_string(),
            },
        }
    }
}

fn pick_random(mut candidates: Vec<UnitId>) -> Option<UnitId> {
    if candidates.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..candidates.len());
    Some(candidates.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{CarryKind, CubeKind, Terrain};

    fn flat_world() -> World {
        let mut terrain = Terrain::new(10, 10, 3);
        for y in 0..10 {
            for x in 0..10 {
                terrain.set_cube(CubePos::new(x, y, 0), CubeKind::Rock);
            }
        }
        World::new(terrain)
    }

    struct Fixture {
        world: World,
        me: UnitId,
        variables: ahash::AHashMap<String, Expr>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = flat_world();
            let f = world.add_faction("Stonekin");
            let me = world.spawn_unit("Brom", f, CubePos::new(2, 2, 1));
            Self {
                world,
                me,
                variables: ahash::AHashMap::new(),
            }
        }

        fn env(&self) -> EvalEnv<'_> {
            EvalEnv {
                world: &self.world,
                unit: self.me,
                selected: CubePos::new(9, 9, 1),
                variables: &self.variables,
            }
        }
    }

    #[test]
    fn test_literal_and_here_and_selected() {
        let fx = Fixture::new();
        let env = fx.env();
        assert_eq!(
            PositionExpr::Literal(CubePos::new(1, 2, 3)).evaluate(&env),
            Some(CubePos::new(1, 2, 3))
        );
        assert_eq!(PositionExpr::Here.evaluate(&env), Some(CubePos::new(2, 2, 1)));
        assert_eq!(
            PositionExpr::Selected.evaluate(&env),
            Some(CubePos::new(9, 9, 1))
        );
    }

    #[test]
    fn test_boolean_connectives_short_circuit_null() {
        let fx = Fixture::new();
        let env = fx.env();
        let unbound = BoolExpr::Var("nope".into());
        // false && <null> short-circuits to false
        assert_eq!(
            BoolExpr::And(Box::new(BoolExpr::False), Box::new(unbound.clone())).evaluate(&env),
            Some(false)
        );
        // true && <null> propagates null
        assert_eq!(
            BoolExpr::And(Box::new(BoolExpr::True), Box::new(unbound.clone())).evaluate(&env),
            None
        );
        // true || <null> short-circuits to true
        assert_eq!(
            BoolExpr::Or(Box::new(BoolExpr::True), Box::new(unbound)).evaluate(&env),
            Some(true)
        );
        assert_eq!(
            BoolExpr::Not(Box::new(BoolExpr::False)).evaluate(&env),
            Some(true)
        );
    }

    #[test]
    fn test_solidity_queries() {
        let fx = Fixture::new();
        let env = fx.env();
        let floor = Box::new(PositionExpr::Literal(CubePos::new(1, 1, 0)));
        let air = Box::new(PositionExpr::Literal(CubePos::new(1, 1, 1)));
        assert_eq!(BoolExpr::IsSolid(floor.clone()).evaluate(&env), Some(true));
        assert_eq!(BoolExpr::IsPassable(floor).evaluate(&env), Some(false));
        assert_eq!(BoolExpr::IsPassable(air).evaluate(&env), Some(true));
    }

    #[test]
    fn test_next_to_finds_walkable_neighbor() {
        let fx = Fixture::new();
        let env = fx.env();
        let next = PositionExpr::NextTo(Box::new(PositionExpr::Literal(CubePos::new(5, 5, 1))))
            .evaluate(&env)
            .expect("open floor has walkable neighbors");
        assert!(next.is_adjacent(&CubePos::new(5, 5, 1)));
        assert!(fx.world.terrain.is_walkable(next));
    }

    #[test]
    fn test_random_family_empty_yields_none() {
        let fx = Fixture::new();
        let env = fx.env();
        // Sole unit in the world: no friends, no enemies, no others
        assert_eq!(UnitExpr::Friend.evaluate(&env), None);
        assert_eq!(UnitExpr::Enemy.evaluate(&env), None);
        assert_eq!(UnitExpr::Any.evaluate(&env), None);
        assert_eq!(UnitExpr::This.evaluate(&env), Some(fx.me));
    }

    #[test]
    fn test_random_family_membership() {
        let mut fx = Fixture::new();
        let home = fx.world.factions[0].id;
        let rival = fx.world.add_faction("Ashborn");
        let mate = fx.world.spawn_unit("Edda", home, CubePos::new(3, 2, 1));
        let foe = fx.world.spawn_unit("Gor", rival, CubePos::new(8, 8, 1));
        let env = fx.env();
        for _ in 0..16 {
            assert_eq!(UnitExpr::Friend.evaluate(&env), Some(mate));
            assert_eq!(UnitExpr::Enemy.evaluate(&env), Some(foe));
            let any = UnitExpr::Any.evaluate(&env).unwrap();
            assert!(any == mate || any == foe);
        }
    }

    #[test]
    fn test_faction_predicates() {
        let mut fx = Fixture::new();
        let home = fx.world.factions[0].id;
        let rival = fx.world.add_faction("Ashborn");
        fx.world.spawn_unit("Edda", home, CubePos::new(3, 2, 1));
        fx.world.spawn_unit("Gor", rival, CubePos::new(8, 8, 1));
        let env = fx.env();
        assert_eq!(
            BoolExpr::IsFriend(Box::new(UnitExpr::Friend)).evaluate(&env),
            Some(true)
        );
        assert_eq!(
            BoolExpr::IsEnemy(Box::new(UnitExpr::Enemy)).evaluate(&env),
            Some(true)
        );
        assert_eq!(
            BoolExpr::IsAlive(Box::new(UnitExpr::This)).evaluate(&env),
            Some(true)
        );
    }

    #[test]
    fn test_nearest_queries() {
        let mut fx = Fixture::new();
        fx.world.drop_carryable(CarryKind::Timber, CubePos::new(4, 2, 1));
        fx.world.drop_carryable(CarryKind::Ore, CubePos::new(7, 7, 1));
        fx.world
            .terrain
            .set_cube(CubePos::new(6, 2, 1), CubeKind::Workshop);
        let env = fx.env();
        assert_eq!(
            PositionExpr::NearestTimber.evaluate(&env),
            Some(CubePos::new(4, 2, 1))
        );
        assert_eq!(
            PositionExpr::NearestOre.evaluate(&env),
            Some(CubePos::new(7, 7, 1))
        );
        assert_eq!(
            PositionExpr::NearestWorkshop.evaluate(&env),
            Some(CubePos::new(6, 2, 1))
        );
    }

    #[test]
    fn test_variable_reads() {
        let mut fx = Fixture::new();
        fx.variables.insert(
            "spot".to_string(),
            Expr::Position(PositionExpr::Literal(CubePos::new(1, 1, 1))),
        );
        let env = fx.env();
        // Unbound name: no result, not an error
        assert_eq!(PositionExpr::Var("nope".into()).evaluate(&env), None);
        // Bound name evaluates the stored expression
        assert_eq!(
            PositionExpr::Var("spot".into()).evaluate(&env),
            Some(CubePos::new(1, 1, 1))
        );
        // Category mismatch reads as no result
        assert_eq!(UnitExpr::Var("spot".into()).evaluate(&env), None);
        assert_eq!(BoolExpr::Var("spot".into()).evaluate(&env), None);
    }

    #[test]
    fn test_describe_renders_values() {
        let fx = Fixture::new();
        let env = fx.env();
        assert_eq!(
            Expr::Position(PositionExpr::Literal(CubePos::new(0, 0, 0))).describe(&env),
            "(0, 0, 0)"
        );
        assert_eq!(Expr::Bool(BoolExpr::True).describe(&env), "true");
        assert_eq!(Expr::Unit(UnitExpr::This).describe(&env), "Brom");
        assert_eq!(Expr::Unit(UnitExpr::Enemy).describe(&env), "no value");
    }
}
