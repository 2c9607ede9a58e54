//! World state: terrain, units, factions and carryable objects

pub mod faction;
pub mod objects;
pub mod terrain;
pub mod unit;

pub use faction::Faction;
pub use objects::{Carryable, CarryKind};
pub use terrain::{CubeKind, Terrain};
pub use unit::{Activity, Unit};

use crate::core::types::{CubePos, FactionId, Tick, UnitId};

/// The shared world all units act in
///
/// Units live in a hash map keyed by id, with a separate insertion-ordered
/// roster so per-tick iteration is deterministic.
#[derive(Debug)]
pub struct World {
    pub terrain: Terrain,
    units: ahash::AHashMap<UnitId, Unit>,
    roster: Vec<UnitId>,
    pub factions: Vec<Faction>,
    pub carryables: Vec<Carryable>,
    pub current_tick: Tick,
}

impl World {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            units: ahash::AHashMap::new(),
            roster: Vec::new(),
            factions: Vec::new(),
            carryables: Vec::new(),
            current_tick: 0,
        }
    }

    pub fn add_faction(&mut self, name: impl Into<String>) -> FactionId {
        let id = FactionId(self.factions.len() as u32);
        self.factions.push(Faction::new(id, name));
        id
    }

    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(id.0 as usize)
    }

    pub fn spawn_unit(
        &mut self,
        name: impl Into<String>,
        faction: FactionId,
        position: CubePos,
    ) -> UnitId {
        let unit = Unit::new(name, faction, position);
        let id = unit.id;
        if let Some(f) = self.factions.get_mut(faction.0 as usize) {
            f.add_member(id);
        }
        self.units.insert(id, unit);
        self.roster.push(id);
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Unit ids in spawn order
    pub fn roster(&self) -> &[UnitId] {
        &self.roster
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.roster.iter().filter_map(|id| self.units.get(id))
    }

    pub fn living_units(&self) -> impl Iterator<Item = &Unit> {
        self.units().filter(|u| u.alive)
    }

    pub fn living_units_in_faction(&self, faction: FactionId) -> impl Iterator<Item = &Unit> {
        self.living_units().filter(move |u| u.faction == faction)
    }

    pub fn are_faction_mates(&self, a: UnitId, b: UnitId) -> bool {
        match (self.unit(a), self.unit(b)) {
            (Some(ua), Some(ub)) => ua.faction == ub.faction,
            _ => false,
        }
    }

    /// Nearest uncarried object of the given kind, by straight-line distance
    pub fn nearest_carryable(&self, kind: CarryKind, from: CubePos) -> Option<CubePos> {
        self.carryables
            .iter()
            .filter(|c| c.kind == kind && c.is_on_ground())
            .map(|c| c.position)
            .min_by(|a, b| {
                from.distance(a)
                    .partial_cmp(&from.distance(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Nearest workshop cube, by straight-line distance
    pub fn nearest_workshop(&self, from: CubePos) -> Option<CubePos> {
        self.terrain
            .cubes_of_kind(CubeKind::Workshop)
            .into_iter()
            .min_by(|a, b| {
                from.distance(a)
                    .partial_cmp(&from.distance(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Index of an uncarried object lying at the given cube
    pub fn carryable_at(&self, pos: CubePos) -> Option<usize> {
        self.carryables
            .iter()
            .position(|c| c.is_on_ground() && c.position == pos)
    }

    pub fn drop_carryable(&mut self, kind: CarryKind, pos: CubePos) {
        self.carryables.push(Carryable::new(kind, pos));
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }
}
