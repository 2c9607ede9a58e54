//! Faction membership bookkeeping

use crate::core::types::{FactionId, UnitId};

/// A named group of units sharing one scheduler
#[derive(Debug, Clone)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    members: ahash::AHashSet<UnitId>,
}

impl Faction {
    pub fn new(id: FactionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: ahash::AHashSet::new(),
        }
    }

    pub fn add_member(&mut self, unit: UnitId) {
        self.members.insert(unit);
    }

    pub fn remove_member(&mut self, unit: UnitId) {
        self.members.remove(&unit);
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.members.contains(&unit)
    }

    pub fn members(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
