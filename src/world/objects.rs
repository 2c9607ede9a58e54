//! Carryable world objects

use crate::core::types::{CubePos, UnitId};
use serde::{Deserialize, Serialize};

/// Kind of carryable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarryKind {
    Timber,
    Ore,
}

/// An object lying in the world or carried by a unit
///
/// While carried, `position` tracks the carrier and the object is excluded
/// from nearest-of queries.
#[derive(Debug, Clone)]
pub struct Carryable {
    pub kind: CarryKind,
    pub position: CubePos,
    pub carried_by: Option<UnitId>,
}

impl Carryable {
    pub fn new(kind: CarryKind, position: CubePos) -> Self {
        Self {
            kind,
            position,
            carried_by: None,
        }
    }

    pub fn is_on_ground(&self) -> bool {
        self.carried_by.is_none()
    }
}
