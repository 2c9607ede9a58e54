//! Cube grid terrain with walkability and path queries

use crate::core::config::PATH_SEARCH_LIMIT;
use crate::core::types::CubePos;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Material of one terrain cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CubeKind {
    Air,
    Rock,
    Workshop,
}

impl CubeKind {
    pub fn is_solid(&self) -> bool {
        matches!(self, CubeKind::Rock)
    }

    pub fn is_passable(&self) -> bool {
        !self.is_solid()
    }
}

/// A bounded 3-D grid of cubes
///
/// Coordinates run 0..size on each axis. Queries outside the bounds answer
/// "not solid, not passable, not walkable" rather than failing, so
/// expressions probing the world edge degrade to no-result instead of
/// aborting the program.
#[derive(Debug, Clone)]
pub struct Terrain {
    size_x: i32,
    size_y: i32,
    size_z: i32,
    cubes: Vec<CubeKind>,
}

impl Terrain {
    /// All-air terrain of the given dimensions
    pub fn new(size_x: i32, size_y: i32, size_z: i32) -> Self {
        assert!(size_x > 0 && size_y > 0 && size_z > 0);
        Self {
            size_x,
            size_y,
            size_z,
            cubes: vec![CubeKind::Air; (size_x * size_y * size_z) as usize],
        }
    }

    pub fn dimensions(&self) -> (i32, i32, i32) {
        (self.size_x, self.size_y, self.size_z)
    }

    pub fn in_bounds(&self, pos: CubePos) -> bool {
        pos.x >= 0
            && pos.x < self.size_x
            && pos.y >= 0
            && pos.y < self.size_y
            && pos.z >= 0
            && pos.z < self.size_z
    }

    fn index(&self, pos: CubePos) -> usize {
        ((pos.z * self.size_y + pos.y) * self.size_x + pos.x) as usize
    }

    pub fn cube(&self, pos: CubePos) -> Option<CubeKind> {
        self.in_bounds(pos).then(|| self.cubes[self.index(pos)])
    }

    pub fn set_cube(&mut self, pos: CubePos, kind: CubeKind) {
        if self.in_bounds(pos) {
            let idx = self.index(pos);
            self.cubes[idx] = kind;
        }
    }

    pub fn is_solid(&self, pos: CubePos) -> bool {
        self.cube(pos).map(|c| c.is_solid()).unwrap_or(false)
    }

    pub fn is_passable(&self, pos: CubePos) -> bool {
        self.cube(pos).map(|c| c.is_passable()).unwrap_or(false)
    }

    /// A cube is walkable when a unit can stand in it: passable, and either
    /// resting on the world floor or on a solid cube.
    pub fn is_walkable(&self, pos: CubePos) -> bool {
        self.is_passable(pos) && (pos.z == 0 || self.is_solid(pos.offset(0, 0, -1)))
    }

    /// All cubes of the given kind (scan order: z, then y, then x)
    pub fn cubes_of_kind(&self, kind: CubeKind) -> Vec<CubePos> {
        let mut result = Vec::new();
        for z in 0..self.size_z {
            for y in 0..self.size_y {
                for x in 0..self.size_x {
                    let pos = CubePos::new(x, y, z);
                    if self.cubes[self.index(pos)] == kind {
                        result.push(pos);
                    }
                }
            }
        }
        result
    }

    /// All walkable cubes, for random wander targets
    pub fn walkable_cubes(&self) -> Vec<CubePos> {
        let mut result = Vec::new();
        for z in 0..self.size_z {
            for y in 0..self.size_y {
                for x in 0..self.size_x {
                    let pos = CubePos::new(x, y, z);
                    if self.is_walkable(pos) {
                        result.push(pos);
                    }
                }
            }
        }
        result
    }

    /// Breadth-first search over walkable cubes
    ///
    /// Returns the cubes to traverse, excluding `from`, ending at `to`.
    /// `None` when no walkable route exists within `PATH_SEARCH_LIMIT`
    /// expansions. `from == to` yields an empty path.
    pub fn find_path(&self, from: CubePos, to: CubePos) -> Option<Vec<CubePos>> {
        if from == to {
            return Some(Vec::new());
        }
        if !self.is_walkable(to) {
            return None;
        }

        let mut came_from: ahash::AHashMap<CubePos, CubePos> = ahash::AHashMap::new();
        let mut frontier = VecDeque::new();
        frontier.push_back(from);
        came_from.insert(from, from);

        let mut expanded = 0usize;
        while let Some(current) = frontier.pop_front() {
            expanded += 1;
            if expanded > PATH_SEARCH_LIMIT {
                return None;
            }
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 && dz == 0 {
                            continue;
                        }
                        let next = current.offset(dx, dy, dz);
                        if !self.is_walkable(next) || came_from.contains_key(&next) {
                            continue;
                        }
                        came_from.insert(next, current);
                        if next == to {
                            let mut path = vec![to];
                            let mut cursor = current;
                            while cursor != from {
                                path.push(cursor);
                                cursor = came_from[&cursor];
                            }
                            path.reverse();
                            return Some(path);
                        }
                        frontier.push_back(next);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A flat 10x10 floor: rock at z=0, air above
    fn flat_terrain() -> Terrain {
        let mut t = Terrain::new(10, 10, 3);
        for y in 0..10 {
            for x in 0..10 {
                t.set_cube(CubePos::new(x, y, 0), CubeKind::Rock);
            }
        }
        t
    }

    #[test]
    fn test_walkability_on_floor() {
        let t = flat_terrain();
        assert!(t.is_walkable(CubePos::new(3, 3, 1)));
        assert!(!t.is_walkable(CubePos::new(3, 3, 0))); // solid
        assert!(!t.is_walkable(CubePos::new(3, 3, 2))); // nothing below
    }

    #[test]
    fn test_out_of_bounds_queries() {
        let t = flat_terrain();
        let outside = CubePos::new(-1, 0, 0);
        assert!(!t.is_solid(outside));
        assert!(!t.is_passable(outside));
        assert!(!t.is_walkable(outside));
        assert_eq!(t.cube(outside), None);
    }

    #[test]
    fn test_find_path_straight() {
        let t = flat_terrain();
        let path = t
            .find_path(CubePos::new(0, 0, 1), CubePos::new(4, 0, 1))
            .expect("path on open floor");
        assert_eq!(path.last(), Some(&CubePos::new(4, 0, 1)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_find_path_blocked() {
        let mut t = flat_terrain();
        // Wall across x=5 at walking height
        for y in 0..10 {
            t.set_cube(CubePos::new(5, y, 1), CubeKind::Rock);
            t.set_cube(CubePos::new(5, y, 2), CubeKind::Rock);
        }
        let path = t.find_path(CubePos::new(0, 0, 1), CubePos::new(9, 0, 1));
        assert!(path.is_none());
    }

    #[test]
    fn test_find_path_to_self_is_empty() {
        let t = flat_terrain();
        let here = CubePos::new(2, 2, 1);
        assert_eq!(t.find_path(here, here), Some(Vec::new()));
    }
}
