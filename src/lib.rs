//! Stoneholm - cube-world unit simulation with a scriptable task system

pub mod core;
pub mod program;
pub mod simulation;
pub mod world;
