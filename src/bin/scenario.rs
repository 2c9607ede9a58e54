//! Scenario runner - builds a small world, loads task programs, runs ticks
//!
//! Task programs arrive as JSON trees (the same in-memory shape an external
//! front end would hand over) and are type-checked into tasks by the
//! program builder. Run with RUST_LOG=info to see task prints and
//! lifecycle events.

use clap::Parser;
use serde::Deserialize;

use stoneholm::core::types::CubePos;
use stoneholm::program::{ast, build_tasks};
use stoneholm::simulation::{run_simulation_tick, Simulation, SimulationEvent};
use stoneholm::world::{CarryKind, CubeKind, Terrain, World};

#[derive(Parser)]
#[command(name = "scenario", about = "Run a task scenario in a demo world")]
struct Args {
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Path to a JSON scenario file; omit for the built-in demo
    #[arg(long)]
    scenario: Option<std::path::PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    tasks: Vec<TaskDef>,
}

#[derive(Debug, Deserialize)]
struct TaskDef {
    name: String,
    priority: i32,
    selected_cubes: Vec<[i32; 3]>,
    program: ast::Stmt,
}

const DEMO_SCENARIO: &str = r#"{
  "tasks": [
    {
      "name": "haul-timber",
      "priority": 8,
      "selected_cubes": [[10, 10, 1]],
      "program": {
        "stmt": "sequence",
        "statements": [
          { "stmt": "assign", "name": "pile",
            "value": { "op": "nearest_timber" } },
          { "stmt": "move_to", "target": { "op": "variable", "name": "pile" } },
          { "stmt": "work", "target": { "op": "variable", "name": "pile" } },
          { "stmt": "move_to", "target": { "op": "nearest_workshop" } },
          { "stmt": "work", "target": { "op": "nearest_workshop" } },
          { "stmt": "print", "value": { "op": "here" } }
        ]
      }
    },
    {
      "name": "patrol-selected",
      "priority": 3,
      "selected_cubes": [[2, 12, 1], [12, 2, 1]],
      "program": {
        "stmt": "sequence",
        "statements": [
          { "stmt": "move_to", "target": { "op": "selected" } },
          { "stmt": "if",
            "condition": { "op": "is_enemy", "unit": { "op": "any" } },
            "then_body": { "stmt": "attack", "target": { "op": "enemy" } },
            "else_body": { "stmt": "print", "value": { "op": "here" } } }
        ]
      }
    }
  ]
}"#;

fn demo_world() -> World {
    let mut terrain = Terrain::new(16, 16, 4);
    for y in 0..16 {
        for x in 0..16 {
            terrain.set_cube(CubePos::new(x, y, 0), CubeKind::Rock);
        }
    }
    terrain.set_cube(CubePos::new(8, 8, 1), CubeKind::Workshop);

    let mut world = World::new(terrain);
    world.drop_carryable(CarryKind::Timber, CubePos::new(3, 12, 1));
    world.drop_carryable(CarryKind::Timber, CubePos::new(13, 4, 1));
    world.drop_carryable(CarryKind::Ore, CubePos::new(14, 14, 1));
    world
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let scenario: ScenarioFile = match &args.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path).expect("read scenario file");
            serde_json::from_str(&text).expect("parse scenario file")
        }
        None => serde_json::from_str(DEMO_SCENARIO).expect("built-in scenario parses"),
    };

    let mut sim = Simulation::new(demo_world());
    let stonekin = sim.add_faction("Stonekin");
    let ashborn = sim.add_faction("Ashborn");

    sim.world.spawn_unit("Brom", stonekin, CubePos::new(2, 2, 1));
    sim.world.spawn_unit("Edda", stonekin, CubePos::new(4, 2, 1));
    sim.world.spawn_unit("Gor", ashborn, CubePos::new(14, 14, 1));

    for def in &scenario.tasks {
        let cubes: Vec<CubePos> = def
            .selected_cubes
            .iter()
            .map(|&[x, y, z]| CubePos::new(x, y, z))
            .collect();
        let (tasks, diagnostics) = build_tasks(&def.name, def.priority, &def.program, &cubes);
        for diagnostic in &diagnostics {
            tracing::warn!(task = %def.name, "{diagnostic}");
        }
        for task in tasks {
            sim.submit_task(stonekin, task);
        }
    }

    let mut completed = 0usize;
    let mut aborted = 0usize;
    for _ in 0..args.ticks {
        for event in run_simulation_tick(&mut sim) {
            match &event {
                SimulationEvent::TaskAssigned {
                    unit_name,
                    task_name,
                    priority,
                } => tracing::info!(unit = %unit_name, task = %task_name, priority, "task assigned"),
                SimulationEvent::TaskCompleted { task_name } => {
                    completed += 1;
                    tracing::info!(task = %task_name, "task completed");
                }
                SimulationEvent::TaskAborted {
                    unit_name,
                    task_name,
                    new_priority,
                } => {
                    aborted += 1;
                    tracing::info!(
                        unit = %unit_name, task = %task_name, new_priority,
                        "task aborted"
                    );
                }
                SimulationEvent::UnitDied { unit_name } => {
                    tracing::info!(unit = %unit_name, "unit died");
                }
            }
        }
    }

    println!(
        "ran {} ticks: {} tasks completed, {} aborts, {} units alive",
        args.ticks,
        completed,
        aborted,
        sim.world.living_units().count()
    );
}
