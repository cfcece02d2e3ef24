use std::collections::HashMap;

use color_eyre::{Report, Result};

use factory_core::balancer::design_balancer;
use factory_core::db::StaticRecipeDb;
use factory_core::economy::StaticEconomy;
use factory_core::recipe::Recipe;
use factory_core::reference_solver::ReferenceSolver;
use factory_core::{optimize_recipes, OptimizeRequest};

/// A tiny two-recipe database, just enough to exercise `optimize_recipes`
/// without wiring up a real game-data source.
fn demo_db() -> StaticRecipeDb {
    let concrete = Recipe::new(
        "Concrete",
        "Constructor",
        HashMap::from([("Limestone".to_string(), 45.0)]),
        HashMap::from([("Concrete".to_string(), 15.0)]),
    )
    .expect("demo recipe is well-formed");

    StaticRecipeDb::new([concrete], ["Limestone".to_string()], ["Concrete".to_string()])
}

fn main() -> Result<(), Report> {
    if std::env::var("RUST_BACKTRACE").is_err() {
        std::env::set_var("RUST_BACKTRACE", "FULL");
    }
    color_eyre::install()?;
    env_logger::init();

    let db = demo_db();
    let economy = StaticEconomy::default();
    let solver = ReferenceSolver::default();

    let request = OptimizeRequest {
        outputs: HashMap::from([("Concrete".to_string(), 480.0)]),
        ..Default::default()
    };
    let counts = optimize_recipes(&request, &db, &economy, &solver, None)?;
    println!("machine counts for 480 Concrete/min: {counts:?}");

    let graph = design_balancer(&[100], &[40, 30, 30])?;
    println!("balancer devices: {}", graph.nodes().len());
    for arc in graph.arcs() {
        println!("  {} -> {} @ {}", arc.from, arc.to, arc.rate);
    }

    Ok(())
}
