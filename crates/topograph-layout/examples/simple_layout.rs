//! Settle a synthetic ring-of-stars topology with the force layout.
//!
//! Run with: cargo run -p topograph-layout --example simple_layout

use std::time::Instant;

use topograph_layout::{ForceSimulation, NodeInfo, NodeRegistry, SimulationConfig, TickOutcome, Vec3};

fn main() {
    tracing_subscriber::fmt::init();

    let hubs = 12;
    let leaves_per_hub = 20;

    let mut nodes = Vec::new();
    let mut links = Vec::new();
    for h in 0..hubs {
        let hub = format!("hub-{h}");
        nodes.push((hub.clone(), None));
        links.push((hub.clone(), format!("hub-{}", (h + 1) % hubs)));
        for l in 0..leaves_per_hub {
            let leaf = format!("leaf-{h}-{l}");
            nodes.push((leaf.clone(), None));
            links.push((leaf, hub.clone()));
        }
    }

    println!("Simulating {} nodes and {} links...", nodes.len(), links.len());

    let mut sim = match ForceSimulation::new(nodes, links, SimulationConfig::default()) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid graph: {err}");
            return;
        }
    };

    let start = Instant::now();
    loop {
        match sim.tick() {
            TickOutcome::Running if sim.ticks() % 50 == 0 => {
                println!("  tick {:4}  alpha {:.4}", sim.ticks(), sim.alpha());
            }
            TickOutcome::Running => {}
            TickOutcome::SteadyState | TickOutcome::Idle => break,
        }
    }
    let elapsed = start.elapsed();

    let mut registry = NodeRegistry::new();
    for (id, p) in sim.positions() {
        registry.insert(id, NodeInfo::new(Vec3::new(p.x, 0.0, p.z), "inventory", None));
    }

    println!(
        "Settled after {} ticks in {:.2?} ({:.2?}/tick)",
        sim.ticks(),
        elapsed,
        elapsed / sim.ticks().max(1)
    );
    if let Some(bounds) = registry.bounds() {
        println!("Extent: {:?}", bounds.extent());
    }
}
