//! Adapter between the force layout and the scene.
//!
//! At most one simulation is live per scene. Restarting stops the previous
//! run before the new one is built, so two simulations never write the
//! registry in the same frame.

use topograph_layout::{ForceSimulation, NodeRegistry, PlanarPoint, SimulationConfig, TickOutcome};

use crate::error::SceneResult;
use crate::reconciler::SceneContext;
use crate::settings::SceneSettings;

#[derive(Debug, Default)]
pub struct SimulationAdapter {
    sim: Option<ForceSimulation>,
    settled: bool,
    restarts: u32,
}

impl SimulationAdapter {
    /// Replace any running simulation with a fresh one seeded from the
    /// registry's current ground-plane positions.
    pub fn restart(
        &mut self,
        registry: &NodeRegistry,
        links: Vec<(String, String)>,
        config: &SimulationConfig,
    ) {
        self.stop();
        self.settled = false;

        if registry.is_empty() {
            self.sim = None;
            return;
        }

        let nodes = registry
            .iter()
            .map(|(id, info)| {
                (
                    id.to_string(),
                    Some(PlanarPoint::new(info.position.x, info.position.z)),
                )
            })
            .collect::<Vec<_>>();

        match ForceSimulation::new(nodes, links, config.clone()) {
            Ok(sim) => {
                self.restarts += 1;
                tracing::info!(
                    nodes = sim.node_count(),
                    links = sim.link_count(),
                    restarts = self.restarts,
                    "Started force simulation"
                );
                self.sim = Some(sim);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start force simulation");
                self.sim = None;
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(sim) = self.sim.as_mut() {
            if sim.is_running() {
                tracing::info!(ticks = sim.ticks(), "Stopping force simulation");
            }
            sim.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.sim.as_ref().is_some_and(ForceSimulation::is_running)
    }

    /// Whether the last run reached steady state.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn alpha(&self) -> Option<f32> {
        self.sim.as_ref().map(ForceSimulation::alpha)
    }

    /// Pin an entity where it was dropped. No-op without a simulation.
    pub fn set_position(&mut self, id: &str, x: f32, z: f32) -> SceneResult<()> {
        if let Some(sim) = self.sim.as_mut() {
            sim.set_position(id, PlanarPoint::new(x, z))?;
        }
        Ok(())
    }

    fn tick(&mut self) -> TickOutcome {
        let Some(sim) = self.sim.as_mut() else {
            return TickOutcome::Idle;
        };
        let outcome = sim.tick();
        if outcome == TickOutcome::SteadyState {
            self.settled = true;
        }
        outcome
    }
}

/// Advance the scene's simulation one tick and write the new ground-plane
/// positions through to the registry, the entity objects and every connector.
pub fn advance(ctx: &mut SceneContext, settings: &SceneSettings) -> TickOutcome {
    let outcome = ctx.simulation.tick();
    if outcome == TickOutcome::Idle {
        return outcome;
    }

    let moved: Vec<(String, PlanarPoint)> = ctx
        .simulation
        .sim
        .as_ref()
        .map(|sim| sim.positions().map(|(id, p)| (id.to_string(), p)).collect())
        .unwrap_or_default();

    for (id, p) in &moved {
        // Entities removed since the restart are simply not written back.
        if ctx.registry.set_planar(id, p.x, p.z).is_ok() {
            ctx.sync_entity_object(id);
        }
    }
    ctx.rebuild_all_connectors(settings);
    outcome
}
