//! Force-directed layout on the ground plane.
//!
//! Velocity-Verlet style integration with the link, many-body (Barnes-Hut),
//! collision, centering and positional forces. Height is never touched.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::placement::phyllotaxis;
use crate::quadtree::{jiggle, ChargeParams, PlanarPoint, QuadTree};
use crate::Result;

/// Force constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Starting temperature.
    pub alpha: f32,
    /// The simulation settles once alpha drops below this.
    pub alpha_min: f32,
    /// Fraction of the remaining alpha removed per tick.
    pub alpha_decay: f32,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,
    /// Rest length of link springs.
    pub link_distance: f32,
    /// Many-body charge per node (negative repels).
    pub charge_strength: f32,
    /// Barnes-Hut accuracy criterion.
    pub theta: f32,
    /// Maximum many-body interaction distance.
    pub distance_max: f32,
    /// Minimum separation between any two nodes.
    pub collide_radius: f32,
    /// Pull toward the origin per axis.
    pub position_strength: f32,
    /// Maximum quadtree depth.
    pub max_tree_depth: usize,
    /// Seed for the jiggle generator.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.01_f32;
        Self {
            alpha: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            link_distance: 30.0,
            charge_strength: -30.0,
            theta: 0.9,
            distance_max: 300.0,
            collide_radius: 10.0,
            position_strength: 0.01,
            max_tree_depth: 12,
            seed: 0x5EED,
        }
    }
}

/// Result of a single [`ForceSimulation::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Positions moved and the layout is still cooling.
    Running,
    /// The layout just settled. Returned exactly once per run.
    SteadyState,
    /// Nothing to do: settled or stopped.
    Idle,
}

#[derive(Debug, Clone)]
struct SimNode {
    id: String,
    x: f32,
    z: f32,
    vx: f32,
    vz: f32,
}

#[derive(Debug, Clone, Copy)]
struct SimLink {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

/// A running (or settled) force layout.
pub struct ForceSimulation {
    config: SimulationConfig,
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    index: HashMap<String, usize>,
    alpha: f32,
    running: bool,
    ticks: u32,
    rng: StdRng,
}

impl ForceSimulation {
    /// Build a simulation over `nodes` (id, optional starting position) and
    /// `links` (source id, target id).
    ///
    /// Nodes without a position start on the phyllotaxis spiral.
    pub fn new(
        nodes: impl IntoIterator<Item = (String, Option<PlanarPoint>)>,
        links: impl IntoIterator<Item = (String, String)>,
        config: SimulationConfig,
    ) -> Result<Self> {
        let mut sim_nodes = Vec::new();
        let mut index = HashMap::new();

        for (i, (id, start)) in nodes.into_iter().enumerate() {
            if index.contains_key(&id) {
                return Err(LayoutError::InvalidGraph(format!("duplicate node id {id}")));
            }
            let start = start.unwrap_or_else(|| {
                let p = phyllotaxis(i, 0.0);
                PlanarPoint::new(p.x, p.z)
            });
            if !(start.x.is_finite() && start.z.is_finite()) {
                return Err(LayoutError::NonFinite(id));
            }
            index.insert(id.clone(), sim_nodes.len());
            sim_nodes.push(SimNode {
                id,
                x: start.x,
                z: start.z,
                vx: 0.0,
                vz: 0.0,
            });
        }

        let mut pairs = Vec::new();
        for (source, target) in links {
            let s = *index
                .get(&source)
                .ok_or_else(|| LayoutError::UnknownNode(source.clone()))?;
            let t = *index
                .get(&target)
                .ok_or_else(|| LayoutError::UnknownNode(target.clone()))?;
            pairs.push((s, t));
        }

        let mut degree = vec![0u32; sim_nodes.len()];
        for &(s, t) in &pairs {
            degree[s] += 1;
            degree[t] += 1;
        }
        let links: Vec<SimLink> = pairs
            .into_iter()
            .map(|(source, target)| {
                let (ds, dt) = (degree[source] as f32, degree[target] as f32);
                SimLink {
                    source,
                    target,
                    strength: 1.0 / ds.min(dt),
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        tracing::debug!(
            nodes = sim_nodes.len(),
            links = links.len(),
            "Created force simulation"
        );

        Ok(Self {
            alpha: config.alpha,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes: sim_nodes,
            links,
            index,
            running: true,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Halt without reaching steady state. Further ticks are idle.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn position(&self, id: &str) -> Option<PlanarPoint> {
        self.index
            .get(id)
            .map(|&i| PlanarPoint::new(self.nodes[i].x, self.nodes[i].z))
    }

    /// Current positions in insertion order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, PlanarPoint)> {
        self.nodes
            .iter()
            .map(|n| (n.id.as_str(), PlanarPoint::new(n.x, n.z)))
    }

    /// Move a node (e.g. after a drag) and drop its momentum.
    pub fn set_position(&mut self, id: &str, point: PlanarPoint) -> Result<()> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))?;
        let node = &mut self.nodes[i];
        node.x = point.x;
        node.z = point.z;
        node.vx = 0.0;
        node.vz = 0.0;
        Ok(())
    }

    /// Advance one step.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;
        self.ticks += 1;

        self.apply_link_force();
        self.apply_many_body_force();
        self.apply_collide_force();
        self.apply_position_force();

        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            node.vx *= keep;
            node.vz *= keep;
            node.x += node.vx;
            node.z += node.vz;
        }

        self.apply_center_force();

        if self.alpha < self.config.alpha_min {
            self.running = false;
            tracing::info!(ticks = self.ticks, "Force simulation reached steady state");
            return TickOutcome::SteadyState;
        }
        TickOutcome::Running
    }

    /// Tick until settled or `max_ticks` elapse. Returns the ticks run.
    pub fn run_to_convergence(&mut self, max_ticks: u32) -> u32 {
        let mut ran = 0;
        while ran < max_ticks {
            match self.tick() {
                TickOutcome::Running => ran += 1,
                TickOutcome::SteadyState => return ran + 1,
                TickOutcome::Idle => break,
            }
        }
        ran
    }

    fn apply_link_force(&mut self) {
        for link in &self.links {
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut z = t.z + t.vz - s.z - s.vz;
            if x == 0.0 {
                x = jiggle(&mut self.rng);
            }
            if z == 0.0 {
                z = jiggle(&mut self.rng);
            }
            let mut l = (x * x + z * z).sqrt();
            l = (l - self.config.link_distance) / l * self.alpha * link.strength;
            x *= l;
            z *= l;

            let t = &mut self.nodes[link.target];
            t.vx -= x * link.bias;
            t.vz -= z * link.bias;
            let s = &mut self.nodes[link.source];
            s.vx += x * (1.0 - link.bias);
            s.vz += z * (1.0 - link.bias);
        }
    }

    fn apply_many_body_force(&mut self) {
        if self.nodes.len() < 2 {
            return;
        }
        let points: Vec<PlanarPoint> = self
            .nodes
            .iter()
            .map(|n| PlanarPoint::new(n.x, n.z))
            .collect();
        let tree = QuadTree::build(&points, self.config.max_tree_depth);
        let params = ChargeParams {
            strength: self.config.charge_strength,
            theta: self.config.theta,
            distance_max: self.config.distance_max,
            distance_min: 1.0,
        };
        for i in 0..self.nodes.len() {
            let (dvx, dvz) = tree.charge_on(i, &points, params, self.alpha, &mut self.rng);
            self.nodes[i].vx += dvx;
            self.nodes[i].vz += dvz;
        }
    }

    fn apply_collide_force(&mut self) {
        let r = self.config.collide_radius;
        if r <= 0.0 || self.nodes.len() < 2 {
            return;
        }
        let min_dist = 2.0 * r;
        let predicted: Vec<PlanarPoint> = self
            .nodes
            .iter()
            .map(|n| PlanarPoint::new(n.x + n.vx, n.z + n.vz))
            .collect();
        let tree = QuadTree::build(&predicted, self.config.max_tree_depth);

        for i in 0..self.nodes.len() {
            for j in tree.within(predicted[i], min_dist, &predicted) {
                // Each pair is resolved once, from its lower index.
                if j <= i {
                    continue;
                }
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                let mut x = a.x + a.vx - b.x - b.vx;
                let mut z = a.z + a.vz - b.z - b.vz;
                let mut l = x * x + z * z;
                if l >= min_dist * min_dist {
                    continue;
                }
                if x == 0.0 {
                    x = jiggle(&mut self.rng);
                    l += x * x;
                }
                if z == 0.0 {
                    z = jiggle(&mut self.rng);
                    l += z * z;
                }
                let dist = l.sqrt();
                if dist == 0.0 {
                    continue;
                }
                let k = (min_dist - dist) / dist * 0.5;
                x *= k;
                z *= k;
                self.nodes[i].vx += x;
                self.nodes[i].vz += z;
                self.nodes[j].vx -= x;
                self.nodes[j].vz -= z;
            }
        }
    }

    fn apply_position_force(&mut self) {
        let k = self.config.position_strength * self.alpha;
        for node in &mut self.nodes {
            node.vx -= node.x * k;
            node.vz -= node.z * k;
        }
    }

    fn apply_center_force(&mut self) {
        let n = self.nodes.len();
        if n == 0 {
            return;
        }
        let (sx, sz) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sz), node| (sx + node.x, sz + node.z));
        let (mx, mz) = (sx / n as f32, sz / n as f32);
        for node in &mut self.nodes {
            node.x -= mx;
            node.z -= mz;
        }
    }
}

impl std::fmt::Debug for ForceSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceSimulation")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("alpha", &self.alpha)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> ForceSimulation {
        let nodes = (0..n).map(|i| (format!("n{i}"), None));
        let links = (1..n).map(|i| (format!("n{}", i - 1), format!("n{i}")));
        ForceSimulation::new(nodes, links, SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_converges_and_reports_steady_state_once() {
        let mut sim = chain(6);
        let mut steady = 0;
        for _ in 0..1000 {
            match sim.tick() {
                TickOutcome::SteadyState => steady += 1,
                TickOutcome::Idle => break,
                TickOutcome::Running => {}
            }
        }
        assert_eq!(steady, 1);
        assert!(!sim.is_running());
        assert_eq!(sim.tick(), TickOutcome::Idle);
        assert!(sim.alpha() < sim.config().alpha_min);
    }

    #[test]
    fn test_alpha_decays() {
        let mut sim = chain(3);
        let before = sim.alpha();
        sim.tick();
        assert!(sim.alpha() < before);
    }

    #[test]
    fn test_stop_makes_ticks_idle() {
        let mut sim = chain(3);
        sim.stop();
        assert_eq!(sim.tick(), TickOutcome::Idle);
        assert_eq!(sim.run_to_convergence(10), 0);
    }

    #[test]
    fn test_positions_stay_finite_and_separate() {
        let nodes = (0..5).map(|i| (format!("n{i}"), Some(PlanarPoint::new(0.0, 0.0))));
        let mut sim =
            ForceSimulation::new(nodes, Vec::new(), SimulationConfig::default()).unwrap();
        sim.run_to_convergence(500);
        let points: Vec<_> = sim.positions().map(|(_, p)| p).collect();
        assert!(points.iter().all(|p| p.x.is_finite() && p.z.is_finite()));
        let spread = points
            .iter()
            .map(|p| (p.x * p.x + p.z * p.z).sqrt())
            .fold(0.0_f32, f32::max);
        assert!(spread > 1.0, "coincident nodes should separate");
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let mut a = chain(8);
        let mut b = chain(8);
        a.run_to_convergence(100);
        b.run_to_convergence(100);
        assert_eq!(a.position("n7"), b.position("n7"));
    }

    #[test]
    fn test_unknown_link_endpoint_is_an_error() {
        let result = ForceSimulation::new(
            vec![("a".to_string(), None)],
            vec![("a".to_string(), "b".to_string())],
            SimulationConfig::default(),
        );
        assert!(matches!(result, Err(LayoutError::UnknownNode(id)) if id == "b"));
    }

    #[test]
    fn test_set_position() {
        let mut sim = chain(2);
        sim.set_position("n1", PlanarPoint::new(50.0, -5.0)).unwrap();
        assert_eq!(sim.position("n1"), Some(PlanarPoint::new(50.0, -5.0)));
        assert!(sim.set_position("nope", PlanarPoint::default()).is_err());
    }

    #[test]
    fn test_collision_pushes_close_pair_apart() {
        let config = SimulationConfig {
            charge_strength: 0.0,
            position_strength: 0.0,
            ..SimulationConfig::default()
        };
        let far = (0..30).map(|i| {
            let point = PlanarPoint::new(200.0 + (i % 6) as f32 * 40.0, (i / 6) as f32 * 40.0);
            (format!("far{i}"), Some(point))
        });
        let nodes = [
            ("a".to_string(), Some(PlanarPoint::new(0.0, 0.0))),
            ("b".to_string(), Some(PlanarPoint::new(4.0, 0.0))),
        ]
        .into_iter()
        .chain(far);
        let mut sim = ForceSimulation::new(nodes, Vec::new(), config).unwrap();
        sim.tick();

        let a = sim.position("a").unwrap();
        let b = sim.position("b").unwrap();
        assert!(b.x - a.x > 4.0, "overlapping pair should separate");
        assert!((a.z - b.z).abs() < 1e-3);
    }
}
