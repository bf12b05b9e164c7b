//! Synthetic traffic markers travelling between random entities.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use topograph_layout::Vec3;

use crate::reconciler::SceneContext;
use crate::scene_graph::{ObjectId, SceneObject, Shape};
use crate::settings::SettingsStyle;
use crate::tween::{Easing, Tween};

const FLOW_RADIUS: f32 = 1.5;
const FLOW_COLOR: &str = "#FFFFFF";

#[derive(Debug, Clone)]
struct Flow {
    object: ObjectId,
    tween: Tween<Vec3>,
}

/// Spawns one marker per tick (up to `max_flows` alive) and retires
/// markers whose tween has finished.
#[derive(Debug)]
pub struct FlowSimulator {
    rng: StdRng,
    flows: Vec<Flow>,
    group: Option<ObjectId>,
}

impl FlowSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            flows: Vec::new(),
            group: None,
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    fn group(&mut self, ctx: &mut SceneContext) -> ObjectId {
        match self.group {
            Some(group) if ctx.scene.contains(group) => group,
            _ => {
                let group = ctx.scene.add(None, SceneObject::group("flows"));
                self.group = Some(group);
                group
            }
        }
    }

    /// Advance every marker, drop finished ones and spawn a new one.
    /// Returns the number of markers alive.
    pub fn tick(&mut self, ctx: &mut SceneContext, now_ms: f64, style: &SettingsStyle) -> usize {
        let mut alive = Vec::with_capacity(self.flows.len());
        for flow in self.flows.drain(..) {
            if flow.tween.is_finished(now_ms) {
                ctx.scene.remove(flow.object);
                continue;
            }
            if let Some(obj) = ctx.scene.get_mut(flow.object) {
                obj.position = flow.tween.sample(now_ms);
            }
            alive.push(flow);
        }
        self.flows = alive;

        if self.flows.len() < style.max_flows {
            self.spawn(ctx, now_ms, style.flow_duration_ms);
        }
        self.flows.len()
    }

    fn spawn(&mut self, ctx: &mut SceneContext, now_ms: f64, duration_ms: f64) {
        let ids: Vec<&str> = ctx.registry.ids().collect();
        if ids.len() < 2 {
            return;
        }
        let pair: Vec<&str> = ids.choose_multiple(&mut self.rng, 2).copied().collect();
        let (Some(from), Some(to)) = (
            ctx.registry.get_position(pair[0]),
            ctx.registry.get_position(pair[1]),
        ) else {
            return;
        };

        let group = self.group(ctx);
        let object = ctx.scene.add(
            Some(group),
            SceneObject::new(
                "flow",
                Shape::Sphere {
                    radius: FLOW_RADIUS,
                },
                from,
                FLOW_COLOR,
            ),
        );
        self.flows.push(Flow {
            object,
            tween: Tween::new(from, to, now_ms, duration_ms, Easing::QuadraticIn),
        });
    }

    /// Remove every marker from the scene.
    pub fn clear(&mut self, ctx: &mut SceneContext) {
        if let Some(group) = self.group.take() {
            ctx.scene.remove(group);
        }
        self.flows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_layout::NodeInfo;

    fn context(n: usize) -> SceneContext {
        let mut ctx = SceneContext::new();
        for i in 0..n {
            ctx.registry.insert(
                format!("n{i}"),
                NodeInfo::new(Vec3::new(i as f32 * 10.0, 0.0, 0.0), "inventory", None),
            );
        }
        ctx
    }

    #[test]
    fn test_caps_alive_markers() {
        let mut ctx = context(5);
        let mut flows = FlowSimulator::new(7);
        let style = SettingsStyle {
            max_flows: 3,
            ..Default::default()
        };
        for frame in 0..10 {
            flows.tick(&mut ctx, frame as f64, &style);
        }
        assert_eq!(flows.len(), 3);
    }

    #[test]
    fn test_finished_markers_are_removed() {
        let mut ctx = context(2);
        let mut flows = FlowSimulator::new(1);
        let style = SettingsStyle::default();
        flows.tick(&mut ctx, 0.0, &style);
        assert_eq!(flows.len(), 1);
        let before = ctx.scene().len();

        // First marker retires, a new one replaces it.
        flows.tick(&mut ctx, 1000.0, &style);
        assert_eq!(flows.len(), 1);
        assert_eq!(ctx.scene().len(), before);

        flows.clear(&mut ctx);
        assert!(flows.is_empty());
        assert!(ctx.scene().find_by_name("flows").is_none());
    }

    #[test]
    fn test_needs_two_entities() {
        let mut ctx = context(1);
        let mut flows = FlowSimulator::new(1);
        assert_eq!(flows.tick(&mut ctx, 0.0, &SettingsStyle::default()), 0);
    }
}
