//! Authoritative id → position table for rendered entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::{Aabb, Vec3};
use crate::Result;

/// Registry entry for one rendered entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub position: Vec3,
    pub layer_id: String,
    pub parent_id: Option<String>,
}

impl NodeInfo {
    pub fn new(position: Vec3, layer_id: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            position,
            layer_id: layer_id.into(),
            parent_id,
        }
    }
}

/// Id-keyed table of [`NodeInfo`], iterated in id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeInfo>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&NodeInfo> {
        self.nodes.get(id)
    }

    pub fn get_position(&self, id: &str) -> Option<Vec3> {
        self.nodes.get(id).map(|n| n.position)
    }

    /// Insert or replace an entry, returning the previous one.
    pub fn insert(&mut self, id: impl Into<String>, info: NodeInfo) -> Option<NodeInfo> {
        self.nodes.insert(id.into(), info)
    }

    /// Move an existing entry.
    pub fn set_position(&mut self, id: &str, position: Vec3) -> Result<()> {
        if !position.is_finite() {
            return Err(LayoutError::NonFinite(id.to_string()));
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Move only the ground-plane coordinates, keeping the height tier.
    pub fn set_planar(&mut self, id: &str, x: f32, z: f32) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))?;
        if !(x.is_finite() && z.is_finite()) {
            return Err(LayoutError::NonFinite(id.to_string()));
        }
        node.position.x = x;
        node.position.z = z;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<NodeInfo> {
        self.nodes.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeInfo)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ids whose `parent_id` is `id`.
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        self.nodes
            .iter()
            .filter(move |(_, n)| n.parent_id.as_deref() == Some(id))
            .map(|(k, _)| k.as_str())
    }

    /// Bounding box over every registered position.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.nodes.values().map(|n| &n.position))
    }

    /// Snapshot of every position, keyed by id.
    pub fn positions(&self) -> BTreeMap<String, [f32; 3]> {
        self.nodes
            .iter()
            .map(|(k, n)| (k.clone(), n.position.to_array()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_move_remove() {
        let mut registry = NodeRegistry::new();
        registry.insert("a", NodeInfo::new(Vec3::new(1.0, 2.0, 3.0), "inventory", None));
        registry.insert(
            "b",
            NodeInfo::new(Vec3::ZERO, "alarms", Some("a".to_string())),
        );

        assert_eq!(registry.get_position("a"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(registry.children_of("a").collect::<Vec<_>>(), vec!["b"]);

        registry.set_planar("a", 10.0, -10.0).unwrap();
        assert_eq!(registry.get_position("a"), Some(Vec3::new(10.0, 2.0, -10.0)));

        assert!(matches!(
            registry.set_position("zzz", Vec3::ZERO),
            Err(LayoutError::UnknownNode(_))
        ));
        assert!(matches!(
            registry.set_position("a", Vec3::new(f32::NAN, 0.0, 0.0)),
            Err(LayoutError::NonFinite(_))
        ));

        assert!(registry.remove("b").is_some());
        assert!(registry.get_position("b").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bounds() {
        let mut registry = NodeRegistry::new();
        assert!(registry.bounds().is_none());
        registry.insert("a", NodeInfo::new(Vec3::new(-5.0, 0.0, 0.0), "x", None));
        registry.insert("b", NodeInfo::new(Vec3::new(5.0, 20.0, 1.0), "x", None));
        let bounds = registry.bounds().unwrap();
        assert_eq!(bounds.max_extent(), 20.0);
    }
}
