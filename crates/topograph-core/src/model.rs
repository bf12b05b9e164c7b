//! Wire types for graph snapshots fetched from the graph server.
//!
//! A snapshot is an immutable value: every poll or time-travel step produces
//! a fresh [`GraphModel`], and identity across snapshots is carried only by
//! vertex and edge ids.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ModelError, ModelResult};

/// Well-known layer ids.
pub mod layers {
    /// Devices and other inventory objects.
    pub const INVENTORY: &str = "inventory";
    /// Alarms raised against inventory objects.
    pub const ALARMS: &str = "alarms";
    /// Situations correlating several alarms.
    pub const SITUATIONS: &str = "situations";
}

/// Well-known edge types.
pub mod edge_types {
    /// Child device → parent device.
    pub const PARENT: &str = "parent";
    /// Device ↔ peer device.
    pub const PEER: &str = "peer";
    /// Alarm → inventory object it was raised on.
    pub const ALARM_TO_IO: &str = "alarm-to-io";
    /// Situation → constituent alarm.
    pub const SITUATION_TO_ALARM: &str = "situation-to-alarm";
}

// =============================================================================
// Vertex
// =============================================================================

/// Kind of entity a vertex represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VertexKind {
    /// Generic topology node.
    #[default]
    Node,
    /// An alarm.
    Alarm,
    /// A situation (alarm correlation).
    Situation,
    /// A physical or logical inventory device.
    InventoryDevice,
    /// Any type string the viewer does not know about.
    Other(String),
}

impl VertexKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            VertexKind::Node => "node",
            VertexKind::Alarm => "alarm",
            VertexKind::Situation => "situation",
            VertexKind::InventoryDevice => "inventory-device",
            VertexKind::Other(other) => other,
        }
    }
}

impl From<String> for VertexKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "node" => VertexKind::Node,
            "alarm" => VertexKind::Alarm,
            "situation" => VertexKind::Situation,
            "inventory-device" => VertexKind::InventoryDevice,
            _ => VertexKind::Other(value),
        }
    }
}

impl From<VertexKind> for String {
    fn from(value: VertexKind) -> Self {
        value.as_str().to_string()
    }
}

/// Alarm/situation severity carried in the `severity` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Indeterminate,
    Cleared,
    Normal,
    Warning,
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// All severities, least to most severe.
    pub const ALL: [Severity; 7] = [
        Severity::Indeterminate,
        Severity::Cleared,
        Severity::Normal,
        Severity::Warning,
        Severity::Minor,
        Severity::Major,
        Severity::Critical,
    ];

    /// Parse a severity label. Unknown labels map to `Indeterminate`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "major" => Severity::Major,
            "minor" => Severity::Minor,
            "warning" => Severity::Warning,
            "normal" => Severity::Normal,
            "cleared" => Severity::Cleared,
            _ => Severity::Indeterminate,
        }
    }

    /// Lowercase label as sent by the server.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Normal => "normal",
            Severity::Cleared => "cleared",
            Severity::Indeterminate => "indeterminate",
        }
    }

    /// Display colour as a hex string.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Critical => "#FC1717",
            Severity::Major => "#DE582A",
            Severity::Minor => "#FFBD00",
            Severity::Warning => "#FFF000",
            Severity::Normal => "#7DD18B",
            Severity::Cleared => "#71B1F1",
            Severity::Indeterminate => "#E6E6E6",
        }
    }
}

/// Key performance indicator attached to a vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "resourceId", default)]
    pub resource_id: String,
}

/// A graph vertex: device, alarm, situation or generic node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Stable identity across snapshots.
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: VertexKind,
    /// Layer that decides placement tier and role.
    #[serde(default)]
    pub layer_id: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
}

impl Vertex {
    /// Create a vertex with no attributes or KPIs.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: VertexKind,
        layer_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            layer_id: layer_id.into(),
            attributes: HashMap::new(),
            kpis: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Severity, if the vertex carries one.
    pub fn severity(&self) -> Option<Severity> {
        self.attribute("severity").map(Severity::parse)
    }
}

// =============================================================================
// Edge / Layer
// =============================================================================

/// A directed relationship between two vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Stable identity across snapshots. Filled in by [`GraphModel::from_json`]
    /// when the server leaves it blank.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Edge {
    /// Create an edge with an explicit id.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: String::new(),
            attributes: HashMap::new(),
        }
    }

    /// Id the server derives for edges created without one.
    pub fn derived_id(kind: &str, source_id: &str, target_id: &str) -> String {
        format!("edge-{kind}-{source_id}-{target_id}")
    }
}

/// A display tier grouping vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Tier order. Some servers send it as a string.
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: i32,
}

impl Layer {
    pub fn new(id: impl Into<String>, label: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            order,
        }
    }
}

fn lenient_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => i32::try_from(v).map_err(serde::de::Error::custom),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// GraphModel
// =============================================================================

/// One fetched snapshot of the topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl GraphModel {
    /// Decode a fetch payload, deriving ids for edges that arrive without one.
    pub fn from_json(payload: &str) -> ModelResult<Self> {
        let mut model: GraphModel = serde_json::from_str(payload)?;
        for edge in &mut model.edges {
            if edge.id.is_empty() {
                edge.id = Edge::derived_id(&edge.kind, &edge.source_id, &edge.target_id);
            }
        }
        Ok(model)
    }

    /// True when the snapshot has no vertices (time-travel uses this to skip gaps).
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    /// Vertex lookup that reports a typed error.
    pub fn require_vertex(&self, id: &str) -> ModelResult<&Vertex> {
        self.vertex(id)
            .ok_or_else(|| ModelError::VertexNotFound { id: id.to_string() })
    }

    /// Vertices whose `layer_id` matches, in snapshot order.
    pub fn vertices_in_layer<'a>(&'a self, layer_id: &'a str) -> impl Iterator<Item = &'a Vertex> {
        self.vertices.iter().filter(move |v| v.layer_id == layer_id)
    }

    /// Edges of one type, in snapshot order.
    pub fn edges_of_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn vertex_ids(&self) -> HashSet<&str> {
        self.vertices.iter().map(|v| v.id.as_str()).collect()
    }

    pub fn edge_ids(&self) -> HashSet<&str> {
        self.edges.iter().map(|e| e.id.as_str()).collect()
    }

    /// Layers indexed by id.
    pub fn layers_by_id(&self) -> HashMap<&str, &Layer> {
        self.layers.iter().map(|l| (l.id.as_str(), l)).collect()
    }

    /// Order of a layer, if the snapshot declares it.
    pub fn layer_order(&self, layer_id: &str) -> Option<i32> {
        self.layers.iter().find(|l| l.id == layer_id).map(|l| l.order)
    }

    pub fn has_layer(&self, layer_id: &str) -> bool {
        self.layers.iter().any(|l| l.id == layer_id)
    }

    /// Convert to a petgraph `StableDiGraph` keyed by vertex id.
    /// Edges whose endpoints are missing are left out.
    pub fn to_petgraph(&self) -> (StableDiGraph<String, String>, HashMap<String, NodeIndex>) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for vertex in &self.vertices {
            let idx = graph.add_node(vertex.id.clone());
            id_to_index.insert(vertex.id.clone(), idx);
        }

        for edge in &self.edges {
            if let (Some(&from), Some(&to)) =
                (id_to_index.get(&edge.source_id), id_to_index.get(&edge.target_id))
            {
                graph.add_edge(from, to, edge.kind.clone());
            }
        }

        (graph, id_to_index)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// A labelled instant on the time slider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnnotation {
    pub timestamp: i64,
    #[serde(default)]
    pub label: String,
}

/// Time window covered by a graph's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeMetadata {
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub annotations: Vec<TemporalAnnotation>,
}

impl TimeMetadata {
    /// Default point in time for a fresh viewer.
    pub fn midpoint_ms(&self) -> i64 {
        self.start_ms + (self.end_ms - self.start_ms) / 2
    }

    pub fn contains(&self, time_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&time_ms)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.start_ms > self.end_ms {
            return Err(ModelError::InvalidTimeWindow {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            });
        }
        Ok(())
    }
}

/// Response of the `/{id}/metadata` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub time_metadata: TimeMetadata,
}
