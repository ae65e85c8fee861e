use super::factory::{CommandLibrary, fill_defaults};
use super::model::{Connection, Graph, NodeInstance, Position};
use crate::error::GraphError;
use crate::value::Values;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Persisted form of one node instance. Sockets are derived and not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    /// Type tag of the command in the library.
    pub command: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub values: Values,
    #[serde(default = "default_true")]
    pub expanded: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

/// Persisted form of a whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Snapshot(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::Snapshot(e.to_string()))
    }
}

impl Graph {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id.clone(),
                command: node.definition.type_tag.clone(),
                name: node.name.clone(),
                position: node.position,
                values: node.values.clone(),
                expanded: node.expanded,
                visible: node.visible,
            })
            .collect();
        GraphSnapshot {
            nodes,
            connections: self.connections.clone(),
        }
    }

    /// Rebuilds a graph, re-linking every node to its library definition.
    ///
    /// Missing values are filled from defaults and sockets are regenerated.
    /// Connections are restored as stored; ones that no longer match a socket
    /// are kept but reported, since resolution and generation tolerate them.
    pub fn from_snapshot(
        snapshot: GraphSnapshot,
        library: &CommandLibrary,
    ) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        for saved in snapshot.nodes {
            let definition = Arc::clone(library.get(&saved.command)?);
            let mut values = saved.values;
            fill_defaults(&definition.schema, &mut values);
            let mut node = NodeInstance {
                id: saved.id,
                name: saved.name,
                definition,
                values,
                expanded: saved.expanded,
                visible: saved.visible,
                position: saved.position,
                sockets: Default::default(),
            };
            node.refresh_sockets();
            graph.add_node(node)?;
        }

        for connection in &snapshot.connections {
            let source_ok = graph
                .node(&connection.source)
                .is_some_and(|n| n.sockets.output(&connection.source_key).is_some());
            let target_ok = graph
                .node(&connection.target)
                .is_some_and(|n| n.sockets.input(&connection.target_key).is_some());
            if !(source_ok && target_ok) {
                warn!(connection = %connection.id(), "snapshot connection does not match a socket");
            }
        }
        graph.connections = snapshot.connections;
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        self.to_snapshot().to_json()
    }

    pub fn from_json(json: &str, library: &CommandLibrary) -> Result<Self, GraphError> {
        Self::from_snapshot(GraphSnapshot::from_json(json)?, library)
    }
}
