use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Flow;
use crate::types::{EdgeId, NodeId, PortId, Position};

/// A canvas gesture affecting one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    Position { id: NodeId, position: Position },
    Select { id: NodeId, selected: bool },
    Remove { id: NodeId },
}

/// A canvas gesture affecting one edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Add { edge: NewEdge },
    Remove { id: EdgeId },
    Select { id: EdgeId, selected: bool },
}

/// A requested connection. Missing ids are generated; missing ports mean the
/// node's default port in that direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<PortId>,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortId>,
}

impl NewEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: None,
            source: source.into(),
            source_port: None,
            target: target.into(),
            target_port: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn from_port(mut self, port: impl Into<PortId>) -> Self {
        self.source_port = Some(port.into());
        self
    }

    pub fn to_port(mut self, port: impl Into<PortId>) -> Self {
        self.target_port = Some(port.into());
        self
    }
}

/// Why a connection was not added. The graph is left unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionRejected {
    #[error("node {0} cannot connect to itself")]
    SelfLoop(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {node} has no {direction} port {port}")]
    UnknownPort {
        node: NodeId,
        port: String,
        direction: &'static str,
    },

    #[error("port {port} on node {node} already has an outgoing edge")]
    FanOutExceeded { node: NodeId, port: PortId },

    #[error("edge id {0} is already in use")]
    DuplicateEdgeId(EdgeId),
}

/// Result of applying an edge change batch: the new graph plus every add that
/// was turned away.
#[derive(Debug, Clone)]
pub struct EdgeChangeOutcome {
    pub flow: Flow,
    pub rejected: Vec<ConnectionRejected>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changes_decode_from_canvas_json() {
        let change: NodeChange = serde_json::from_value(json!({
            "type": "position",
            "id": "node_2",
            "position": { "x": 10.0, "y": 20.5 }
        }))
        .unwrap();
        assert_eq!(
            change,
            NodeChange::Position {
                id: NodeId::from("node_2"),
                position: Position::new(10.0, 20.5),
            }
        );

        let change: EdgeChange = serde_json::from_value(json!({
            "type": "add",
            "edge": { "source": "node_1", "target": "node_2", "sourcePort": "yes" }
        }))
        .unwrap();
        assert_eq!(
            change,
            EdgeChange::Add {
                edge: NewEdge::new("node_1", "node_2").from_port("yes"),
            }
        );
    }
}
