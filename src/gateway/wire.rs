use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::graph::{Edge, Flow, Node};
use crate::nodes::{NodeData, NodeType};
use crate::types::{EdgeId, FlowId, NodeId, PortId, Position};

/// Flow document as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub edges: Vec<WireEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WireEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlowMeta {
    pub id: String,
    pub name: String,
}

/// `PUT /flows/:id` body; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<WireNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<WireEdge>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlowListEnvelope {
    pub flows: Vec<FlowMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlowEnvelope {
    pub flow: WireFlow,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEnvelope {
    pub media_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
}

impl WireFlow {
    /// Wire form of `flow`. Temporary ids are not sent.
    pub fn from_flow(flow: &Flow) -> Result<Self, GatewayError> {
        let nodes = flow
            .nodes()
            .iter()
            .map(|node| -> Result<WireNode, GatewayError> {
                Ok(WireNode {
                    id: node.id.to_string(),
                    node_type: node.node_type(),
                    position: node.position,
                    data: node.data.to_value()?,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        let edges = flow
            .edges()
            .iter()
            .map(|edge| WireEdge {
                id: edge.id.to_string(),
                source: edge.source.to_string(),
                target: edge.target.to_string(),
                source_handle: edge.source_port.as_ref().map(ToString::to_string),
                target_handle: edge.target_port.as_ref().map(ToString::to_string),
            })
            .collect();

        Ok(Self {
            id: flow.id.persisted_id().map(str::to_string),
            name: flow.name.clone(),
            nodes,
            edges,
        })
    }

    /// Model form of a backend document; the document must carry an id.
    pub fn into_flow(self) -> Result<Flow, GatewayError> {
        let WireFlow { id, name, nodes, edges } = self;
        let id = id.ok_or(GatewayError::InvalidResponse("flow without id"))?;
        Self::assemble(FlowId::persisted(id), name, nodes, edges)
    }

    /// Like [`WireFlow::into_flow`], but documents without an id become
    /// unsaved flows with a temporary id.
    pub fn into_draft(self) -> Result<Flow, GatewayError> {
        let WireFlow { id, name, nodes, edges } = self;
        let id = id.map(FlowId::persisted).unwrap_or_else(FlowId::temporary);
        Self::assemble(id, name, nodes, edges)
    }

    fn assemble(
        id: FlowId,
        name: String,
        nodes: Vec<WireNode>,
        edges: Vec<WireEdge>,
    ) -> Result<Flow, GatewayError> {
        let nodes = nodes
            .into_iter()
            .map(|node| -> Result<Node, GatewayError> {
                let data = NodeData::from_value(node.node_type, node.data).map_err(|err| {
                    GatewayError::InvalidWire(format!("node {}: {err}", node.id))
                })?;
                Ok(Node::new(NodeId::new(node.id), node.position, data))
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        let edges = edges
            .into_iter()
            .map(|edge| {
                Edge::new(EdgeId::new(edge.id), NodeId::new(edge.source), NodeId::new(edge.target))
                    .with_ports(
                        edge.source_handle.map(PortId::new),
                        edge.target_handle.map(PortId::new),
                    )
            })
            .collect();

        Flow::from_parts(id, name, nodes, edges)
            .map_err(|err| GatewayError::InvalidWire(err.to_string()))
    }

    pub fn meta(&self) -> Option<FlowMeta> {
        Some(FlowMeta {
            id: self.id.clone()?,
            name: self.name.clone(),
        })
    }
}
