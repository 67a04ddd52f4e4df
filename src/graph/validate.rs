use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::Flow;
use crate::nodes::{NodeRegistry, ValidationErrors};
use crate::types::NodeId;

/// Validation problems of a whole flow, keyed by node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowValidationReport {
    nodes: BTreeMap<NodeId, ValidationErrors>,
}

impl FlowValidationReport {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_errors(&self, id: &NodeId) -> Option<&ValidationErrors> {
        self.nodes.get(id)
    }

    pub fn invalid_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &ValidationErrors)> {
        self.nodes.iter()
    }
}

impl fmt::Display for FlowValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .nodes
            .iter()
            .map(|(id, errors)| format!("{id}: {errors}"))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(" | "))
    }
}

/// Runs every node's type validation.
pub fn validate_flow(flow: &Flow, registry: &NodeRegistry) -> FlowValidationReport {
    let nodes = flow
        .nodes()
        .iter()
        .filter_map(|node| {
            let errors = registry.validate(&node.data);
            (!errors.is_empty()).then(|| (node.id.clone(), errors))
        })
        .collect();
    FlowValidationReport { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mutations::{add_node, create_flow};
    use crate::nodes::NodeType;

    #[test]
    fn fresh_flow_is_valid() {
        let registry = NodeRegistry::default();
        let flow = create_flow("f");
        let (flow, _) = add_node(&flow, &registry, NodeType::TextMessage, None);
        assert!(validate_flow(&flow, &registry).is_empty());
    }

    #[test]
    fn incomplete_nodes_are_reported() {
        let registry = NodeRegistry::default();
        let (flow, id) = add_node(&create_flow("f"), &registry, NodeType::MediaMessage, None);
        let report = validate_flow(&flow, &registry);
        assert_eq!(report.invalid_nodes().collect::<Vec<_>>(), vec![&id]);
        assert!(report.node_errors(&id).unwrap().has_field("mediaType"));
        assert!(report.to_string().contains("mediaType"));
    }
}
