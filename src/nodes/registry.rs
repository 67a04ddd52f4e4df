use once_cell::sync::Lazy;
use serde::Serialize;

use super::{validation, NodeData, NodeType, ValidationErrors};
use crate::config::EditorLimits;
use crate::types::{ButtonKind, PortId};

static DEFAULT_REGISTRY: Lazy<NodeRegistry> = Lazy::new(NodeRegistry::default);

/// Registry built from [`EditorLimits::default`].
pub fn default_registry() -> &'static NodeRegistry {
    &DEFAULT_REGISTRY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

/// How many edges may leave a source port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    Single,
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub id: PortId,
    pub direction: PortDirection,
    /// Derived from the node's buttons; recomputed whenever they change.
    pub dynamic: bool,
    pub fan_out: FanOut,
}

impl PortSpec {
    fn input() -> Self {
        Self {
            id: PortId::input(),
            direction: PortDirection::In,
            dynamic: false,
            fan_out: FanOut::Multiple,
        }
    }

    fn output() -> Self {
        Self {
            id: PortId::output(),
            direction: PortDirection::Out,
            dynamic: false,
            fan_out: FanOut::Single,
        }
    }

    fn button(id: &str) -> Self {
        Self {
            id: PortId::new(id),
            direction: PortDirection::Out,
            dynamic: true,
            fan_out: FanOut::Single,
        }
    }
}

/// Capability set of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub has_input: bool,
    pub has_output: bool,
    pub output_ports_per_button: bool,
}

impl Capabilities {
    pub fn of(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Trigger => Self {
                has_input: false,
                has_output: true,
                output_ports_per_button: false,
            },
            NodeType::TextMessageWithButton | NodeType::TextMessageWithList => Self {
                has_input: true,
                has_output: false,
                output_ports_per_button: true,
            },
            _ => Self {
                has_input: true,
                has_output: true,
                output_ports_per_button: false,
            },
        }
    }
}

/// Ports exposed by a node with the given data.
pub fn ports_for(data: &NodeData) -> Vec<PortSpec> {
    let caps = Capabilities::of(data.node_type());
    let mut ports = Vec::new();
    if caps.has_input {
        ports.push(PortSpec::input());
    }
    if caps.has_output {
        ports.push(PortSpec::output());
    }
    if caps.output_ports_per_button {
        ports.extend(
            data.buttons()
                .iter()
                .filter(|button| button.kind() == ButtonKind::Reply && !button.id.is_empty())
                .map(|button| PortSpec::button(&button.id)),
        );
    }
    ports
}

/// Resolves a port reference. `None` means the default port for `direction`.
pub fn find_port(data: &NodeData, direction: PortDirection, port: Option<&PortId>) -> Option<PortSpec> {
    let wanted = match (port, direction) {
        (Some(port), _) => port.clone(),
        (None, PortDirection::In) => PortId::input(),
        (None, PortDirection::Out) => PortId::output(),
    };
    ports_for(data)
        .into_iter()
        .find(|spec| spec.direction == direction && spec.id == wanted)
}

/// Maps node type tags to defaults, ports and validation.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    limits: EditorLimits,
}

impl NodeRegistry {
    pub fn new(limits: EditorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &EditorLimits {
        &self.limits
    }

    pub fn definition(&self, node_type: NodeType) -> NodeDefinition<'_> {
        NodeDefinition {
            node_type,
            capabilities: Capabilities::of(node_type),
            limits: &self.limits,
        }
    }

    pub fn validate(&self, data: &NodeData) -> ValidationErrors {
        self.definition(data.node_type()).validate(data)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NodeDefinition<'a> {
    pub node_type: NodeType,
    pub capabilities: Capabilities,
    limits: &'a EditorLimits,
}

impl NodeDefinition<'_> {
    pub fn default_data(&self) -> NodeData {
        let mut data = NodeData::default_for(self.node_type);
        if let NodeData::Delay(delay) = &mut data {
            delay.delay_minutes = self.limits.delay_min_minutes;
        }
        data
    }

    pub fn ports(&self, data: &NodeData) -> Vec<PortSpec> {
        ports_for(data)
    }

    /// Pure field-level validation, usable for live feedback and save gating alike.
    pub fn validate(&self, data: &NodeData) -> ValidationErrors {
        validation::validate(data, self.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::ButtonMessageData;
    use crate::types::Button;

    #[test]
    fn trigger_has_single_source_port() {
        let registry = NodeRegistry::default();
        let definition = registry.definition(NodeType::Trigger);
        let ports = definition.ports(&definition.default_data());
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].direction, PortDirection::Out);
        assert_eq!(ports[0].id, PortId::output());
    }

    #[test]
    fn reply_buttons_get_dynamic_ports_and_url_buttons_none() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "choose".into(),
            buttons: vec![
                Button::reply("yes", "Yes"),
                Button::reply("no", "No"),
                Button::link("docs", "Docs", "https://example.com"),
            ],
        });
        let ports = ports_for(&data);
        let outs: Vec<_> = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Out)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(outs, vec!["yes", "no"]);
        assert!(ports.iter().filter(|p| p.direction == PortDirection::Out).all(|p| p.dynamic));
        assert!(find_port(&data, PortDirection::In, None).is_some());
        assert!(find_port(&data, PortDirection::Out, None).is_none());
        assert!(find_port(&data, PortDirection::Out, Some(&PortId::new("docs"))).is_none());
    }

    #[test]
    fn message_nodes_have_one_port_each_way() {
        for node_type in [NodeType::TextMessage, NodeType::MediaMessage, NodeType::Delay] {
            let ports = ports_for(&NodeData::default_for(node_type));
            assert_eq!(ports.len(), 2, "{node_type}");
        }
    }

    #[test]
    fn default_delay_follows_limits() {
        let limits = EditorLimits {
            delay_min_minutes: 5,
            ..EditorLimits::default()
        };
        let registry = NodeRegistry::new(limits);
        let data = registry.definition(NodeType::Delay).default_data();
        assert!(registry.validate(&data).is_empty());
    }
}
