//! Node types, their data payloads and the registry describing them.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Button, ContactEntry, MediaType};

pub mod registry;
pub mod validation;

pub use registry::{default_registry, FanOut, NodeDefinition, NodeRegistry, PortDirection, PortSpec};
pub use validation::{FieldError, ValidationErrors};

/// Partial node data, shallow-merged over a node's current payload.
pub type DataPatch = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Trigger,
    TextMessage,
    TextMessageWithButton,
    TextMessageWithList,
    MediaMessage,
    Delay,
    ContactCard,
    ShareLocation,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Trigger,
        NodeType::TextMessage,
        NodeType::TextMessageWithButton,
        NodeType::TextMessageWithList,
        NodeType::MediaMessage,
        NodeType::Delay,
        NodeType::ContactCard,
        NodeType::ShareLocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::TextMessage => "textMessage",
            NodeType::TextMessageWithButton => "textMessageWithButton",
            NodeType::TextMessageWithList => "textMessageWithList",
            NodeType::MediaMessage => "mediaMessage",
            NodeType::Delay => "delay",
            NodeType::ContactCard => "contactCard",
            NodeType::ShareLocation => "shareLocation",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerData {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextMessageData {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonMessageData {
    pub message: String,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListMessageData {
    pub message: String,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaMessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelayData {
    pub delay_minutes: i64,
}

impl Default for DelayData {
    fn default() -> Self {
        Self { delay_minutes: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactCardData {
    pub contacts: Vec<ContactEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareLocationData {
    pub name: String,
    pub address: String,
    pub map_url: String,
}

/// Type-dependent node payload. The variant is the node's type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Trigger(TriggerData),
    TextMessage(TextMessageData),
    TextMessageWithButton(ButtonMessageData),
    TextMessageWithList(ListMessageData),
    MediaMessage(MediaMessageData),
    Delay(DelayData),
    ContactCard(ContactCardData),
    ShareLocation(ShareLocationData),
}

impl NodeData {
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Trigger => NodeData::Trigger(TriggerData::default()),
            NodeType::TextMessage => NodeData::TextMessage(TextMessageData::default()),
            NodeType::TextMessageWithButton => {
                NodeData::TextMessageWithButton(ButtonMessageData::default())
            }
            NodeType::TextMessageWithList => {
                NodeData::TextMessageWithList(ListMessageData::default())
            }
            NodeType::MediaMessage => NodeData::MediaMessage(MediaMessageData::default()),
            NodeType::Delay => NodeData::Delay(DelayData::default()),
            NodeType::ContactCard => NodeData::ContactCard(ContactCardData::default()),
            NodeType::ShareLocation => NodeData::ShareLocation(ShareLocationData::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Trigger(_) => NodeType::Trigger,
            NodeData::TextMessage(_) => NodeType::TextMessage,
            NodeData::TextMessageWithButton(_) => NodeType::TextMessageWithButton,
            NodeData::TextMessageWithList(_) => NodeType::TextMessageWithList,
            NodeData::MediaMessage(_) => NodeType::MediaMessage,
            NodeData::Delay(_) => NodeType::Delay,
            NodeData::ContactCard(_) => NodeType::ContactCard,
            NodeData::ShareLocation(_) => NodeType::ShareLocation,
        }
    }

    /// Buttons carried by the interactive variants.
    pub fn buttons(&self) -> &[Button] {
        match self {
            NodeData::TextMessageWithButton(data) => &data.buttons,
            NodeData::TextMessageWithList(data) => &data.buttons,
            _ => &[],
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            NodeData::Trigger(data) => serde_json::to_value(data),
            NodeData::TextMessage(data) => serde_json::to_value(data),
            NodeData::TextMessageWithButton(data) => serde_json::to_value(data),
            NodeData::TextMessageWithList(data) => serde_json::to_value(data),
            NodeData::MediaMessage(data) => serde_json::to_value(data),
            NodeData::Delay(data) => serde_json::to_value(data),
            NodeData::ContactCard(data) => serde_json::to_value(data),
            NodeData::ShareLocation(data) => serde_json::to_value(data),
        }
    }

    /// Decodes a raw data bag for the given type. `null` yields the type's default.
    pub fn from_value(node_type: NodeType, value: Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default_for(node_type));
        }

        Ok(match node_type {
            NodeType::Trigger => NodeData::Trigger(serde_json::from_value(value)?),
            NodeType::TextMessage => NodeData::TextMessage(serde_json::from_value(value)?),
            NodeType::TextMessageWithButton => {
                NodeData::TextMessageWithButton(serde_json::from_value(value)?)
            }
            NodeType::TextMessageWithList => {
                NodeData::TextMessageWithList(serde_json::from_value(value)?)
            }
            NodeType::MediaMessage => NodeData::MediaMessage(serde_json::from_value(value)?),
            NodeType::Delay => NodeData::Delay(serde_json::from_value(value)?),
            NodeType::ContactCard => NodeData::ContactCard(serde_json::from_value(value)?),
            NodeType::ShareLocation => NodeData::ShareLocation(serde_json::from_value(value)?),
        })
    }

    /// Shallow-merges `patch` over this payload, keeping the node type.
    pub fn merged(&self, patch: &DataPatch) -> Result<Self, serde_json::Error> {
        let mut current = match self.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        Self::from_value(self.node_type(), Value::Object(current))
    }
}

/// Serializes a data struct into a patch that overwrites every field it carries.
pub fn patch_from<T: Serialize>(data: &T) -> DataPatch {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => map,
        _ => DataPatch::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_patched_keys() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "hello".into(),
            buttons: vec![Button::reply("b1", "Yes")],
        });
        let mut patch = DataPatch::new();
        patch.insert("message".into(), json!("bye"));

        let merged = data.merged(&patch).unwrap();
        match merged {
            NodeData::TextMessageWithButton(data) => {
                assert_eq!(data.message, "bye");
                assert_eq!(data.buttons.len(), 1);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn merge_with_wrong_shape_fails() {
        let data = NodeData::Delay(DelayData::default());
        let mut patch = DataPatch::new();
        patch.insert("delayMinutes".into(), json!("soon"));
        assert!(data.merged(&patch).is_err());
    }

    #[test]
    fn null_data_decodes_to_defaults() {
        let data = NodeData::from_value(NodeType::Delay, Value::Null).unwrap();
        assert_eq!(data, NodeData::Delay(DelayData { delay_minutes: 1 }));
    }

    #[test]
    fn type_tags_use_camel_case() {
        assert_eq!(
            serde_json::to_value(NodeType::TextMessageWithButton).unwrap(),
            json!("textMessageWithButton")
        );
        for node_type in NodeType::ALL {
            assert_eq!(NodeData::default_for(node_type).node_type(), node_type);
            assert_eq!(
                serde_json::to_value(node_type).unwrap(),
                json!(node_type.as_str())
            );
        }
    }
}
