use super::{finish, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::{char_len, validate};
use crate::nodes::{NodeData, TextMessageData, ValidationErrors};
use crate::types::NodeId;

#[derive(Debug, Clone)]
pub struct TextMessageEditor {
    node_id: NodeId,
    message: String,
    limits: EditorLimits,
}

impl TextMessageEditor {
    pub fn open(node_id: NodeId, data: &TextMessageData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            message: data.message.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Characters left before the configured cap; negative when over it.
    pub fn remaining_chars(&self) -> i64 {
        self.limits.text_message_max_chars as i64 - char_len(&self.message) as i64
    }

    fn data(&self) -> TextMessageData {
        TextMessageData {
            message: self.message.clone(),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::TextMessage(self.data()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(&self.node_id, &data, &NodeData::TextMessage(data.clone()), &self.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_configurable() {
        let limits = EditorLimits {
            text_message_max_chars: 5,
            ..EditorLimits::default()
        };
        let mut editor = TextMessageEditor::open(NodeId::from("n"), &TextMessageData::default(), limits);
        editor.set_message("hello!");
        assert_eq!(editor.remaining_chars(), -1);
        assert!(editor.save().unwrap_err().has_field("message"));

        editor.set_message("hello");
        assert_eq!(editor.save().unwrap().patch["message"], "hello");
    }
}
