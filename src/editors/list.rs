use super::{fresh_id, finish, EditorError, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::validate;
use crate::nodes::{ListMessageData, NodeData, ValidationErrors};
use crate::types::{Button, NodeId};

/// List message: a body plus labelled reply items, each with its own port.
#[derive(Debug, Clone)]
pub struct ListMessageEditor {
    node_id: NodeId,
    message: String,
    items: Vec<Button>,
    limits: EditorLimits,
}

impl ListMessageEditor {
    pub fn open(node_id: NodeId, data: &ListMessageData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            message: data.message.clone(),
            items: data.buttons.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn items(&self) -> &[Button] {
        &self.items
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn add_item(&mut self, label: impl Into<String>) -> Result<String, EditorError> {
        if self.items.len() >= self.limits.list_max_items {
            return Err(EditorError::ListItemLimit(self.limits.list_max_items));
        }
        let id = fresh_id("item", self.items.iter().map(|item| item.id.as_str()));
        self.items.push(Button::reply(id.clone(), label));
        Ok(id)
    }

    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<(), EditorError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| EditorError::UnknownButton(id.to_string()))?;
        item.label = label.into();
        Ok(())
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    fn data(&self) -> ListMessageData {
        ListMessageData {
            message: self.message.clone(),
            buttons: self.items.clone(),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::TextMessageWithList(self.data()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(
            &self.node_id,
            &data,
            &NodeData::TextMessageWithList(data.clone()),
            &self.limits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_capped_and_labelled() {
        let limits = EditorLimits {
            list_max_items: 2,
            ..EditorLimits::default()
        };
        let mut editor = ListMessageEditor::open(NodeId::from("l"), &ListMessageData::default(), limits);
        editor.set_message("Choose a plan");
        let first = editor.add_item("Basic").unwrap();
        editor.add_item("").unwrap();
        assert_eq!(editor.add_item("Pro"), Err(EditorError::ListItemLimit(2)));
        assert!(editor.save().unwrap_err().has_field("buttons[1].label"));

        editor.set_label("item_2", "Premium").unwrap();
        assert!(editor.remove_item(&first));
        let patch = editor.save().unwrap();
        assert_eq!(patch.patch["buttons"].as_array().unwrap().len(), 1);
    }
}
