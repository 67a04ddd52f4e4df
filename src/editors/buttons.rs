use super::{fresh_id, finish, EditorError, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::validate;
use crate::nodes::{ButtonMessageData, NodeData, ValidationErrors};
use crate::types::{Button, ButtonKind, NodeId};

/// Interactive message with either up to three reply buttons or a single URL
/// button. Actions that would break those rules are refused up front.
#[derive(Debug, Clone)]
pub struct ButtonMessageEditor {
    node_id: NodeId,
    message: String,
    buttons: Vec<Button>,
    limits: EditorLimits,
}

impl ButtonMessageEditor {
    pub fn open(node_id: NodeId, data: &ButtonMessageData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            message: data.message.clone(),
            buttons: data.buttons.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn add_reply_button(&mut self, label: impl Into<String>) -> Result<String, EditorError> {
        let id = self.next_id();
        self.try_push(Button::reply(id.clone(), label))?;
        Ok(id)
    }

    pub fn add_url_button(
        &mut self,
        label: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<String, EditorError> {
        let id = self.next_id();
        self.try_push(Button::link(id.clone(), label, url))?;
        Ok(id)
    }

    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<(), EditorError> {
        let button = self.find_mut(id)?;
        button.label = label.into();
        Ok(())
    }

    /// Changes a button's url. Clearing it turns the button into a reply button,
    /// which is refused when it would mix kinds or exceed a cap.
    pub fn set_url(&mut self, id: &str, url: impl Into<String>) -> Result<(), EditorError> {
        let url = url.into();
        let mut candidate = self.buttons.clone();
        let button = candidate
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| EditorError::UnknownButton(id.to_string()))?;
        button.url = if url.trim().is_empty() { None } else { Some(url) };
        self.check_kinds(&candidate)?;
        self.buttons = candidate;
        Ok(())
    }

    pub fn remove_button(&mut self, id: &str) -> bool {
        let before = self.buttons.len();
        self.buttons.retain(|b| b.id != id);
        self.buttons.len() != before
    }

    fn try_push(&mut self, button: Button) -> Result<(), EditorError> {
        let mut candidate = self.buttons.clone();
        candidate.push(button);
        self.check_kinds(&candidate)?;
        self.buttons = candidate;
        Ok(())
    }

    fn check_kinds(&self, buttons: &[Button]) -> Result<(), EditorError> {
        let replies = buttons.iter().filter(|b| b.kind() == ButtonKind::Reply).count();
        let links = buttons.len() - replies;
        if replies > 0 && links > 0 {
            return Err(EditorError::MixedButtonKinds);
        }
        if replies > self.limits.max_reply_buttons {
            return Err(EditorError::ReplyButtonLimit(self.limits.max_reply_buttons));
        }
        if links > self.limits.max_url_buttons {
            return Err(EditorError::UrlButtonLimit(self.limits.max_url_buttons));
        }
        Ok(())
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Button, EditorError> {
        self.buttons
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| EditorError::UnknownButton(id.to_string()))
    }

    fn next_id(&self) -> String {
        fresh_id("btn", self.buttons.iter().map(|b| b.id.as_str()))
    }

    fn data(&self) -> ButtonMessageData {
        ButtonMessageData {
            message: self.message.clone(),
            buttons: self.buttons.clone(),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::TextMessageWithButton(self.data()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(
            &self.node_id,
            &data,
            &NodeData::TextMessageWithButton(data.clone()),
            &self.limits,
        )
    }
}
