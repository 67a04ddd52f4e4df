use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;

use super::{
    ButtonMessageData, ContactCardData, DelayData, ListMessageData, MediaMessageData, NodeData,
    ShareLocationData, TextMessageData, TriggerData,
};
use crate::config::EditorLimits;
use crate::types::ButtonKind;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9(][0-9 ()\-]{4,19}$").expect("valid phone regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Field-level problems found in a node's data, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// First error reported for `field`.
    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate(data: &NodeData, limits: &EditorLimits) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    match data {
        NodeData::Trigger(data) => trigger(data, &mut errors),
        NodeData::TextMessage(data) => text_message(data, limits, &mut errors),
        NodeData::TextMessageWithButton(data) => button_message(data, limits, &mut errors),
        NodeData::TextMessageWithList(data) => list_message(data, limits, &mut errors),
        NodeData::MediaMessage(data) => media_message(data, limits, &mut errors),
        NodeData::Delay(data) => delay(data, limits, &mut errors),
        NodeData::ContactCard(data) => contact_card(data, &mut errors),
        NodeData::ShareLocation(data) => share_location(data, &mut errors),
    }
    errors
}

pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub(crate) fn is_http_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub(crate) fn is_phone_number(value: &str) -> bool {
    PHONE_PATTERN.is_match(value.trim())
}

pub(crate) fn keyword_problem(keyword: &str) -> Option<&'static str> {
    if keyword.trim().is_empty() {
        Some("keyword must not be empty")
    } else if keyword.chars().any(char::is_whitespace) {
        Some("keyword must be a single word")
    } else {
        None
    }
}

fn trigger(data: &TriggerData, errors: &mut ValidationErrors) {
    let mut seen = HashSet::new();
    for (index, keyword) in data.keywords.iter().enumerate() {
        let field = format!("keywords[{index}]");
        if let Some(problem) = keyword_problem(keyword) {
            errors.push(field, problem);
        } else if !seen.insert(keyword.to_lowercase()) {
            errors.push(field, format!("duplicate keyword '{keyword}'"));
        }
    }
}

fn text_message(data: &TextMessageData, limits: &EditorLimits, errors: &mut ValidationErrors) {
    let max = limits.text_message_max_chars;
    if char_len(&data.message) > max {
        errors.push("message", format!("message must be at most {max} characters"));
    }
}

fn button_message(data: &ButtonMessageData, limits: &EditorLimits, errors: &mut ValidationErrors) {
    let max_body = limits.button_body_max_chars;
    if data.message.trim().is_empty() {
        errors.push("message", "message is required");
    } else if char_len(&data.message) > max_body {
        errors.push("message", format!("message must be at most {max_body} characters"));
    }

    let replies = data.buttons.iter().filter(|b| b.kind() == ButtonKind::Reply).count();
    let links = data.buttons.len() - replies;
    if replies > 0 && links > 0 {
        errors.push("buttons", "reply buttons and URL buttons cannot be mixed");
    }
    if replies > limits.max_reply_buttons {
        errors.push(
            "buttons",
            format!("at most {} reply buttons are allowed", limits.max_reply_buttons),
        );
    }
    if links > limits.max_url_buttons {
        errors.push(
            "buttons",
            format!("at most {} URL button is allowed", limits.max_url_buttons),
        );
    }
    if !data.buttons.iter().any(|b| !b.label.trim().is_empty()) {
        errors.push("buttons", "at least one button with a label is required");
    }

    let mut ids = HashSet::new();
    let max_label = limits.button_label_max_chars;
    for (index, button) in data.buttons.iter().enumerate() {
        if !ids.insert(button.id.as_str()) {
            errors.push(format!("buttons[{index}].id"), "duplicate button id");
        }
        if button.label.trim().is_empty() {
            errors.push(format!("buttons[{index}].label"), "label is required");
        } else if char_len(&button.label) > max_label {
            errors.push(
                format!("buttons[{index}].label"),
                format!("label must be at most {max_label} characters"),
            );
        }
        if let (ButtonKind::Url, Some(url)) = (button.kind(), button.url.as_deref()) {
            if !is_http_url(url) {
                errors.push(
                    format!("buttons[{index}].url"),
                    "url must be an absolute http or https address",
                );
            }
        }
    }
}

fn list_message(data: &ListMessageData, limits: &EditorLimits, errors: &mut ValidationErrors) {
    let max_body = limits.list_body_max_chars;
    if data.message.trim().is_empty() {
        errors.push("message", "message is required");
    } else if char_len(&data.message) > max_body {
        errors.push("message", format!("message must be at most {max_body} characters"));
    }

    if data.buttons.is_empty() {
        errors.push("buttons", "at least one list item is required");
    }
    if data.buttons.len() > limits.list_max_items {
        errors.push(
            "buttons",
            format!("at most {} list items are allowed", limits.list_max_items),
        );
    }

    let mut ids = HashSet::new();
    let max_label = limits.list_label_max_chars;
    for (index, item) in data.buttons.iter().enumerate() {
        if !ids.insert(item.id.as_str()) {
            errors.push(format!("buttons[{index}].id"), "duplicate item id");
        }
        if item.label.trim().is_empty() {
            errors.push(format!("buttons[{index}].label"), "label is required");
        } else if char_len(&item.label) > max_label {
            errors.push(
                format!("buttons[{index}].label"),
                format!("label must be at most {max_label} characters"),
            );
        }
        if item.kind() == ButtonKind::Url {
            errors.push(format!("buttons[{index}].url"), "list items cannot carry a url");
        }
    }
}

fn media_message(data: &MediaMessageData, limits: &EditorLimits, errors: &mut ValidationErrors) {
    if data.media_type.is_none() {
        errors.push("mediaType", "select a media type");
    }
    if data.media_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        errors.push("mediaId", "upload a file before saving");
    }
    let max_caption = limits.media_caption_max_chars;
    if char_len(&data.caption) > max_caption {
        errors.push("caption", format!("caption must be at most {max_caption} characters"));
    }
}

fn delay(data: &DelayData, limits: &EditorLimits, errors: &mut ValidationErrors) {
    let (min, max) = (limits.delay_min_minutes, limits.delay_max_minutes);
    if data.delay_minutes < min || data.delay_minutes > max {
        errors.push("delayMinutes", format!("delay must be between {min} and {max} minutes"));
    }
}

fn contact_card(data: &ContactCardData, errors: &mut ValidationErrors) {
    if data.contacts.is_empty() {
        errors.push("contacts", "add at least one contact");
    }
    for (index, contact) in data.contacts.iter().enumerate() {
        if contact.name.trim().is_empty() {
            errors.push(format!("contacts[{index}].name"), "name is required");
        }
        if contact.phone.trim().is_empty() {
            errors.push(format!("contacts[{index}].phone"), "phone is required");
        } else if !is_phone_number(&contact.phone) {
            errors.push(format!("contacts[{index}].phone"), "phone number is not valid");
        }
    }
}

fn share_location(data: &ShareLocationData, errors: &mut ValidationErrors) {
    if data.name.trim().is_empty() {
        errors.push("name", "name is required");
    }
    if data.address.trim().is_empty() {
        errors.push("address", "address is required");
    }
    if data.map_url.trim().is_empty() {
        errors.push("mapUrl", "map url is required");
    } else if !is_http_url(&data.map_url) {
        errors.push("mapUrl", "map url must be an absolute http or https address");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Button, ContactEntry, MediaType};

    fn limits() -> EditorLimits {
        EditorLimits::default()
    }

    #[test]
    fn button_body_over_limit_is_reported() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "x".repeat(1025),
            buttons: vec![Button::reply("b1", "Yes")],
        });
        let errors = validate(&data, &limits());
        assert!(errors.has_field("message"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn mixed_button_kinds_are_rejected() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "pick".into(),
            buttons: vec![
                Button::reply("b1", "Yes"),
                Button::link("b2", "Docs", "https://example.com"),
            ],
        });
        let errors = validate(&data, &limits());
        assert!(errors.has_field("buttons"));
    }

    #[test]
    fn url_buttons_need_absolute_http_urls() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "visit".into(),
            buttons: vec![Button::link("b1", "Docs", "ftp://example.com")],
        });
        assert!(validate(&data, &limits()).has_field("buttons[0].url"));
        assert!(is_http_url("https://example.com/path?q=1"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn label_length_counts_characters() {
        let data = NodeData::TextMessageWithButton(ButtonMessageData {
            message: "hi".into(),
            buttons: vec![Button::reply("b1", "ü".repeat(20))],
        });
        assert!(validate(&data, &limits()).is_empty());
    }

    #[test]
    fn trigger_rejects_whitespace_and_duplicates() {
        let data = NodeData::Trigger(TriggerData {
            keywords: vec!["hi".into(), "two words".into(), "HI".into()],
        });
        let errors = validate(&data, &limits());
        assert!(errors.has_field("keywords[1]"));
        assert!(errors.has_field("keywords[2]"));
        assert!(!errors.has_field("keywords[0]"));
    }

    #[test]
    fn text_message_respects_configured_cap() {
        let mut limits = limits();
        limits.text_message_max_chars = 10;
        let data = NodeData::TextMessage(TextMessageData {
            message: "eleven chars".into(),
        });
        assert!(validate(&data, &limits).has_field("message"));
    }

    #[test]
    fn media_requires_type_and_upload() {
        let data = NodeData::MediaMessage(MediaMessageData::default());
        let errors = validate(&data, &limits());
        assert!(errors.has_field("mediaType"));
        assert!(errors.has_field("mediaId"));

        let data = NodeData::MediaMessage(MediaMessageData {
            media_type: Some(MediaType::Image),
            media_id: Some("m-1".into()),
            ..Default::default()
        });
        assert!(validate(&data, &limits()).is_empty());
    }

    #[test]
    fn contact_and_location_fields_are_required() {
        let data = NodeData::ContactCard(ContactCardData {
            contacts: vec![ContactEntry::new("", "abc")],
        });
        let errors = validate(&data, &limits());
        assert!(errors.has_field("contacts[0].name"));
        assert!(errors.has_field("contacts[0].phone"));

        let data = NodeData::ShareLocation(ShareLocationData::default());
        let errors = validate(&data, &limits());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn phone_pattern() {
        assert!(is_phone_number("+49 151 2345678"));
        assert!(is_phone_number("(030) 123-456"));
        assert!(!is_phone_number("call me"));
    }
}
