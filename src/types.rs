use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

const TEMP_PREFIX: &str = "tmp-";

/// Identifier of a flow document.
///
/// A flow starts life with a client-generated `Temporary` token and receives a
/// `Persisted` id from the backend on its first successful save. Only the
/// persistence gateway turns one into the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowId {
    Temporary(String),
    Persisted(String),
}

impl FlowId {
    pub fn temporary() -> Self {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        FlowId::Temporary(format!("{TEMP_PREFIX}{millis}-{seq}"))
    }

    pub fn persisted(id: impl Into<String>) -> Self {
        FlowId::Persisted(id.into())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, FlowId::Temporary(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            FlowId::Temporary(token) => token,
            FlowId::Persisted(id) => id,
        }
    }

    /// The backend id, if this flow has been saved at least once.
    pub fn persisted_id(&self) -> Option<&str> {
        match self {
            FlowId::Temporary(_) => None,
            FlowId::Persisted(id) => Some(id),
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Node identifier, unique within one flow and stable across saves.
    NodeId
);
string_id!(
    /// Edge identifier, unique within one flow.
    EdgeId
);
string_id!(
    /// Named connection point on a node.
    PortId
);

impl PortId {
    pub const DEFAULT_INPUT: &'static str = "in";
    pub const DEFAULT_OUTPUT: &'static str = "out";

    pub fn input() -> Self {
        Self::new(Self::DEFAULT_INPUT)
    }

    pub fn output() -> Self {
        Self::new(Self::DEFAULT_OUTPUT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A button attached to an interactive message. Buttons without a url are
/// reply buttons and each one gets its own outgoing port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Button {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Reply,
    Url,
}

impl Button {
    pub fn reply(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: None,
        }
    }

    pub fn link(id: impl Into<String>, label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: Some(url.into()),
        }
    }

    pub fn kind(&self) -> ButtonKind {
        match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => ButtonKind::Url,
            _ => ButtonKind::Reply,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.kind() == ButtonKind::Reply
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Document,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
            MediaType::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContactEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

impl ContactEntry {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// A file picked for a media message, ready to be sent to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_distinct_and_prefixed() {
        let a = FlowId::temporary();
        let b = FlowId::temporary();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(a.as_str().starts_with(TEMP_PREFIX));
        assert_eq!(a.persisted_id(), None);
        assert_eq!(FlowId::persisted("42").persisted_id(), Some("42"));
    }

    #[test]
    fn blank_url_makes_a_reply_button() {
        assert_eq!(Button::reply("b1", "Yes").kind(), ButtonKind::Reply);
        assert_eq!(Button::link("b2", "Site", "  ").kind(), ButtonKind::Reply);
        assert_eq!(
            Button::link("b3", "Site", "https://example.com").kind(),
            ButtonKind::Url
        );
    }
}
