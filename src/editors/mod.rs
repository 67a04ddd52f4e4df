//! Side-panel editors, one per node type. An editor works on a private copy of
//! a node's data and hands back a validated [`EditorPatch`] on save; it never
//! touches the flow itself.

use serde::Serialize;
use thiserror::Error;

use crate::config::EditorLimits;
use crate::graph::Node;
use crate::nodes::{patch_from, validation, DataPatch, NodeData, ValidationErrors};
use crate::types::NodeId;

pub mod buttons;
pub mod contact;
pub mod delay;
pub mod list;
pub mod location;
pub mod media;
pub mod text;
pub mod trigger;

pub use buttons::ButtonMessageEditor;
pub use contact::ContactCardEditor;
pub use delay::DelayEditor;
pub use list::ListMessageEditor;
pub use location::ShareLocationEditor;
pub use media::{MediaEditor, UploadState, UploadTicket};
pub use text::TextMessageEditor;
pub use trigger::TriggerEditor;

/// Validated data produced by an editor, ready for `update_node_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorPatch {
    pub node_id: NodeId,
    pub patch: DataPatch,
}

/// An editor action that was refused; the editor state is unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("keyword '{0}' must be a single word")]
    KeywordWhitespace(String),

    #[error("keyword '{0}' already exists")]
    DuplicateKeyword(String),

    #[error("at most {0} reply buttons are allowed")]
    ReplyButtonLimit(usize),

    #[error("at most {0} URL buttons are allowed")]
    UrlButtonLimit(usize),

    #[error("reply buttons and URL buttons cannot be mixed")]
    MixedButtonKinds,

    #[error("unknown button {0}")]
    UnknownButton(String),

    #[error("at most {0} list items are allowed")]
    ListItemLimit(usize),

    #[error("no contact at position {0}")]
    UnknownContact(usize),

    #[error("select a media type first")]
    MediaTypeRequired,

    #[error("{file_name} is {size} bytes, the limit for {media_type} is {limit} bytes")]
    FileTooLarge {
        file_name: String,
        media_type: String,
        size: u64,
        limit: u64,
    },

    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("there is no failed upload to retry")]
    NothingToRetry,
}

#[derive(Debug, Clone)]
pub enum NodeEditor {
    Trigger(TriggerEditor),
    TextMessage(TextMessageEditor),
    Buttons(ButtonMessageEditor),
    List(ListMessageEditor),
    Media(MediaEditor),
    Delay(DelayEditor),
    ContactCard(ContactCardEditor),
    ShareLocation(ShareLocationEditor),
}

impl NodeEditor {
    /// Opens the editor matching the node's type, seeded with its current data.
    pub fn open(node: &Node, limits: &EditorLimits) -> Self {
        let id = node.id.clone();
        let limits = limits.clone();
        match &node.data {
            NodeData::Trigger(data) => NodeEditor::Trigger(TriggerEditor::open(id, data, limits)),
            NodeData::TextMessage(data) => {
                NodeEditor::TextMessage(TextMessageEditor::open(id, data, limits))
            }
            NodeData::TextMessageWithButton(data) => {
                NodeEditor::Buttons(ButtonMessageEditor::open(id, data, limits))
            }
            NodeData::TextMessageWithList(data) => {
                NodeEditor::List(ListMessageEditor::open(id, data, limits))
            }
            NodeData::MediaMessage(data) => NodeEditor::Media(MediaEditor::open(id, data, limits)),
            NodeData::Delay(data) => NodeEditor::Delay(DelayEditor::open(id, data, limits)),
            NodeData::ContactCard(data) => {
                NodeEditor::ContactCard(ContactCardEditor::open(id, data, limits))
            }
            NodeData::ShareLocation(data) => {
                NodeEditor::ShareLocation(ShareLocationEditor::open(id, data, limits))
            }
        }
    }

    pub fn node_id(&self) -> &NodeId {
        match self {
            NodeEditor::Trigger(editor) => editor.node_id(),
            NodeEditor::TextMessage(editor) => editor.node_id(),
            NodeEditor::Buttons(editor) => editor.node_id(),
            NodeEditor::List(editor) => editor.node_id(),
            NodeEditor::Media(editor) => editor.node_id(),
            NodeEditor::Delay(editor) => editor.node_id(),
            NodeEditor::ContactCard(editor) => editor.node_id(),
            NodeEditor::ShareLocation(editor) => editor.node_id(),
        }
    }

    /// Live feedback for the current form state.
    pub fn errors(&self) -> ValidationErrors {
        match self {
            NodeEditor::Trigger(editor) => editor.errors(),
            NodeEditor::TextMessage(editor) => editor.errors(),
            NodeEditor::Buttons(editor) => editor.errors(),
            NodeEditor::List(editor) => editor.errors(),
            NodeEditor::Media(editor) => editor.errors(),
            NodeEditor::Delay(editor) => editor.errors(),
            NodeEditor::ContactCard(editor) => editor.errors(),
            NodeEditor::ShareLocation(editor) => editor.errors(),
        }
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        match self {
            NodeEditor::Trigger(editor) => editor.save(),
            NodeEditor::TextMessage(editor) => editor.save(),
            NodeEditor::Buttons(editor) => editor.save(),
            NodeEditor::List(editor) => editor.save(),
            NodeEditor::Media(editor) => editor.save(),
            NodeEditor::Delay(editor) => editor.save(),
            NodeEditor::ContactCard(editor) => editor.save(),
            NodeEditor::ShareLocation(editor) => editor.save(),
        }
    }
}

/// Validates `data` and, if clean, turns `fields` into a patch for `node_id`.
pub(crate) fn finish<T: Serialize>(
    node_id: &NodeId,
    fields: &T,
    data: &NodeData,
    limits: &EditorLimits,
) -> Result<EditorPatch, ValidationErrors> {
    validation::validate(data, limits).into_result()?;
    Ok(EditorPatch {
        node_id: node_id.clone(),
        patch: patch_from(fields),
    })
}

/// Next `{prefix}_{n}` id not present in `existing`.
pub(crate) fn fresh_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str> + Clone) -> String {
    let mut seq = 1usize;
    loop {
        let candidate = format!("{prefix}_{seq}");
        if !existing.clone().any(|id| id == candidate) {
            return candidate;
        }
        seq += 1;
    }
}
