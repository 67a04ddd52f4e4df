//! The editing session: one open flow, its undo history and the state of the
//! network operations running against it.
//!
//! Every edit goes through the pure functions in [`crate::graph`]; the session
//! only swaps in the returned flow. Network calls are split into `begin_*` /
//! `finish_*` pairs so a UI loop can run them off-thread, and wrapped in async
//! helpers (`load`, `save`, ...) for callers that just want to await them.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EditorLimits};
use crate::editors::{EditorError, EditorPatch, MediaEditor, NodeEditor, UploadTicket};
use crate::error::GatewayError;
use crate::gateway::{FlowMeta, FlowStore};
use crate::graph::{
    self, validate_flow, ConnectionRejected, EdgeChange, Flow, FlowValidationReport, History,
    NodeChange,
};
use crate::nodes::{DataPatch, NodeRegistry, NodeType};
use crate::types::{EdgeId, FlowId, MediaUpload, NodeId, PortId, Position};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("flow has invalid nodes:\n{0}")]
    Invalid(FlowValidationReport),

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("no flow is open")]
    NoActiveFlow,

    #[error("flow graph is inconsistent: {}", .0.join("; "))]
    Inconsistent(Vec<String>),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("connection rejected: {0}")]
    Rejected(#[from] ConnectionRejected),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// State of one kind of network operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

impl OpStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, OpStatus::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OpStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    flow_id: String,
}

impl LoadTicket {
    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    seq: u64,
    revision: u64,
    flow_id: FlowId,
}

pub struct FlowEditingSession {
    store: Arc<dyn FlowStore>,
    registry: NodeRegistry,
    flow: Option<Flow>,
    history: History,
    /// Content as last loaded or saved; undo/redo compare against it.
    baseline: Option<Flow>,
    revision: u64,
    load_seq: u64,
    pending_load: Option<LoadTicket>,
    save_seq: u64,
    pending_save: Option<u64>,
    load_status: OpStatus,
    save_status: OpStatus,
    remove_status: OpStatus,
    upload_status: OpStatus,
    not_found: Option<String>,
    banner: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl FlowEditingSession {
    pub fn new(store: Arc<dyn FlowStore>, registry: NodeRegistry) -> Self {
        Self {
            store,
            registry,
            flow: None,
            history: History::default(),
            baseline: None,
            revision: 0,
            load_seq: 0,
            pending_load: None,
            save_seq: 0,
            pending_save: None,
            load_status: OpStatus::Idle,
            save_status: OpStatus::Idle,
            remove_status: OpStatus::Idle,
            upload_status: OpStatus::Idle,
            not_found: None,
            banner: None,
            last_saved_at: None,
        }
    }

    /// Builds a session whose registry uses limits read from a YAML file.
    pub fn with_limits_file(
        store: Arc<dyn FlowStore>,
        path: impl AsRef<Path>,
    ) -> Result<Self, SessionError> {
        let limits = EditorLimits::from_file(path)?;
        Ok(Self::new(store, NodeRegistry::new(limits)))
    }

    pub fn flow(&self) -> Option<&Flow> {
        self.flow.as_ref()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Bumped on every content change; used to tell whether a save result is
    /// still current.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn load_status(&self) -> &OpStatus {
        &self.load_status
    }

    pub fn save_status(&self) -> &OpStatus {
        &self.save_status
    }

    pub fn remove_status(&self) -> &OpStatus {
        &self.remove_status
    }

    pub fn upload_status(&self) -> &OpStatus {
        &self.upload_status
    }

    /// Id of the flow whose load came back 404, if the last load did.
    pub fn not_found(&self) -> Option<&str> {
        self.not_found.as_deref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn can_undo(&self) -> bool {
        self.flow.is_some() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.flow.is_some() && self.history.can_redo()
    }

    // ---- navigation ----

    /// Opens a fresh, unsaved flow. Any load still in flight is abandoned.
    pub fn new_flow(&mut self, name: impl Into<String>) -> &Flow {
        let flow = graph::create_flow(name);
        info!(flow = %flow.id.as_str(), name = %flow.name, "new flow");
        self.open(flow)
    }

    pub fn begin_load(&mut self, id: impl Into<String>) -> LoadTicket {
        self.load_seq += 1;
        let ticket = LoadTicket {
            seq: self.load_seq,
            flow_id: id.into(),
        };
        self.pending_load = Some(ticket.clone());
        self.load_status = OpStatus::Pending;
        self.not_found = None;
        ticket
    }

    /// Applies a load result. Returns `Ok(false)` when the ticket is outdated
    /// and the result was dropped.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Flow, GatewayError>,
    ) -> Result<bool, SessionError> {
        if self.pending_load.as_ref() != Some(&ticket) {
            debug!(flow = %ticket.flow_id, "stale load result dropped");
            return Ok(false);
        }
        self.pending_load = None;

        match result {
            Ok(flow) => {
                info!(flow = %ticket.flow_id, nodes = flow.nodes().len(), "flow loaded");
                self.load_status = OpStatus::Succeeded;
                self.open(flow);
                Ok(true)
            }
            Err(err) => {
                self.load_status = OpStatus::Failed(err.to_string());
                if err.is_not_found() {
                    warn!(flow = %ticket.flow_id, "flow not found");
                    self.not_found = Some(ticket.flow_id);
                    self.flow = None;
                    self.history.clear();
                } else {
                    warn!(flow = %ticket.flow_id, error = %err, "flow load failed");
                    self.banner = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    pub async fn load(&mut self, id: &str) -> Result<&Flow, SessionError> {
        let ticket = self.begin_load(id);
        let store = Arc::clone(&self.store);
        let result = store.load(id).await;
        self.finish_load(ticket, result)?;
        self.flow.as_ref().ok_or(SessionError::NoActiveFlow)
    }

    /// Leaves the current flow. A pending load is abandoned; a pending save
    /// still completes but no longer touches the session's flow.
    pub fn close(&mut self) {
        self.flow = None;
        self.baseline = None;
        self.history.clear();
        self.pending_load = None;
        self.not_found = None;
    }

    fn open(&mut self, flow: Flow) -> &Flow {
        self.pending_load = None;
        self.not_found = None;
        self.history.clear();
        self.revision += 1;
        self.baseline = Some(flow.clone());
        self.flow.insert(flow)
    }

    // ---- edits ----

    fn current(&self) -> Result<&Flow, SessionError> {
        self.flow.as_ref().ok_or(SessionError::NoActiveFlow)
    }

    /// Swaps in `next`. History only records content changes, so selection
    /// clicks do not fill the undo stack.
    fn commit(&mut self, next: Flow) -> bool {
        let Some(current) = self.flow.take() else {
            return false;
        };
        let changed = !current.content_eq(&next);
        if changed {
            self.history.record(current);
            self.revision += 1;
        }
        self.flow = Some(next);
        changed
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), SessionError> {
        let next = graph::rename_flow(self.current()?, name);
        self.commit(next);
        Ok(())
    }

    pub fn add_node(
        &mut self,
        node_type: NodeType,
        position: Option<Position>,
    ) -> Result<NodeId, SessionError> {
        let (next, id) = graph::add_node(self.current()?, &self.registry, node_type, position);
        self.commit(next);
        Ok(id)
    }

    pub fn remove_node(&mut self, id: &NodeId) -> Result<(), SessionError> {
        let next = graph::remove_node(self.current()?, id);
        self.commit(next);
        Ok(())
    }

    pub fn update_node_data(&mut self, id: &NodeId, patch: &DataPatch) -> Result<(), SessionError> {
        let next = graph::update_node_data(self.current()?, id, patch);
        self.commit(next);
        Ok(())
    }

    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> Result<(), SessionError> {
        let next = graph::apply_node_changes(self.current()?, changes);
        self.commit(next);
        Ok(())
    }

    /// Applies canvas edge gestures and returns the ones that were refused.
    pub fn apply_edge_changes(
        &mut self,
        changes: &[EdgeChange],
    ) -> Result<Vec<ConnectionRejected>, SessionError> {
        let outcome = graph::apply_edge_changes(self.current()?, changes);
        self.commit(outcome.flow);
        Ok(outcome.rejected)
    }

    pub fn connect(
        &mut self,
        source: &NodeId,
        source_port: Option<PortId>,
        target: &NodeId,
        target_port: Option<PortId>,
    ) -> Result<EdgeId, SessionError> {
        let (next, id) = graph::connect(self.current()?, source, source_port, target, target_port)?;
        self.commit(next);
        Ok(id)
    }

    pub fn open_editor(&self, id: &NodeId) -> Result<NodeEditor, SessionError> {
        let node = self
            .current()?
            .get_node(id)
            .ok_or_else(|| SessionError::UnknownNode(id.clone()))?;
        Ok(NodeEditor::open(node, self.registry.limits()))
    }

    pub fn apply_editor_patch(&mut self, patch: EditorPatch) -> Result<(), SessionError> {
        if self.current()?.get_node(&patch.node_id).is_none() {
            return Err(SessionError::UnknownNode(patch.node_id));
        }
        self.update_node_data(&patch.node_id, &patch.patch)
    }

    /// Steps back one content change. The flow keeps its current id so an
    /// undo after the first save cannot resurrect the temporary id.
    pub fn undo(&mut self) -> bool {
        let Some(current) = self.flow.take() else {
            return false;
        };
        let id = current.id.clone();
        match self.history.undo(current.clone()) {
            Some(mut previous) => {
                previous.id = id;
                previous.dirty = !self.is_baseline(&previous);
                self.flow = Some(previous);
                self.revision += 1;
                true
            }
            None => {
                self.flow = Some(current);
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        let Some(current) = self.flow.take() else {
            return false;
        };
        let id = current.id.clone();
        match self.history.redo(current.clone()) {
            Some(mut next) => {
                next.id = id;
                next.dirty = !self.is_baseline(&next);
                self.flow = Some(next);
                self.revision += 1;
                true
            }
            None => {
                self.flow = Some(current);
                false
            }
        }
    }

    fn is_baseline(&self, flow: &Flow) -> bool {
        self.baseline
            .as_ref()
            .is_some_and(|baseline| baseline.content_eq(flow))
    }

    // ---- save / delete ----

    pub fn validate(&self) -> Result<FlowValidationReport, SessionError> {
        Ok(validate_flow(self.current()?, &self.registry))
    }

    /// False while a save runs, when nothing is open, or when the open flow
    /// is already persisted and unchanged.
    pub fn can_save(&self) -> bool {
        match &self.flow {
            Some(flow) => !self.save_status.is_pending() && (flow.dirty || flow.id.is_temporary()),
            None => false,
        }
    }

    /// Validates the open flow and marks a save as pending. The returned
    /// snapshot is what should be sent to the store.
    pub fn begin_save(&mut self) -> Result<(SaveTicket, Flow), SessionError> {
        if self.pending_save.is_some() {
            return Err(SessionError::SaveInProgress);
        }
        let flow = self.current()?;
        let report = validate_flow(flow, &self.registry);
        if !report.is_empty() {
            debug!(flow = %flow.id.as_str(), invalid = report.invalid_nodes().count(), "save blocked by validation");
            return Err(SessionError::Invalid(report));
        }
        let violations = flow.invariant_violations();
        if !violations.is_empty() {
            warn!(flow = %flow.id.as_str(), ?violations, "save blocked by inconsistent graph");
            return Err(SessionError::Inconsistent(violations));
        }

        let snapshot = flow.clone();
        self.save_seq += 1;
        let ticket = SaveTicket {
            seq: self.save_seq,
            revision: self.revision,
            flow_id: snapshot.id.clone(),
        };
        self.pending_save = Some(ticket.seq);
        self.save_status = OpStatus::Pending;
        Ok((ticket, snapshot))
    }

    /// Applies a save result. On success the open flow adopts the persisted
    /// id; it is marked clean only if nothing changed since `begin_save`.
    /// On failure the flow is left untouched so the save can be retried.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Flow, GatewayError>,
    ) -> Result<bool, SessionError> {
        if self.pending_save != Some(ticket.seq) {
            debug!(flow = %ticket.flow_id.as_str(), "stale save result dropped");
            return Ok(false);
        }
        self.pending_save = None;

        match result {
            Ok(saved) => {
                let unchanged = self.revision == ticket.revision;
                if let Some(flow) = self.flow.as_mut().filter(|flow| flow.id == ticket.flow_id) {
                    flow.id = saved.id.clone();
                    if unchanged {
                        flow.dirty = false;
                    }
                    self.baseline = Some(saved.clone());
                }
                info!(flow = %saved.id.as_str(), unchanged, "flow saved");
                self.save_status = OpStatus::Succeeded;
                self.banner = None;
                self.last_saved_at = Some(Utc::now());
                Ok(true)
            }
            Err(err) => {
                warn!(flow = %ticket.flow_id.as_str(), error = %err, "flow save failed");
                self.save_status = OpStatus::Failed(err.to_string());
                self.banner = Some(format!("Could not save flow: {err}"));
                Err(err.into())
            }
        }
    }

    /// Validates and saves the open flow, returning its persisted id.
    pub async fn save(&mut self) -> Result<FlowId, SessionError> {
        let (ticket, snapshot) = self.begin_save()?;
        let store = Arc::clone(&self.store);
        let result = store.save(&snapshot).await;
        let persisted = result.as_ref().ok().map(|flow| flow.id.clone());
        self.finish_save(ticket, result)?;
        persisted.ok_or(SessionError::NoActiveFlow)
    }

    /// Deletes the open flow on the backend and closes it. An unsaved flow is
    /// simply discarded.
    pub async fn delete(&mut self) -> Result<(), SessionError> {
        let persisted = self.current()?.id.persisted_id().map(str::to_string);
        let Some(id) = persisted else {
            debug!("discarding unsaved flow");
            self.close();
            return Ok(());
        };

        self.remove_status = OpStatus::Pending;
        let store = Arc::clone(&self.store);
        match store.remove(&id).await {
            Ok(()) => {
                info!(flow = %id, "flow deleted");
                self.remove_status = OpStatus::Succeeded;
                if self.flow.as_ref().and_then(|flow| flow.id.persisted_id()) == Some(id.as_str()) {
                    self.close();
                }
                Ok(())
            }
            Err(err) => {
                warn!(flow = %id, error = %err, "flow delete failed");
                self.remove_status = OpStatus::Failed(err.to_string());
                self.banner = Some(format!("Could not delete flow: {err}"));
                Err(err.into())
            }
        }
    }

    pub async fn list(&mut self) -> Result<Vec<FlowMeta>, SessionError> {
        let store = Arc::clone(&self.store);
        store.list().await.map_err(|err| {
            self.banner = Some(format!("Could not list flows: {err}"));
            err.into()
        })
    }

    // ---- media ----

    /// Uploads `file` for a media editor. The editor keeps its previous
    /// `mediaId` if the upload fails.
    pub async fn upload_media(
        &mut self,
        editor: &mut MediaEditor,
        file: MediaUpload,
    ) -> Result<(), SessionError> {
        let ticket = editor.begin_upload(file.clone())?;
        self.run_upload(editor, ticket, file).await
    }

    pub async fn retry_media_upload(&mut self, editor: &mut MediaEditor) -> Result<(), SessionError> {
        let (ticket, file) = editor.retry_upload()?;
        self.run_upload(editor, ticket, file).await
    }

    async fn run_upload(
        &mut self,
        editor: &mut MediaEditor,
        ticket: UploadTicket,
        file: MediaUpload,
    ) -> Result<(), SessionError> {
        self.upload_status = OpStatus::Pending;
        let store = Arc::clone(&self.store);
        let file_name = file.file_name.clone();
        let result = store.upload_media(file).await;

        match result {
            Ok(media_id) => {
                debug!(file = %file_name, media = %media_id, "media uploaded");
                editor.complete_upload(ticket, Ok(media_id));
                self.upload_status = OpStatus::Succeeded;
                Ok(())
            }
            Err(err) => {
                warn!(file = %file_name, error = %err, "media upload failed");
                editor.complete_upload(ticket, Err(err.to_string()));
                self.upload_status = OpStatus::Failed(err.to_string());
                Err(err.into())
            }
        }
    }
}

impl std::fmt::Debug for FlowEditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEditingSession")
            .field("store", &self.store.name())
            .field("flow", &self.flow.as_ref().map(|flow| flow.id.as_str()))
            .field("revision", &self.revision)
            .field("save_status", &self.save_status)
            .finish()
    }
}
