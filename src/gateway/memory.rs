use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::wire::{FlowMeta, FlowUpdate, WireFlow};
use super::FlowStore;
use crate::error::GatewayError;
use crate::graph::Flow;
use crate::types::{FlowId, MediaUpload};

#[derive(Debug, Clone)]
struct StoredFlow {
    seq: u64,
    document: WireFlow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Process-local flow store. Backs the reference server and stands in for the
/// HTTP backend in tests.
#[derive(Debug, Default)]
pub struct MemoryFlowStore {
    flows: RwLock<HashMap<String, StoredFlow>>,
    idempotency: RwLock<HashMap<String, String>>,
    media: RwLock<HashMap<String, StoredMedia>>,
    next_id: AtomicU64,
    requests: AtomicUsize,
    failures: AtomicUsize,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gateway calls made through the [`FlowStore`] interface.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Makes the next `count` gateway calls fail with a network error.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn check_document(document: &WireFlow) -> Result<(), GatewayError> {
        document.clone().into_draft().map(|_| ())
    }

    /// Stores a new flow. A repeated create with the same idempotency key
    /// overwrites the flow created the first time instead of adding another.
    /// The key table stays locked until the flow is stored, so concurrent
    /// creates with one key resolve to a single flow.
    pub async fn create(
        &self,
        mut document: WireFlow,
        idempotency_key: Option<&str>,
    ) -> Result<WireFlow, GatewayError> {
        Self::check_document(&document)?;

        let mut keys = self.idempotency.write().await;
        let mut flows = self.flows.write().await;

        if let Some(id) = idempotency_key.and_then(|key| keys.get(key)).cloned() {
            if let Some(stored) = flows.get_mut(&id) {
                document.id = Some(id.clone());
                stored.document = document.clone();
                debug!(flow = %id, "create replayed for idempotency key");
                return Ok(document);
            }
        }

        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = seq.to_string();
        document.id = Some(id.clone());
        flows.insert(
            id.clone(),
            StoredFlow {
                seq,
                document: document.clone(),
            },
        );
        if let Some(key) = idempotency_key {
            keys.insert(key.to_string(), id);
        }
        Ok(document)
    }

    pub async fn get(&self, id: &str) -> Result<WireFlow, GatewayError> {
        self.flows
            .read()
            .await
            .get(id)
            .map(|stored| stored.document.clone())
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    pub async fn update(&self, id: &str, update: FlowUpdate) -> Result<WireFlow, GatewayError> {
        let mut flows = self.flows.write().await;
        let stored = flows
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;

        let mut document = stored.document.clone();
        if let Some(name) = update.name {
            document.name = name;
        }
        if let Some(nodes) = update.nodes {
            document.nodes = nodes;
        }
        if let Some(edges) = update.edges {
            document.edges = edges;
        }
        Self::check_document(&document)?;

        stored.document = document.clone();
        Ok(document)
    }

    pub async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.flows
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    pub async fn metas(&self) -> Vec<FlowMeta> {
        let flows = self.flows.read().await;
        let mut stored: Vec<&StoredFlow> = flows.values().collect();
        stored.sort_by_key(|stored| stored.seq);
        stored
            .into_iter()
            .filter_map(|stored| stored.document.meta())
            .collect()
    }

    pub async fn store_media(&self, file_name: &str, mime_type: &str, size: u64) -> String {
        let id = format!("media-{}", self.next_id());
        self.media.write().await.insert(
            id.clone(),
            StoredMedia {
                file_name: file_name.to_string(),
                mime_type: mime_type.to_string(),
                size,
            },
        );
        id
    }

    pub async fn media(&self, id: &str) -> Option<StoredMedia> {
        self.media.read().await.get(id).cloned()
    }

    fn begin_request(&self) -> Result<(), GatewayError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(GatewayError::Network("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn list(&self) -> Result<Vec<FlowMeta>, GatewayError> {
        self.begin_request()?;
        Ok(self.metas().await)
    }

    async fn load(&self, id: &str) -> Result<Flow, GatewayError> {
        self.begin_request()?;
        self.get(id).await?.into_flow()
    }

    async fn save(&self, flow: &Flow) -> Result<Flow, GatewayError> {
        self.begin_request()?;
        let document = WireFlow::from_flow(flow)?;
        let saved = match &flow.id {
            FlowId::Temporary(token) => self.create(document, Some(token)).await?,
            FlowId::Persisted(id) => {
                self.update(
                    id,
                    FlowUpdate {
                        name: Some(document.name),
                        nodes: Some(document.nodes),
                        edges: Some(document.edges),
                    },
                )
                .await?
            }
        };
        saved.into_flow()
    }

    async fn remove(&self, id: &str) -> Result<(), GatewayError> {
        self.begin_request()?;
        self.delete(id).await
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<String, GatewayError> {
        self.begin_request()?;
        Ok(self
            .store_media(&upload.file_name, &upload.mime_type, upload.size())
            .await)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
