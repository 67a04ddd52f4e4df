//! Persistence gateway: moves flows between the in-memory model and the
//! backend's Flow CRUD endpoints.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::graph::Flow;
use crate::types::MediaUpload;

pub mod http;
pub mod memory;
pub mod wire;

pub use http::HttpFlowStore;
pub use memory::MemoryFlowStore;
pub use wire::{FlowMeta, WireEdge, WireFlow, WireNode};

#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn list(&self) -> Result<Vec<FlowMeta>, GatewayError>;

    /// Fails with [`GatewayError::NotFound`] for unknown ids.
    async fn load(&self, id: &str) -> Result<Flow, GatewayError>;

    /// Creates the flow if its id is temporary, updates it otherwise. The
    /// returned flow always carries a persisted id. Retrying a save for the
    /// same flow must not create a second copy.
    async fn save(&self, flow: &Flow) -> Result<Flow, GatewayError>;

    async fn remove(&self, id: &str) -> Result<(), GatewayError>;

    async fn upload_media(&self, _upload: MediaUpload) -> Result<String, GatewayError> {
        Err(GatewayError::Unsupported("media uploads"))
    }

    fn name(&self) -> &'static str;
}
