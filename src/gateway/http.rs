use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{multipart::{Form, Part}, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::wire::{
    ErrorEnvelope, FlowEnvelope, FlowListEnvelope, FlowMeta, FlowUpdate, MediaEnvelope, WireFlow,
};
use super::FlowStore;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::graph::Flow;
use crate::types::{FlowId, MediaUpload};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// [`FlowStore`] backed by the Flow REST endpoints.
#[derive(Debug)]
pub struct HttpFlowStore {
    client: Client,
    config: GatewayConfig,
    /// Temporary token -> persisted id for creates that already succeeded.
    created: Mutex<HashMap<String, String>>,
}

impl HttpFlowStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::from_config(GatewayConfig::new(base_url))
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_config(GatewayConfig::from_env())
    }

    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            created: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_default_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn created_id(&self, token: &str) -> Option<String> {
        self.created
            .lock()
            .ok()
            .and_then(|created| created.get(token).cloned())
    }

    fn remember_created(&self, token: &str, id: &str) {
        if let Ok(mut created) = self.created.lock() {
            created.insert(token.to_string(), id.to_string());
        }
    }

    fn forget_token(&self, token: &str) {
        if let Ok(mut created) = self.created.lock() {
            created.remove(token);
        }
    }

    fn forget_flow(&self, id: &str) {
        if let Ok(mut created) = self.created.lock() {
            created.retain(|_, persisted| persisted != id);
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let response = self.with_default_headers(builder).send().await?;
        let response = Self::check_status(response, resource).await?;
        Ok(response.json().await?)
    }

    async fn check_status(response: Response, resource: &str) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(resource.to_string()));
        }

        let text = response.text().await?;
        if let Ok(error) = serde_json::from_str::<ErrorEnvelope>(&text) {
            return Err(GatewayError::Network(format!("{status}: {}", error.message)));
        }
        Err(GatewayError::Network(format!("unexpected status {status}: {text}")))
    }

    async fn create(&self, document: &WireFlow, token: &str) -> Result<WireFlow, GatewayError> {
        let builder = self
            .client
            .post(self.endpoint("flows"))
            .header(IDEMPOTENCY_HEADER, token)
            .json(document);
        let envelope: FlowEnvelope = self.send(builder, "flows").await?;
        if let Some(id) = envelope.flow.id.as_deref() {
            self.remember_created(token, id);
            info!(flow = %id, "flow created");
        }
        Ok(envelope.flow)
    }

    async fn update(&self, id: &str, document: WireFlow) -> Result<WireFlow, GatewayError> {
        let body = FlowUpdate {
            name: Some(document.name),
            nodes: Some(document.nodes),
            edges: Some(document.edges),
        };
        let builder = self
            .client
            .put(self.endpoint(&format!("flows/{id}")))
            .json(&body);
        let envelope: FlowEnvelope = self.send(builder, id).await?;
        debug!(flow = %id, "flow updated");
        Ok(envelope.flow)
    }
}

#[async_trait]
impl FlowStore for HttpFlowStore {
    async fn list(&self) -> Result<Vec<FlowMeta>, GatewayError> {
        let envelope: FlowListEnvelope = self
            .send(self.client.get(self.endpoint("flows")), "flows")
            .await?;
        debug!(count = envelope.flows.len(), "listed flows");
        Ok(envelope.flows)
    }

    async fn load(&self, id: &str) -> Result<Flow, GatewayError> {
        let envelope: FlowEnvelope = self
            .send(self.client.get(self.endpoint(&format!("flows/{id}"))), id)
            .await?;
        debug!(flow = %id, nodes = envelope.flow.nodes.len(), "flow loaded");
        envelope.flow.into_flow()
    }

    async fn save(&self, flow: &Flow) -> Result<Flow, GatewayError> {
        let document = WireFlow::from_flow(flow)?;
        let saved = match &flow.id {
            FlowId::Persisted(id) => self.update(id, document).await?,
            FlowId::Temporary(token) => match self.created_id(token) {
                // A retried create: the update reaches the caller with the
                // persisted id, after which the token is never sent again.
                Some(id) => match self.update(&id, document.clone()).await {
                    Ok(saved) => {
                        self.forget_token(token);
                        saved
                    }
                    Err(err) if err.is_not_found() => {
                        self.forget_token(token);
                        self.create(&document, token).await?
                    }
                    Err(err) => return Err(err),
                },
                None => self.create(&document, token).await?,
            },
        };
        saved.into_flow()
    }

    async fn remove(&self, id: &str) -> Result<(), GatewayError> {
        let response = self
            .with_default_headers(self.client.delete(self.endpoint(&format!("flows/{id}"))))
            .send()
            .await?;
        Self::check_status(response, id).await?;
        self.forget_flow(id);
        info!(flow = %id, "flow deleted");
        Ok(())
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<String, GatewayError> {
        let MediaUpload {
            file_name,
            mime_type,
            bytes,
        } = upload;

        let file_part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(&mime_type)?;
        let form = Form::new().part("file", file_part);

        let builder = self.client.post(self.endpoint("upload-media")).multipart(form);
        let envelope: MediaEnvelope = self.send(builder, "upload-media").await?;
        debug!(file = %file_name, media = %envelope.media_id, "media uploaded");
        Ok(envelope.media_id)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let store = HttpFlowStore::new("http://localhost:3002/api/").unwrap();
        assert_eq!(store.endpoint("/flows"), "http://localhost:3002/api/flows");
        assert_eq!(store.endpoint("flows/7"), "http://localhost:3002/api/flows/7");
    }

    #[test]
    fn remembers_created_tokens() {
        let store = HttpFlowStore::new("http://localhost").unwrap();
        assert_eq!(store.created_id("tmp-1"), None);
        store.remember_created("tmp-1", "42");
        assert_eq!(store.created_id("tmp-1").as_deref(), Some("42"));
    }

    #[test]
    fn forgets_tokens_per_token_and_per_flow() {
        let store = HttpFlowStore::new("http://localhost").unwrap();
        store.remember_created("tmp-1", "42");
        store.remember_created("tmp-2", "43");
        store.forget_flow("42");
        assert_eq!(store.created_id("tmp-1"), None);
        assert_eq!(store.created_id("tmp-2").as_deref(), Some("43"));
        store.forget_token("tmp-2");
        assert_eq!(store.created_id("tmp-2"), None);
    }
}
