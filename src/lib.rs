pub mod backend;
pub mod config;
pub mod editors;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod nodes;
pub mod session;
pub mod types;

pub use config::{ConfigError, EditorLimits, GatewayConfig};
pub use editors::{EditorError, EditorPatch, NodeEditor};
pub use error::GatewayError;
pub use gateway::{FlowMeta, FlowStore, HttpFlowStore, MemoryFlowStore, WireFlow};
pub use graph::{
    ConnectionRejected, Edge, EdgeChange, Flow, FlowValidationReport, History, NewEdge, Node,
    NodeChange,
};
pub use nodes::{
    default_registry, DataPatch, FieldError, NodeData, NodeRegistry, NodeType, ValidationErrors,
};
pub use session::{FlowEditingSession, OpStatus, SessionError};
pub use types::{Button, EdgeId, FlowId, MediaType, MediaUpload, NodeId, PortId, Position};
pub use schemars::JsonSchema;
