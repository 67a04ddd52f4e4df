use super::{finish, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::{DelayData, NodeData, ValidationErrors};
use crate::types::NodeId;

/// Wait step in minutes. Out-of-range input is clamped on save, never rejected.
#[derive(Debug, Clone)]
pub struct DelayEditor {
    node_id: NodeId,
    minutes: i64,
    limits: EditorLimits,
}

impl DelayEditor {
    pub fn open(node_id: NodeId, data: &DelayData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            minutes: data.delay_minutes,
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn set_minutes(&mut self, minutes: i64) {
        self.minutes = minutes;
    }

    fn data(&self) -> DelayData {
        DelayData {
            delay_minutes: self.limits.clamp_delay(self.minutes),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        ValidationErrors::new()
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(&self.node_id, &data, &NodeData::Delay(data.clone()), &self.limits)
    }
}
