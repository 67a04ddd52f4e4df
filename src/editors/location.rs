use super::{finish, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::validate;
use crate::nodes::{NodeData, ShareLocationData, ValidationErrors};
use crate::types::NodeId;

#[derive(Debug, Clone)]
pub struct ShareLocationEditor {
    node_id: NodeId,
    data: ShareLocationData,
    limits: EditorLimits,
}

impl ShareLocationEditor {
    pub fn open(node_id: NodeId, data: &ShareLocationData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            data: data.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.data.name = name.into();
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.data.address = address.into();
    }

    pub fn set_map_url(&mut self, map_url: impl Into<String>) {
        self.data.map_url = map_url.into();
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::ShareLocation(self.data.clone()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        finish(
            &self.node_id,
            &self.data,
            &NodeData::ShareLocation(self.data.clone()),
            &self.limits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_submission_warns_on_every_field() {
        let mut editor = ShareLocationEditor::open(
            NodeId::from("loc"),
            &ShareLocationData::default(),
            EditorLimits::default(),
        );
        let errors = editor.save().unwrap_err();
        assert!(errors.has_field("name"));
        assert!(errors.has_field("address"));
        assert!(errors.has_field("mapUrl"));

        editor.set_name("Head office");
        editor.set_address("1 Main St");
        editor.set_map_url("https://maps.example.com/?q=1+Main+St");
        let patch = editor.save().unwrap();
        assert_eq!(patch.patch["mapUrl"], "https://maps.example.com/?q=1+Main+St");
    }
}
