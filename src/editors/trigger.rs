use super::{finish, EditorError, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::keyword_problem;
use crate::nodes::{NodeData, TriggerData, ValidationErrors};
use crate::types::NodeId;

/// Keyword list of a trigger: single words, no duplicates (case-insensitive).
#[derive(Debug, Clone)]
pub struct TriggerEditor {
    node_id: NodeId,
    keywords: Vec<String>,
    limits: EditorLimits,
}

impl TriggerEditor {
    pub fn open(node_id: NodeId, data: &TriggerData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            keywords: data.keywords.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn add_keyword(&mut self, keyword: &str) -> Result<(), EditorError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(EditorError::EmptyKeyword);
        }
        if keyword_problem(keyword).is_some() {
            return Err(EditorError::KeywordWhitespace(keyword.to_string()));
        }
        let lowered = keyword.to_lowercase();
        if self.keywords.iter().any(|k| k.to_lowercase() == lowered) {
            return Err(EditorError::DuplicateKeyword(keyword.to_string()));
        }
        self.keywords.push(keyword.to_string());
        Ok(())
    }

    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let before = self.keywords.len();
        self.keywords.retain(|k| k != keyword);
        self.keywords.len() != before
    }

    fn data(&self) -> TriggerData {
        TriggerData {
            keywords: self.keywords.clone(),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        crate::nodes::validation::validate(&NodeData::Trigger(self.data()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(&self.node_id, &data, &NodeData::Trigger(data.clone()), &self.limits)
    }
}
