use super::{finish, EditorError, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::validate;
use crate::nodes::{ContactCardData, NodeData, ValidationErrors};
use crate::types::{ContactEntry, NodeId};

#[derive(Debug, Clone)]
pub struct ContactCardEditor {
    node_id: NodeId,
    contacts: Vec<ContactEntry>,
    limits: EditorLimits,
}

impl ContactCardEditor {
    pub fn open(node_id: NodeId, data: &ContactCardData, limits: EditorLimits) -> Self {
        Self {
            node_id,
            contacts: data.contacts.clone(),
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn contacts(&self) -> &[ContactEntry] {
        &self.contacts
    }

    pub fn add_contact(&mut self, name: impl Into<String>, phone: impl Into<String>) -> usize {
        self.contacts.push(ContactEntry::new(name, phone));
        self.contacts.len() - 1
    }

    pub fn update_contact(
        &mut self,
        index: usize,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<(), EditorError> {
        let contact = self
            .contacts
            .get_mut(index)
            .ok_or(EditorError::UnknownContact(index))?;
        *contact = ContactEntry::new(name, phone);
        Ok(())
    }

    pub fn remove_contact(&mut self, index: usize) -> Result<ContactEntry, EditorError> {
        if index >= self.contacts.len() {
            return Err(EditorError::UnknownContact(index));
        }
        Ok(self.contacts.remove(index))
    }

    fn data(&self) -> ContactCardData {
        ContactCardData {
            contacts: self.contacts.clone(),
        }
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::ContactCard(self.data()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        let data = self.data();
        finish(&self.node_id, &data, &NodeData::ContactCard(data.clone()), &self.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_complete_contacts() {
        let mut editor = ContactCardEditor::open(
            NodeId::from("c"),
            &ContactCardData::default(),
            EditorLimits::default(),
        );
        assert!(editor.save().unwrap_err().has_field("contacts"));

        let index = editor.add_contact("Support", "");
        assert!(editor.save().unwrap_err().has_field("contacts[0].phone"));
        editor.update_contact(index, "Support", "+1 555 0100").unwrap();
        let patch = editor.save().unwrap();
        assert_eq!(patch.patch["contacts"][0]["phone"], "+1 555 0100");

        assert_eq!(editor.remove_contact(3), Err(EditorError::UnknownContact(3)));
    }
}
