use super::{finish, EditorError, EditorPatch};
use crate::config::EditorLimits;
use crate::nodes::validation::validate;
use crate::nodes::{MediaMessageData, NodeData, ValidationErrors};
use crate::types::{MediaType, MediaUpload, NodeId};

/// Identifies one upload attempt. Results carrying an outdated ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading { ticket: UploadTicket, file_name: String },
    Uploaded,
    Failed { message: String },
}

/// Media message form. The upload runs outside the editor; the editor only
/// tracks its lifecycle and keeps the last good `mediaId` until a new upload
/// replaces it.
#[derive(Debug, Clone)]
pub struct MediaEditor {
    node_id: NodeId,
    data: MediaMessageData,
    upload: UploadState,
    last_attempt: Option<MediaUpload>,
    ticket_seq: u64,
    limits: EditorLimits,
}

impl MediaEditor {
    pub fn open(node_id: NodeId, data: &MediaMessageData, limits: EditorLimits) -> Self {
        let upload = if data.media_id.is_some() {
            UploadState::Uploaded
        } else {
            UploadState::Idle
        };
        Self {
            node_id,
            data: data.clone(),
            upload,
            last_attempt: None,
            ticket_seq: 0,
            limits,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn media_type(&self) -> Option<MediaType> {
        self.data.media_type
    }

    pub fn media_id(&self) -> Option<&str> {
        self.data.media_id.as_deref()
    }

    pub fn upload_state(&self) -> &UploadState {
        &self.upload
    }

    /// The upload control is only offered once a media type is chosen.
    pub fn can_upload(&self) -> bool {
        self.data.media_type.is_some() && !matches!(self.upload, UploadState::Uploading { .. })
    }

    /// Switching type discards the uploaded file and any in-flight attempt.
    pub fn set_media_type(&mut self, media_type: MediaType) {
        if self.data.media_type == Some(media_type) {
            return;
        }
        self.data.media_type = Some(media_type);
        self.data.media_id = None;
        self.data.file_name = None;
        self.upload = UploadState::Idle;
        self.last_attempt = None;
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.data.caption = caption.into();
    }

    pub fn begin_upload(&mut self, file: MediaUpload) -> Result<UploadTicket, EditorError> {
        let media_type = self.data.media_type.ok_or(EditorError::MediaTypeRequired)?;
        if matches!(self.upload, UploadState::Uploading { .. }) {
            return Err(EditorError::UploadInProgress);
        }
        let limit = self.limits.max_upload_bytes(media_type);
        if file.size() > limit {
            return Err(EditorError::FileTooLarge {
                file_name: file.file_name.clone(),
                media_type: media_type.to_string(),
                size: file.size(),
                limit,
            });
        }

        self.ticket_seq += 1;
        let ticket = UploadTicket(self.ticket_seq);
        self.upload = UploadState::Uploading {
            ticket,
            file_name: file.file_name.clone(),
        };
        self.last_attempt = Some(file);
        Ok(ticket)
    }

    /// Applies an upload result. Returns `false` when the attempt was cancelled
    /// or superseded and the result was ignored.
    pub fn complete_upload(&mut self, ticket: UploadTicket, result: Result<String, String>) -> bool {
        let file_name = match &self.upload {
            UploadState::Uploading { ticket: current, file_name } if *current == ticket => {
                file_name.clone()
            }
            _ => return false,
        };

        match result {
            Ok(media_id) => {
                self.data.media_id = Some(media_id);
                self.data.file_name = Some(file_name);
                self.upload = UploadState::Uploaded;
                self.last_attempt = None;
            }
            Err(message) => {
                self.upload = UploadState::Failed { message };
            }
        }
        true
    }

    pub fn cancel_upload(&mut self) -> bool {
        if !matches!(self.upload, UploadState::Uploading { .. }) {
            return false;
        }
        self.upload = if self.data.media_id.is_some() {
            UploadState::Uploaded
        } else {
            UploadState::Idle
        };
        true
    }

    /// Restarts the last failed attempt with the same file.
    pub fn retry_upload(&mut self) -> Result<(UploadTicket, MediaUpload), EditorError> {
        if !matches!(self.upload, UploadState::Failed { .. }) {
            return Err(EditorError::NothingToRetry);
        }
        let file = self.last_attempt.clone().ok_or(EditorError::NothingToRetry)?;
        let ticket = self.begin_upload(file.clone())?;
        Ok((ticket, file))
    }

    pub fn errors(&self) -> ValidationErrors {
        validate(&NodeData::MediaMessage(self.data.clone()), &self.limits)
    }

    pub fn save(&self) -> Result<EditorPatch, ValidationErrors> {
        if let UploadState::Uploading { .. } = self.upload {
            let mut errors = self.errors();
            errors.push("mediaId", "wait for the upload to finish");
            return Err(errors);
        }
        finish(
            &self.node_id,
            &self.data,
            &NodeData::MediaMessage(self.data.clone()),
            &self.limits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> MediaEditor {
        MediaEditor::open(NodeId::from("m"), &MediaMessageData::default(), EditorLimits::default())
    }

    fn file(size: usize) -> MediaUpload {
        MediaUpload::new("photo.jpg", "image/jpeg", vec![0; size])
    }

    #[test]
    fn upload_needs_a_media_type_and_respects_ceilings() {
        let mut editor = editor();
        assert!(!editor.can_upload());
        assert_eq!(editor.begin_upload(file(10)), Err(EditorError::MediaTypeRequired));

        editor.set_media_type(MediaType::Image);
        let too_big = file(5 * 1024 * 1024 + 1);
        assert!(matches!(
            editor.begin_upload(too_big),
            Err(EditorError::FileTooLarge { .. })
        ));
        assert_eq!(editor.upload_state(), &UploadState::Idle);
    }

    #[test]
    fn save_is_blocked_until_upload_completes() {
        let mut editor = editor();
        editor.set_media_type(MediaType::Image);
        assert!(editor.save().unwrap_err().has_field("mediaId"));

        let ticket = editor.begin_upload(file(100)).unwrap();
        assert!(editor.save().is_err());
        assert!(editor.complete_upload(ticket, Ok("media-1".into())));
        assert_eq!(editor.upload_state(), &UploadState::Uploaded);

        let patch = editor.save().unwrap();
        assert_eq!(patch.patch["mediaId"], "media-1");
        assert_eq!(patch.patch["mediaType"], "image");
        assert_eq!(patch.patch["fileName"], "photo.jpg");
    }

    #[test]
    fn failure_keeps_previous_media_and_allows_retry() {
        let mut editor = editor();
        editor.set_media_type(MediaType::Video);
        let ticket = editor.begin_upload(file(10)).unwrap();
        editor.complete_upload(ticket, Ok("first".into()));

        let ticket = editor.begin_upload(file(20)).unwrap();
        editor.complete_upload(ticket, Err("timeout".into()));
        assert_eq!(editor.media_id(), Some("first"));
        assert!(matches!(editor.upload_state(), UploadState::Failed { .. }));

        let (ticket, retried) = editor.retry_upload().unwrap();
        assert_eq!(retried.size(), 20);
        editor.complete_upload(ticket, Ok("second".into()));
        assert_eq!(editor.media_id(), Some("second"));
        assert_eq!(editor.retry_upload(), Err(EditorError::NothingToRetry));
    }

    #[test]
    fn cancelled_or_stale_results_are_ignored() {
        let mut editor = editor();
        editor.set_media_type(MediaType::Document);
        let ticket = editor.begin_upload(file(10)).unwrap();
        assert!(editor.cancel_upload());
        assert!(!editor.complete_upload(ticket, Ok("late".into())));
        assert_eq!(editor.media_id(), None);
        assert_eq!(editor.upload_state(), &UploadState::Idle);
    }
}
