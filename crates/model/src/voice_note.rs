use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{
    validation::{Validate, ValidationErrors},
    ExampleData, WithId,
};

/// A recorded voice message and its (optional) transcription. The audio itself
/// lives in file storage, only its path is kept here.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoiceNote {
    pub audio_file: String,
    pub transcription: Option<String>,
    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for VoiceNote {
    type IdType = i64;
}

impl Validate for VoiceNote {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_not_blank("audioFile", &self.audio_file);
        errors.require_max_length("audioFile", &self.audio_file, 255);
        errors.into_result()
    }
}

impl ExampleData for VoiceNote {
    fn example_data() -> Self {
        Self {
            audio_file: "voice_uploads/2025-04-12-lecture-note.m4a".to_owned(),
            transcription: Some("Tomorrow's lab session moves to room 204.".to_owned()),
            created_at: None,
        }
    }
}

/// Newest first.
pub fn sort_newest_first(notes: &mut [WithId<VoiceNote>]) {
    notes.sort_by(|a, b| {
        b.content
            .created_at
            .cmp(&a.content.created_at)
            .then(b.id.cmp(&a.id))
    });
}
