use async_trait::async_trait;
use campus::database::{Repo, Result, VoiceNoteRepo};
use chrono::{DateTime, Utc};
use model::{voice_note::VoiceNote, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{queries::voice_note, PgDatabaseTransaction};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct VoiceNoteRow {
    pub id: i64,
    pub audio_file: String,
    pub transcription: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DatabaseRow for VoiceNoteRow {
    type Model = VoiceNote;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(VoiceNote {
            audio_file: self.audio_file,
            transcription: self.transcription,
            created_at: Some(self.created_at),
        })
    }
}

#[async_trait]
impl<'a> Repo<VoiceNote> for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: Id<VoiceNote>) -> Result<WithId<VoiceNote>> {
        voice_note::get(&mut *self.tx, id).await
    }

    async fn insert(&mut self, element: VoiceNote) -> Result<WithId<VoiceNote>> {
        voice_note::insert(&mut *self.tx, element).await
    }

    async fn update(&mut self, element: WithId<VoiceNote>) -> Result<WithId<VoiceNote>> {
        voice_note::update(&mut *self.tx, element).await
    }

    async fn delete(&mut self, id: Id<VoiceNote>) -> Result<()> {
        voice_note::delete(&mut *self.tx, id).await
    }
}

#[async_trait]
impl<'a> VoiceNoteRepo for PgDatabaseTransaction<'a> {
    async fn voice_notes(&mut self) -> Result<Vec<WithId<VoiceNote>>> {
        voice_note::get_all(&mut *self.tx).await
    }
}
