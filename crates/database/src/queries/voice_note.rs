use campus::database::Result;
use model::{voice_note::VoiceNote, WithId};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{voice_note::VoiceNoteRow, with_id, with_ids};

use super::{convert_error, deleted};

pub async fn get<'c, E>(executor: E, id: Id<VoiceNote>) -> Result<WithId<VoiceNote>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, VoiceNoteRow>(
        "
        SELECT id, audio_file, transcription, created_at
        FROM voice_notes
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

/// Newest first.
pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<VoiceNote>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, VoiceNoteRow>(
        "
        SELECT id, audio_file, transcription, created_at
        FROM voice_notes
        ORDER BY created_at DESC, id DESC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_ids)
}

pub async fn insert<'c, E>(executor: E, note: VoiceNote) -> Result<WithId<VoiceNote>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, VoiceNoteRow>(
        "
        INSERT INTO voice_notes(audio_file, transcription)
        VALUES ($1, $2)
        RETURNING id, audio_file, transcription, created_at;
        ",
    )
    .bind(&note.audio_file)
    .bind(&note.transcription)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn update<'c, E>(executor: E, note: WithId<VoiceNote>) -> Result<WithId<VoiceNote>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, VoiceNoteRow>(
        "
        UPDATE voice_notes
        SET audio_file = $1,
            transcription = $2
        WHERE id = $3
        RETURNING id, audio_file, transcription, created_at;
        ",
    )
    .bind(&note.content.audio_file)
    .bind(&note.content.transcription)
    .bind(note.id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?
    .let_owned(with_id)
}

pub async fn delete<'c, E>(executor: E, id: Id<VoiceNote>) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM voice_notes WHERE id = $1;")
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)
        .and_then(deleted)
}
