use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// One fan submission: who sent it, when, and what was submitted. Rows are
/// written by the submission side and are read-only here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Record {
    pub submitter: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub content: String,
}

/// Match logs submitted for a streamer, in storage order.
pub async fn list_paipu(db: &PgPool, streamer_id: i32) -> anyhow::Result<Vec<Record>> {
    let rows = sqlx::query_as::<_, Record>(
        r#"
        SELECT userName AS submitter, paipuDate AS submitted_at, paipuCode AS content
        FROM paipu
        WHERE streamerID = $1
        "#,
    )
    .bind(streamer_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Schedule suggestions submitted for a streamer, in storage order.
pub async fn list_schedule(db: &PgPool, streamer_id: i32) -> anyhow::Result<Vec<Record>> {
    let rows = sqlx::query_as::<_, Record>(
        r#"
        SELECT userName AS submitter, scheduleDate AS submitted_at, scheduleContent AS content
        FROM schedule
        WHERE streamerID = $1
        "#,
    )
    .bind(streamer_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Viewer questions submitted for a streamer, in storage order.
pub async fn list_questions(db: &PgPool, streamer_id: i32) -> anyhow::Result<Vec<Record>> {
    let rows = sqlx::query_as::<_, Record>(
        r#"
        SELECT userName AS submitter, questionDate AS submitted_at, questionContent AS content
        FROM question
        WHERE streamerID = $1
        "#,
    )
    .bind(streamer_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn record_serializes_with_rfc3339_date() {
        let record = Record {
            submitter: "viewer-1".into(),
            submitted_at: datetime!(2024-03-01 12:00 UTC),
            content: "3ma8k2xq01zz".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("viewer-1"));
        assert!(json.contains("2024-03-01T12:00:00Z"));
        assert!(json.contains("3ma8k2xq01zz"));
    }
}
