//! Typed query helpers for every table in the PatchGate database.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{
    Submission, SubmissionLogLine, SubmissionStatus, Upload, ValidationStatus,
};

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_timestamp(entity: &str, id: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRecord {
            entity: entity.to_string(),
            id: id.to_string(),
            detail: format!("bad timestamp '{}': {}", raw, e),
        })
}

fn row_to_upload(row: &Row<'_>) -> rusqlite::Result<(Upload, String)> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(6)?;
    let status: String = row.get(4)?;
    Ok((
        Upload {
            id: id.clone(),
            filename: row.get(1)?,
            content: row.get(2)?,
            project: row.get(3)?,
            validation_status: ValidationStatus::from_str_val(&status),
            validation_error: row.get(5)?,
            created_at: Utc::now(), // replaced by the caller after parsing
        },
        created_at,
    ))
}

fn row_to_submission(
    row: &Row<'_>,
) -> rusqlite::Result<(Submission, String, String, String)> {
    let id: String = row.get(0)?;
    let status: String = row.get(6)?;
    let emails: String = row.get(10)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;
    Ok((
        Submission {
            id: id.clone(),
            upload_id: row.get(1)?,
            project: row.get(2)?,
            subject: row.get(3)?,
            description: row.get(4)?,
            branch: row.get(5)?,
            status: SubmissionStatus::from_str_val(&status),
            change_id: row.get(7)?,
            change_url: row.get(8)?,
            error: row.get(9)?,
            notification_emails: Vec::new(), // replaced by the caller after parsing
            remote_node_id: row.get(11)?,
            git_repository: row.get(12)?,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        emails,
        created_at,
        updated_at,
    ))
}

const SUBMISSION_COLUMNS: &str = "id, upload_id, project, subject, description, branch, status, \
     change_id, change_url, error, notification_emails, remote_node_id, git_repository, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Query implementations
// ---------------------------------------------------------------------------

impl Database {
    // -- uploads ------------------------------------------------------------

    /// Insert a new upload record. Uploads are immutable after this point.
    pub fn insert_upload(&self, upload: &Upload) -> Result<(), DatabaseError> {
        debug!(id = %upload.id, status = %upload.validation_status, "inserting upload");
        self.conn().execute(
            "INSERT INTO uploads \
             (id, filename, content, project, validation_status, validation_error, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                upload.id,
                upload.filename,
                upload.content,
                upload.project,
                upload.validation_status.to_string(),
                upload.validation_error,
                upload.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch an upload by id.
    pub fn get_upload(&self, id: &str) -> Result<Option<Upload>, DatabaseError> {
        let result = self
            .conn()
            .query_row(
                "SELECT id, filename, content, project, validation_status, validation_error, \
                 created_at FROM uploads WHERE id = ?1",
                params![id],
                row_to_upload,
            )
            .optional()?;

        match result {
            Some((mut upload, created_at)) => {
                upload.created_at = parse_timestamp("upload", id, &created_at)?;
                Ok(Some(upload))
            }
            None => Ok(None),
        }
    }

    // -- submissions --------------------------------------------------------

    /// Insert a new submission record.
    pub fn insert_submission(&self, submission: &Submission) -> Result<(), DatabaseError> {
        debug!(id = %submission.id, upload_id = %submission.upload_id, "inserting submission");
        let emails = serde_json::to_string(&submission.notification_emails).map_err(|e| {
            DatabaseError::CorruptRecord {
                entity: "submission".into(),
                id: submission.id.clone(),
                detail: format!("cannot encode notification_emails: {}", e),
            }
        })?;
        self.conn().execute(
            "INSERT INTO submissions \
             (id, upload_id, project, subject, description, branch, status, change_id, \
              change_url, error, notification_emails, remote_node_id, git_repository, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                submission.id,
                submission.upload_id,
                submission.project,
                submission.subject,
                submission.description,
                submission.branch,
                submission.status.to_string(),
                submission.change_id,
                submission.change_url,
                submission.error,
                emails,
                submission.remote_node_id,
                submission.git_repository,
                submission.created_at.to_rfc3339(),
                submission.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a submission by id.
    pub fn get_submission(&self, id: &str) -> Result<Option<Submission>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE id = ?1",
            SUBMISSION_COLUMNS
        );
        let result = self
            .conn()
            .query_row(&sql, params![id], row_to_submission)
            .optional()?;

        match result {
            Some((mut submission, emails, created_at, updated_at)) => {
                submission.notification_emails =
                    serde_json::from_str(&emails).map_err(|e| DatabaseError::CorruptRecord {
                        entity: "submission".into(),
                        id: id.to_string(),
                        detail: format!("bad notification_emails '{}': {}", emails, e),
                    })?;
                submission.created_at = parse_timestamp("submission", id, &created_at)?;
                submission.updated_at = parse_timestamp("submission", id, &updated_at)?;
                Ok(Some(submission))
            }
            None => Ok(None),
        }
    }

    /// Transition a submission's status.
    ///
    /// This is a plain column update; the monotonicity of the state machine
    /// is enforced by the orchestrator (single writer per id), not here.
    pub fn update_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
    ) -> Result<(), DatabaseError> {
        debug!(id, status = %status, "updating submission status");
        let changed = self.conn().execute(
            "UPDATE submissions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.to_string(), Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "submission".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Record a successful code-review push: change id/url and completed state.
    pub fn complete_submission(
        &self,
        id: &str,
        change_id: &str,
        change_url: &str,
    ) -> Result<(), DatabaseError> {
        debug!(id, change_id, "marking submission completed");
        let changed = self.conn().execute(
            "UPDATE submissions SET status = 'completed', change_id = ?2, change_url = ?3, \
             error = NULL, updated_at = ?4 WHERE id = ?1",
            params![id, change_id, change_url, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "submission".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Record a terminal failure with its error message.
    pub fn fail_submission(&self, id: &str, error: &str) -> Result<(), DatabaseError> {
        debug!(id, "marking submission failed");
        let changed = self.conn().execute(
            "UPDATE submissions SET status = 'failed', error = ?2, updated_at = ?3 \
             WHERE id = ?1",
            params![id, error, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "submission".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // -- submission logs (append-only) --------------------------------------

    /// Append one timestamped log line for a submission.
    ///
    /// Each append is a single atomic insert, so checkpointed progress
    /// survives any later failure in the same task.
    pub fn append_submission_log(
        &self,
        submission_id: &str,
        message: &str,
    ) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO submission_logs (submission_id, timestamp, message) \
             VALUES (?1, ?2, ?3)",
            params![submission_id, Utc::now().to_rfc3339(), message],
        )?;
        Ok(())
    }

    /// Fetch all log lines for a submission in append order.
    pub fn get_submission_logs(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SubmissionLogLine>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, message FROM submission_logs \
             WHERE submission_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![submission_id], |row| {
            let ts: String = row.get(0)?;
            let message: String = row.get(1)?;
            Ok((ts, message))
        })?;

        let mut lines = Vec::new();
        for row in rows {
            let (ts, message) = row?;
            lines.push(SubmissionLogLine {
                timestamp: parse_timestamp("submission_log", submission_id, &ts)?,
                message,
            });
        }
        Ok(lines)
    }

    // -- key-value state ----------------------------------------------------

    /// Read an ad-hoc state value.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM kv_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write an ad-hoc state value (upsert).
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO kv_state (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn sample_submission(upload_id: &str) -> Submission {
        Submission {
            id: uuid::Uuid::new_v4().to_string(),
            upload_id: upload_id.to_string(),
            project: "demo".into(),
            subject: "Fix the thing".into(),
            description: "Longer text".into(),
            branch: "main".into(),
            status: SubmissionStatus::Pending,
            change_id: None,
            change_url: None,
            error: None,
            notification_emails: vec!["dev@example.com".into()],
            remote_node_id: None,
            git_repository: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_upload_roundtrip() {
        let db = test_db();
        let upload = Upload::new("fix.diff", "--- a\n+++ b\n", "demo", None);
        db.insert_upload(&upload).unwrap();

        let loaded = db.get_upload(&upload.id).unwrap().unwrap();
        assert_eq!(loaded.filename, "fix.diff");
        assert_eq!(loaded.project, "demo");
        assert!(loaded.is_valid());
        assert!(db.get_upload("missing").unwrap().is_none());
    }

    #[test]
    fn test_invalid_upload_keeps_error() {
        let db = test_db();
        let upload = Upload::new("bad.diff", "not a diff", "demo", Some("no hunks".into()));
        db.insert_upload(&upload).unwrap();

        let loaded = db.get_upload(&upload.id).unwrap().unwrap();
        assert!(!loaded.is_valid());
        assert_eq!(loaded.validation_error.as_deref(), Some("no hunks"));
    }

    #[test]
    fn test_submission_roundtrip_and_transitions() {
        let db = test_db();
        let upload = Upload::new("fix.diff", "--- a\n+++ b\n", "demo", None);
        db.insert_upload(&upload).unwrap();

        let submission = sample_submission(&upload.id);
        db.insert_submission(&submission).unwrap();

        let loaded = db.get_submission(&submission.id).unwrap().unwrap();
        assert_eq!(loaded.status, SubmissionStatus::Pending);
        assert_eq!(loaded.notification_emails, vec!["dev@example.com"]);

        db.update_submission_status(&submission.id, SubmissionStatus::Processing)
            .unwrap();
        db.complete_submission(&submission.id, "I1234", "https://review/c/demo/+/42")
            .unwrap();

        let loaded = db.get_submission(&submission.id).unwrap().unwrap();
        assert_eq!(loaded.status, SubmissionStatus::Completed);
        assert_eq!(loaded.change_id.as_deref(), Some("I1234"));
        assert_eq!(
            loaded.change_url.as_deref(),
            Some("https://review/c/demo/+/42")
        );
    }

    #[test]
    fn test_update_missing_submission_is_not_found() {
        let db = test_db();
        let err = db
            .update_submission_status("nope", SubmissionStatus::Processing)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn test_log_append_preserves_order() {
        let db = test_db();
        let upload = Upload::new("fix.diff", "--- a\n+++ b\n", "demo", None);
        db.insert_upload(&upload).unwrap();
        let submission = sample_submission(&upload.id);
        db.insert_submission(&submission).unwrap();

        for i in 0..5 {
            db.append_submission_log(&submission.id, &format!("step {}", i))
                .unwrap();
        }

        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert_eq!(logs.len(), 5);
        for (i, line) in logs.iter().enumerate() {
            assert_eq!(line.message, format!("step {}", i));
        }
    }

    #[test]
    fn test_kv_state_upsert() {
        let db = test_db();
        assert!(db.get_state("k").unwrap().is_none());
        db.set_state("k", "v1").unwrap();
        db.set_state("k", "v2").unwrap();
        assert_eq!(db.get_state("k").unwrap().as_deref(), Some("v2"));
    }
}
