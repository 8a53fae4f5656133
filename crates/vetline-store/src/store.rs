//! Persistence operations for finalized session records.
//!
//! A record, its turns, and its summary are written in one transaction and
//! read back as one unit. [`save_record`] is keyed on the record id and is
//! safe to call more than once for the same record.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use vetline_types::{IntakeTurn, SessionRecord, SubjectProfile, TriageSummary, Urgency};

use crate::error::StoreError;

fn to_rfc3339(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

fn from_rfc3339(id: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::Corrupt {
                id: id.to_string(),
                reason: format!("bad timestamp '{raw}': {e}"),
            }),
    }
}

/// Writes a finalized record, replacing any prior version with the same id.
///
/// Turns and summary are replaced wholesale so a retried finalization never
/// leaves a partial mixture of old and new rows.
pub fn save_record(conn: &Connection, record: &SessionRecord) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT OR REPLACE INTO sessions
            (id, channel_id, subject_name, subject_species, subject_age_years,
             started_at, ended_at, duration_secs, summary_is_fallback)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id,
            record.channel_id,
            record.subject.name,
            record.subject.species,
            record.subject.age_years,
            to_rfc3339(record.started_at),
            to_rfc3339(record.ended_at),
            record.duration_secs,
            record.summary_is_fallback,
        ],
    )?;

    tx.execute(
        "DELETE FROM intake_turns WHERE session_id = ?1",
        [&record.id],
    )?;
    for turn in &record.turns {
        tx.execute(
            "INSERT INTO intake_turns (session_id, ordinal, prompt, response, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                turn.ordinal,
                turn.prompt,
                turn.response,
                turn.captured_at.to_rfc3339(),
            ],
        )?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO summaries
            (session_id, urgency, reasoning, findings_json, recommendations_json,
             follow_ups_json, spoken_digest)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.summary.urgency.as_str(),
            record.summary.reasoning,
            serde_json::to_string(&record.summary.findings)?,
            serde_json::to_string(&record.summary.recommendations)?,
            serde_json::to_string(&record.summary.follow_ups)?,
            record.summary.spoken_digest,
        ],
    )?;

    tx.commit()?;
    tracing::debug!(record_id = %record.id, channel = %record.channel_id, "session record saved");
    Ok(())
}

/// Loads one record with its turns (ordinal order) and summary.
pub fn load_record(conn: &Connection, id: &str) -> Result<Option<SessionRecord>, StoreError> {
    let header = conn
        .query_row(
            "SELECT channel_id, subject_name, subject_species, subject_age_years,
                    started_at, ended_at, duration_secs, summary_is_fallback
             FROM sessions WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            },
        )
        .optional()?;

    let Some((
        channel_id,
        subject_name,
        subject_species,
        subject_age_years,
        started_at,
        ended_at,
        duration_secs,
        summary_is_fallback,
    )) = header
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT ordinal, prompt, response, captured_at
         FROM intake_turns WHERE session_id = ?1 ORDER BY ordinal ASC",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    let mut turns = Vec::new();
    for row in rows {
        let (ordinal, prompt, response, captured_at) = row?;
        let captured_at = from_rfc3339(id, Some(captured_at))?.ok_or_else(|| {
            StoreError::Corrupt {
                id: id.to_string(),
                reason: "turn missing captured_at".to_string(),
            }
        })?;
        turns.push(IntakeTurn {
            ordinal,
            prompt,
            response,
            captured_at,
        });
    }

    let summary = load_summary(conn, id)?;

    Ok(Some(SessionRecord {
        id: id.to_string(),
        channel_id,
        subject: SubjectProfile {
            name: subject_name,
            species: subject_species,
            age_years: subject_age_years,
        },
        started_at: from_rfc3339(id, started_at)?,
        ended_at: from_rfc3339(id, ended_at)?,
        duration_secs,
        turns,
        summary,
        summary_is_fallback,
    }))
}

fn load_summary(conn: &Connection, id: &str) -> Result<TriageSummary, StoreError> {
    let row = conn
        .query_row(
            "SELECT urgency, reasoning, findings_json, recommendations_json,
                    follow_ups_json, spoken_digest
             FROM summaries WHERE session_id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((urgency, reasoning, findings, recommendations, follow_ups, spoken_digest)) = row
    else {
        return Err(StoreError::Corrupt {
            id: id.to_string(),
            reason: "session row exists without a summary".to_string(),
        });
    };

    let urgency = Urgency::parse(&urgency).ok_or_else(|| StoreError::Corrupt {
        id: id.to_string(),
        reason: format!("unknown urgency '{urgency}'"),
    })?;

    Ok(TriageSummary {
        urgency,
        reasoning,
        findings: serde_json::from_str(&findings)?,
        recommendations: serde_json::from_str(&recommendations)?,
        follow_ups: serde_json::from_str(&follow_ups)?,
        spoken_digest,
    })
}

/// Lists record ids with channel and urgency, most recent first.
pub fn list_records(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<(String, String, Urgency)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.channel_id, m.urgency
         FROM sessions s JOIN summaries m ON m.session_id = s.id
         ORDER BY s.created_at DESC, s.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, channel, urgency) = row?;
        let urgency = Urgency::parse(&urgency).ok_or_else(|| StoreError::Corrupt {
            id: id.clone(),
            reason: format!("unknown urgency '{urgency}'"),
        })?;
        out.push((id, channel, urgency));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).expect("migrations");
        conn
    }

    fn sample_record(id: &str) -> SessionRecord {
        let started = Utc::now() - chrono::Duration::seconds(90);
        let ended = started + chrono::Duration::seconds(88);
        SessionRecord {
            id: id.to_string(),
            channel_id: "triage-77".to_string(),
            subject: SubjectProfile {
                name: "Biscuit".to_string(),
                species: "dog".to_string(),
                age_years: Some(4),
            },
            started_at: Some(started),
            ended_at: Some(ended),
            duration_secs: Some(88),
            turns: vec![
                IntakeTurn::captured(1, "What is your pet's name and breed?", "Biscuit, a beagle"),
                IntakeTurn::timed_out(2, "Is your pet spayed or neutered?"),
            ],
            summary: TriageSummary::fallback(),
            summary_is_fallback: true,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let conn = setup();
        let record = sample_record("rec-1");

        save_record(&conn, &record).expect("save");
        let loaded = load_record(&conn, "rec-1").expect("load").expect("present");

        assert_eq!(loaded.channel_id, record.channel_id);
        assert_eq!(loaded.subject, record.subject);
        assert_eq!(loaded.duration_secs, Some(88));
        assert_eq!(loaded.turns.len(), 2);
        assert!(loaded.turns[1].is_timeout());
        assert_eq!(loaded.summary, record.summary);
        assert!(loaded.summary_is_fallback);
    }

    #[test]
    fn save_is_idempotent_per_record_id() {
        let conn = setup();
        let record = sample_record("rec-1");

        save_record(&conn, &record).expect("first save");
        save_record(&conn, &record).expect("second save");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let turn_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM intake_turns", [], |row| row.get(0))
            .unwrap();
        assert_eq!(turn_count, 2, "turns are replaced, not duplicated");
    }

    #[test]
    fn missing_record_is_none() {
        let conn = setup();
        assert!(load_record(&conn, "nope").expect("load").is_none());
    }

    #[test]
    fn turns_load_in_ordinal_order() {
        let conn = setup();
        let mut record = sample_record("rec-1");
        record.turns.reverse();

        save_record(&conn, &record).expect("save");
        let loaded = load_record(&conn, "rec-1").expect("load").expect("present");
        let ordinals: Vec<u32> = loaded.turns.iter().map(|t| t.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[test]
    fn list_shows_saved_records() {
        let conn = setup();
        save_record(&conn, &sample_record("rec-a")).unwrap();
        save_record(&conn, &sample_record("rec-b")).unwrap();

        let listed = list_records(&conn, 10).expect("list");
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|(_, channel, _)| channel == "triage-77"));
    }
}
