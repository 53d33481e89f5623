//! SQLite persistence for medications and dose events.
//!
//! Two tables, created on open if absent:
//! - `medications(id, name, amount, times, period, color)`
//! - `medication_taken(id, medication_id, time_taken, date, status)`
//!
//! `times` is stored joined by `", "` and `period` as `"A to B"`. Deleting a
//! medication leaves its dose events in place.

use crate::time::{decode_times, encode_times};
use crate::{
    DoseEvent, DoseStatus, Error, Medication, NewDoseEvent, NewMedication, Result, TakenRow,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS medications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    amount TEXT,
    times TEXT,
    period TEXT,
    color TEXT
);
CREATE TABLE IF NOT EXISTS medication_taken (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    medication_id INTEGER,
    time_taken TEXT,
    date TEXT,
    status TEXT
);
";

/// Persistence operations used by the screens
pub trait MedicationRepository {
    fn create_medication(&self, input: &NewMedication) -> Result<Medication>;
    fn update_medication(&self, id: i64, input: &NewMedication) -> Result<Medication>;
    /// Returns whether a row was removed
    fn delete_medication(&self, id: i64) -> Result<bool>;
    fn get_medication(&self, id: i64) -> Result<Option<Medication>>;
    fn list_medications(&self) -> Result<Vec<Medication>>;

    fn create_dose_event(&self, input: &NewDoseEvent) -> Result<DoseEvent>;
    fn update_dose_event_status(&self, id: i64, status: &DoseStatus) -> Result<()>;
    /// Returns whether a row was removed
    fn delete_dose_event(&self, id: i64) -> Result<bool>;
    fn list_dose_events_for_date(&self, date: NaiveDate) -> Result<Vec<DoseEvent>>;
    /// Every dose event joined with its medication, newest date first
    fn list_taken_history(&self) -> Result<Vec<TakenRow>>;
}

/// SQLite-backed repository
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened database at {:?}", path);
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

fn text(row: &Row, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}

fn row_to_medication(row: &Row) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get("id")?,
        name: text(row, "name")?,
        amount: text(row, "amount")?,
        times: decode_times(&text(row, "times")?),
        period: text(row, "period")?,
        color: text(row, "color")?,
    })
}

/// Dose event columns as stored, before their text is parsed
struct DoseEventRow {
    id: i64,
    medication_id: i64,
    time_taken: String,
    date: String,
    status: String,
}

fn row_to_dose_event(row: &Row) -> rusqlite::Result<DoseEventRow> {
    Ok(DoseEventRow {
        id: row.get("id")?,
        medication_id: row.get::<_, Option<i64>>("medication_id")?.unwrap_or_default(),
        time_taken: text(row, "time_taken")?,
        date: text(row, "date")?,
        status: text(row, "status")?,
    })
}

impl TryFrom<DoseEventRow> for DoseEvent {
    type Error = Error;

    fn try_from(row: DoseEventRow) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
            Error::Validation(format!("invalid date '{}' in dose event: {}", row.date, e))
        })?;
        let status = row
            .status
            .parse::<DoseStatus>()
            .unwrap_or_else(|never| match never {});

        Ok(DoseEvent {
            id: row.id,
            medication_id: row.medication_id,
            time_taken: row.time_taken.parse()?,
            date,
            status,
        })
    }
}

impl MedicationRepository for SqliteStore {
    fn create_medication(&self, input: &NewMedication) -> Result<Medication> {
        input.validate()?;
        self.conn.execute(
            "INSERT INTO medications (name, amount, times, period, color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.name,
                input.amount,
                encode_times(&input.times),
                input.period.to_string(),
                input.color
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("Created medication {} ({})", id, input.name);

        self.get_medication(id)?.ok_or(Error::NotFound {
            entity: "medication",
            id,
        })
    }

    fn update_medication(&self, id: i64, input: &NewMedication) -> Result<Medication> {
        input.validate()?;
        let rows_affected = self.conn.execute(
            "UPDATE medications
             SET name = ?1, amount = ?2, times = ?3, period = ?4, color = ?5
             WHERE id = ?6",
            params![
                input.name,
                input.amount,
                encode_times(&input.times),
                input.period.to_string(),
                input.color,
                id
            ],
        )?;
        if rows_affected == 0 {
            return Err(Error::NotFound {
                entity: "medication",
                id,
            });
        }
        tracing::info!("Updated medication {}", id);

        self.get_medication(id)?.ok_or(Error::NotFound {
            entity: "medication",
            id,
        })
    }

    fn delete_medication(&self, id: i64) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medications WHERE id = ?1", params![id])?;
        tracing::info!("Deleted medication {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }

    fn get_medication(&self, id: i64) -> Result<Option<Medication>> {
        let medication = self
            .conn
            .query_row(
                "SELECT id, name, amount, times, period, color FROM medications WHERE id = ?1",
                params![id],
                row_to_medication,
            )
            .optional()?;
        Ok(medication)
    }

    fn list_medications(&self) -> Result<Vec<Medication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, amount, times, period, color FROM medications ORDER BY id ASC",
        )?;
        let medications = stmt
            .query_map([], row_to_medication)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!("Loaded {} medications", medications.len());
        Ok(medications)
    }

    fn create_dose_event(&self, input: &NewDoseEvent) -> Result<DoseEvent> {
        self.conn.execute(
            "INSERT INTO medication_taken (medication_id, time_taken, date, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                input.medication_id,
                input.time_taken.to_string(),
                input.date.format("%Y-%m-%d").to_string(),
                input.status.to_string()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            "Recorded dose {} for medication {} at {} on {}",
            id,
            input.medication_id,
            input.time_taken,
            input.date
        );

        Ok(DoseEvent {
            id,
            medication_id: input.medication_id,
            time_taken: input.time_taken,
            date: input.date,
            status: input.status.clone(),
        })
    }

    fn update_dose_event_status(&self, id: i64, status: &DoseStatus) -> Result<()> {
        let rows_affected = self.conn.execute(
            "UPDATE medication_taken SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        if rows_affected == 0 {
            return Err(Error::NotFound {
                entity: "dose event",
                id,
            });
        }
        tracing::info!("Set dose event {} status to {}", id, status);
        Ok(())
    }

    fn delete_dose_event(&self, id: i64) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medication_taken WHERE id = ?1", params![id])?;
        tracing::info!("Deleted dose event {} ({} rows)", id, rows_affected);
        Ok(rows_affected > 0)
    }

    fn list_dose_events_for_date(&self, date: NaiveDate) -> Result<Vec<DoseEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, medication_id, time_taken, date, status
             FROM medication_taken
             WHERE date = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], row_to_dose_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match DoseEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Skipping unreadable dose event {}: {}", id, e);
                }
            }
        }

        tracing::debug!("Loaded {} dose events for {}", events.len(), date);
        Ok(events)
    }

    fn list_taken_history(&self) -> Result<Vec<TakenRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.name, m.amount, m.times, m.period, t.time_taken, t.date, t.status
             FROM medication_taken t
             JOIN medications m ON m.id = t.medication_id
             ORDER BY t.date DESC, t.id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TakenRow {
                    name: text(row, "name")?,
                    amount: text(row, "amount")?,
                    times: text(row, "times")?,
                    period: text(row, "period")?,
                    time_taken: text(row, "time_taken")?,
                    date: text(row, "date")?,
                    status: text(row, "status")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!("Loaded {} history rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeOfDay;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn new_medication(name: &str, times: &[&str], period: &str) -> NewMedication {
        NewMedication {
            name: name.into(),
            amount: "250".into(),
            times: times.iter().map(|t| time(t)).collect(),
            period: period.parse().unwrap(),
            color: "#4CAF50".into(),
        }
    }

    fn dose(medication_id: i64, at: &str, on: &str) -> NewDoseEvent {
        NewDoseEvent {
            medication_id,
            time_taken: time(at),
            date: date(on),
            status: DoseStatus::Done,
        }
    }

    #[test]
    fn test_create_then_list_roundtrips_times() {
        let store = SqliteStore::open_in_memory().unwrap();
        let input = new_medication(
            "Amoxicillin",
            &["20:00", "08:00", "14:30"],
            "2024-01-01 to 2024-01-10",
        );

        let created = store.create_medication(&input).unwrap();
        let listed = store.list_medications().unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
        assert_eq!(listed[0].period, "2024-01-01 to 2024-01-10");

        let times: Vec<String> = listed[0].times.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, vec!["20:00", "08:00", "14:30"]);
    }

    #[test]
    fn test_stored_times_column_uses_comma_space() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store
            .create_medication(&new_medication("A", &["08:00", "20:00"], "2024-01-01 to 2024-01-02"))
            .unwrap();

        let raw: String = store
            .conn
            .query_row(
                "SELECT times FROM medications WHERE id = ?1",
                params![created.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, "08:00, 20:00");
        assert_eq!(raw.split(", ").collect::<Vec<_>>(), vec!["08:00", "20:00"]);
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let store = SqliteStore::open_in_memory().unwrap();
        let input = new_medication("", &[], "2024-01-01 to 2024-01-02");

        assert!(matches!(
            store.create_medication(&input),
            Err(Error::Validation(_))
        ));
        assert!(store.list_medications().unwrap().is_empty());
    }

    #[test]
    fn test_update_and_missing_update() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store
            .create_medication(&new_medication("A", &["08:00"], "2024-01-01 to 2024-01-02"))
            .unwrap();

        let updated = store
            .update_medication(
                created.id,
                &new_medication("B", &["09:00"], "2024-02-01 to 2024-02-02"),
            )
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "B");
        assert_eq!(updated.period, "2024-02-01 to 2024-02-02");

        let missing = store.update_medication(
            999,
            &new_medication("C", &["09:00"], "2024-02-01 to 2024-02-02"),
        );
        assert!(matches!(missing, Err(Error::NotFound { id: 999, .. })));
    }

    #[test]
    fn test_delete_is_repeatable_and_leaves_dose_events() {
        let store = SqliteStore::open_in_memory().unwrap();
        let med = store
            .create_medication(&new_medication("A", &["08:00"], "2024-01-01 to 2024-01-02"))
            .unwrap();
        store.create_dose_event(&dose(med.id, "08:00", "2024-01-01")).unwrap();

        assert!(store.delete_medication(med.id).unwrap());
        assert!(!store.delete_medication(med.id).unwrap());
        assert!(store.get_medication(med.id).unwrap().is_none());

        // Orphaned dose events survive but drop out of the joined history
        let events = store.list_dose_events_for_date(date("2024-01-01")).unwrap();
        assert_eq!(events.len(), 1);
        assert!(store.list_taken_history().unwrap().is_empty());
    }

    #[test]
    fn test_dose_events_by_date() {
        let store = SqliteStore::open_in_memory().unwrap();
        let med = store
            .create_medication(&new_medication("A", &["08:00", "20:00"], "2024-01-01 to 2024-01-05"))
            .unwrap();

        let first = store.create_dose_event(&dose(med.id, "08:00", "2024-01-02")).unwrap();
        store.create_dose_event(&dose(med.id, "20:00", "2024-01-02")).unwrap();
        store.create_dose_event(&dose(med.id, "08:00", "2024-01-03")).unwrap();

        let events = store.list_dose_events_for_date(date("2024-01-02")).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], first);
        assert_eq!(events[1].time_taken, time("20:00"));
    }

    #[test]
    fn test_update_status_and_delete_event() {
        let store = SqliteStore::open_in_memory().unwrap();
        let event = store.create_dose_event(&dose(1, "08:00", "2024-01-02")).unwrap();

        store
            .update_dose_event_status(event.id, &DoseStatus::Other("skipped".into()))
            .unwrap();
        let events = store.list_dose_events_for_date(date("2024-01-02")).unwrap();
        assert_eq!(events[0].status, DoseStatus::Other("skipped".into()));

        assert!(matches!(
            store.update_dose_event_status(999, &DoseStatus::Done),
            Err(Error::NotFound { .. })
        ));

        assert!(store.delete_dose_event(event.id).unwrap());
        assert!(!store.delete_dose_event(event.id).unwrap());
        assert!(store.list_dose_events_for_date(date("2024-01-02")).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_dose_rows_are_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_dose_event(&dose(1, "08:00", "2024-01-02")).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO medication_taken (medication_id, time_taken, date, status)
                 VALUES (1, 'noon', '2024-01-02', 'done')",
                [],
            )
            .unwrap();

        let events = store.list_dose_events_for_date(date("2024-01-02")).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_history_is_newest_date_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store
            .create_medication(&new_medication("A", &["08:00"], "2024-01-01 to 2024-01-31"))
            .unwrap();
        let b = store
            .create_medication(&new_medication("B", &["21:00"], "2024-01-01 to 2024-01-31"))
            .unwrap();

        store.create_dose_event(&dose(a.id, "08:00", "2024-01-02")).unwrap();
        store.create_dose_event(&dose(b.id, "21:00", "2024-01-05")).unwrap();
        store.create_dose_event(&dose(a.id, "08:00", "2024-01-03")).unwrap();

        let history = store.list_taken_history().unwrap();
        let dates: Vec<&str> = history.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-05", "2024-01-03", "2024-01-02"]);
        assert_eq!(history[0].name, "B");
        assert_eq!(history[0].times, "21:00");
        assert_eq!(history[0].status, "done");
    }

    #[test]
    fn test_open_creates_file_and_reopens() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("medtrack.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .create_medication(&new_medication("A", &["08:00"], "2024-01-01 to 2024-01-02"))
                .unwrap();
        }

        assert!(db_path.exists());
        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.list_medications().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_stored_period_still_lists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO medications (name, amount, times, period, color)
                 VALUES ('Legacy', '5', '08:00', '', '#000000')",
                [],
            )
            .unwrap();

        let meds = store.list_medications().unwrap();
        assert_eq!(meds.len(), 1);
        assert!(meds[0].date_range().is_err());
    }
}
