use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Result as SqlResult};
use std::path::{Path, PathBuf};

use super::data::{Department, NewVolunteer, ResolvedVolunteer};

/// The Store manages the SQLite catalog database.
/// It holds departments, registered volunteers, and attendance records,
/// and is the sole arbiter of the one-attendance-per-day invariant.
pub struct Store {
    conn: Connection,
    db_path: PathBuf,
}

/// Result of an attendance insert.
///
/// `Duplicate` is the UNIQUE(volunteer_id, attended_on) constraint
/// firing: an expected, benign outcome, not a bug.
#[derive(Debug)]
pub enum AttendanceWrite {
    Recorded,
    Duplicate,
    Failed(rusqlite::Error),
}

impl Store {
    /// Create a Store backed by the given database file.
    ///
    /// Quiet on purpose: background tasks open short-lived connections
    /// through here on every scan.
    pub fn open(db_path: &Path) -> SqlResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .expect("Failed to create application data directory");
        }

        let conn = Connection::open(db_path)?;

        let mut store = Store {
            conn,
            db_path: db_path.to_path_buf(),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Store {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Default database location:
    /// ~/.local/share/qr-checkin/checkin.db on Linux
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user data directory");

        path.push("qr-checkin");
        path.push("checkin.db");
        path
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS departments (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS volunteers (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                birth_date      TEXT,
                gender          TEXT,
                address         TEXT,
                department_id   INTEGER NOT NULL,
                code            TEXT NOT NULL UNIQUE,
                badge_url       TEXT,
                registered_at   INTEGER NOT NULL,
                FOREIGN KEY(department_id) REFERENCES departments(id)
            )",
            [],
        )?;

        // One row per volunteer per service day; the UNIQUE constraint
        // carries the invariant so concurrent stations cannot double-record
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS attendance (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                volunteer_id    INTEGER NOT NULL,
                attended_on     TEXT NOT NULL,
                recorded_at     INTEGER NOT NULL,
                FOREIGN KEY(volunteer_id) REFERENCES volunteers(id) ON DELETE CASCADE,
                UNIQUE(volunteer_id, attended_on)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_volunteers_code
             ON volunteers(code)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attendance_attended_on
             ON attendance(attended_on)",
            [],
        )?;

        Ok(())
    }

    /// Look up a volunteer by badge code, joined with their department.
    ///
    /// The join shape is normalized right here into `ResolvedVolunteer`;
    /// callers never branch on row layout.
    pub fn find_volunteer_by_code(&self, code: &str) -> SqlResult<Option<ResolvedVolunteer>> {
        self.conn
            .query_row(
                "SELECT v.id, v.name, d.name
                 FROM volunteers v
                 JOIN departments d ON d.id = v.department_id
                 WHERE v.code = ?1",
                [code],
                |row| {
                    Ok(ResolvedVolunteer {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        department_name: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    /// Check whether an email is already registered; returns the owning
    /// volunteer's id if so
    pub fn find_volunteer_by_email(&self, email: &str) -> SqlResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM volunteers WHERE email = ?1",
                [email],
                |row| row.get(0),
            )
            .optional()
    }

    /// Register a new volunteer. Returns the new volunteer ID.
    ///
    /// UNIQUE violations on email or code propagate as errors; the
    /// registration flow classifies them.
    pub fn insert_volunteer(&self, volunteer: &NewVolunteer) -> SqlResult<i64> {
        self.conn.execute(
            "INSERT INTO volunteers
                (name, email, birth_date, gender, address, department_id, code, badge_url, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                volunteer.name,
                volunteer.email,
                volunteer.birth_date,
                volunteer.gender,
                volunteer.address,
                volunteer.department_id,
                volunteer.code,
                volunteer.badge_url,
                Utc::now().timestamp(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Add a department. Returns the new department ID.
    pub fn insert_department(&self, name: &str) -> SqlResult<i64> {
        self.conn.execute(
            "INSERT INTO departments (name) VALUES (?1)",
            [name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get all departments, ordered by name
    pub fn list_departments(&self) -> SqlResult<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM departments ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut departments = Vec::new();
        for department in rows {
            departments.push(department?);
        }

        Ok(departments)
    }

    /// Insert an attendance record for the given service day.
    ///
    /// No pre-check: the UNIQUE constraint decides duplicates, so two
    /// stations scanning the same badge at once cannot both succeed.
    pub fn record_attendance(&self, volunteer_id: i64, service_day: NaiveDate) -> AttendanceWrite {
        let result = self.conn.execute(
            "INSERT INTO attendance (volunteer_id, attended_on, recorded_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                volunteer_id,
                service_day.to_string(),
                Utc::now().timestamp(),
            ],
        );

        match result {
            Ok(_) => AttendanceWrite::Recorded,
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                if err.code == ErrorCode::ConstraintViolation {
                    AttendanceWrite::Duplicate
                } else {
                    AttendanceWrite::Failed(rusqlite::Error::SqliteFailure(err, msg))
                }
            }
            Err(e) => AttendanceWrite::Failed(e),
        }
    }

    /// Number of attendance records for a volunteer (statistics hook)
    pub fn attendance_count_for(&self, volunteer_id: i64) -> SqlResult<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM attendance WHERE volunteer_id = ?1",
            [volunteer_id],
            |row| row.get(0),
        )
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let dept = store.insert_department("Musik").unwrap();
        let id = store
            .insert_volunteer(&NewVolunteer {
                name: "Budi Santoso".to_string(),
                email: "budi@example.com".to_string(),
                birth_date: "1990-01-15".to_string(),
                gender: "L".to_string(),
                address: "Pasar Kemis".to_string(),
                department_id: dept,
                code: "W9NRXBA".to_string(),
                badge_url: Some("file:///badges/W9NRXBA.png".to_string()),
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_find_by_code_joins_department() {
        let (store, id) = seeded_store();

        let found = store.find_volunteer_by_code("W9NRXBA").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "Budi Santoso");
        assert_eq!(found.department_name, "Musik");

        assert!(store.find_volunteer_by_code("ZZZZZZZ").unwrap().is_none());
    }

    #[test]
    fn test_find_by_email() {
        let (store, id) = seeded_store();
        assert_eq!(
            store.find_volunteer_by_email("budi@example.com").unwrap(),
            Some(id)
        );
        assert_eq!(store.find_volunteer_by_email("none@example.com").unwrap(), None);
    }

    #[test]
    fn test_attendance_unique_per_day() {
        let (store, id) = seeded_store();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert!(matches!(
            store.record_attendance(id, day),
            AttendanceWrite::Recorded
        ));
        assert!(matches!(
            store.record_attendance(id, day),
            AttendanceWrite::Duplicate
        ));

        // A different day is a fresh record
        let next = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
        assert!(matches!(
            store.record_attendance(id, next),
            AttendanceWrite::Recorded
        ));

        assert_eq!(store.attendance_count_for(id).unwrap(), 2);
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let (store, _) = seeded_store();
        let err = store.insert_volunteer(&NewVolunteer {
            name: "Other".to_string(),
            email: "budi@example.com".to_string(),
            birth_date: String::new(),
            gender: "P".to_string(),
            address: String::new(),
            department_id: 1,
            code: "ABC1234".to_string(),
            badge_url: None,
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_list_departments_sorted() {
        let store = Store::open_in_memory().unwrap();
        store.insert_department("Usher").unwrap();
        store.insert_department("Musik").unwrap();

        let names: Vec<String> = store
            .list_departments()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Musik".to_string(), "Usher".to_string()]);
    }
}
