/// Attendance submission
///
/// Turns a decoded badge code into exactly one attendance write.
/// Identity is resolved first; the write itself relies on the store's
/// uniqueness constraint to arbitrate duplicates, so two stations
/// scanning the same badge in the same instant cannot both succeed.
/// There is no check-then-act window here.

use chrono::NaiveDate;

use crate::state::store::{AttendanceWrite, Store};

/// Classified result of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Attendance recorded for this volunteer
    Success { name: String, department: String },
    /// The volunteer already checked in this service day (benign)
    AlreadyRecorded { name: String },
    /// The code matches no registered volunteer
    NotFound,
    /// Store or I/O failure; the operator can re-scan
    SystemError(String),
}

/// The current service day (one calendar day in local time)
pub fn service_day_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Resolve `code` and record attendance for the given service day.
pub fn submit(store: &Store, code: &str, service_day: NaiveDate) -> Outcome {
    let found = match store.find_volunteer_by_code(code) {
        Ok(found) => found,
        Err(e) => return Outcome::SystemError(e.to_string()),
    };

    let Some(volunteer) = found else {
        return Outcome::NotFound;
    };

    match store.record_attendance(volunteer.id, service_day) {
        AttendanceWrite::Recorded => {
            println!(
                "✅ Attendance recorded: {} ({}) on {}",
                volunteer.name, volunteer.department_name, service_day
            );
            Outcome::Success {
                name: volunteer.name,
                department: volunteer.department_name,
            }
        }
        AttendanceWrite::Duplicate => Outcome::AlreadyRecorded {
            name: volunteer.name,
        },
        AttendanceWrite::Failed(e) => Outcome::SystemError(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::NewVolunteer;

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
                code: "W9NRXBA2".to_string(),
                badge_url: None,
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_success_then_already_recorded_never_two_successes() {
        let (store, _) = seeded_store();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let first = submit(&store, "W9NRXBA2", day);
        assert_eq!(
            first,
            Outcome::Success {
                name: "Budi Santoso".to_string(),
                department: "Musik".to_string(),
            }
        );

        let second = submit(&store, "W9NRXBA2", day);
        assert_eq!(
            second,
            Outcome::AlreadyRecorded {
                name: "Budi Santoso".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_code_creates_no_record() {
        let (store, id) = seeded_store();
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert_eq!(submit(&store, "ZZZZZZZ", day), Outcome::NotFound);
        assert_eq!(store.attendance_count_for(id).unwrap(), 0);
    }

    #[test]
    fn test_new_service_day_records_again() {
        let (store, _) = seeded_store();

        let sunday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let next_sunday = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();

        assert!(matches!(
            submit(&store, "W9NRXBA2", sunday),
            Outcome::Success { .. }
        ));
        assert!(matches!(
            submit(&store, "W9NRXBA2", next_sunday),
            Outcome::Success { .. }
        ));
    }
}
