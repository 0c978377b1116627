/// Volunteer registration flow
///
/// One call covers the whole reference flow: email uniqueness check,
/// badge acquisition (decode a provided badge, or generate code +
/// render + store a fresh one), the volunteer insert, and a best-effort
/// confirmation email once the row exists.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::badge::{code, decode, synthesize};
use crate::notify::Notifier;
use crate::state::badges::BadgeStore;
use crate::state::data::NewVolunteer;
use crate::state::store::Store;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("email is already registered")]
    EmailTaken,
    /// The volunteer supplied a badge image with no readable QR code
    #[error("uploaded badge has no readable QR code")]
    InvalidBadge,
    #[error("badge could not be rendered: {0}")]
    Badge(#[from] synthesize::EncodingError),
    #[error("badge could not be read: {0}")]
    BadgeImage(#[from] decode::DecodeError),
    #[error("badge could not be stored: {0}")]
    BadgeStore(#[from] std::io::Error),
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// The registration form as filled in by the volunteer
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub birth_date: String,
    pub gender: String,
    pub address: String,
    pub department_id: i64,
}

/// What registration produced
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredVolunteer {
    pub id: i64,
    pub code: String,
    /// None when the volunteer kept a pre-existing badge
    pub badge_url: Option<String>,
}

/// Register a volunteer.
///
/// With `provided_badge`, the code is read out of the supplied image
/// and no new badge is generated or stored. Otherwise a fresh code is
/// generated, rendered, and uploaded. The notification is best-effort:
/// a failed send is logged, the registration stands.
pub fn register(
    store: &Store,
    badges: &BadgeStore,
    notifier: Option<&Notifier>,
    form: RegistrationForm,
    provided_badge: Option<&[u8]>,
    style: &synthesize::StyleOptions,
) -> Result<RegisteredVolunteer, RegisterError> {
    if store.find_volunteer_by_email(&form.email)?.is_some() {
        return Err(RegisterError::EmailTaken);
    }

    let (volunteer_code, badge_url) = match provided_badge {
        Some(bytes) => {
            let payload = decode::decode(bytes)?.ok_or(RegisterError::InvalidBadge)?;
            (payload, None)
        }
        None => {
            let volunteer_code = code::generate();
            let png = synthesize::synthesize(&volunteer_code, &form.name, style)?;
            let url = badges.upload(&volunteer_code, &png)?;
            (volunteer_code, Some(url))
        }
    };

    let id = store
        .insert_volunteer(&NewVolunteer {
            name: form.name.clone(),
            email: form.email.clone(),
            birth_date: form.birth_date.clone(),
            gender: form.gender.clone(),
            address: form.address.clone(),
            department_id: form.department_id,
            code: volunteer_code.clone(),
            badge_url: badge_url.clone(),
        })
        .map_err(classify_insert_error)?;

    // The volunteer row exists; a failed email must not undo that
    if let Some(notifier) = notifier {
        if let Err(e) = notifier.send(&form.email, &form.name, badge_url.as_deref()) {
            eprintln!("⚠️  Notification failed for {}: {}", form.email, e);
        }
    }

    println!("🎉 Registered {} with code {}", form.name, volunteer_code);

    Ok(RegisteredVolunteer {
        id,
        code: volunteer_code,
        badge_url,
    })
}

/// A UNIQUE violation on insert means we lost a race with a concurrent
/// registration; report it as the taken field rather than a raw error
fn classify_insert_error(e: rusqlite::Error) -> RegisterError {
    if let rusqlite::Error::SqliteFailure(err, Some(msg)) = &e {
        if err.code == ErrorCode::ConstraintViolation && msg.contains("volunteers.email") {
            return RegisterError::EmailTaken;
        }
    }
    RegisterError::Store(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::synthesize::StyleOptions;

    fn form(email: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Budi Santoso".to_string(),
            email: email.to_string(),
            birth_date: "1990-01-15".to_string(),
            gender: "L".to_string(),
            address: "Pasar Kemis".to_string(),
            department_id: 1,
        }
    }

    fn stores() -> (Store, BadgeStore, tempfile::TempDir) {
        let store = Store::open_in_memory().unwrap();
        store.insert_department("Musik").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let badges = BadgeStore::open(dir.path().to_path_buf()).unwrap();
        (store, badges, dir)
    }

    #[test]
    fn test_registration_generates_code_and_badge() {
        let (store, badges, _dir) = stores();

        let registered = register(
            &store,
            &badges,
            None,
            form("budi@example.com"),
            None,
            &StyleOptions::default(),
        )
        .unwrap();

        assert_eq!(registered.code.len(), code::CODE_LEN);
        let url = registered.badge_url.expect("generated badge has a URL");
        assert!(url.ends_with(&format!("{}.png", registered.code)));
        assert!(badges.path_for(&registered.code).exists());

        // The badge on disk scans back to the stored code
        let png = std::fs::read(badges.path_for(&registered.code)).unwrap();
        assert_eq!(
            decode::decode(&png).unwrap().as_deref(),
            Some(registered.code.as_str())
        );

        let resolved = store
            .find_volunteer_by_code(&registered.code)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.name, "Budi Santoso");
        assert_eq!(resolved.department_name, "Musik");
    }

    #[test]
    fn test_duplicate_email_is_rejected_before_any_badge_work() {
        let (store, badges, _dir) = stores();
        register(
            &store,
            &badges,
            None,
            form("budi@example.com"),
            None,
            &StyleOptions::default(),
        )
        .unwrap();

        let err = register(
            &store,
            &badges,
            None,
            form("budi@example.com"),
            None,
            &StyleOptions::default(),
        );
        assert!(matches!(err, Err(RegisterError::EmailTaken)));
    }

    #[test]
    fn test_provided_badge_keeps_its_code_and_skips_upload() {
        let (store, badges, _dir) = stores();

        // A badge issued elsewhere, carrying a foreign-format code
        let provided =
            synthesize::synthesize("W9NRXBA2", "Budi Santoso", &StyleOptions::default()).unwrap();

        let registered = register(
            &store,
            &badges,
            None,
            form("budi@example.com"),
            Some(&provided),
            &StyleOptions::default(),
        )
        .unwrap();

        assert_eq!(registered.code, "W9NRXBA2");
        assert_eq!(registered.badge_url, None);
        assert!(!badges.path_for("W9NRXBA2").exists());
    }

    #[test]
    fn test_unreadable_provided_badge_is_rejected() {
        let (store, badges, _dir) = stores();

        // Valid image, no QR anywhere
        let blank = {
            let img = image::RgbaImage::from_pixel(200, 200, image::Rgba([255, 255, 255, 255]));
            let mut buf = std::io::Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut buf, image::ImageFormat::Png)
                .unwrap();
            buf.into_inner()
        };

        let err = register(
            &store,
            &badges,
            None,
            form("budi@example.com"),
            Some(&blank),
            &StyleOptions::default(),
        );
        assert!(matches!(err, Err(RegisterError::InvalidBadge)));

        // Nothing was inserted
        assert!(store
            .find_volunteer_by_email("budi@example.com")
            .unwrap()
            .is_none());
    }
}
