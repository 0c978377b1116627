/// File-backed badge image store
///
/// Generated badge PNGs are kept under the user data directory and
/// referenced by URL, standing in for a hosted object store. Uploads
/// overwrite: regenerating a badge for a code replaces the old image.

use std::fs;
use std::io;
use std::path::PathBuf;

pub struct BadgeStore {
    root: PathBuf,
}

impl BadgeStore {
    /// Open the store at the default location:
    /// ~/.local/share/qr-checkin/badges on Linux
    pub fn open_default() -> io::Result<Self> {
        let mut root = dirs::data_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user data directory");
        root.push("qr-checkin");
        root.push("badges");
        Self::open(root)
    }

    /// Open the store rooted at an explicit directory
    pub fn open(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(BadgeStore { root })
    }

    /// Store the badge PNG for a code and return its public URL
    pub fn upload(&self, code: &str, png_bytes: &[u8]) -> io::Result<String> {
        let path = self.path_for(code);
        fs::write(&path, png_bytes)?;

        println!("🖼️  Stored badge: {}", path.display());
        Ok(format!("file://{}", path.display()))
    }

    /// Where the badge for a code lives (whether or not it exists yet)
    pub fn path_for(&self, code: &str) -> PathBuf {
        self.root.join(format!("{}.png", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_writes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = BadgeStore::open(dir.path().join("badges")).unwrap();

        let url = store.upload("W9NRXBA", b"png-bytes").unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("W9NRXBA.png"));
        assert_eq!(fs::read(store.path_for("W9NRXBA")).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_upload_overwrites_existing_badge() {
        let dir = tempfile::tempdir().unwrap();
        let store = BadgeStore::open(dir.path().to_path_buf()).unwrap();

        store.upload("ABC1234", b"old").unwrap();
        store.upload("ABC1234", b"new").unwrap();
        assert_eq!(fs::read(store.path_for("ABC1234")).unwrap(), b"new");
    }
}
