/// Frame acquisition for the live scan loop
///
/// The capture device is modeled as a `FrameSource` with an explicit
/// open/poll/pause/resume/stop lifecycle and exactly one owner (the
/// station). The shipped implementation reads frames an external
/// capture process drops into a spool directory; a hardware-backed
/// source can replace it behind the same trait.

use image::imageops::FilterType;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// Frame image extensions the spool scanner picks up
const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Errors from the capture device
#[derive(Debug, Error)]
pub enum ScanError {
    /// The device could not be opened at all. Fatal for the screen
    /// session; distinguished from routine per-frame misses.
    #[error("camera source unavailable: {0}")]
    SourceUnavailable(String),
}

/// One captured frame, sized for detection
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels for the viewport
    pub rgba: Vec<u8>,
    /// 8-bit luminance for the decoder
    pub gray: Vec<u8>,
}

/// A camera-like device delivering frames to the scan loop.
///
/// Single owner, explicit lifecycle. `poll` returns `None` whenever
/// there is nothing new: closed, paused, or simply no fresh frame.
pub trait FrameSource {
    fn open(&mut self) -> Result<(), ScanError>;
    fn poll(&mut self) -> Option<Frame>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn is_open(&self) -> bool;
    fn is_paused(&self) -> bool;
}

/// Frame source backed by a spool directory.
///
/// An external capture process (or any camera tool) writes frame images
/// into the directory; `poll` picks up the newest one not seen before,
/// downscaled to the detection size.
pub struct SpoolSource {
    dir: PathBuf,
    detection_size: u32,
    open: bool,
    paused: bool,
    /// Newest frame already delivered, so a static spool yields nothing
    last_delivered: Option<(PathBuf, SystemTime)>,
}

impl SpoolSource {
    pub fn new(dir: PathBuf, detection_size: u32) -> Self {
        SpoolSource {
            dir,
            detection_size: detection_size.max(32),
            open: false,
            paused: false,
            last_delivered: None,
        }
    }

    /// Newest frame image in the spool, by modification time
    fn newest_frame(&self) -> Option<(PathBuf, SystemTime)> {
        WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy().to_lowercase();
                        FRAME_EXTENSIONS.contains(&ext.as_str())
                    })
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                let mtime = e.metadata().ok()?.modified().ok()?;
                Some((e.path().to_path_buf(), mtime))
            })
            .max_by_key(|(_, mtime)| *mtime)
    }
}

impl FrameSource for SpoolSource {
    fn open(&mut self) -> Result<(), ScanError> {
        if !self.dir.is_dir() {
            return Err(ScanError::SourceUnavailable(format!(
                "spool directory does not exist: {}",
                self.dir.display()
            )));
        }

        self.open = true;
        self.paused = false;
        println!("📷 Frame source opened: {}", self.dir.display());
        Ok(())
    }

    fn poll(&mut self) -> Option<Frame> {
        if !self.open || self.paused {
            return None;
        }

        let (path, mtime) = self.newest_frame()?;
        if self.last_delivered.as_ref() == Some(&(path.clone(), mtime)) {
            return None;
        }

        // A half-written file simply fails to load and is retried on the
        // next poll
        let img = image::open(&path).ok()?;
        self.last_delivered = Some((path, mtime));

        let img = img.resize(self.detection_size, self.detection_size, FilterType::Triangle);
        let rgba = img.to_rgba8();
        let gray = img.to_luma8();
        Some(Frame {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
            gray: gray.into_raw(),
        })
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        if self.open {
            self.paused = false;
        }
    }

    fn stop(&mut self) {
        if self.open {
            self.open = false;
            println!("📷 Frame source stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

// The device must never be left open after the screen is gone
impl Drop for SpoolSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &std::path::Path, name: &str, shade: u8) {
        let img = image::RgbaImage::from_pixel(64, 48, image::Rgba([shade, shade, shade, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_open_fails_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SpoolSource::new(dir.path().join("nope"), 250);
        assert!(matches!(
            source.open(),
            Err(ScanError::SourceUnavailable(_))
        ));
        assert!(!source.is_open());
    }

    #[test]
    fn test_poll_delivers_each_frame_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SpoolSource::new(dir.path().to_path_buf(), 250);
        source.open().unwrap();

        assert!(source.poll().is_none());

        write_frame(dir.path(), "frame-0001.png", 40);
        let frame = source.poll().expect("first poll sees the frame");
        assert!(frame.width <= 250 && frame.height <= 250);
        assert_eq!(
            frame.gray.len(),
            (frame.width * frame.height) as usize
        );

        // Same spool content: nothing new
        assert!(source.poll().is_none());

        write_frame(dir.path(), "frame-0002.png", 90);
        assert!(source.poll().is_some());
    }

    #[test]
    fn test_pause_and_resume_gate_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SpoolSource::new(dir.path().to_path_buf(), 250);
        source.open().unwrap();

        source.pause();
        write_frame(dir.path(), "frame-0001.png", 40);
        assert!(source.poll().is_none());
        assert!(source.is_paused());

        source.resume();
        assert!(source.poll().is_some());
    }

    #[test]
    fn test_stop_closes_the_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SpoolSource::new(dir.path().to_path_buf(), 250);
        source.open().unwrap();
        source.stop();

        write_frame(dir.path(), "frame-0001.png", 40);
        assert!(source.poll().is_none());
        assert!(!source.is_open());
    }

    #[test]
    fn test_non_image_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a frame").unwrap();

        let mut source = SpoolSource::new(dir.path().to_path_buf(), 250);
        source.open().unwrap();
        assert!(source.poll().is_none());
    }
}
