/// Live scan state machine
///
/// The controller owns the ordering guarantee of the check-in screen:
/// at most one scan is in flight at any time. Frame decodes and manual
/// entries pass through the same gate, so neither path can race the
/// other. The controller is deliberately UI-free; the station maps its
/// transitions onto camera pause/resume and timers.
///
/// States: Idle → Capturing → Processing → Cooldown → Capturing …

use std::time::Duration;

use crate::attendance::Outcome;

/// Where the scan loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No frames are being accepted (camera not open, or open failed)
    Idle,
    /// Frames flow and the next successful decode is accepted
    Capturing,
    /// One scan is being resolved; everything else is dropped
    Processing,
    /// Post-scan delay; frames are still dropped until it elapses
    Cooldown,
}

/// Which tone to play for an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Success,
    Error,
}

/// Operator feedback for a settled scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFeedback {
    pub message: String,
    pub cue: Cue,
}

/// Result of offering a manual entry to the gate
#[derive(Debug, Clone, PartialEq)]
pub enum ManualEntry {
    /// Entry accepted; submit this normalized code
    Accepted(String),
    /// Nothing was typed; a hint message was set instead
    EmptyInput,
    /// A scan is already in flight or cooling down
    Busy,
}

pub struct ScanController {
    state: ScanState,
    /// Whether a capture device is open (it may be paused while a scan
    /// resolves; that is still "active")
    camera_active: bool,
    cooldown: Duration,
    last_message: String,
    /// Name and department of the most recently resolved volunteer
    resolved: Option<(String, String)>,
}

impl ScanController {
    pub fn new(cooldown: Duration) -> Self {
        ScanController {
            state: ScanState::Idle,
            camera_active: false,
            cooldown,
            last_message: String::new(),
            resolved: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// How long the station should wait before calling `cooldown_elapsed`
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// (name, department) of the last successful check-in, for the
    /// result panel
    pub fn resolved(&self) -> Option<&(String, String)> {
        self.resolved.as_ref()
    }

    /// The capture device opened; start accepting frame decodes.
    pub fn camera_opened(&mut self) {
        self.camera_active = true;
        if self.state == ScanState::Idle {
            self.state = ScanState::Capturing;
        }
    }

    /// The capture device could not be opened or was lost. Fatal for the
    /// camera path; manual entry keeps working.
    pub fn camera_failed(&mut self, detail: &str) {
        self.camera_active = false;
        if self.state == ScanState::Capturing {
            self.state = ScanState::Idle;
        }
        self.last_message = format!("⚠️ Error: {}", detail);
        eprintln!("❌ Camera unavailable: {}", detail);
    }

    /// Offer a successfully decoded frame to the gate.
    ///
    /// Returns `Some(code)` if this decode is accepted; the caller must
    /// pause frame delivery and submit the code. Returns `None` when a
    /// scan is already in flight or cooling down; the decode is dropped.
    pub fn frame_decoded(&mut self, payload: &str) -> Option<String> {
        if self.state != ScanState::Capturing {
            return None;
        }
        self.state = ScanState::Processing;
        Some(payload.to_string())
    }

    /// Offer a typed code to the same gate.
    ///
    /// Input is trimmed and upper-cased. Works without a camera (the
    /// manual path is the fallback when the device fails), but never
    /// while a scan is in flight.
    pub fn manual_entry(&mut self, input: &str) -> ManualEntry {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            self.last_message = "❌ Masukkan kode QR terlebih dahulu".to_string();
            return ManualEntry::EmptyInput;
        }

        match self.state {
            ScanState::Processing | ScanState::Cooldown => ManualEntry::Busy,
            ScanState::Idle | ScanState::Capturing => {
                self.state = ScanState::Processing;
                ManualEntry::Accepted(code)
            }
        }
    }

    /// The submission for the in-flight scan settled. Enter cooldown and
    /// return the operator feedback for this outcome.
    pub fn submission_settled(&mut self, outcome: &Outcome) -> ScanFeedback {
        self.state = ScanState::Cooldown;

        let feedback = match outcome {
            Outcome::Success { name, department } => {
                self.resolved = Some((name.clone(), department.clone()));
                ScanFeedback {
                    message: format!("✅ Absensi {} berhasil", name),
                    cue: Cue::Success,
                }
            }
            Outcome::AlreadyRecorded { name } => {
                self.resolved = None;
                ScanFeedback {
                    message: format!("❌ {} sudah absen hari ini", name),
                    cue: Cue::Error,
                }
            }
            Outcome::NotFound => {
                self.resolved = None;
                ScanFeedback {
                    message: "❌ QR tidak dikenali".to_string(),
                    cue: Cue::Error,
                }
            }
            Outcome::SystemError(detail) => {
                self.resolved = None;
                ScanFeedback {
                    message: format!("⚠️ Error: {}", detail),
                    cue: Cue::Error,
                }
            }
        };

        self.last_message = feedback.message.clone();
        feedback
    }

    /// The cooldown timer fired; resume accepting scans.
    pub fn cooldown_elapsed(&mut self) {
        if self.state == ScanState::Cooldown {
            self.state = if self.camera_active {
                ScanState::Capturing
            } else {
                ScanState::Idle
            };
        }
    }
}
