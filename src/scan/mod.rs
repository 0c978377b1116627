/// Live scanning module
///
/// This module handles:
/// - The scan state machine gating one submission at a time (controller.rs)
/// - Frame acquisition from the capture device (source.rs)
/// - Audible outcome cues (sound.rs)

pub mod controller;
pub mod sound;
pub mod source;
