/// Audible scan cues
///
/// Short synthesized tones, no bundled samples. Playback problems (no
/// audio device on a kiosk, busy output) are warned about and otherwise
/// ignored; a silent station still records attendance.

use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use std::time::Duration;

use super::controller::Cue;

/// Play the tone for a scan outcome. Returns immediately; the tone
/// renders on a short-lived background thread.
pub fn play(cue: Cue) {
    let notes: &[(f32, u64)] = match cue {
        // Rising major third
        Cue::Success => &[(880.0, 120), (1108.73, 180)],
        // Falling buzz
        Cue::Error => &[(330.0, 180), (220.0, 240)],
    };

    std::thread::spawn(move || {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(out) => out,
            Err(e) => {
                eprintln!("⚠️  Sound error: {}", e);
                return;
            }
        };
        let sink = match Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("⚠️  Sound error: {}", e);
                return;
            }
        };

        for &(freq, ms) in notes {
            sink.append(
                SineWave::new(freq)
                    .take_duration(Duration::from_millis(ms))
                    .amplify(0.20),
            );
        }
        sink.sleep_until_end();
    });
}
