//! Sound playback through the default output device (rodio).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;

use rodio::{Decoder, OutputStreamBuilder, Sink};
use tracing::info;

use super::SoundPlayer;
use crate::error::HardwareError;

fn audio_err(e: impl std::fmt::Display) -> HardwareError {
    HardwareError::Audio(e.to_string())
}

/// Opens the output stream per playback; the stream handle is not `Send`.
pub struct RodioPlayer {
    // One sound at a time on the single speaker.
    busy: Mutex<()>,
}

impl RodioPlayer {
    /// Probe the default output device.
    ///
    /// # Errors
    ///
    /// Fails when no output device can be opened.
    pub fn new() -> Result<Self, HardwareError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| HardwareError::unavailable("audio output", e))?;
        stream.log_on_drop(false);
        info!("audio output ready");
        Ok(Self {
            busy: Mutex::new(()),
        })
    }
}

impl SoundPlayer for RodioPlayer {
    fn play(&self, path: &Path) -> Result<(), HardwareError> {
        if !path.exists() {
            return Err(HardwareError::SoundNotFound(path.to_path_buf()));
        }
        let _guard = self
            .busy
            .lock()
            .map_err(|_| HardwareError::unavailable("audio output", "lock poisoned"))?;

        info!(path = %path.display(), "playing sound");
        let mut stream = OutputStreamBuilder::open_default_stream().map_err(audio_err)?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        let file = File::open(path).map_err(audio_err)?;
        let source = Decoder::new(BufReader::new(file)).map_err(audio_err)?;
        sink.append(source);
        sink.sleep_until_end();

        info!(path = %path.display(), "sound finished");
        Ok(())
    }

    fn release(&self) {
        info!("audio output released");
    }
}
