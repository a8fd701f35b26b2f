use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::decoder::{AudioDecoder, WaveformBuffer};
use crate::error::VadError;

/// Container formats accepted for upload, by file extension
pub const SUPPORTED_FORMATS: [&str; 3] = ["wav", "mp3", "flac"];

/// Lower-cased extension of `filename` if it is a supported format
pub fn supported_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_FORMATS.iter().copied().find(|f| *f == ext)
}

/// Validates uploads and decodes them through a per-request temporary file
pub struct AudioIngest {
    decoder: Arc<dyn AudioDecoder>,
    temp_dir: PathBuf,
    max_upload_bytes: usize,
}

impl AudioIngest {
    pub fn new(decoder: Arc<dyn AudioDecoder>, temp_dir: PathBuf, max_upload_bytes: usize) -> Self {
        Self {
            decoder,
            temp_dir,
            max_upload_bytes,
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Checks that need no I/O. Returns the normalized extension.
    pub fn validate(&self, raw_bytes: &[u8], filename: &str) -> Result<&'static str, VadError> {
        let extension = supported_extension(filename).ok_or_else(|| {
            VadError::validation(format!(
                "unsupported audio format for '{}'; supported formats: {}",
                filename,
                SUPPORTED_FORMATS.join(", ")
            ))
        })?;

        if raw_bytes.is_empty() {
            return Err(VadError::validation("audio file is empty"));
        }
        if raw_bytes.len() > self.max_upload_bytes {
            return Err(VadError::validation(format!(
                "audio file is {} bytes, limit is {} bytes",
                raw_bytes.len(),
                self.max_upload_bytes
            )));
        }

        Ok(extension)
    }

    /// Blocking. The staged file is removed before this returns, whatever the outcome.
    pub fn ingest(
        &self,
        raw_bytes: &[u8],
        filename: &str,
        request_id: Uuid,
    ) -> Result<WaveformBuffer, VadError> {
        let extension = self.validate(raw_bytes, filename)?;
        info!(filename, bytes = raw_bytes.len(), "Ingesting audio upload");

        let staged = StagedAudioFile::write(&self.temp_dir, request_id, extension, raw_bytes)?;

        let waveform = self.decoder.decode(staged.path()).map_err(|e| {
            VadError::processing(format!("could not decode '{}': {:#}", filename, e))
        })?;

        info!(
            sample_rate = waveform.sample_rate(),
            duration_secs = waveform.duration(),
            "Decoded audio"
        );
        Ok(waveform)
    }
}

/// Upload bytes on disk for the duration of a decode. Deleted on drop.
#[derive(Debug)]
pub struct StagedAudioFile {
    path: PathBuf,
}

impl StagedAudioFile {
    /// The name embeds the request id, so concurrent requests never collide.
    pub fn write(
        dir: &Path,
        request_id: Uuid,
        extension: &str,
        bytes: &[u8],
    ) -> Result<Self, VadError> {
        let path = dir.join(format!("vad-{}.{}", request_id.simple(), extension));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                VadError::processing(format!("could not stage upload at {}: {}", path.display(), e))
            })?;

        // From here on the file is ours and the guard removes it
        let staged = Self { path };
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| VadError::processing(format!("could not stage upload: {}", e)))?;

        debug!(path = %staged.path.display(), "Staged upload");
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedAudioFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                "Failed to remove staged upload: {}", e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the staged path it was handed, then succeeds or fails
    struct RecordingDecoder {
        fail: bool,
        seen: Mutex<Option<(PathBuf, Vec<u8>)>>,
    }

    impl RecordingDecoder {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                seen: Mutex::new(None),
            }
        }
    }

    impl AudioDecoder for RecordingDecoder {
        fn decode(&self, path: &Path) -> anyhow::Result<WaveformBuffer> {
            let contents = fs::read(path)?;
            *self.seen.lock().unwrap() = Some((path.to_path_buf(), contents));
            if self.fail {
                anyhow::bail!("corrupt stream");
            }
            Ok(WaveformBuffer::new(vec![0.0; 1600], 16000))
        }
    }

    fn ingest_with(decoder: Arc<RecordingDecoder>, dir: &Path) -> AudioIngest {
        AudioIngest::new(decoder, dir.to_path_buf(), 1024)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(supported_extension("clip.WAV"), Some("wav"));
        assert_eq!(supported_extension("a.b.flac"), Some("flac"));
        assert_eq!(supported_extension("take.mp3"), Some("mp3"));
        assert_eq!(supported_extension("voice.ogg"), None);
        assert_eq!(supported_extension("noextension"), None);
    }

    #[test]
    fn successful_ingest_decodes_staged_copy_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = Arc::new(RecordingDecoder::new(false));
        let ingest = ingest_with(decoder.clone(), dir.path());
        let request_id = Uuid::new_v4();

        let waveform = ingest.ingest(b"RIFFdata", "clip.wav", request_id).unwrap();
        assert_eq!(waveform.sample_rate(), 16000);

        let (path, contents) = decoder.seen.lock().unwrap().clone().unwrap();
        assert_eq!(contents, b"RIFFdata");
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.contains(&request_id.simple().to_string()));
        assert!(name.ends_with(".wav"));
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn decode_failure_is_a_processing_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let ingest = ingest_with(Arc::new(RecordingDecoder::new(true)), dir.path());

        let err = ingest.ingest(b"bytes", "clip.flac", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VadError::Processing(_)));
        assert!(err.to_string().contains("corrupt stream"));
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn validation_failures_stage_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = Arc::new(RecordingDecoder::new(false));
        let ingest = ingest_with(decoder.clone(), dir.path());

        let err = ingest.ingest(b"bytes", "voice.ogg", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VadError::Validation(_)));

        let err = ingest.ingest(b"", "voice.wav", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VadError::Validation(_)));

        let err = ingest.ingest(&[0u8; 2048], "voice.wav", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VadError::Validation(_)));

        assert!(decoder.seen.lock().unwrap().is_none());
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn missing_temp_dir_is_a_processing_error() {
        let ingest = AudioIngest::new(
            Arc::new(RecordingDecoder::new(false)),
            PathBuf::from("/nonexistent/vad-staging"),
            1024,
        );
        let err = ingest.ingest(b"bytes", "clip.wav", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VadError::Processing(_)));
    }
}
