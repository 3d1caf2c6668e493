use crate::error::CaptureError;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

const CLIP_MIME: &str = "audio/webm";

/// Trait for microphone backends. `poll_chunk` drains whatever audio has
/// accumulated since the last call; `stop` must release the device.
pub trait MicBackend: Send {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn poll_chunk(&mut self) -> Option<Vec<u8>>;
    fn stop(&mut self);
}

/// One assembled, playable audio note.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub duration_secs: u64,
}

/// Optional voice note attached to a draft report. Accumulates chunks while
/// recording and assembles them into a single clip on stop. Only one clip
/// may exist at a time; recording again requires deleting the prior clip.
pub struct AudioRecorder {
    backend: Box<dyn MicBackend>,
    recording: bool,
    chunks: Vec<Vec<u8>>,
    started: Option<Instant>,
    clip: Option<AudioClip>,
}

impl AudioRecorder {
    pub fn new(backend: Box<dyn MicBackend>) -> Self {
        Self {
            backend,
            recording: false,
            chunks: Vec::new(),
            started: None,
            clip: None,
        }
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.recording {
            return Err(CaptureError::AlreadyRecording);
        }
        if self.clip.is_some() {
            return Err(CaptureError::ClipExists);
        }
        self.backend.start()?;
        self.chunks.clear();
        self.started = Some(Instant::now());
        self.recording = true;
        Ok(())
    }

    /// Drain available audio from the backend. Driven by the caller's loop
    /// while recording.
    pub fn poll(&mut self) {
        if !self.recording {
            return;
        }
        while let Some(chunk) = self.backend.poll_chunk() {
            if !chunk.is_empty() {
                self.chunks.push(chunk);
            }
        }
    }

    /// Seconds since recording started; the once-per-second counter shown
    /// next to the stop button.
    pub fn elapsed_secs(&self) -> u64 {
        match (&self.started, self.recording) {
            (Some(started), true) => started.elapsed().as_secs(),
            _ => 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Stop, release the microphone, and assemble the chunks into one clip.
    /// A no-op when nothing is recording.
    pub fn stop_recording(&mut self) {
        if !self.recording {
            return;
        }
        self.poll_remaining();
        self.backend.stop();
        let duration_secs = self
            .started
            .take()
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0);
        let bytes: Vec<u8> = self.chunks.drain(..).flatten().collect();
        self.clip = Some(AudioClip {
            bytes,
            mime: CLIP_MIME.to_string(),
            duration_secs,
        });
        self.recording = false;
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn take_clip(&mut self) -> Option<AudioClip> {
        self.clip.take()
    }

    pub fn delete_clip(&mut self) {
        self.clip = None;
    }

    fn poll_remaining(&mut self) {
        while let Some(chunk) = self.backend.poll_chunk() {
            if !chunk.is_empty() {
                self.chunks.push(chunk);
            }
        }
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        if self.recording {
            self.backend.stop();
        }
    }
}

/// Microphone backend that replays a file in fixed-size chunks; the demo
/// stand-in for device audio, behind the same trait a hardware backend
/// would implement.
pub struct FileMic {
    path: PathBuf,
    pending: Vec<Vec<u8>>,
    open: bool,
}

const FILE_MIC_CHUNK: usize = 4096;

impl FileMic {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            pending: Vec::new(),
            open: false,
        }
    }
}

impl MicBackend for FileMic {
    fn start(&mut self) -> Result<(), CaptureError> {
        let bytes = fs::read(&self.path).map_err(|_| CaptureError::NoMicrophone)?;
        self.pending = bytes
            .chunks(FILE_MIC_CHUNK)
            .map(|chunk| chunk.to_vec())
            .collect();
        self.pending.reverse();
        self.open = true;
        Ok(())
    }

    fn poll_chunk(&mut self) -> Option<Vec<u8>> {
        if !self.open {
            return None;
        }
        self.pending.pop()
    }

    fn stop(&mut self) {
        self.open = false;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubMic {
        chunks: Vec<Vec<u8>>,
        released: Arc<AtomicBool>,
        deny: bool,
    }

    impl StubMic {
        fn new(chunks: Vec<Vec<u8>>) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Self {
                    chunks,
                    released: Arc::clone(&released),
                    deny: false,
                },
                released,
            )
        }
    }

    impl MicBackend for StubMic {
        fn start(&mut self) -> Result<(), CaptureError> {
            if self.deny {
                return Err(CaptureError::MicPermissionDenied);
            }
            self.released.store(false, Ordering::Relaxed);
            Ok(())
        }

        fn poll_chunk(&mut self) -> Option<Vec<u8>> {
            if self.chunks.is_empty() {
                None
            } else {
                Some(self.chunks.remove(0))
            }
        }

        fn stop(&mut self) {
            self.released.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn stop_assembles_chunks_into_one_clip_and_releases_mic() {
        let (mic, released) = StubMic::new(vec![vec![1, 2], vec![3], vec![4, 5]]);
        let mut recorder = AudioRecorder::new(Box::new(mic));
        recorder.start_recording().unwrap();
        recorder.poll();
        recorder.stop_recording();

        let clip = recorder.clip().unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3, 4, 5]);
        assert_eq!(clip.mime, "audio/webm");
        assert!(released.load(Ordering::Relaxed));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn stop_drains_chunks_left_in_the_backend() {
        let (mic, _) = StubMic::new(vec![vec![9, 9]]);
        let mut recorder = AudioRecorder::new(Box::new(mic));
        recorder.start_recording().unwrap();
        // No poll before stop; the remaining audio must still land in the clip.
        recorder.stop_recording();
        assert_eq!(recorder.clip().unwrap().bytes, vec![9, 9]);
    }

    #[test]
    fn second_recording_requires_deleting_the_clip() {
        let (mic, _) = StubMic::new(vec![vec![1]]);
        let mut recorder = AudioRecorder::new(Box::new(mic));
        recorder.start_recording().unwrap();
        recorder.stop_recording();

        assert!(matches!(
            recorder.start_recording(),
            Err(CaptureError::ClipExists)
        ));
        recorder.delete_clip();
        assert!(recorder.clip().is_none());
        assert!(recorder.start_recording().is_ok());
    }

    #[test]
    fn starting_twice_is_rejected() {
        let (mic, _) = StubMic::new(Vec::new());
        let mut recorder = AudioRecorder::new(Box::new(mic));
        recorder.start_recording().unwrap();
        assert!(matches!(
            recorder.start_recording(),
            Err(CaptureError::AlreadyRecording)
        ));
    }

    #[test]
    fn denied_microphone_leaves_recorder_idle() {
        let (mut mic, _) = StubMic::new(Vec::new());
        mic.deny = true;
        let mut recorder = AudioRecorder::new(Box::new(mic));
        assert!(matches!(
            recorder.start_recording(),
            Err(CaptureError::MicPermissionDenied)
        ));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn drop_while_recording_releases_the_mic() {
        let (mic, released) = StubMic::new(Vec::new());
        {
            let mut recorder = AudioRecorder::new(Box::new(mic));
            recorder.start_recording().unwrap();
        }
        assert!(released.load(Ordering::Relaxed));
    }

    #[test]
    fn file_mic_replays_file_contents() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("note.webm");
        std::fs::write(&path, vec![7u8; 10_000]).unwrap();

        let mut recorder = AudioRecorder::new(Box::new(FileMic::new(path)));
        recorder.start_recording().unwrap();
        recorder.poll();
        recorder.stop_recording();
        assert_eq!(recorder.clip().unwrap().bytes.len(), 10_000);
    }
}
