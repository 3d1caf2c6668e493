use thiserror::Error;

/// Errors from camera and microphone backends.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera available")]
    NoCamera,

    #[error("no live camera stream; pick a file instead")]
    NoStream,

    #[error("microphone permission denied")]
    MicPermissionDenied,

    #[error("no microphone available")]
    NoMicrophone,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("an audio note already exists; delete it first")]
    ClipExists,

    #[error("frame read failed: {0}")]
    FrameFailed(String),

    #[error("image encode failed: {0}")]
    EncodeFailed(String),

    #[error("file import failed: {0}")]
    ImportFailed(String),

    #[error("capture backend error: {0}")]
    Backend(String),
}

/// Errors from geolocation backends.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("geolocation not supported on this device")]
    Unsupported,

    #[error("position request timed out")]
    Timeout,

    #[error("geolocation backend error: {0}")]
    Backend(String),
}

/// Errors from generative-model providers.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call failed: {0}")]
    Failed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors loading image bytes from a data URI or remote URL.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image fetch failed: {0}")]
    Fetch(String),
}

/// Errors from the duplicate scan over the issue collection.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("issue not found: {0}")]
    UnknownIssue(String),

    #[error("this issue has no image to compare")]
    MissingImage,

    #[error("issue image could not be loaded: {0}")]
    Unreadable(String),
}

/// Errors from the issue store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
