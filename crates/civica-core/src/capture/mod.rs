mod recorder;

pub use recorder::{AudioClip, AudioRecorder, FileMic, MicBackend};

use crate::error::CaptureError;
use crate::media;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::Path;

/// Encoding quality for captured stills.
const JPEG_QUALITY: u8 = 80;

/// Which camera a stream is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Front,
    Back,
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "front" => Ok(FacingMode::Front),
            "back" => Ok(FacingMode::Back),
            other => Err(format!("facing mode must be front or back (got {other})")),
        }
    }
}

/// Trait for still-camera backends.
///
/// Frames arrive in preview orientation: front-facing frames are mirrored
/// left-to-right the way a selfie preview is, back-facing frames are
/// scene-true. The controller undoes the front mirror before encoding.
pub trait CameraBackend: Send {
    fn open(&mut self, facing: FacingMode, torch: bool) -> Result<(), CaptureError>;
    fn read_frame(&mut self) -> Result<RgbaImage, CaptureError>;
    fn close(&mut self);
}

/// A photo ready to attach to a draft issue.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl CapturedImage {
    /// The storage form used by the issue collection.
    pub fn data_uri(&self) -> String {
        media::to_data_uri(&self.mime, &self.bytes)
    }
}

/// Owns the live camera stream for the report view: facing mode, torch
/// hint, still capture, and the file-picker fallback. Streams are released
/// on capture, on teardown, and on drop.
pub struct CaptureController {
    backend: Box<dyn CameraBackend>,
    facing: FacingMode,
    torch: bool,
    live: bool,
}

impl CaptureController {
    pub fn new(backend: Box<dyn CameraBackend>, facing: FacingMode) -> Self {
        Self {
            backend,
            facing,
            torch: false,
            live: false,
        }
    }

    /// Acquire (or reacquire) the stream for the current facing mode and
    /// torch hint. On failure the controller stays in the camera-unavailable
    /// state and the caller falls back to `import_file`.
    pub fn start_stream(&mut self) -> Result<(), CaptureError> {
        if self.live {
            self.backend.close();
            self.live = false;
        }
        self.backend.open(self.facing, self.torch)?;
        self.live = true;
        Ok(())
    }

    /// Switching cameras tears down and reacquires the stream.
    pub fn set_facing(&mut self, facing: FacingMode) -> Result<(), CaptureError> {
        self.facing = facing;
        if self.live { self.start_stream() } else { Ok(()) }
    }

    pub fn set_torch(&mut self, torch: bool) -> Result<(), CaptureError> {
        self.torch = torch;
        if self.live { self.start_stream() } else { Ok(()) }
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Capture a still at the stream's native resolution. Front-facing
    /// frames are un-mirrored before encoding so the stored photo shows the
    /// scene, not a flipped selfie. The stream is released afterwards; the
    /// still replaces the preview.
    pub fn capture(&mut self) -> Result<CapturedImage, CaptureError> {
        if !self.live {
            return Err(CaptureError::NoStream);
        }
        let frame = self.backend.read_frame()?;
        let frame = match self.facing {
            FacingMode::Front => image::imageops::flip_horizontal(&frame),
            FacingMode::Back => frame,
        };
        self.stop_stream();

        let rgb = DynamicImage::ImageRgba8(frame).to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;

        Ok(CapturedImage {
            bytes,
            mime: "image/jpeg".to_string(),
        })
    }

    /// File-picker fallback: any image file, unconstrained format, passed
    /// through untouched.
    pub fn import_file(&mut self, path: &Path) -> Result<CapturedImage, CaptureError> {
        self.stop_stream();
        let bytes = fs::read(path).map_err(|e| CaptureError::ImportFailed(e.to_string()))?;
        Ok(CapturedImage {
            bytes,
            mime: media::mime_for_path(path).to_string(),
        })
    }

    /// Release the stream if one is live.
    pub fn stop_stream(&mut self) {
        if self.live {
            self.backend.close();
            self.live = false;
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

/// A camera backend that serves frames from an image file, used at demo
/// scale and in tests. Hardware cameras plug in behind the same trait.
pub struct FileCamera {
    path: std::path::PathBuf,
    open: bool,
    facing: FacingMode,
}

impl FileCamera {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self {
            path,
            open: false,
            facing: FacingMode::Back,
        }
    }
}

impl CameraBackend for FileCamera {
    fn open(&mut self, facing: FacingMode, _torch: bool) -> Result<(), CaptureError> {
        if !self.path.exists() {
            return Err(CaptureError::NoCamera);
        }
        self.facing = facing;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        if !self.open {
            return Err(CaptureError::Backend("stream not open".into()));
        }
        let frame = image::open(&self.path)
            .map_err(|e| CaptureError::FrameFailed(e.to_string()))?
            .to_rgba8();
        // Serve preview orientation: mirrored for the front camera.
        Ok(match self.facing {
            FacingMode::Front => image::imageops::flip_horizontal(&frame),
            FacingMode::Back => frame,
        })
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Stands in when the device has no camera at all; every open fails and
/// the caller lands on the file picker.
pub struct NoCameraBackend;

impl CameraBackend for NoCameraBackend {
    fn open(&mut self, _facing: FacingMode, _torch: bool) -> Result<(), CaptureError> {
        Err(CaptureError::NoCamera)
    }

    fn read_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::NoStream)
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves an asymmetric test pattern in preview orientation and counts
    /// stream acquisitions/releases so leaks show up in assertions.
    struct PatternCamera {
        facing: FacingMode,
        opens: Arc<AtomicU32>,
        closes: Arc<AtomicU32>,
        fail_open: bool,
    }

    impl PatternCamera {
        fn new() -> (Self, Arc<AtomicU32>, Arc<AtomicU32>) {
            let opens = Arc::new(AtomicU32::new(0));
            let closes = Arc::new(AtomicU32::new(0));
            (
                Self {
                    facing: FacingMode::Back,
                    opens: Arc::clone(&opens),
                    closes: Arc::clone(&closes),
                    fail_open: false,
                },
                opens,
                closes,
            )
        }

        /// Left column red, right column blue: flipping is detectable.
        fn scene() -> RgbaImage {
            let mut img = RgbaImage::new(4, 2);
            for y in 0..2 {
                for x in 0..4 {
                    let pixel = if x < 2 {
                        Rgba([255, 0, 0, 255])
                    } else {
                        Rgba([0, 0, 255, 255])
                    };
                    img.put_pixel(x, y, pixel);
                }
            }
            img
        }
    }

    impl CameraBackend for PatternCamera {
        fn open(&mut self, facing: FacingMode, _torch: bool) -> Result<(), CaptureError> {
            if self.fail_open {
                return Err(CaptureError::PermissionDenied);
            }
            self.facing = facing;
            self.opens.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn read_frame(&mut self) -> Result<RgbaImage, CaptureError> {
            Ok(match self.facing {
                FacingMode::Front => image::imageops::flip_horizontal(&Self::scene()),
                FacingMode::Back => Self::scene(),
            })
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn decode(image: &CapturedImage) -> image::RgbImage {
        image::load_from_memory(&image.bytes).unwrap().to_rgb8()
    }

    #[test]
    fn capture_without_stream_routes_to_file_picker() {
        let (camera, _, _) = PatternCamera::new();
        let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
        assert!(matches!(controller.capture(), Err(CaptureError::NoStream)));
    }

    #[test]
    fn front_capture_is_not_mirrored_relative_to_back_capture() {
        let (camera, _, _) = PatternCamera::new();
        let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
        controller.start_stream().unwrap();
        let back = controller.capture().unwrap();

        controller.set_facing(FacingMode::Front).unwrap();
        controller.start_stream().unwrap();
        let front = controller.capture().unwrap();

        let back_px = decode(&back);
        let front_px = decode(&front);
        // Same scene orientation either way: red stays on the left.
        assert_eq!(back_px.get_pixel(0, 0), front_px.get_pixel(0, 0));
        assert_eq!(back_px.get_pixel(3, 0), front_px.get_pixel(3, 0));
        assert!(back_px.get_pixel(0, 0)[0] > back_px.get_pixel(0, 0)[2]);
        assert!(back_px.get_pixel(3, 0)[2] > back_px.get_pixel(3, 0)[0]);
    }

    #[test]
    fn capture_encodes_jpeg_and_releases_the_stream() {
        let (camera, opens, closes) = PatternCamera::new();
        let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
        controller.start_stream().unwrap();
        let image = controller.capture().unwrap();

        assert_eq!(image.mime, "image/jpeg");
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
        assert!(!controller.is_live());
        assert_eq!(opens.load(Ordering::Relaxed), 1);
        assert_eq!(closes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn switching_facing_reacquires_the_stream() {
        let (camera, opens, closes) = PatternCamera::new();
        let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
        controller.start_stream().unwrap();
        controller.set_facing(FacingMode::Front).unwrap();
        controller.set_torch(true).unwrap();

        assert_eq!(opens.load(Ordering::Relaxed), 3);
        assert_eq!(closes.load(Ordering::Relaxed), 2);
        assert!(controller.is_live());
    }

    #[test]
    fn drop_releases_a_live_stream() {
        let (camera, opens, closes) = PatternCamera::new();
        {
            let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
            controller.start_stream().unwrap();
        }
        assert_eq!(opens.load(Ordering::Relaxed), 1);
        assert_eq!(closes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn denied_stream_leaves_controller_not_live() {
        let (mut camera, _, _) = PatternCamera::new();
        camera.fail_open = true;
        let mut controller = CaptureController::new(Box::new(camera), FacingMode::Back);
        assert!(matches!(
            controller.start_stream(),
            Err(CaptureError::PermissionDenied)
        ));
        assert!(!controller.is_live());
    }

    #[test]
    fn import_preserves_unconstrained_formats() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shot.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let mut controller =
            CaptureController::new(Box::new(NoCameraBackend), FacingMode::Back);
        let imported = controller.import_file(&path).unwrap();
        assert_eq!(imported.mime, "image/png");
        assert_eq!(imported.bytes, b"not really a png");
    }

    #[test]
    fn file_camera_round_trips_a_real_frame() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("frame.png");
        let mut scene = RgbaImage::new(2, 1);
        scene.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        scene.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        scene.save(&path).unwrap();

        let mut controller =
            CaptureController::new(Box::new(FileCamera::new(path)), FacingMode::Back);
        controller.start_stream().unwrap();
        let captured = controller.capture().unwrap();
        let px = decode(&captured);
        assert!(px.get_pixel(0, 0)[0] > px.get_pixel(0, 0)[2]);
    }
}
