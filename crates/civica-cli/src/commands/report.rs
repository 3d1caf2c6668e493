use super::{build_model, confirm, open_store, require_user};
use crate::config::{Config, ConfigPaths};
use civica_core::capture::{
    AudioClip, AudioRecorder, CameraBackend, CaptureController, FacingMode, FileCamera, FileMic,
    NoCameraBackend,
};
use civica_core::locate::{FixedPosition, GeoBackend, LocationResolver, NoGeolocation};
use civica_core::report::{ReportFlow, ReportPhase};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Skip the camera and pick an image file instead
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Free-text description for the draft
    #[arg(long)]
    pub description: Option<String>,

    /// Attach an audio note recorded from this file
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Camera to open: front or back (default from config)
    #[arg(long)]
    pub facing: Option<String>,

    /// Torch hint for the stream
    #[arg(long)]
    pub torch: bool,

    /// Submit without the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

pub fn run(
    args: &ReportArgs,
    config: &Config,
    paths: &ConfigPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(paths)?;
    let user = require_user(&store)?;

    let facing: FacingMode = args
        .facing
        .as_deref()
        .unwrap_or(config.camera.facing.as_str())
        .parse()?;
    let torch = args.torch || config.camera.torch;

    let mut flow = ReportFlow::new();

    // Capture path: live camera when one is configured, otherwise (or on
    // --image) the file picker.
    let backend: Box<dyn CameraBackend> = if config.camera.frame_source.trim().is_empty() {
        Box::new(NoCameraBackend)
    } else {
        Box::new(FileCamera::new(PathBuf::from(
            config.camera.frame_source.trim(),
        )))
    };
    let mut controller = CaptureController::new(backend, facing);
    let image = match &args.image {
        Some(path) => controller.import_file(path)?,
        None => {
            if let Err(err) = controller.set_torch(torch) {
                eprintln!("torch unavailable: {err}");
            }
            match controller.start_stream().and_then(|()| controller.capture()) {
                Ok(image) => image,
                Err(err) => {
                    eprintln!("Camera access unavailable ({err})");
                    eprintln!("pass --image FILE to pick a photo from storage instead");
                    return Err(Box::new(err));
                }
            }
        }
    };
    flow.attach_image(image)?;

    if let Some(description) = &args.description {
        flow.set_description(description.clone());
    }

    if let Some(path) = &args.audio {
        match record_note(path.clone()) {
            Ok(clip) => flow.attach_audio(clip),
            // Recording is optional; a missing microphone never blocks the
            // report.
            Err(err) => eprintln!("audio note skipped: {err}"),
        }
    }

    let model = build_model(&config.model.classify);
    let mut resolver = build_resolver(config);

    println!("analyzing image and fetching location...");
    let phase = flow.analyze(model.as_ref(), &mut resolver)?;

    match phase {
        ReportPhase::Rejected => {
            println!("Issue Not Detected");
            if let Some(reason) = flow.rejection_reason() {
                println!("{reason}");
            }
            println!("try again with a new photo");
            Ok(())
        }
        ReportPhase::Ready => {
            if let Some(classification) = flow.classification() {
                println!(
                    "{} \u{2022} {} \u{2022} {}",
                    classification.category, classification.priority, classification.department
                );
                println!("title: {}", classification.summary);
            }
            if let Some(location) = flow.location() {
                println!("location: {}", location.address);
            }
            if !args.yes && !confirm("submit this report?")? {
                println!("discarded");
                return Ok(());
            }
            let id = flow.submit(&mut store, &user)?;
            println!("issue {id} submitted");
            Ok(())
        }
        other => Err(format!("unexpected phase after analyze: {other:?}").into()),
    }
}

fn record_note(path: PathBuf) -> Result<AudioClip, Box<dyn std::error::Error>> {
    let mut recorder = AudioRecorder::new(Box::new(FileMic::new(path)));
    recorder.start_recording()?;
    recorder.poll();
    recorder.stop_recording();
    recorder
        .take_clip()
        .ok_or_else(|| "no audio captured".into())
}

fn build_resolver(config: &Config) -> LocationResolver {
    let backend: Box<dyn GeoBackend> = if config.location.enabled {
        Box::new(FixedPosition {
            latitude: config.location.latitude,
            longitude: config.location.longitude,
        })
    } else {
        Box::new(NoGeolocation)
    };
    LocationResolver::new(
        backend,
        Duration::from_millis(config.location.timeout_ms),
        Duration::from_millis(config.location.geocode_delay_ms),
    )
}
