use crate::capture::{AudioClip, CapturedImage};
use crate::classify;
use crate::error::StoreError;
use crate::locate::LocationResolver;
use crate::model::GenerativeModel;
use crate::store::IssueStore;
use crate::types::{Classification, GeoLocation, Issue, IssueStatus, User, now_rfc3339};
use std::thread;
use thiserror::Error;
use uuid::Uuid;

const FALLBACK_TITLE: &str = "Reported Issue";
const FALLBACK_DESCRIPTION: &str = "No description provided.";

/// Where a submission currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Capturing,
    Analyzing,
    Ready,
    Rejected,
    Submitting,
    Done,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no image attached; capture or pick a photo first")]
    NoImage,

    #[error("submission is not ready in phase {0:?}")]
    WrongPhase(ReportPhase),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The short-lived draft of one submission: captured, analyzed, confirmed,
/// then submitted. Holds everything the draft owns: photo, free-text
/// description, optional audio note, and the joined location and
/// classification results.
pub struct ReportFlow {
    phase: ReportPhase,
    image: Option<CapturedImage>,
    description: String,
    audio: Option<AudioClip>,
    location: Option<GeoLocation>,
    classification: Option<Classification>,
    rejection_reason: Option<String>,
}

impl ReportFlow {
    pub fn new() -> Self {
        Self {
            phase: ReportPhase::Capturing,
            image: None,
            description: String::new(),
            audio: None,
            location: None,
            classification: None,
            rejection_reason: None,
        }
    }

    pub fn phase(&self) -> ReportPhase {
        self.phase
    }

    pub fn attach_image(&mut self, image: CapturedImage) -> Result<(), ReportError> {
        if self.phase != ReportPhase::Capturing {
            return Err(ReportError::WrongPhase(self.phase));
        }
        self.image = Some(image);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn attach_audio(&mut self, clip: AudioClip) {
        self.audio = Some(clip);
    }

    /// Removing the note leaves no audio reference on the draft.
    pub fn delete_audio(&mut self) {
        self.audio = None;
    }

    pub fn audio(&self) -> Option<&AudioClip> {
        self.audio.as_ref()
    }

    pub fn location(&self) -> Option<&GeoLocation> {
        self.location.as_ref()
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Run location resolution and classification concurrently and join
    /// both before finalizing the draft. Each leg carries its own bounded
    /// timeout and fallback, so the join always completes; a slow
    /// classification never blocks a fast location fix from being used.
    pub fn analyze(
        &mut self,
        model: &dyn GenerativeModel,
        resolver: &mut LocationResolver,
    ) -> Result<ReportPhase, ReportError> {
        if self.phase != ReportPhase::Capturing {
            return Err(ReportError::WrongPhase(self.phase));
        }
        let Some(image) = self.image.as_ref() else {
            return Err(ReportError::NoImage);
        };
        self.phase = ReportPhase::Analyzing;
        let description = non_empty(&self.description);

        let (classification, location) = thread::scope(|scope| {
            let classify_handle = scope.spawn(|| {
                classify::analyze_issue(
                    model,
                    description,
                    Some((image.mime.as_str(), image.bytes.as_slice())),
                )
            });
            let location = resolver.resolve();
            let classification = match classify_handle.join() {
                Ok(classification) => classification,
                Err(_) => classify::fallback_classification(description),
            };
            (classification, location)
        });

        self.location = Some(location);
        if classification.is_civic_issue {
            self.classification = Some(classification);
            self.phase = ReportPhase::Ready;
        } else {
            self.rejection_reason = classification.rejection_reason;
            self.phase = ReportPhase::Rejected;
        }
        Ok(self.phase)
    }

    /// Discard the capture and start over. The only path onward from a
    /// rejection; also backs the retake button on the confirm screen.
    pub fn retry(&mut self) -> Result<(), ReportError> {
        match self.phase {
            ReportPhase::Submitting | ReportPhase::Done => {
                Err(ReportError::WrongPhase(self.phase))
            }
            _ => {
                self.image = None;
                self.description.clear();
                self.audio = None;
                self.location = None;
                self.classification = None;
                self.rejection_reason = None;
                self.phase = ReportPhase::Capturing;
                Ok(())
            }
        }
    }

    /// Append the confirmed draft to the store. New issues always start
    /// PENDING with zero upvotes and no comments.
    pub fn submit(&mut self, store: &mut IssueStore, user: &User) -> Result<String, ReportError> {
        if self.phase != ReportPhase::Ready {
            return Err(ReportError::WrongPhase(self.phase));
        }
        let Some(location) = self.location.clone() else {
            return Err(ReportError::WrongPhase(self.phase));
        };
        let Some(image) = self.image.as_ref() else {
            return Err(ReportError::WrongPhase(self.phase));
        };
        let classification = self
            .classification
            .clone()
            .unwrap_or_else(|| classify::fallback_classification(non_empty(&self.description)));
        self.phase = ReportPhase::Submitting;

        let title = if classification.summary.is_empty() {
            if classification.category.is_empty() {
                FALLBACK_TITLE.to_string()
            } else {
                classification.category.clone()
            }
        } else {
            classification.summary.clone()
        };
        let description = non_empty(&self.description)
            .unwrap_or(FALLBACK_DESCRIPTION)
            .to_string();

        let issue = Issue {
            id: Uuid::now_v7().to_string(),
            title,
            description,
            category: classification.category,
            status: IssueStatus::Pending,
            location,
            image: Some(image.data_uri()),
            reported_by: user.id.clone(),
            reported_at: now_rfc3339(),
            assigned_to: None,
            priority: classification.priority,
            department: classification.department,
            upvotes: 0,
            comments: Vec::new(),
        };
        let id = issue.id.clone();
        store.create(issue)?;
        self.phase = ReportPhase::Done;
        Ok(id)
    }
}

impl Default for ReportFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
