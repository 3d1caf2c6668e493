use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Role of an account, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Citizen,
    Authority,
    Worker,
}

/// A platform account. `points` is mutated only by reward logic outside
/// this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: UserRole,
    pub points: u32,
    pub avatar: String,
}

/// Lifecycle state of an issue. Transitions are not enforced here; callers
/// sequence them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Rejected,
}

impl IssueStatus {
    /// Open issues are eligible for duplicate comparison and worker action.
    pub fn is_open(self) -> bool {
        !matches!(self, IssueStatus::Resolved | IssueStatus::Rejected)
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IssueStatus::Pending => "PENDING",
            IssueStatus::Assigned => "ASSIGNED",
            IssueStatus::InProgress => "IN_PROGRESS",
            IssueStatus::Resolved => "RESOLVED",
            IssueStatus::Rejected => "REJECTED",
        };
        f.pad(label)
    }
}

/// Urgency assigned by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        };
        f.pad(label)
    }
}

/// Coordinates plus a human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    pub address: String,
}

/// A comment on an issue. Immutable once created; only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub timestamp: String,
}

impl Comment {
    pub fn new(author: &User, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            text: text.into(),
            timestamp: now_rfc3339(),
        }
    }
}

/// A single reported civic defect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: IssueStatus,
    pub location: GeoLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub reported_by: String,
    pub reported_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub priority: Priority,
    pub department: String,
    pub upvotes: u32,
    pub comments: Vec<Comment>,
}

/// Structured verdict of the classification model for a captured image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_civic_issue: bool,
    pub rejection_reason: Option<String>,
    pub category: String,
    pub department: String,
    pub priority: Priority,
    pub summary: String,
}

/// Verdict of a pairwise same-defect comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub reason: String,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One turn in a linear chat history.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Current wall-clock time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::new())
}
