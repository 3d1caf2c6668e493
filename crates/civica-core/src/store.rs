use crate::error::StoreError;
use crate::types::{Comment, GeoLocation, Issue, IssueStatus, Priority, User};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const STORE_VERSION: u32 = 1;
const SEED_IMAGE_POTHOLE: &str =
    "https://images.unsplash.com/photo-1515162816999-a0c47dc192f7?auto=format&fit=crop&q=80&w=800";
const SEED_IMAGE_GARBAGE: &str =
    "https://images.unsplash.com/photo-1530587191325-3db32d826c18?auto=format&fit=crop&q=80&w=800";

/// Locations of the two persisted keys: the current user and the issue
/// collection.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub base_dir: PathBuf,
    pub issues_path: PathBuf,
    pub user_path: PathBuf,
}

impl StorePaths {
    pub fn from_base(base_dir: PathBuf) -> Self {
        let issues_path = base_dir.join("issues.json");
        let user_path = base_dir.join("user.json");
        Self {
            base_dir,
            issues_path,
            user_path,
        }
    }
}

/// A partial-field merge applied to one issue. Unset fields keep their
/// current value.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<IssueStatus>,
    pub location: Option<GeoLocation>,
    pub image: Option<String>,
    pub assigned_to: Option<String>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub upvotes: Option<u32>,
    pub comments: Option<Vec<Comment>>,
}

impl IssuePatch {
    fn apply(self, issue: &mut Issue) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(category) = self.category {
            issue.category = category;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(location) = self.location {
            issue.location = location;
        }
        if let Some(image) = self.image {
            issue.image = Some(image);
        }
        if let Some(assigned_to) = self.assigned_to {
            issue.assigned_to = Some(assigned_to);
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(department) = self.department {
            issue.department = department;
        }
        if let Some(upvotes) = self.upvotes {
            issue.upvotes = upvotes;
        }
        if let Some(comments) = self.comments {
            issue.comments = comments;
        }
    }
}

/// Single owner of the issue collection within one client instance. Every
/// mutation persists the full collection before returning, so in-memory and
/// on-disk state never diverge.
pub struct IssueStore {
    paths: StorePaths,
    issues: Vec<Issue>,
}

impl IssueStore {
    /// Load the persisted collection, or populate and persist the demo seed
    /// on first run.
    pub fn open(paths: StorePaths) -> Result<Self, StoreError> {
        fs::create_dir_all(&paths.base_dir)?;
        if paths.issues_path.exists() {
            let contents = fs::read_to_string(&paths.issues_path)?;
            let envelope: IssuesEnvelope = serde_json::from_str(&contents)?;
            if envelope.version > STORE_VERSION {
                eprintln!(
                    "issue store version {} is newer than supported {STORE_VERSION}; proceeding",
                    envelope.version
                );
            }
            return Ok(Self {
                paths,
                issues: envelope.issues,
            });
        }

        let store = Self {
            paths,
            issues: seed_issues(),
        };
        store.persist()?;
        Ok(store)
    }

    /// Full collection, most-recent-first.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    /// Prepend a new issue and persist.
    pub fn create(&mut self, issue: Issue) -> Result<(), StoreError> {
        self.issues.insert(0, issue);
        self.persist()
    }

    /// Merge partial fields into the matching issue. An unknown id is a
    /// no-op; nothing is written and `false` is returned.
    pub fn update(&mut self, id: &str, patch: IssuePatch) -> Result<bool, StoreError> {
        let Some(issue) = self.issues.iter_mut().find(|issue| issue.id == id) else {
            return Ok(false);
        };
        patch.apply(issue);
        self.persist()?;
        Ok(true)
    }

    pub fn upvote(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(current) = self.get(id).map(|issue| issue.upvotes) else {
            return Ok(false);
        };
        self.update(
            id,
            IssuePatch {
                upvotes: Some(current + 1),
                ..IssuePatch::default()
            },
        )
    }

    pub fn add_comment(&mut self, id: &str, comment: Comment) -> Result<bool, StoreError> {
        let Some(mut comments) = self.get(id).map(|issue| issue.comments.clone()) else {
            return Ok(false);
        };
        comments.push(comment);
        self.update(
            id,
            IssuePatch {
                comments: Some(comments),
                ..IssuePatch::default()
            },
        )
    }

    /// Authority action: route to a worker.
    pub fn assign(&mut self, id: &str, worker_id: &str) -> Result<bool, StoreError> {
        self.update(
            id,
            IssuePatch {
                status: Some(IssueStatus::Assigned),
                assigned_to: Some(worker_id.to_string()),
                ..IssuePatch::default()
            },
        )
    }

    /// Worker action: move an issue along its lifecycle.
    pub fn set_status(&mut self, id: &str, status: IssueStatus) -> Result<bool, StoreError> {
        self.update(
            id,
            IssuePatch {
                status: Some(status),
                ..IssuePatch::default()
            },
        )
    }

    /// Resolve a confirmed duplicate in one transactional mutation: the
    /// duplicate is rejected (never deleted) and the original gains one
    /// upvote. Applies nothing unless both records exist and differ.
    pub fn merge_duplicate(
        &mut self,
        duplicate_id: &str,
        original_id: &str,
    ) -> Result<bool, StoreError> {
        if duplicate_id == original_id {
            return Ok(false);
        }
        if self.get(duplicate_id).is_none() || self.get(original_id).is_none() {
            return Ok(false);
        }
        for issue in &mut self.issues {
            if issue.id == duplicate_id {
                issue.status = IssueStatus::Rejected;
            } else if issue.id == original_id {
                issue.upvotes += 1;
            }
        }
        self.persist()?;
        Ok(true)
    }

    /// The persisted current-user key.
    pub fn load_user(&self) -> Result<Option<User>, StoreError> {
        if !self.paths.user_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.paths.user_path)?;
        let envelope: UserEnvelope = serde_json::from_str(&contents)?;
        Ok(Some(envelope.user))
    }

    pub fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let envelope = UserEnvelope {
            version: STORE_VERSION,
            user: user.clone(),
        };
        let contents = serde_json::to_vec_pretty(&envelope)?;
        write_atomic(&self.paths.user_path, &contents)?;
        Ok(())
    }

    pub fn clear_user(&self) -> Result<(), StoreError> {
        if self.paths.user_path.exists() {
            fs::remove_file(&self.paths.user_path)?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let envelope = IssuesEnvelope {
            version: STORE_VERSION,
            issues: self.issues.clone(),
        };
        let contents = serde_json::to_vec_pretty(&envelope)?;
        write_atomic(&self.paths.issues_path, &contents)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct IssuesEnvelope {
    version: u32,
    issues: Vec<Issue>,
}

#[derive(Serialize, Deserialize)]
struct UserEnvelope {
    version: u32,
    user: User,
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("store path missing parent directory"))?;
    let tmp_path = parent.join(".tmp-write");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn rfc3339_ago(duration: time::Duration) -> String {
    (OffsetDateTime::now_utc() - duration)
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::new())
}

/// Fixed first-run demo data: five issues, one per lifecycle status.
fn seed_issues() -> Vec<Issue> {
    vec![
        Issue {
            id: "1".to_string(),
            title: "Large Pothole on Main St".to_string(),
            description: "Deep pothole causing traffic issues near the signal.".to_string(),
            category: "Roads & Safety".to_string(),
            status: IssueStatus::Pending,
            location: GeoLocation {
                latitude: 19.076,
                longitude: 72.877,
                address: "Main Street, Mumbai".to_string(),
            },
            image: Some(SEED_IMAGE_POTHOLE.to_string()),
            reported_by: "user1".to_string(),
            reported_at: rfc3339_ago(time::Duration::ZERO),
            assigned_to: None,
            priority: Priority::High,
            department: "Public Works".to_string(),
            upvotes: 12,
            comments: vec![Comment {
                id: "c1".to_string(),
                user_id: "u2".to_string(),
                user_name: "Citizen Jane".to_string(),
                text: "This is really dangerous for bikers.".to_string(),
                timestamp: rfc3339_ago(time::Duration::ZERO),
            }],
        },
        Issue {
            id: "2".to_string(),
            title: "Garbage pile near Park".to_string(),
            description: "Garbage hasn't been picked up for 3 days.".to_string(),
            category: "Garbage & Sanitation".to_string(),
            status: IssueStatus::InProgress,
            location: GeoLocation {
                latitude: 19.080,
                longitude: 72.880,
                address: "Sunrise Park Road".to_string(),
            },
            image: Some(SEED_IMAGE_GARBAGE.to_string()),
            reported_by: "user2".to_string(),
            reported_at: rfc3339_ago(time::Duration::days(1)),
            assigned_to: None,
            priority: Priority::Medium,
            department: "Municipal Corp".to_string(),
            upvotes: 5,
            comments: Vec::new(),
        },
        Issue {
            id: "w1".to_string(),
            title: "Broken Street Light #42".to_string(),
            description: "Street light blinking and sparking intermittently.".to_string(),
            category: "Electricity".to_string(),
            status: IssueStatus::Assigned,
            location: GeoLocation {
                latitude: 19.100,
                longitude: 72.890,
                address: "Sector 5, Market Road".to_string(),
            },
            image: None,
            reported_by: "user3".to_string(),
            reported_at: rfc3339_ago(time::Duration::days(2)),
            assigned_to: Some("WORKER_01".to_string()),
            priority: Priority::Medium,
            department: "Electric Board".to_string(),
            upvotes: 2,
            comments: Vec::new(),
        },
        Issue {
            id: "w2".to_string(),
            title: "Water Pipe Leakage".to_string(),
            description: "Major pipeline burst flooding the intersection.".to_string(),
            category: "Water Supply".to_string(),
            status: IssueStatus::Resolved,
            location: GeoLocation {
                latitude: 19.110,
                longitude: 72.900,
                address: "Junction 9, MG Road".to_string(),
            },
            image: None,
            reported_by: "user4".to_string(),
            reported_at: rfc3339_ago(time::Duration::hours(1)),
            assigned_to: Some("WORKER_01".to_string()),
            priority: Priority::High,
            department: "Water Board".to_string(),
            upvotes: 25,
            comments: Vec::new(),
        },
        Issue {
            id: "w3".to_string(),
            title: "Illegal Parking Blockade".to_string(),
            description: "Car parked in front of fire hydrant. Merged into an earlier report."
                .to_string(),
            category: "Traffic".to_string(),
            status: IssueStatus::Rejected,
            location: GeoLocation {
                latitude: 19.120,
                longitude: 72.910,
                address: "Civil Lines".to_string(),
            },
            image: None,
            reported_by: "user5".to_string(),
            reported_at: rfc3339_ago(time::Duration::days(5)),
            assigned_to: Some("WORKER_01".to_string()),
            priority: Priority::Medium,
            department: "Traffic Police".to_string(),
            upvotes: 8,
            comments: Vec::new(),
        },
    ]
}
