use super::{open_store, require_user};
use crate::config::ConfigPaths;
use civica_core::store::IssueStore;
use civica_core::types::{Comment, Issue, IssueStatus};
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum IssuesCommand {
    /// List the issue collection, most recent first
    List {
        /// Only show issues with this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one issue in full, comments included
    Show { id: String },
    /// Upvote an issue
    Upvote { id: String },
    /// Append a comment
    Comment {
        id: String,
        #[arg(long)]
        text: String,
    },
    /// Authority action: assign an issue to a worker
    Assign {
        id: String,
        #[arg(long)]
        worker: String,
    },
    /// Worker action: move an issue to a new status
    Status {
        id: String,
        #[arg(long)]
        to: String,
    },
}

pub fn run(command: &IssuesCommand, paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(paths)?;
    match command {
        IssuesCommand::List { status } => {
            let filter = status.as_deref().map(parse_status).transpose()?;
            list(&store, filter);
            Ok(())
        }
        IssuesCommand::Show { id } => {
            match store.get(id) {
                Some(issue) => show(issue),
                None => println!("issue not found: {id}"),
            }
            Ok(())
        }
        IssuesCommand::Upvote { id } => {
            if store.upvote(id)? {
                let issue = store.get(id).ok_or("issue vanished after upvote")?;
                println!("{} upvotes on {}", issue.upvotes, issue.title);
            } else {
                println!("issue not found: {id}");
            }
            Ok(())
        }
        IssuesCommand::Comment { id, text } => {
            let user = require_user(&store)?;
            if store.add_comment(id, Comment::new(&user, text.clone()))? {
                println!("comment added to {id}");
            } else {
                println!("issue not found: {id}");
            }
            Ok(())
        }
        IssuesCommand::Assign { id, worker } => {
            if store.assign(id, worker)? {
                println!("{id} assigned to {worker}");
            } else {
                println!("issue not found: {id}");
            }
            Ok(())
        }
        IssuesCommand::Status { id, to } => {
            let status = parse_status(to)?;
            if store.set_status(id, status)? {
                println!("{id} moved to {status}");
            } else {
                println!("issue not found: {id}");
            }
            Ok(())
        }
    }
}

fn list(store: &IssueStore, filter: Option<IssueStatus>) {
    let mut shown = 0;
    for issue in store.issues() {
        if let Some(status) = filter {
            if issue.status != status {
                continue;
            }
        }
        println!(
            "{:<12} {:<11} {:<6} {:>4}\u{2191}  {}",
            short_id(&issue.id),
            issue.status,
            issue.priority,
            issue.upvotes,
            issue.title
        );
        shown += 1;
    }
    if shown == 0 {
        println!("no issues");
    }
}

fn show(issue: &Issue) {
    println!("{} ({})", issue.title, issue.id);
    println!(
        "status {} \u{2022} {} \u{2022} {} \u{2022} {}",
        issue.status, issue.category, issue.priority, issue.department
    );
    println!(
        "at {} ({:.3}, {:.3})",
        issue.location.address, issue.location.latitude, issue.location.longitude
    );
    println!("reported by {} at {}", issue.reported_by, issue.reported_at);
    if let Some(worker) = &issue.assigned_to {
        println!("assigned to {worker}");
    }
    println!("{} upvotes", issue.upvotes);
    if !issue.description.is_empty() {
        println!("\n{}", issue.description);
    }
    if !issue.comments.is_empty() {
        println!();
        for comment in &issue.comments {
            println!("[{}] {}: {}", comment.timestamp, comment.user_name, comment.text);
        }
    }
}

fn short_id(id: &str) -> String {
    if id.len() <= 12 {
        id.to_string()
    } else {
        id[..12].to_string()
    }
}

pub(crate) fn parse_status(value: &str) -> Result<IssueStatus, String> {
    match value.to_ascii_uppercase().replace('-', "_").as_str() {
        "PENDING" => Ok(IssueStatus::Pending),
        "ASSIGNED" => Ok(IssueStatus::Assigned),
        "IN_PROGRESS" => Ok(IssueStatus::InProgress),
        "RESOLVED" => Ok(IssueStatus::Resolved),
        "REJECTED" => Ok(IssueStatus::Rejected),
        other => Err(format!("unknown status: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_status, short_id};
    use civica_core::types::IssueStatus;

    #[test]
    fn parse_status_accepts_wire_and_cli_spellings() {
        assert_eq!(parse_status("pending").unwrap(), IssueStatus::Pending);
        assert_eq!(parse_status("IN_PROGRESS").unwrap(), IssueStatus::InProgress);
        assert_eq!(parse_status("in-progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(parse_status("Resolved").unwrap(), IssueStatus::Resolved);
        assert!(parse_status("done").is_err());
    }

    #[test]
    fn short_id_truncates_uuids_only() {
        assert_eq!(short_id("w1"), "w1");
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
    }
}
