use super::{build_model, confirm, open_store};
use crate::config::{Config, ConfigPaths};
use civica_core::duplicate::scan_for_duplicate;
use civica_core::http::default_agent;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct DuplicatesArgs {
    /// Issue to check against the rest of the open collection
    pub id: String,

    /// Merge into the found original without the confirmation prompt
    #[arg(long)]
    pub merge: bool,
}

pub fn run(
    args: &DuplicatesArgs,
    config: &Config,
    paths: &ConfigPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(paths)?;
    let model = build_model(&config.model.classify);
    let agent = default_agent();

    println!("comparing against open issues...");
    let found = scan_for_duplicate(model.as_ref(), &agent, store.issues(), &args.id)?;

    let Some(found) = found else {
        println!("no duplicates found");
        return Ok(());
    };

    let original_title = store
        .get(&found.issue_id)
        .map(|issue| issue.title.clone())
        .unwrap_or_default();
    println!("duplicate found: {} ({})", original_title, found.issue_id);
    println!("reason: {}", found.reason);

    if !args.merge && !confirm("merge into the original?")? {
        println!("left unmerged");
        return Ok(());
    }

    if store.merge_duplicate(&args.id, &found.issue_id)? {
        println!(
            "merged: {} rejected, one upvote added to {}",
            args.id, found.issue_id
        );
        println!("see issue {}", found.issue_id);
    } else {
        println!("merge skipped; records changed underneath");
    }
    Ok(())
}
