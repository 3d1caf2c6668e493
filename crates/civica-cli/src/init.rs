use crate::config::{Config, ConfigPaths};
use civica_core::store::{IssueStore, StorePaths};
use clap::Args;
use std::fs;
use std::io;

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Write GEMINI_API_KEY to .env (defaults to GEMINI_API_KEY from current env)
    #[arg(long)]
    pub gemini_key: Option<String>,

    /// Re-seed the issue store even if state already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_create(paths)?;
    config.validate()?;
    println!("config at {}", paths.config_path.display());

    let store_paths = StorePaths::from_base(paths.state_dir.clone());
    if args.force && store_paths.issues_path.exists() {
        fs::remove_file(&store_paths.issues_path)?;
    }
    let store = IssueStore::open(store_paths)?;
    println!(
        "issue store at {} ({} issues)",
        paths.state_dir.display(),
        store.issues().len()
    );

    write_env_file(args)?;
    Ok(())
}

fn write_env_file(args: &InitArgs) -> Result<(), io::Error> {
    let env_key = std::env::var("GEMINI_API_KEY").ok();
    let gemini_key = match &args.gemini_key {
        Some(key) => Some(key.as_str()),
        None => env_key.as_deref(),
    };
    let Some(key) = gemini_key else {
        return Ok(());
    };

    let mut lines = match fs::read_to_string(".env") {
        Ok(contents) => contents.lines().map(|l| l.to_string()).collect(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err),
    };

    upsert_env_var(&mut lines, "GEMINI_API_KEY", key);

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(".env", content)?;
    println!("wrote GEMINI_API_KEY to .env");
    Ok(())
}

fn upsert_env_var(lines: &mut Vec<String>, key: &str, value: &str) {
    let entry = format!("{key}={value}");
    for line in lines.iter_mut() {
        if line.starts_with(&format!("{key}=")) {
            *line = entry;
            return;
        }
    }
    lines.push(entry);
}
