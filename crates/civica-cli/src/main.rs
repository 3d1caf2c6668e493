mod commands;
mod config;
mod config_cmd;
mod init;

use clap::{Parser, Subcommand};
use config::{Config, ConfigPaths};

#[derive(Parser)]
#[command(name = "civica", version, about = "civic issue reporting client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap config, state directory, and the demo issue store
    Init(init::InitArgs),
    /// Inspect or change configuration
    Config(config_cmd::ConfigArgs),
    /// Persist the current user
    Login(commands::login::LoginArgs),
    /// Clear the current user
    Logout,
    /// Capture, classify, and submit a new issue
    Report(commands::report::ReportArgs),
    /// Work with the issue collection
    #[command(subcommand)]
    Issues(commands::issues::IssuesCommand),
    /// Scan an issue for duplicates and optionally merge
    Duplicates(commands::duplicates::DuplicatesArgs),
    /// Talk to the support assistant
    Chat(commands::chat::ChatArgs),
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let paths = match ConfigPaths::from_home() {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("config paths error: {err}");
            std::process::exit(1);
        }
    };

    let mut config = match Config::load_or_create(&paths) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config load failed: {err}");
            std::process::exit(1);
        }
    };
    apply_env_overrides(&mut config);

    let result = match &cli.command {
        Command::Init(args) => init::run(args, &paths),
        Command::Config(args) => config_cmd::run(args, &paths).map_err(Into::into),
        Command::Login(args) => commands::login::run(args, &paths),
        Command::Logout => commands::login::logout(&paths),
        Command::Report(args) => commands::report::run(args, &config, &paths),
        Command::Issues(command) => commands::issues::run(command, &paths),
        Command::Duplicates(args) => commands::duplicates::run(args, &config, &paths),
        Command::Chat(args) => commands::chat::run(args, &config),
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(value) = env_override("CIVICA_CLASSIFY_MODEL") {
        config.model.classify.model = value;
    }
    if let Some(value) = env_override("CIVICA_CHAT_MODEL") {
        config.model.chat.model = value;
    }
    if let Some(value) = env_override("CIVICA_CLASSIFY_API_KEY") {
        config.model.classify.api_key = value;
    }
    if let Some(value) = env_override("CIVICA_CHAT_API_KEY") {
        config.model.chat.api_key = value;
    }
    if config.model.classify.api_key.trim().is_empty() {
        if let Some(value) = env_override("GEMINI_API_KEY") {
            config.model.classify.api_key = value;
        }
    }
    if config.model.chat.api_key.trim().is_empty() {
        if let Some(value) = env_override("GEMINI_API_KEY") {
            config.model.chat.api_key = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::apply_env_overrides;
    use crate::config::Config;

    // Environment-variable assertions share process state, so they live in
    // one test.
    #[test]
    fn env_overrides_fill_empty_keys_only() {
        unsafe {
            std::env::set_var("GEMINI_API_KEY", "shared-key");
            std::env::remove_var("CIVICA_CLASSIFY_API_KEY");
            std::env::remove_var("CIVICA_CHAT_API_KEY");
            std::env::remove_var("CIVICA_CLASSIFY_MODEL");
            std::env::remove_var("CIVICA_CHAT_MODEL");
        }
        let mut config = Config::default();
        config.model.chat.api_key = "explicit".to_string();
        apply_env_overrides(&mut config);
        assert_eq!(config.model.classify.api_key, "shared-key");
        assert_eq!(config.model.chat.api_key, "explicit");

        unsafe {
            std::env::set_var("CIVICA_CLASSIFY_MODEL", "gemini-next");
        }
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert_eq!(config.model.classify.model, "gemini-next");
        assert_eq!(config.model.chat.model, "gemini-3-pro-preview");

        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
            std::env::remove_var("CIVICA_CLASSIFY_MODEL");
        }
    }
}
