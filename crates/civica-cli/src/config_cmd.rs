use crate::config::{Config, ConfigError, ConfigPaths};
use clap::Args;
use std::process::Command;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Print config with secrets redacted
    #[arg(long)]
    pub print: bool,

    /// Edit config in $EDITOR
    #[arg(long)]
    pub edit: bool,

    /// Set a config value (dotted key=value)
    #[arg(long, value_name = "key=value")]
    pub set: Vec<String>,
}

pub fn run(args: &ConfigArgs, paths: &ConfigPaths) -> Result<(), ConfigError> {
    if args.edit && (!args.set.is_empty() || args.print) {
        return Err(ConfigError::Validation(
            "--edit cannot be combined with --set or --print".into(),
        ));
    }

    let mut config = Config::load_or_create(paths)?;

    if args.edit {
        edit_config(paths)?;
        config = Config::load(paths)?;
        config.validate()?;
        return Ok(());
    }

    if !args.set.is_empty() {
        for assignment in &args.set {
            apply_set(&mut config, assignment)?;
        }
        config.validate()?;
        Config::write(paths, &config)?;
    }

    if args.print || args.set.is_empty() {
        let redacted = config.redacted();
        let output = toml::to_string_pretty(&redacted)?;
        println!("{output}");
    }

    Ok(())
}

fn edit_config(paths: &ConfigPaths) -> Result<(), ConfigError> {
    let editor = std::env::var("EDITOR")
        .map_err(|_| ConfigError::Validation("$EDITOR not set; use --set or set EDITOR".into()))?;
    let parts = split_editor_command(&editor)?;
    let (program, args) = parts
        .split_first()
        .ok_or_else(|| ConfigError::Validation("$EDITOR is empty".into()))?;
    let status = Command::new(program)
        .args(args)
        .arg(&paths.config_path)
        .status()
        .map_err(ConfigError::Io)?;
    if !status.success() {
        return Err(ConfigError::Validation(
            "editor exited with a non-zero status".into(),
        ));
    }
    Ok(())
}

fn split_editor_command(editor: &str) -> Result<Vec<String>, ConfigError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = editor.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
            }
            '"' if !in_single => {
                in_double = !in_double;
            }
            '\\' if !in_single => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ch if ch.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() {
                    parts.push(current.clone());
                    current.clear();
                }
            }
            _ => current.push(ch),
        }
    }

    if in_single || in_double {
        return Err(ConfigError::Validation(
            "$EDITOR has unmatched quotes".into(),
        ));
    }
    if !current.is_empty() {
        parts.push(current);
    }

    if parts.is_empty() {
        return Err(ConfigError::Validation("$EDITOR is empty".into()));
    }

    Ok(parts)
}

fn apply_set(config: &mut Config, assignment: &str) -> Result<(), ConfigError> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| ConfigError::Validation("expected key=value for --set".into()))?;
    let value = value.trim();
    match key {
        "camera.facing" => {
            config.camera.facing = value.to_string();
        }
        "camera.torch" => {
            config.camera.torch = parse_bool(value, key)?;
        }
        "camera.frame_source" => {
            config.camera.frame_source = value.to_string();
        }
        "audio.note_source" => {
            config.audio.note_source = value.to_string();
        }
        "location.enabled" => {
            config.location.enabled = parse_bool(value, key)?;
        }
        "location.latitude" => {
            config.location.latitude = parse_f64(value, key)?;
        }
        "location.longitude" => {
            config.location.longitude = parse_f64(value, key)?;
        }
        "location.timeout_ms" => {
            config.location.timeout_ms = parse_u64(value, key)?;
        }
        "location.geocode_delay_ms" => {
            config.location.geocode_delay_ms = parse_u64(value, key)?;
        }
        "model.classify.provider" => {
            config.model.classify.provider = value.to_string();
        }
        "model.classify.model" => {
            config.model.classify.model = value.to_string();
        }
        "model.classify.api_key" => {
            config.model.classify.api_key = value.to_string();
        }
        "model.chat.provider" => {
            config.model.chat.provider = value.to_string();
        }
        "model.chat.model" => {
            config.model.chat.model = value.to_string();
        }
        "model.chat.api_key" => {
            config.model.chat.api_key = value.to_string();
        }
        "model.api_key" => {
            config.model.classify.api_key = value.to_string();
            config.model.chat.api_key = value.to_string();
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "unknown config key: {key}"
            )));
        }
    }
    Ok(())
}

fn parse_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "{key} expects true or false"
        ))),
    }
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects an unsigned integer")))
}

fn parse_f64(value: &str, key: &str) -> Result<f64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key} expects a number")))
}

#[cfg(test)]
mod tests {
    use super::{apply_set, split_editor_command};
    use crate::config::Config;

    #[test]
    fn split_editor_command_handles_args() {
        let parts = split_editor_command("code --wait").unwrap();
        assert_eq!(parts, vec!["code", "--wait"]);
    }

    #[test]
    fn split_editor_command_handles_quotes() {
        let parts = split_editor_command("\"/Applications/VS Code\" --wait").unwrap();
        assert_eq!(parts, vec!["/Applications/VS Code", "--wait"]);
    }

    #[test]
    fn split_editor_command_rejects_unmatched_quotes() {
        let err = split_editor_command("\"unterminated").unwrap_err();
        assert!(err.to_string().contains("unmatched quotes"));
    }

    #[test]
    fn apply_set_updates_dotted_keys() {
        let mut config = Config::default();
        apply_set(&mut config, "camera.facing=front").unwrap();
        apply_set(&mut config, "camera.torch=true").unwrap();
        apply_set(&mut config, "location.enabled=false").unwrap();
        apply_set(&mut config, "location.latitude=18.52").unwrap();
        apply_set(&mut config, "model.classify.model=gemini-3-flash-preview").unwrap();

        assert_eq!(config.camera.facing, "front");
        assert!(config.camera.torch);
        assert!(!config.location.enabled);
        assert_eq!(config.location.latitude, 18.52);
    }

    #[test]
    fn apply_set_shared_api_key_covers_both_profiles() {
        let mut config = Config::default();
        apply_set(&mut config, "model.api_key=abc123").unwrap();
        assert_eq!(config.model.classify.api_key, "abc123");
        assert_eq!(config.model.chat.api_key, "abc123");
    }

    #[test]
    fn apply_set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(apply_set(&mut config, "no.such.key=1").is_err());
        assert!(apply_set(&mut config, "camera.torch=maybe").is_err());
        assert!(apply_set(&mut config, "location.timeout_ms=soon").is_err());
        assert!(apply_set(&mut config, "just-a-key").is_err());
    }
}
