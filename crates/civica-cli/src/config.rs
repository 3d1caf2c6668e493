use civica_core::capture::FacingMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_VERSION: u32 = 1;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("home directory not found; set HOME")]
    HomeMissing,
    #[error("config io error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn from_home() -> Result<Self, ConfigError> {
        if let Ok(base) = std::env::var("CIVICA_HOME") {
            return Ok(Self::from_base(PathBuf::from(base)));
        }
        let home = std::env::var("HOME").map_err(|_| ConfigError::HomeMissing)?;
        Ok(Self::from_base(PathBuf::from(home).join(".civica")))
    }

    pub fn from_base(base_dir: PathBuf) -> Self {
        let config_path = base_dir.join("config.toml");
        let state_dir = base_dir.join("state");
        Self {
            base_dir,
            config_path,
            state_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub camera: CameraConfig,
    pub audio: AudioConfig,
    pub location: LocationConfig,
    pub model: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            camera: CameraConfig::default(),
            audio: AudioConfig::default(),
            location: LocationConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Default camera to open: front or back.
    pub facing: String,
    pub torch: bool,
    /// Path the frame backend serves stills from; empty means no camera is
    /// present and report falls back to the file picker.
    pub frame_source: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing: "back".to_string(),
            torch: false,
            frame_source: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioConfig {
    /// Path the microphone backend replays; empty means no microphone.
    pub note_source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Disabled models a device without geolocation capability.
    pub enabled: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub timeout_ms: u64,
    /// Simulated reverse-geocode latency before the address arrives.
    pub geocode_delay_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: 19.076,
            longitude: 72.877,
            timeout_ms: 10_000,
            geocode_delay_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub classify: ProviderConfig,
    pub chat: ProviderConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classify: ProviderConfig {
                provider: "gemini".to_string(),
                model: "gemini-3-flash-preview".to_string(),
                api_key: String::new(),
            },
            chat: ProviderConfig {
                provider: "gemini".to_string(),
                model: "gemini-3-pro-preview".to_string(),
                api_key: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

impl Config {
    pub fn load_or_create(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        if paths.config_path.exists() {
            let config = Self::load(paths)?;
            return Ok(config);
        }

        let config = Self::default();
        Self::write(paths, &config)?;
        Ok(config)
    }

    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        let content = fs::read_to_string(&paths.config_path)?;
        let raw: toml::Value = toml::from_str(&content)?;
        let file_version = raw
            .get("version")
            .and_then(|value| value.as_integer())
            .unwrap_or(0) as u32;

        let mut config: Config = toml::from_str(&content)?;
        let mut migrated = false;

        if file_version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
            migrated = true;
        } else if file_version > CONFIG_VERSION {
            eprintln!(
                "config version {file_version} is newer than supported {CONFIG_VERSION}; proceeding"
            );
        }

        warn_if_loose_permissions(&paths.config_path)?;

        if migrated {
            Self::write(paths, &config)?;
        }

        Ok(config)
    }

    pub fn write(paths: &ConfigPaths, config: &Config) -> Result<(), ConfigError> {
        ensure_dirs(paths)?;
        let content = toml::to_string_pretty(config)?;
        write_atomic(&paths.config_path, content.as_bytes())?;
        Ok(())
    }

    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        redact_provider(&mut redacted.model.classify);
        redact_provider(&mut redacted.model.chat);
        redacted
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera
            .facing
            .parse::<FacingMode>()
            .map_err(|err| ConfigError::Validation(format!("camera.facing: {err}")))?;
        if self.location.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "location.timeout_ms must be greater than 0".into(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(ConfigError::Validation(
                "location.latitude must be between -90 and 90".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(ConfigError::Validation(
                "location.longitude must be between -180 and 180".into(),
            ));
        }
        validate_provider("model.classify", &self.model.classify)?;
        validate_provider("model.chat", &self.model.chat)?;
        Ok(())
    }
}

fn ensure_dirs(paths: &ConfigPaths) -> Result<(), ConfigError> {
    fs::create_dir_all(&paths.base_dir)?;
    fs::create_dir_all(&paths.state_dir)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("config path missing parent directory"))?;
    let tmp_path = parent.join("config.toml.tmp");
    fs::write(&tmp_path, contents)?;
    set_strict_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn set_strict_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perm)?;
    }
    Ok(())
}

fn warn_if_loose_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            eprintln!(
                "config file {} is group/world readable; set permissions to 0600",
                path.display()
            );
        }
    }
    Ok(())
}

fn validate_provider(label: &str, profile: &ProviderConfig) -> Result<(), ConfigError> {
    match profile.provider.as_str() {
        "gemini" => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "{label}.provider must be gemini (got {other})"
            )));
        }
    }
    if profile.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{label}.model must not be empty"
        )));
    }
    Ok(())
}

fn redact_provider(profile: &mut ProviderConfig) {
    if !profile.api_key.trim().is_empty() {
        profile.api_key = "<redacted>".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_VERSION, Config, ConfigPaths};
    use std::fs;

    #[test]
    fn load_or_create_writes_defaults_and_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("civica");
        let paths = ConfigPaths::from_base(base);
        let config = Config::load_or_create(&paths).unwrap();

        assert!(paths.config_path.exists());
        assert!(paths.state_dir.is_dir());
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.camera.facing, "back");
        assert_eq!(config.model.classify.model, "gemini-3-flash-preview");
        assert_eq!(config.model.chat.model, "gemini-3-pro-preview");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&paths.config_path)
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn load_migrates_old_versions_and_fills_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::from_base(temp.path().join("civica"));
        fs::create_dir_all(&paths.base_dir).unwrap();
        let content = r#"version = 0

[camera]
facing = "front"
"#;
        fs::write(&paths.config_path, content).unwrap();

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.camera.facing, "front");
        assert_eq!(config.model.classify.provider, "gemini");

        let updated = fs::read_to_string(&paths.config_path).unwrap();
        assert!(updated.contains(&format!("version = {CONFIG_VERSION}")));
        assert!(updated.contains("[model.chat]"));
    }

    #[test]
    fn redacted_hides_api_keys() {
        let mut config = Config::default();
        config.model.classify.api_key = "secret".to_string();
        config.model.chat.api_key = "secret2".to_string();
        let redacted = config.redacted();
        assert_eq!(redacted.model.classify.api_key, "<redacted>");
        assert_eq!(redacted.model.chat.api_key, "<redacted>");
        // The live config keeps its keys.
        assert_eq!(config.model.classify.api_key, "secret");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.camera.facing = "sideways".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.location.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.location.latitude = 120.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.chat.provider = "openai".to_string();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
