use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use termonaut_core::{is_style_supported, AvatarSize, DEFAULT_STYLE};

use crate::avatar::remote::DEFAULT_BASE_URL;
use crate::avatar::DEFAULT_MAX_RASTER_BYTES;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct TermonautConfig {
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// Avatar generation and cache settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AvatarConfig {
    /// Cache root; a leading `~/` is expanded to the home directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Hours before a cached avatar expires
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// HTTP timeout for the avatar service, in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_style")]
    pub default_style: String,

    /// mini, small, medium or large
    #[serde(default = "default_size")]
    pub default_size: String,

    /// Budget used by `termonaut avatar evict` when no limit is given
    #[serde(default = "default_max_cache_size_mb", skip_serializing_if = "Option::is_none")]
    pub max_cache_size_mb: Option<u64>,

    /// Repeat the expiry sweep this often instead of once at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_minutes: Option<u64>,

    #[serde(default = "default_max_raster_bytes")]
    pub max_raster_bytes: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("~/.termonaut/avatars")
}

fn default_cache_ttl_hours() -> u64 {
    7 * 24
}

fn default_api_timeout_secs() -> u64 {
    10
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

fn default_size() -> String {
    "small".to_string()
}

fn default_max_cache_size_mb() -> Option<u64> {
    Some(50)
}

fn default_max_raster_bytes() -> usize {
    DEFAULT_MAX_RASTER_BYTES
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_ttl_hours: default_cache_ttl_hours(),
            api_timeout_secs: default_api_timeout_secs(),
            api_base_url: default_api_base_url(),
            default_style: default_style(),
            default_size: default_size(),
            max_cache_size_mb: default_max_cache_size_mb(),
            sweep_interval_minutes: None,
            max_raster_bytes: default_max_raster_bytes(),
        }
    }
}

impl AvatarConfig {
    /// Cache directory with `~` expanded
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_home(&self.cache_dir)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn default_size(&self) -> Result<AvatarSize, ConfigError> {
        self.default_size
            .parse()
            .map_err(|e: termonaut_core::ParseSizeError| ConfigError::InvalidValue {
                field: "avatar.default_size".to_string(),
                value: self.default_size.clone(),
                reason: e.to_string(),
            })
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn max_cache_bytes(&self) -> Option<u64> {
        self.max_cache_size_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

/// One year
const MAX_SWEEP_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value:?} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),
}

impl TermonautConfig {
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TermonautConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the config as TOML, creating the parent directory if needed
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// File that `avatar config` writes to: `explicit`, else the first
    /// existing config location, else the user config path.
    pub fn writable_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let current_path = Self::get_current_config_path();
        if current_path.exists() {
            return Some(current_path);
        }
        Self::get_user_config_path()
    }

    /// Store a new default style and/or size in the file at `path`.
    ///
    /// Only the file's own contents are rewritten; environment overrides are
    /// not baked in. The updated file config is returned.
    pub fn persist_defaults(
        path: &Path,
        style: Option<&str>,
        size: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        if let Some(style) = style {
            config.avatar.default_style = style.to_string();
        }
        if let Some(size) = size {
            config.avatar.default_size = size.to_string();
        }
        config.validate()?;

        config.save_to_file(path)?;
        tracing::info!("Saved avatar defaults to {}", path.display());
        Ok(config)
    }

    /// Get the user config file path (~/.config/termonaut/config.toml)
    pub fn get_user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/termonaut/config.toml"))
    }

    /// Get the current directory config file path (./termonaut.toml)
    pub fn get_current_config_path() -> PathBuf {
        PathBuf::from("./termonaut.toml")
    }

    /// Load the first config found, in order of precedence:
    /// 1. `explicit` (must exist when given)
    /// 2. Current directory (./termonaut.toml)
    /// 3. User config (~/.config/termonaut/config.toml)
    ///
    /// Defaults apply when none exists. `TERMONAUT_*` environment
    /// variables override the result.
    pub fn load_with_precedence(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
                }
                Self::load_from_file(path)?
            }
            None => Self::load_default_locations()?,
        };

        let env_vars: HashMap<String, String> = std::env::vars().collect();
        config.apply_env_vars(&env_vars)?;
        config.validate()?;

        Ok(config)
    }

    fn load_default_locations() -> Result<Self, ConfigError> {
        let current_path = Self::get_current_config_path();
        if current_path.exists() {
            tracing::debug!("Loading config from: {}", current_path.display());
            return Self::load_from_file(&current_path);
        }

        if let Some(user_path) = Self::get_user_config_path() {
            if user_path.exists() {
                tracing::debug!("Loading config from: {}", user_path.display());
                return Self::load_from_file(&user_path);
            }
        }

        Ok(Self::default())
    }

    pub fn apply_env_vars(&mut self, env_vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        let parse_u64 = |field: &str, value: &str| {
            value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })
        };

        for (key, value) in env_vars {
            let Some(config_key) = key.strip_prefix("TERMONAUT_AVATAR_") else {
                continue;
            };

            match config_key {
                "CACHE_DIR" => self.avatar.cache_dir = PathBuf::from(value),
                "CACHE_TTL_HOURS" => {
                    self.avatar.cache_ttl_hours = parse_u64("avatar.cache_ttl_hours", value)?;
                }
                "API_TIMEOUT_SECS" => {
                    self.avatar.api_timeout_secs = parse_u64("avatar.api_timeout_secs", value)?;
                }
                "API_BASE_URL" => self.avatar.api_base_url = value.clone(),
                "DEFAULT_STYLE" => self.avatar.default_style = value.clone(),
                "DEFAULT_SIZE" => self.avatar.default_size = value.clone(),
                _ => tracing::debug!("Ignoring unknown config variable {}", key),
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let avatar = &self.avatar;
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if avatar.cache_ttl_hours == 0 {
            return Err(invalid("avatar.cache_ttl_hours", "0".into(), "must be positive"));
        }
        if avatar.api_timeout_secs == 0 {
            return Err(invalid("avatar.api_timeout_secs", "0".into(), "must be positive"));
        }
        if avatar.api_base_url.trim().is_empty() {
            return Err(invalid("avatar.api_base_url", String::new(), "must not be empty"));
        }
        if !is_style_supported(&avatar.default_style) {
            return Err(invalid(
                "avatar.default_style",
                avatar.default_style.clone(),
                "unsupported style",
            ));
        }
        if let Some(minutes) = avatar.sweep_interval_minutes {
            if minutes > MAX_SWEEP_INTERVAL_MINUTES {
                return Err(invalid(
                    "avatar.sweep_interval_minutes",
                    minutes.to_string(),
                    "must be at most one year",
                ));
            }
        }
        avatar.default_size()?;

        Ok(())
    }
}
