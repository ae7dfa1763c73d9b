use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::PathBuf;

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/flight/`
/// - Linux: `~/.config/flight/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/flight/`
///
/// Falls back to `~/.flight/` if platform dir is unavailable.
pub(crate) fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("flight"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".flight")
        })
}

/// Default location of the port announce file the host-side shim reads.
pub fn default_port_file() -> PathBuf {
    config_dir().join("ui-port")
}

/// Load a JSON config file, returning Default if missing or corrupt.
/// Logs when the file exists but cannot be read or parsed, so corrupt
/// files are visible in logs instead of silently resetting state.
pub(crate) fn load_json_config<T: DeserializeOwned + Default>(filename: &str) -> T {
    let path = config_dir().join(filename);
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read config");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "corrupt config, using defaults");
            T::default()
        }
    }
}

/// Save a JSON config file atomically (temp file + rename).
/// Sets 0600 permissions on Unix.
pub(crate) fn save_json_config<T: Serialize>(filename: &str, config: &T) -> Result<(), String> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let target = dir.join(filename);
    let temp = dir.join(format!("{}.tmp.{}", filename, std::process::id()));

    std::fs::write(&temp, &json)
        .map_err(|e| format!("Failed to write temp config: {e}"))?;

    // Set restrictive permissions before rename (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp, perms)
            .map_err(|e| format!("Failed to set config permissions: {e}"))?;
    }

    // Atomic rename: either the old file or new file exists, never partial
    std::fs::rename(&temp, &target)
        .map_err(|e| {
            // Clean up temp file on rename failure
            let _ = std::fs::remove_file(&temp);
            format!("Failed to commit config: {e}")
        })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Persisted settings for the dev binary. Flags override these per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// First port tried by the probe scan.
    #[serde(default = "default_preferred_port")]
    pub preferred_port: u16,
    /// Total ports probed before giving up.
    #[serde(default = "default_max_port_attempts")]
    pub max_port_attempts: u32,
    /// Content root override. None means `dist/` next to the executable.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
}

fn default_preferred_port() -> u16 {
    crate::server::DEFAULT_PREFERRED_PORT
}

fn default_max_port_attempts() -> u32 {
    crate::server::DEFAULT_MAX_PORT_ATTEMPTS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preferred_port: default_preferred_port(),
            max_port_attempts: default_max_port_attempts(),
            root_dir: None,
        }
    }
}

const APP_CONFIG_FILE: &str = "config.json";

pub fn load_app_config() -> AppConfig {
    load_json_config(APP_CONFIG_FILE)
}

/// Write the default config on first run so the file is discoverable.
/// An existing file is never touched.
pub fn ensure_app_config_exists() -> Result<(), String> {
    let path = config_dir().join(APP_CONFIG_FILE);
    if path.exists() {
        return Ok(());
    }
    save_json_config(APP_CONFIG_FILE, &AppConfig::default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
