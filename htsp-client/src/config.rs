//! Configuration loading for the HTSP client.
//!
//! Settings come from the `[Server]` section of an INI file:
//!
//! ```ini
//! [Server]
//! Address = 192.168.1.10:9982
//! ClientName = living-room
//! Username = viewer
//! Password = secret
//! ; milliseconds
//! ConnectTimeout = 5000
//! CallTimeout = 30000
//! MaxFrameSize = 16777216
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info};

use crate::auth::Credentials;
use crate::client::ConnectionConfig;

/// INI file searched for in the current directory.
pub const CONFIG_FILE_NAME: &str = "htsp-client.ini";

/// Load configuration.
///
/// Searches for configuration in the following order:
/// 1. `htsp-client.ini` in the current directory
/// 2. Environment variables (`HTSP_*`)
/// 3. Default values
pub fn load_config() -> ConnectionConfig {
    if let Some(ini_path) = find_ini_file() {
        info!("Loading configuration from {:?}", ini_path);
        if let Some(config) = load_from_ini(&ini_path) {
            return config;
        }
    }

    load_from_env()
}

/// Load configuration from an explicit INI path, falling back like
/// [`load_config`] when the file is unreadable or has no `[Server]` section.
pub fn load_config_from(path: &Path) -> ConnectionConfig {
    load_from_ini(path).unwrap_or_else(load_from_env)
}

fn find_ini_file() -> Option<PathBuf> {
    let ini_path = std::env::current_dir().ok()?.join(CONFIG_FILE_NAME);
    ini_path.exists().then_some(ini_path)
}

/// Simple INI section parser.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current_section = String::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current_section = name.trim().to_string();
            sections.entry(current_section.clone()).or_default();
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current_section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

fn millis(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// A password without a username is ignored.
fn credentials(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    username.map(|user| Credentials::new(user, password.unwrap_or_default()))
}

fn load_from_ini(path: &Path) -> Option<ConnectionConfig> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to read INI file {:?}: {}", path, e);
            return None;
        }
    };

    let sections = parse_ini(&content);
    let section = sections.get("Server")?;
    let defaults = ConnectionConfig::default();

    let config = ConnectionConfig {
        server_addr: section
            .get("Address")
            .or_else(|| section.get("Server"))
            .cloned()
            .unwrap_or(defaults.server_addr),
        client_name: section
            .get("ClientName")
            .cloned()
            .unwrap_or(defaults.client_name),
        credentials: credentials(
            non_empty(section.get("Username")),
            section.get("Password").cloned(),
        ),
        connect_timeout: millis(
            section.get("ConnectTimeout").map(String::as_str),
            defaults.connect_timeout,
        ),
        call_timeout: millis(
            section.get("CallTimeout").map(String::as_str),
            defaults.call_timeout,
        ),
        max_frame_size: section
            .get("MaxFrameSize")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_frame_size),
    };

    debug!(
        "Configuration loaded: server={}, client={}",
        config.server_addr, config.client_name
    );
    Some(config)
}

fn load_from_env() -> ConnectionConfig {
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConnectionConfig {
    let defaults = ConnectionConfig::default();

    let config = ConnectionConfig {
        server_addr: lookup("HTSP_SERVER").unwrap_or(defaults.server_addr),
        client_name: lookup("HTSP_CLIENT_NAME").unwrap_or(defaults.client_name),
        credentials: credentials(
            lookup("HTSP_USERNAME").filter(|s| !s.is_empty()),
            lookup("HTSP_PASSWORD"),
        ),
        connect_timeout: millis(
            lookup("HTSP_CONNECT_TIMEOUT").as_deref(),
            defaults.connect_timeout,
        ),
        call_timeout: millis(lookup("HTSP_CALL_TIMEOUT").as_deref(), defaults.call_timeout),
        max_frame_size: lookup("HTSP_MAX_FRAME_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_frame_size),
    };

    debug!(
        "Using environment/default config: server={}, client={}",
        config.server_addr, config.client_name
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_env() {
        let config = load_from_env();
        assert!(!config.server_addr.is_empty());
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = from_lookup(|key| match key {
            "HTSP_SERVER" => Some("tvh.local:9982".to_string()),
            "HTSP_USERNAME" => Some("viewer".to_string()),
            "HTSP_PASSWORD" => Some(String::new()),
            "HTSP_CALL_TIMEOUT" => Some("2500".to_string()),
            "HTSP_MAX_FRAME_SIZE" => Some("not a number".to_string()),
            _ => None,
        });

        assert_eq!(config.server_addr, "tvh.local:9982");
        assert_eq!(config.credentials, Some(Credentials::new("viewer", "")));
        assert_eq!(config.call_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_frame_size, ConnectionConfig::default().max_frame_size);
        assert_eq!(config.client_name, "htsp-client");
    }

    #[test]
    fn test_password_without_username_is_ignored() {
        let config = from_lookup(|key| match key {
            "HTSP_PASSWORD" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.credentials, None);
    }

    #[test]
    fn test_parse_ini() {
        let content = r#"
; Comment
[Server]
Address = 192.168.1.1:9982
ClientName = bedroom

[Other]
Key = Value
"#;
        let sections = parse_ini(content);

        assert!(sections.contains_key("Server"));
        let server = sections.get("Server").unwrap();
        assert_eq!(server.get("Address").unwrap(), "192.168.1.1:9982");
        assert_eq!(server.get("ClientName").unwrap(), "bedroom");
        assert_eq!(sections["Other"]["Key"], "Value");
    }

    #[test]
    fn test_load_from_ini_file() {
        let path = std::env::temp_dir().join(format!("htsp-config-{}.ini", std::process::id()));
        let content = [
            "[Server]",
            "Address = 10.0.0.2:9982",
            "Username = admin",
            "Password = pw",
            "ConnectTimeout = 1500",
        ];
        fs::write(&path, content.join("\n")).unwrap();

        let config = load_config_from(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(config.server_addr, "10.0.0.2:9982");
        assert_eq!(config.credentials, Some(Credentials::new("admin", "pw")));
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.call_timeout, Duration::from_secs(30));
    }
}
