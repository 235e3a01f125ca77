use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use reqflow_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = config
        .email
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries: [(&str, String, &[&str]); 17] = [
        ("database.url", config.database.url.clone(), &["REQFLOW_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["REQFLOW_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["REQFLOW_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["REQFLOW_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["REQFLOW_SERVER_PORT"]),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["REQFLOW_SERVER_HEALTH_CHECK_PORT"],
        ),
        (
            "auth.identity_header",
            config.auth.identity_header.clone(),
            &["REQFLOW_AUTH_IDENTITY_HEADER"],
        ),
        ("email.provider", format!("{:?}", config.email.provider), &["REQFLOW_EMAIL_PROVIDER"]),
        ("email.api_key", api_key, &["REQFLOW_EMAIL_API_KEY"]),
        ("email.api_url", config.email.api_url.clone(), &["REQFLOW_EMAIL_API_URL"]),
        ("email.sender", config.email.sender.clone(), &["REQFLOW_EMAIL_SENDER"]),
        (
            "email.dashboard_url",
            config.email.dashboard_url.clone(),
            &["REQFLOW_EMAIL_DASHBOARD_URL"],
        ),
        (
            "workflow.admin_department",
            config.workflow.admin_department.clone(),
            &["REQFLOW_WORKFLOW_ADMIN_DEPARTMENT"],
        ),
        (
            "workflow.default_page_size",
            config.workflow.default_page_size.to_string(),
            &["REQFLOW_WORKFLOW_DEFAULT_PAGE_SIZE"],
        ),
        (
            "workflow.max_page_size",
            config.workflow.max_page_size.to_string(),
            &["REQFLOW_WORKFLOW_MAX_PAGE_SIZE"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["REQFLOW_LOGGING_LEVEL", "REQFLOW_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["REQFLOW_LOGGING_FORMAT", "REQFLOW_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["reqflow.toml", "config/reqflow.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

// Keeps a provider prefix such as `re_` so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('_') {
        return format!("{prefix}_***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_key};

    #[test]
    fn redaction_keeps_only_the_prefix() {
        assert_eq!(redact_key("re_123456"), "re_***");
        assert_eq!(redact_key("plainsecret"), "<redacted>");
        assert_eq!(redact_key("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: toml::Value = "[email]\nprovider = \"http\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "email.provider"));
        assert!(!contains_path(&doc, "email.api_key"));
    }
}
