use std::{collections::HashMap, fs, time::Duration};

use shared::domain::Principal;
use tracing::warn;

use crate::visits::RetryPolicy;

pub const SETTINGS_FILE: &str = "site.toml";

/// Administrator whose role can never be revoked from this client.
pub const DEFAULT_ADMIN_PRINCIPAL: &str =
    "tyf5f-xp4vd-acgcy-3az6q-poccg-u2yfq-7phil-jgidl-kmwm6-477a6-mae";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_host: Option<String>,
    pub backend_canister_id: Option<String>,
    pub default_admin_principal: Option<String>,
    pub visit_retry_attempts: u32,
    pub visit_retry_delay_ms: u64,
    pub revisit_after_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_host: None,
            backend_canister_id: None,
            default_admin_principal: Some(DEFAULT_ADMIN_PRINCIPAL.into()),
            visit_retry_attempts: 3,
            visit_retry_delay_ms: 1000,
            revisit_after_secs: 300,
        }
    }
}

/// Deployment placeholders that were never filled in count as unset.
fn defined(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "undefined" {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value, "config: ignoring non-numeric value");
            None
        }
    }
}

impl Settings {
    /// Overlays values from a `site.toml` document. Unknown keys are ignored.
    pub fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(error = %err, "config: ignoring unreadable {SETTINGS_FILE}");
                return;
            }
        };

        let text = |key: &str| -> Option<String> {
            match file_cfg.get(key)? {
                toml::Value::String(v) => Some(v.clone()),
                toml::Value::Integer(v) => Some(v.to_string()),
                _ => None,
            }
        };

        if let Some(v) = text("backend_host") {
            self.backend_host = defined(&v);
        }
        if let Some(v) = text("backend_canister_id") {
            self.backend_canister_id = defined(&v);
        }
        if let Some(v) = text("default_admin_principal") {
            self.default_admin_principal = defined(&v);
        }
        if let Some(v) =
            text("visit_retry_attempts").and_then(|v| parse_number("visit_retry_attempts", &v))
        {
            self.visit_retry_attempts = v;
        }
        if let Some(v) = text("visit_retry_delay_ms")
            .and_then(|v| parse_number("visit_retry_delay_ms", &v))
        {
            self.visit_retry_delay_ms = v;
        }
        if let Some(v) =
            text("revisit_after_secs").and_then(|v| parse_number("revisit_after_secs", &v))
        {
            self.revisit_after_secs = v;
        }
    }

    /// Overlays environment values; the `APP__` form wins over the bare one.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["BACKEND_HOST", "APP__BACKEND_HOST"] {
            if let Some(v) = lookup(key) {
                self.backend_host = defined(&v);
            }
        }
        for key in ["BACKEND_CANISTER_ID", "APP__BACKEND_CANISTER_ID"] {
            if let Some(v) = lookup(key) {
                self.backend_canister_id = defined(&v);
            }
        }
        if let Some(v) = lookup("APP__DEFAULT_ADMIN") {
            self.default_admin_principal = defined(&v);
        }
        if let Some(v) = lookup("APP__VISIT_RETRY_ATTEMPTS") {
            if let Some(parsed) = parse_number("APP__VISIT_RETRY_ATTEMPTS", &v) {
                self.visit_retry_attempts = parsed;
            }
        }
        if let Some(v) = lookup("APP__VISIT_RETRY_DELAY_MS") {
            if let Some(parsed) = parse_number("APP__VISIT_RETRY_DELAY_MS", &v) {
                self.visit_retry_delay_ms = parsed;
            }
        }
        if let Some(v) = lookup("APP__REVISIT_AFTER_SECS") {
            if let Some(parsed) = parse_number("APP__REVISIT_AFTER_SECS", &v) {
                self.revisit_after_secs = parsed;
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.visit_retry_attempts.max(1),
            delay: Duration::from_millis(self.visit_retry_delay_ms),
        }
    }

    pub fn revisit_after(&self) -> Duration {
        Duration::from_secs(self.revisit_after_secs)
    }

    /// Parsed default admin; a malformed value disables the protection.
    pub fn default_admin(&self) -> Option<Principal> {
        let raw = self.default_admin_principal.as_deref()?;
        match raw.parse() {
            Ok(principal) => Some(principal),
            Err(err) => {
                warn!(principal = raw, error = %err, "config: invalid default admin principal");
                None
            }
        }
    }

    /// `(host, canister id)` once both are known.
    pub fn backend(&self) -> Option<(&str, &str)> {
        Some((
            self.backend_host.as_deref()?,
            self.backend_canister_id.as_deref()?,
        ))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        settings.apply_file(&raw);
    }
    settings.apply_env_with(|key| std::env::var(key).ok());

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
