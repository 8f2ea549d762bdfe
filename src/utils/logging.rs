//! Structured Logging with Sensitive Data Redaction
//!
//! Provides safe logging that automatically redacts:
//! - Private keys and other secret material
//! - Addresses (partial redaction)
//! - Digests and signatures (partial redaction)

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to enable/disable debug logging
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Check if debug logging is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the log entry (auto-redacts sensitive data)
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value_str = value.to_string();
        let redacted = redact_if_sensitive(key, &value_str);
        self.fields.push((key, redacted));
        self
    }

    /// Render the entry as a single line (without timestamp)
    pub fn render(&self) -> String {
        let fields_str = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");

        if fields_str.is_empty() {
            format!("{} [{}] {}", self.level, self.module, self.message)
        } else {
            format!("{} [{}] {} | {}", self.level, self.module, self.message, fields_str)
        }
    }

    /// Log the entry
    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

/// Redact a value if the key suggests it's sensitive
fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    let fully_redacted_keys = ["private", "secret", "key_hex", "signing_key", "seed"];
    if fully_redacted_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }

    let address_keys = [
        "address", "signer", "expected", "recovered", "account", "owner", "spender",
    ];
    if address_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_address(value);
    }

    let hash_keys = ["digest", "hash", "separator", "signature"];
    if hash_keys.iter().any(|k| key_lower.contains(k)) {
        return redact_hash(value);
    }

    value.to_string()
}

/// Fully redact a sensitive value
fn redact_value(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }

    let len = value.len();
    if len <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", len)
    }
}

/// Partially redact an address (show first 6 hex chars and last 4)
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    let suffix_len = 4;

    if trimmed.len() <= prefix_len + suffix_len + 3 {
        return redact_value(trimmed);
    }

    let prefix = &trimmed[..prefix_len];
    let suffix = &trimmed[trimmed.len() - suffix_len..];

    format!("{}...{}", prefix, suffix)
}

/// Partially redact a hash (show first 10 hex chars and last 6)
fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();

    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    if trimmed.len() <= 20 {
        return trimmed.to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    let suffix_len = 6;

    let prefix = &trimmed[..prefix_len];
    let suffix = &trimmed[trimmed.len() - suffix_len..];

    format!("{}...{}", prefix, suffix)
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for error logging
#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}
