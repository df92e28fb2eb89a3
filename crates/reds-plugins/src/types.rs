//! Types crossing the host/plugin boundary.

use reds_core::{Directive, MetaValue, Metadata};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input to a plugin from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInput {
    /// All directives, already parsed, booked and validated, in file order.
    pub directives: Vec<Directive>,
    /// Engine-wide options.
    pub options: PluginOptions,
    /// Plugin configuration string (from the `plugin` directive).
    pub config: Option<String>,
}

impl PluginInput {
    /// Input with default options and no configuration.
    pub fn new(directives: Vec<Directive>) -> Self {
        Self {
            directives,
            options: PluginOptions::default(),
            config: None,
        }
    }

    /// Set the configuration string.
    #[must_use]
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }
}

/// Output from a plugin.
///
/// `directives` replaces the host's working list for every later plugin and
/// for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOutput {
    /// Transformed directives.
    pub directives: Vec<Directive>,
    /// Errors and warnings to surface alongside parse errors.
    pub errors: Vec<PluginError>,
}

/// Engine-wide options passed to plugins. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Operating currencies.
    pub operating_currencies: Vec<String>,
    /// Ledger title.
    pub title: Option<String>,
}

/// How bad a [`PluginError`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginErrorSeverity {
    /// Reported, nothing was skipped.
    Warning,
    /// The offending entry was left untransformed.
    Error,
}

/// A plugin error or warning, optionally pointing at the ledger source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginError {
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: PluginErrorSeverity,
    /// Source file of the offending entry.
    pub source_file: Option<String>,
    /// Line of the offending entry.
    pub line_number: Option<u32>,
}

impl PluginError {
    /// Create an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: PluginErrorSeverity::Error,
            source_file: None,
            line_number: None,
        }
    }

    /// Create a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: PluginErrorSeverity::Warning,
            ..Self::error(String::new())
        }
    }

    /// Attach the location recorded in an entry's `filename`/`lineno` metadata.
    #[must_use]
    pub fn at(mut self, meta: &Metadata) -> Self {
        self.source_file = match meta.get("filename") {
            Some(MetaValue::String(file)) => Some(file.clone()),
            _ => None,
        };
        self.line_number = match meta.get("lineno") {
            Some(MetaValue::Number(line)) => line.to_u32(),
            _ => None,
        };
        self
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source_file, self.line_number) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}: {}", self.message),
            (Some(file), None) => write!(f, "{file}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}
