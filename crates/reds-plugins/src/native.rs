//! Native plugin support.
//!
//! Plugins run as native Rust code over the host's directive list.

use std::sync::Arc;

use crate::effective_date::EffectiveDatePlugin;
use crate::link::LinkSequence;
use crate::long_short::LongShortPlugin;
use crate::types::{PluginInput, PluginOutput};

/// Python package the plugins are published under.
pub const MODULE_PREFIX: &str = "beancount_reds_plugins.";

/// Trait for native plugins.
pub trait NativePlugin: Send + Sync {
    /// Plugin name.
    fn name(&self) -> &str;

    /// Process directives and return modified directives + errors.
    fn process(&self, input: PluginInput) -> PluginOutput;
}

/// Reduce a plugin reference to its bare name.
///
/// Both `effective_date` and
/// `beancount_reds_plugins.effective_date.effective_date` name the same
/// plugin.
fn bare_name(name: &str) -> &str {
    match name.strip_prefix(MODULE_PREFIX) {
        Some(path) => path.rsplit('.').next().unwrap_or(path),
        None => name,
    }
}

/// Registry of built-in native plugins.
pub struct NativePluginRegistry {
    plugins: Vec<Box<dyn NativePlugin>>,
    links: Arc<LinkSequence>,
}

impl NativePluginRegistry {
    /// Create a new registry with all built-in plugins.
    pub fn new() -> Self {
        Self::with_link_sequence(Arc::new(LinkSequence::new()))
    }

    /// Create a registry whose splitter draws links from `links`.
    pub fn with_link_sequence(links: Arc<LinkSequence>) -> Self {
        Self {
            plugins: vec![
                Box::new(EffectiveDatePlugin::with_links(Arc::clone(&links))),
                Box::new(LongShortPlugin),
            ],
            links,
        }
    }

    /// The link sequence shared with the effective-date splitter.
    pub const fn link_sequence(&self) -> &Arc<LinkSequence> {
        &self.links
    }

    /// Find a plugin by name.
    pub fn find(&self, name: &str) -> Option<&dyn NativePlugin> {
        let name = bare_name(name);

        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(std::convert::AsRef::as_ref)
    }

    /// Check if a name refers to a built-in plugin.
    pub fn is_builtin(name: &str) -> bool {
        matches!(bare_name(name), "effective_date" | "long_short")
    }
}

impl Default for NativePluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
