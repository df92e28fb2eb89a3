//! Ledger plugins for Beancount-style directive lists.
//!
//! Each plugin takes the host's fully parsed and booked directives and
//! returns a transformed list plus any errors.
//!
//! # Built-in Plugins
//!
//! - `effective_date`: Moves postings annotated with `effective_date` to
//!   their own linked transactions, routed through holding accounts
//! - `long_short`: Splits realized capital gains into short- and long-term
//!   accounts by holding period
//!
//! # Example
//!
//! ```
//! use reds_plugins::{NativePluginRegistry, PluginInput};
//!
//! let registry = NativePluginRegistry::new();
//! let plugin = registry
//!     .find("beancount_reds_plugins.effective_date.effective_date")
//!     .unwrap();
//!
//! let output = plugin.process(PluginInput::new(Vec::new()));
//! assert!(output.directives.is_empty());
//! assert!(output.errors.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod effective_date;
pub mod holding;
pub mod link;
pub mod long_short;
pub mod native;
pub mod open;
pub mod types;

pub use config::{ConfigError, GainsAccounts, LongShortConfig};
pub use effective_date::{EffectiveDateError, EffectiveDatePlugin};
pub use holding::{holding_account, HoldingAccountError};
pub use link::LinkSequence;
pub use long_short::{ClassifierError, LongShortPlugin};
pub use native::{NativePlugin, NativePluginRegistry};
pub use types::{PluginError, PluginErrorSeverity, PluginInput, PluginOptions, PluginOutput};
