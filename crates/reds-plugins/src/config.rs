//! Configuration for the `long_short` classifier.
//!
//! The plugin directive carries a JSON object:
//!
//! ```json
//! {"generic_account": "Income:Capital-Gains",
//!  "short_account_rep": ["Capital-Gains", "Capital-Gains:Short"],
//!  "long_account_rep":  ["Capital-Gains", "Capital-Gains:Long"]}
//! ```
//!
//! Each `*_rep` pair is a substring replacement applied to the generic
//! account to name the short- and long-term accounts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a classifier configuration was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The plugin directive had no configuration string.
    #[error("long_short needs a configuration naming the generic, short and long accounts")]
    Missing,
    /// The configuration is not the expected JSON object.
    #[error("invalid long_short configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// A replacement pair with an empty pattern.
    #[error("{term} replacement has an empty pattern")]
    EmptyPattern {
        /// `short` or `long`
        term: &'static str,
    },
    /// A replacement pair that does not alter the generic account.
    #[error("{term} replacement '{from}' -> '{to}' leaves '{account}' unchanged")]
    Unchanged {
        /// `short` or `long`
        term: &'static str,
        /// Pattern searched for
        from: String,
        /// Its replacement
        to: String,
        /// The generic account
        account: String,
    },
    /// Both replacements name the same account.
    #[error("short and long gains would both be booked to '{0}'")]
    SameAccount(String),
}

/// A `(pattern, replacement)` pair, written as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReplacement(pub String, pub String);

impl AccountReplacement {
    fn apply(&self, term: &'static str, account: &str) -> Result<String, ConfigError> {
        let Self(from, to) = self;
        if from.is_empty() {
            return Err(ConfigError::EmptyPattern { term });
        }
        let replaced = account.replace(from.as_str(), to);
        if replaced == account {
            return Err(ConfigError::Unchanged {
                term,
                from: from.clone(),
                to: to.clone(),
                account: account.to_string(),
            });
        }
        Ok(replaced)
    }
}

/// Raw classifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LongShortConfig {
    /// Account the host books all capital gains to.
    pub generic_account: String,
    /// Rewrites `generic_account` into the short-term account.
    pub short_account_rep: AccountReplacement,
    /// Rewrites `generic_account` into the long-term account.
    pub long_account_rep: AccountReplacement,
}

/// The three accounts the classifier works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GainsAccounts {
    /// Account gains arrive on
    pub generic: String,
    /// Account for gains held a year or less
    pub short: String,
    /// Account for gains held longer
    pub long: String,
}

impl LongShortConfig {
    /// Parse the plugin configuration string.
    pub fn parse(config: Option<&str>) -> Result<Self, ConfigError> {
        let config = config
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::Missing)?;
        Ok(serde_json::from_str(config)?)
    }

    /// Derive the short and long accounts from the generic one.
    pub fn accounts(&self) -> Result<GainsAccounts, ConfigError> {
        let short = self
            .short_account_rep
            .apply("short", &self.generic_account)?;
        let long = self.long_account_rep.apply("long", &self.generic_account)?;
        if short == long {
            return Err(ConfigError::SameAccount(short));
        }
        Ok(GainsAccounts {
            generic: self.generic_account.clone(),
            short,
            long,
        })
    }
}
