//! Open directives for accounts a plugin introduces.

use chrono::NaiveDate;
use reds_core::{Decimal, Directive, MetaValue, Open};
use std::collections::{BTreeMap, HashSet};

/// Accounts opened by an `open` directive anywhere in `entries`.
pub fn opened_accounts(entries: &[Directive]) -> HashSet<&str> {
    entries
        .iter()
        .filter_map(Directive::as_open)
        .map(|open| open.account.as_str())
        .collect()
}

/// One `open` per account in `new_accounts` that `entries` does not open yet.
///
/// `new_accounts` maps each account to the date it must be open by. The
/// result is sorted by account name. Synthesized directives are tagged with
/// `filename: "<plugin>"` and `lineno: 0` so errors about them can be traced
/// back to the plugin that made them.
pub fn create_open_directives(
    new_accounts: &BTreeMap<String, NaiveDate>,
    entries: &[Directive],
    plugin: &str,
) -> Vec<Directive> {
    let existing = opened_accounts(entries);
    new_accounts
        .iter()
        .filter(|(account, _)| !existing.contains(account.as_str()))
        .map(|(account, date)| {
            Directive::Open(
                Open::new(*date, account.clone())
                    .with_meta("filename", MetaValue::String(format!("<{plugin}>")))
                    .with_meta("lineno", MetaValue::Number(Decimal::ZERO)),
            )
        })
        .collect()
}
