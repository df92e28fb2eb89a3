//! Holding accounts: where a deferred posting's value waits between the
//! transaction date and its effective date.
//!
//! A holding account keeps the original account's full name under a `Hold`
//! segment, re-rooted on the balance sheet so that the interim balance is
//! never reported as income or expense:
//!
//! | original root | holding root  |
//! |---------------|---------------|
//! | `Assets`      | `Assets`      |
//! | `Liabilities` | `Liabilities` |
//! | `Equity`      | `Equity`      |
//! | `Expenses`    | `Assets`      |
//! | `Income`      | `Liabilities` |
//!
//! Two roots share each of `Assets` and `Liabilities`, so the original root
//! stays in the name: `Expenses:Prepaid` and `Assets:Prepaid` are held on
//! `Assets:Hold:Expenses:Prepaid` and `Assets:Hold:Assets:Prepaid`.

use thiserror::Error;

/// Segment inserted after the root of every holding account.
pub const HOLD_SEGMENT: &str = "Hold";

/// Why an account cannot be given a holding account.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HoldingAccountError {
    /// The root is not one of the five standard account types.
    #[error("account '{0}' has no standard root (Assets, Liabilities, Equity, Income, Expenses)")]
    UnknownRoot(String),
    /// A bare root such as `Expenses` has no path to keep under `Hold`.
    #[error("account '{0}' has no sub-account to hold")]
    BareRoot(String),
}

/// The balance-sheet root a posting on `root` is held under.
pub fn holding_root(root: &str) -> Option<&'static str> {
    match root {
        "Assets" | "Expenses" => Some("Assets"),
        "Liabilities" | "Income" => Some("Liabilities"),
        "Equity" => Some("Equity"),
        _ => None,
    }
}

/// The holding account for `account`.
///
/// ```
/// use reds_plugins::holding::holding_account;
///
/// assert_eq!(
///     holding_account("Expenses:Taxes:Federal").unwrap(),
///     "Assets:Hold:Expenses:Taxes:Federal"
/// );
/// assert_eq!(
///     holding_account("Income:Salary").unwrap(),
///     "Liabilities:Hold:Income:Salary"
/// );
/// ```
pub fn holding_account(account: &str) -> Result<String, HoldingAccountError> {
    let (root, rest) = account.split_once(':').unwrap_or((account, ""));
    let held_on = holding_root(root)
        .ok_or_else(|| HoldingAccountError::UnknownRoot(account.to_string()))?;
    if rest.is_empty() {
        return Err(HoldingAccountError::BareRoot(account.to_string()));
    }
    Ok(format!("{held_on}:{HOLD_SEGMENT}:{account}"))
}
