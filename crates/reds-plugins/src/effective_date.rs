//! Effective-date splitting.
//!
//! A posting annotated with `effective_date` belongs economically to a
//! different day than its transaction. This pass moves such postings to
//! their own transaction on that day and keeps every resulting transaction
//! balanced by routing the value through a [holding account](crate::holding).
//!
//! ```text
//! 2014-02-01 * "Car insurance: 3 months"
//!   Liabilities:Mastercard    -600 USD
//!   Expenses:Car:Insurance     200 USD
//!     effective_date: 2014-03-01
//!   Expenses:Car:Insurance     400 USD
//!     effective_date: 2014-04-01
//! ```
//!
//! becomes
//!
//! ```text
//! 2014-02-01 * "Car insurance: 3 months" ^edate-20140201-1
//!   Liabilities:Mastercard              -600 USD
//!   Assets:Hold:Expenses:Car:Insurance   600 USD
//!
//! 2014-03-01 * "Car insurance: 3 months" ^edate-20140201-1
//!   Assets:Hold:Expenses:Car:Insurance  -200 USD
//!   Expenses:Car:Insurance               200 USD
//!
//! 2014-04-01 * "Car insurance: 3 months" ^edate-20140201-1
//!   Assets:Hold:Expenses:Car:Insurance  -400 USD
//!   Expenses:Car:Insurance               400 USD
//! ```
//!
//! plus an `open` for `Assets:Hold:Expenses:Car:Insurance` unless the ledger already
//! has one.

use chrono::NaiveDate;
use reds_core::{Amount, Decimal, Directive, InternedStr, MetaValue, Posting, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::holding::{holding_account, HoldingAccountError};
use crate::link::LinkSequence;
use crate::native::NativePlugin;
use crate::open::create_open_directives;
use crate::types::{PluginError, PluginInput, PluginOutput};

/// Posting metadata key holding the date a posting takes effect.
pub const EFFECTIVE_DATE_KEY: &str = "effective_date";

/// Why a transaction was left unsplit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectiveDateError {
    /// The annotation is not a date.
    #[error("posting on '{account}' has an {EFFECTIVE_DATE_KEY} that is not a date: {value}")]
    MalformedDate {
        /// Account of the annotated posting
        account: String,
        /// The offending value as written
        value: String,
    },
    /// The deferred posting's account cannot be held.
    #[error(transparent)]
    Holding(#[from] HoldingAccountError),
    /// The deferred posting weighs in another currency than its units.
    #[error(
        "cannot defer posting on '{account}' ({units}): it carries a cost or price, \
         and holding it would need a currency conversion"
    )]
    Conversion {
        /// Account of the deferred posting
        account: String,
        /// Its units
        units: Amount,
    },
    /// A derived transaction failed the balance check.
    #[error("split of \"{narration}\" leaves {residual} {currency} unbalanced on {date}")]
    Unbalanced {
        /// Narration of the source transaction
        narration: String,
        /// Date of the offending derived transaction
        date: NaiveDate,
        /// Currency that does not balance
        currency: InternedStr,
        /// Amount it is off by
        residual: Decimal,
    },
}

/// Read a posting's effective date, if it has one.
///
/// Accepts a date value or a string in `YYYY-MM-DD` form.
pub fn effective_date(posting: &Posting) -> Result<Option<NaiveDate>, EffectiveDateError> {
    let malformed = |value: String| EffectiveDateError::MalformedDate {
        account: posting.account.clone(),
        value,
    };
    match posting.meta.get(EFFECTIVE_DATE_KEY) {
        None => Ok(None),
        Some(MetaValue::Date(date)) => Ok(Some(*date)),
        Some(MetaValue::String(text)) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| malformed(format!("\"{text}\""))),
        Some(other) => Err(malformed(other.to_string())),
    }
}

/// Holding balances keyed by (holding account, currency), in first-seen order.
#[derive(Debug, Default)]
struct Held(Vec<(String, Amount)>);

impl Held {
    fn add(&mut self, account: &str, units: &Amount) {
        match self
            .0
            .iter_mut()
            .find(|(held, amount)| held == account && amount.currency == units.currency)
        {
            Some((_, amount)) => *amount += units,
            None => self.0.push((account.to_string(), units.clone())),
        }
    }

    /// Non-zero balances as postings, negated when closing the hold out.
    fn postings(&self, negate: bool) -> impl Iterator<Item = Posting> + '_ {
        self.0
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(move |(account, amount)| {
                let units = if negate { -amount } else { amount.clone() };
                Posting::new(account.clone(), units)
            })
    }
}

/// The transactions one source transaction turns into.
#[derive(Debug)]
pub struct Split {
    /// Derived transactions, ascending by date, all sharing `link`.
    pub transactions: Vec<Transaction>,
    /// Link shared by every derived transaction.
    pub link: String,
    /// Holding accounts used, with the earliest date each is used on.
    pub holding_accounts: BTreeMap<String, NaiveDate>,
}

/// Copy of `txn` with another date and posting list.
fn derive(txn: &Transaction, date: NaiveDate, postings: Vec<Posting>) -> Transaction {
    Transaction {
        date,
        flag: txn.flag,
        payee: txn.payee.clone(),
        narration: txn.narration.clone(),
        tags: txn.tags.clone(),
        links: txn.links.clone(),
        meta: txn.meta.clone(),
        postings,
    }
}

/// Residual with zero entries dropped, for comparing balances.
fn nonzero_residual(txn: &Transaction) -> BTreeMap<InternedStr, Decimal> {
    txn.residual()
        .into_iter()
        .filter(|(_, residual)| !residual.is_zero())
        .collect()
}

/// Split `txn` by effective date.
///
/// Returns `Ok(None)` when no posting takes effect on another day than the
/// transaction itself. When every posting is deferred, the transaction on the
/// nominal date carries only holding postings. A link is drawn from `links`
/// only for a successful split.
pub fn split_transaction(
    txn: &Transaction,
    links: &LinkSequence,
) -> Result<Option<Split>, EffectiveDateError> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Posting>> = BTreeMap::new();
    for posting in &txn.postings {
        let date = effective_date(posting)?.unwrap_or(txn.date);
        groups.entry(date).or_default().push(posting);
    }
    if groups.keys().all(|date| *date == txn.date) {
        return Ok(None);
    }

    let mut nominal_postings = Vec::new();
    let mut nominal_held = Held::default();
    let mut deferred = Vec::new();
    for (date, postings) in groups {
        if date == txn.date {
            nominal_postings.extend(postings.into_iter().cloned());
            continue;
        }
        let mut held = Held::default();
        for posting in &postings {
            if posting.has_conversion() {
                return Err(EffectiveDateError::Conversion {
                    account: posting.account.clone(),
                    units: posting.units.clone(),
                });
            }
            let hold = holding_account(&posting.account)?;
            held.add(&hold, &posting.units);
            nominal_held.add(&hold, &posting.units);
        }
        deferred.push((date, held, postings));
    }

    let mut holding_accounts: BTreeMap<String, NaiveDate> = BTreeMap::new();
    let mut note_use = |account: &str, date: NaiveDate| {
        holding_accounts
            .entry(account.to_string())
            .and_modify(|first| *first = (*first).min(date))
            .or_insert(date);
    };

    let held_now: Vec<Posting> = nominal_held.postings(false).collect();
    for posting in &held_now {
        note_use(&posting.account, txn.date);
    }
    nominal_postings.extend(held_now);
    let nominal = derive(txn, txn.date, nominal_postings);

    let mut transactions = Vec::with_capacity(deferred.len() + 1);
    for (date, held, postings) in deferred {
        let mut split_postings: Vec<Posting> = held.postings(true).collect();
        for posting in &split_postings {
            note_use(&posting.account, date);
        }
        split_postings.extend(postings.into_iter().cloned());
        transactions.push(derive(txn, date, split_postings));
    }
    let at = transactions.partition_point(|t| t.date < txn.date);
    transactions.insert(at, nominal);

    check_balance(txn, &transactions)?;

    let link = links.next_link(txn.date);
    let transactions = transactions
        .into_iter()
        .map(|t| t.with_link(link.clone()))
        .collect();

    Ok(Some(Split {
        transactions,
        link,
        holding_accounts,
    }))
}

/// The nominal transaction must keep the source's residual; every other
/// derived transaction must balance exactly.
fn check_balance(source: &Transaction, derived: &[Transaction]) -> Result<(), EffectiveDateError> {
    let expected = nonzero_residual(source);
    let balanced = BTreeMap::new();
    for txn in derived {
        let wanted = if txn.date == source.date {
            &expected
        } else {
            &balanced
        };
        let mut residual = nonzero_residual(txn);
        for (currency, number) in wanted {
            *residual.entry(currency.clone()).or_default() -= *number;
        }
        if let Some((currency, off)) = residual.into_iter().find(|(_, off)| !off.is_zero()) {
            return Err(EffectiveDateError::Unbalanced {
                narration: source.narration.clone(),
                date: txn.date,
                currency,
                residual: off,
            });
        }
    }
    Ok(())
}

/// Plugin that splits transactions by posting effective dates.
///
/// Holds the [`LinkSequence`] its links are drawn from; keep one instance
/// (or share one sequence) for the life of the process so links stay unique
/// across runs.
#[derive(Debug, Clone)]
pub struct EffectiveDatePlugin {
    links: Arc<LinkSequence>,
}

impl EffectiveDatePlugin {
    /// Create with a fresh link sequence.
    pub fn new() -> Self {
        Self::with_links(Arc::new(LinkSequence::new()))
    }

    /// Create drawing links from a shared sequence.
    pub const fn with_links(links: Arc<LinkSequence>) -> Self {
        Self { links }
    }

    /// The sequence links are drawn from.
    pub fn links(&self) -> &LinkSequence {
        &self.links
    }

    /// Split every transaction in `entries` that has effective-dated postings.
    ///
    /// Open directives for new holding accounts come first, sorted by
    /// account; the remaining entries keep their order, with each split
    /// transaction replaced in place by its derived transactions.
    pub fn split(&self, entries: Vec<Directive>) -> PluginOutput {
        let start = Instant::now();
        let mut directives = Vec::with_capacity(entries.len());
        let mut errors = Vec::new();
        let mut holding_accounts: BTreeMap<String, NaiveDate> = BTreeMap::new();
        let mut split_count = 0usize;

        for entry in entries {
            let txn = match entry {
                Directive::Transaction(txn) => txn,
                other => {
                    directives.push(other);
                    continue;
                }
            };
            match split_transaction(&txn, &self.links) {
                Ok(None) => directives.push(Directive::Transaction(txn)),
                Ok(Some(split)) => {
                    tracing::debug!(
                        date = %txn.date,
                        narration = %txn.narration,
                        link = %split.link,
                        parts = split.transactions.len(),
                        "split transaction by effective date"
                    );
                    split_count += 1;
                    for (account, date) in split.holding_accounts {
                        holding_accounts
                            .entry(account)
                            .and_modify(|first| *first = (*first).min(date))
                            .or_insert(date);
                    }
                    directives.extend(split.transactions.into_iter().map(Directive::Transaction));
                }
                Err(err) => {
                    tracing::warn!(date = %txn.date, narration = %txn.narration, "{err}");
                    errors.push(PluginError::error(err.to_string()).at(&txn.meta));
                    directives.push(Directive::Transaction(txn));
                }
            }
        }

        let mut output = create_open_directives(&holding_accounts, &directives, self.name());
        let opens_added = output.len();
        output.extend(directives);

        tracing::info!(
            splits = split_count,
            opens = opens_added,
            errors = errors.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "effective_date done"
        );

        PluginOutput {
            directives: output,
            errors,
        }
    }
}

impl Default for EffectiveDatePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl NativePlugin for EffectiveDatePlugin {
    fn name(&self) -> &'static str {
        "effective_date"
    }

    fn process(&self, input: PluginInput) -> PluginOutput {
        let ignored_config = input
            .config
            .as_deref()
            .is_some_and(|config| !config.trim().is_empty());

        let mut output = self.split(input.directives);
        if ignored_config {
            output.errors.insert(
                0,
                PluginError::warning("effective_date takes no configuration; ignoring it"),
            );
        }
        output
    }
}
