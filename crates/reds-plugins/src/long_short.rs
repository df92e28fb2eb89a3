//! Capital gains classifier.
//!
//! The host books every realized gain to one generic account. This pass
//! splits those postings by holding period: lots held a year or less go to
//! the short-term account, older lots to the long-term account. Which
//! accounts these are is set by the [plugin configuration](crate::config).

use chrono::{Months, NaiveDate};
use reds_core::{Decimal, Directive, InternedStr, Posting, Transaction};
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;

use crate::config::{ConfigError, GainsAccounts, LongShortConfig};
use crate::native::NativePlugin;
use crate::open::create_open_directives;
use crate::types::{PluginError, PluginInput, PluginOutput};

/// Why a sale could not be classified.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The plugin is misconfigured; nothing was classified.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A reduction with no sale price.
    #[error("sale of {units} from '{account}' has no price")]
    MissingPrice {
        /// Account the lot was sold from
        account: String,
        /// Units sold
        units: String,
    },
    /// A reduction whose lot has no acquisition date.
    #[error("sale of {units} from '{account}' has no acquisition date on its cost")]
    MissingCostDate {
        /// Account the lot was sold from
        account: String,
        /// Units sold
        units: String,
    },
    /// Sale price and cost are in different currencies.
    #[error("sale from '{account}' is priced in {price} but its cost is in {cost}")]
    CurrencyMismatch {
        /// Account the lot was sold from
        account: String,
        /// Price currency
        price: InternedStr,
        /// Cost currency
        cost: InternedStr,
    },
    /// The booked gain does not match the gain computed from the lots.
    #[error("booked gains {booked} do not match {computed} computed from the lots sold")]
    GainsMismatch {
        /// Sum of the generic gains postings
        booked: Decimal,
        /// Negated sum of the per-lot gains
        computed: Decimal,
    },
}

/// Holding period of a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// Held a year or less
    Short,
    /// Held longer than a year
    Long,
}

/// Holding period of a lot acquired on `acquired` and sold on `sold`.
///
/// A lot sold on or before the first anniversary of its purchase is
/// short-term. Anniversaries follow the calendar, so a lot bought on
/// 2020-02-29 turns long-term after 2021-02-28.
pub fn holding_term(acquired: NaiveDate, sold: NaiveDate) -> Term {
    match acquired.checked_add_months(Months::new(12)) {
        Some(anniversary) if sold > anniversary => Term::Long,
        _ => Term::Short,
    }
}

/// Whether `posting` removes units from a lot held at cost.
fn is_reduction(posting: &Posting) -> bool {
    posting.cost.is_some() && posting.units.is_negative()
}

/// Realized gain on one reduction posting, with its holding period.
pub fn lot_gain(posting: &Posting, sold: NaiveDate) -> Result<(Term, Decimal), ClassifierError> {
    let units = &posting.units;
    let Some(cost) = &posting.cost else {
        return Ok((Term::Short, Decimal::ZERO));
    };
    let acquired = cost.date.ok_or_else(|| ClassifierError::MissingCostDate {
        account: posting.account.clone(),
        units: units.to_string(),
    })?;
    let price = posting
        .price
        .as_ref()
        .and_then(|price| price.per_unit(units.number))
        .ok_or_else(|| ClassifierError::MissingPrice {
            account: posting.account.clone(),
            units: units.to_string(),
        })?;
    if price.currency != cost.currency {
        return Err(ClassifierError::CurrencyMismatch {
            account: posting.account.clone(),
            price: price.currency,
            cost: cost.currency.clone(),
        });
    }

    let gain = (price.number - cost.number) * units.number.abs();
    Ok((holding_term(acquired, sold), gain))
}

/// A transaction with its generic gains postings replaced.
#[derive(Debug)]
pub struct Reclassified {
    /// The rewritten transaction.
    pub transaction: Transaction,
    /// Whether a short-term posting was added.
    pub short_added: bool,
    /// Whether a long-term posting was added.
    pub long_added: bool,
}

/// Classify the gains of one transaction.
///
/// Returns `Ok(None)` for transactions that sell nothing at cost, book
/// nothing to the generic account, or were already classified.
pub fn classify_transaction(
    txn: &Transaction,
    accounts: &GainsAccounts,
) -> Result<Option<Reclassified>, ClassifierError> {
    let has_reduction = txn.postings.iter().any(is_reduction);
    let has_generic = txn.postings.iter().any(|p| p.account == accounts.generic);
    let already_split = txn
        .postings
        .iter()
        .any(|p| p.account == accounts.short || p.account == accounts.long);
    if !has_reduction || !has_generic || already_split {
        return Ok(None);
    }

    let mut short = Decimal::ZERO;
    let mut long = Decimal::ZERO;
    for posting in txn.postings.iter().filter(|p| is_reduction(p)) {
        match lot_gain(posting, txn.date)? {
            (Term::Short, gain) => short += gain,
            (Term::Long, gain) => long += gain,
        }
    }

    let (generic, postings): (Vec<&Posting>, Vec<&Posting>) = txn
        .postings
        .iter()
        .partition(|p| p.account == accounts.generic);
    let booked: Decimal = generic.iter().map(|p| p.units.number).sum();
    if booked != -(short + long) {
        return Err(ClassifierError::GainsMismatch {
            booked,
            computed: -(short + long),
        });
    }

    // New postings copy the first generic one, flag and metadata included.
    let Some(&template) = generic.first() else {
        return Ok(None);
    };
    let replacement = |account: &str, gain: Decimal| {
        template
            .clone()
            .with_account(account)
            .with_units(template.units.with_number(-gain))
    };
    let mut added = Vec::with_capacity(2);
    if !short.is_zero() {
        added.push(replacement(&accounts.short, short));
    }
    if !long.is_zero() {
        added.push(replacement(&accounts.long, long));
    }

    let mut kept: Vec<Posting> = postings.into_iter().cloned().collect();
    kept.extend(added);

    Ok(Some(Reclassified {
        transaction: txn.clone().with_postings(kept),
        short_added: !short.is_zero(),
        long_added: !long.is_zero(),
    }))
}

/// Plugin that books capital gains to short- and long-term accounts.
pub struct LongShortPlugin;

impl NativePlugin for LongShortPlugin {
    fn name(&self) -> &'static str {
        "long_short"
    }

    fn process(&self, input: PluginInput) -> PluginOutput {
        let start = Instant::now();
        let accounts =
            match LongShortConfig::parse(input.config.as_deref()).and_then(|c| c.accounts()) {
                Ok(accounts) => accounts,
                Err(err) => {
                    let err = ClassifierError::from(err);
                    tracing::warn!("{err}");
                    return PluginOutput {
                        directives: input.directives,
                        errors: vec![PluginError::error(err.to_string())],
                    };
                }
            };

        let earliest = input.directives.iter().map(Directive::date).min();
        let mut directives = Vec::with_capacity(input.directives.len());
        let mut errors = Vec::new();
        let (mut short_count, mut long_count) = (0usize, 0usize);

        for entry in input.directives {
            let txn = match entry {
                Directive::Transaction(txn) => txn,
                other => {
                    directives.push(other);
                    continue;
                }
            };
            match classify_transaction(&txn, &accounts) {
                Ok(None) => directives.push(Directive::Transaction(txn)),
                Ok(Some(done)) => {
                    short_count += usize::from(done.short_added);
                    long_count += usize::from(done.long_added);
                    directives.push(Directive::Transaction(done.transaction));
                }
                Err(err) => {
                    tracing::warn!(date = %txn.date, narration = %txn.narration, "{err}");
                    errors.push(PluginError::error(err.to_string()).at(&txn.meta));
                    directives.push(Directive::Transaction(txn));
                }
            }
        }

        let mut new_accounts = BTreeMap::new();
        if let Some(date) = earliest {
            if short_count > 0 {
                new_accounts.insert(accounts.short.clone(), date);
            }
            if long_count > 0 {
                new_accounts.insert(accounts.long.clone(), date);
            }
        }
        let mut output = create_open_directives(&new_accounts, &directives, self.name());
        output.extend(directives);

        tracing::info!(
            short = short_count,
            long = long_count,
            elapsed_ms = start.elapsed().as_millis(),
            "capital gains classified"
        );

        PluginOutput {
            directives: output,
            errors,
        }
    }
}
