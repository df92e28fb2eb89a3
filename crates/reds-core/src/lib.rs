//! Core types for the reds ledger plugins
//!
//! This crate models the already-booked directive list a host ledger engine
//! hands to its plugins:
//!
//! - [`Amount`] - A decimal number with a currency
//! - [`Cost`] - Booked acquisition cost of a lot
//! - [`Posting`] / [`Transaction`] - Transfers between accounts
//! - [`Directive`] - Everything a plugin may see (Transaction, Open, Close, ...)
//!
//! # Example
//!
//! ```
//! use reds_core::{Amount, Posting, Transaction};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let txn = Transaction::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), "Car insurance")
//!     .with_posting(Posting::new("Liabilities:Mastercard", Amount::new(dec!(-600), "USD")))
//!     .with_posting(Posting::new("Expenses:Car:Insurance", Amount::new(dec!(600), "USD")));
//!
//! assert!(txn.is_balanced());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;
pub mod intern;

pub use amount::Amount;
pub use cost::Cost;
pub use directive::{
    Balance, Close, Directive, MetaValue, Metadata, Note, Open, Posting, Price, PriceAnnotation,
    Transaction,
};
pub use intern::InternedStr;

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
