//! Integration tests for the effective-date splitter.
//!
//! Scenarios follow the plugin's original ledger fixtures.

use std::collections::HashMap;
use std::sync::Arc;

use reds_core::{Amount, Close, Directive, MetaValue, NaiveDate, Open, Posting, Transaction};
use reds_plugins::effective_date::EFFECTIVE_DATE_KEY;
use reds_plugins::{
    EffectiveDatePlugin, LinkSequence, NativePlugin, NativePluginRegistry, PluginErrorSeverity,
    PluginInput, PluginOptions,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ============================================================================
// Helper Functions
// ============================================================================

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn make_input(directives: Vec<Directive>) -> PluginInput {
    PluginInput {
        directives,
        options: PluginOptions {
            operating_currencies: vec!["USD".to_string()],
            title: None,
        },
        config: None,
    }
}

fn make_open(day: &str, account: &str) -> Directive {
    Directive::Open(Open::new(date(day), account))
}

fn make_posting(account: &str, number: Decimal) -> Posting {
    Posting::new(account, Amount::new(number, "USD"))
}

fn make_deferred(account: &str, number: Decimal, effective: &str) -> Posting {
    make_posting(account, number).with_meta(EFFECTIVE_DATE_KEY, MetaValue::Date(date(effective)))
}

fn make_transaction(day: &str, narration: &str, postings: Vec<Posting>) -> Directive {
    Directive::Transaction(
        Transaction::new(date(day), narration)
            .with_meta(
                "filename",
                MetaValue::String("ledger.beancount".to_string()),
            )
            .with_meta("lineno", MetaValue::Number(dec!(4)))
            .with_postings(postings),
    )
}

fn transactions_with_narration<'a>(
    directives: &'a [Directive],
    narration: &str,
) -> Vec<&'a Transaction> {
    directives
        .iter()
        .filter_map(Directive::as_transaction)
        .filter(|t| t.narration.contains(narration))
        .collect()
}

fn opened(directives: &[Directive]) -> Vec<(&str, NaiveDate)> {
    directives
        .iter()
        .filter_map(Directive::as_open)
        .map(|o| (o.account.as_str(), o.date))
        .collect()
}

fn run(directives: Vec<Directive>) -> reds_plugins::PluginOutput {
    EffectiveDatePlugin::new().process(make_input(directives))
}

// ============================================================================
// Pass-through
// ============================================================================

#[test]
fn test_empty_entries() {
    let output = run(Vec::new());
    assert!(output.directives.is_empty());
    assert!(output.errors.is_empty());
}

#[test]
fn test_no_effective_dates() {
    let entries = vec![
        make_open("2014-01-01", "Liabilities:Mastercard"),
        make_open("2014-01-01", "Expenses:Taxes:Federal"),
        make_transaction(
            "2014-02-01",
            "Estimated taxes for 2013",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-2000)),
                make_posting("Expenses:Taxes:Federal", dec!(2000)),
            ],
        ),
    ];

    let output = run(entries.clone());
    assert_eq!(output.directives, entries);
    assert!(output.errors.is_empty());
}

#[test]
fn test_passthrough_shares_currency_handles() {
    let entries = vec![make_transaction(
        "2014-02-01",
        "Lunch",
        vec![
            make_posting("Liabilities:Mastercard", dec!(-12)),
            make_posting("Expenses:Food", dec!(12)),
        ],
    )];
    let before = entries[0].as_transaction().unwrap().postings[0]
        .units
        .currency
        .clone();

    let output = run(entries);
    let after = &output.directives[0].as_transaction().unwrap().postings[0]
        .units
        .currency;
    assert!(before.ptr_eq(after));
}

#[test]
fn test_other_directives_untouched() {
    let entries = vec![
        make_open("2014-01-01", "Assets:Cash"),
        Directive::Close(Close::new(date("2015-01-01"), "Assets:Cash")),
    ];
    assert_eq!(run(entries.clone()).directives, entries);
}

// ============================================================================
// Splitting
// ============================================================================

#[test]
fn test_expense_earlier() {
    let entries = vec![
        make_open("2014-01-01", "Liabilities:Mastercard"),
        make_open("2014-01-01", "Expenses:Taxes:Federal"),
        make_transaction(
            "2014-02-01",
            "Estimated taxes for 2013",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-2000)),
                make_deferred("Expenses:Taxes:Federal", dec!(2000), "2013-12-31"),
            ],
        ),
    ];

    let output = run(entries);
    assert!(output.errors.is_empty());
    assert_eq!(output.directives.len(), 5);

    let results = transactions_with_narration(&output.directives, "Estimated taxes");
    assert_eq!(results[0].date, date("2013-12-31"));
    assert_eq!(results[1].date, date("2014-02-01"));

    assert_eq!(results[0].postings[0].account, "Assets:Hold:Expenses:Taxes:Federal");
    assert_eq!(results[0].postings[0].units.number, dec!(-2000));
    assert_eq!(results[0].postings[1].account, "Expenses:Taxes:Federal");
    assert_eq!(results[1].postings[1].account, "Assets:Hold:Expenses:Taxes:Federal");
    assert_eq!(results[1].postings[1].units.number, dec!(2000));

    assert_eq!(
        opened(&output.directives)[0],
        ("Assets:Hold:Expenses:Taxes:Federal", date("2013-12-31"))
    );
}

#[test]
fn test_expense_later_multiple() {
    let entries = vec![
        make_open("2014-01-01", "Liabilities:Mastercard"),
        make_open("2014-01-01", "Expenses:Car:Insurance"),
        make_transaction(
            "2014-02-01",
            "Car insurance: 3 months",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-600)),
                make_deferred("Expenses:Car:Insurance", dec!(200), "2014-03-01"),
                make_deferred("Expenses:Car:Insurance", dec!(200), "2014-04-01"),
                make_deferred("Expenses:Car:Insurance", dec!(200), "2014-05-01"),
            ],
        ),
    ];

    let output = run(entries);
    assert_eq!(output.directives.len(), 7);

    // Synthesized opens come first.
    assert_eq!(
        output.directives[0].as_open().map(|o| o.account.as_str()),
        Some("Assets:Hold:Expenses:Car:Insurance")
    );

    let results = transactions_with_narration(&output.directives, "Car insurance");
    let dates: Vec<_> = results.iter().map(|t| t.date).collect();
    assert_eq!(
        dates,
        vec![
            date("2014-02-01"),
            date("2014-03-01"),
            date("2014-04-01"),
            date("2014-05-01"),
        ]
    );

    let link = &results[0].links[0];
    assert!(link.starts_with("edate-20140201-"));
    for txn in &results {
        assert!(txn.is_balanced(), "{txn}");
        assert_eq!(&txn.links[0], link);
    }
    assert_eq!(results[0].postings.len(), 2);
    assert_eq!(results[0].postings[1].units.number, dec!(600));
}

#[test]
fn test_income_is_held_as_liability() {
    let entries = vec![make_transaction(
        "2014-12-20",
        "January retainer",
        vec![
            make_posting("Assets:Checking", dec!(5000)),
            make_deferred("Income:Consulting", dec!(-5000), "2015-01-01"),
        ],
    )];

    let output = run(entries);
    let results = transactions_with_narration(&output.directives, "retainer");
    assert_eq!(results[0].postings[1].account, "Liabilities:Hold:Income:Consulting");
    assert_eq!(results[0].postings[1].units.number, dec!(-5000));
    assert_eq!(results[1].postings[0].units.number, dec!(5000));
}

#[test]
fn test_every_posting_deferred_to_one_date() {
    let entries = vec![make_transaction(
        "2014-02-01",
        "Rent",
        vec![
            make_deferred("Liabilities:Mastercard", dec!(-2000), "2014-05-01"),
            make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"),
        ],
    )];

    let output = run(entries);
    assert!(output.errors.is_empty());

    let results = transactions_with_narration(&output.directives, "Rent");
    let dates: Vec<_> = results.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![date("2014-02-01"), date("2014-05-01")]);

    // Nothing happens on the nominal date except moving value into holds.
    assert!(results[0]
        .postings
        .iter()
        .all(|p| p.account.contains(":Hold:")));
    assert_eq!(results[1].postings.len(), 4);
    for txn in &results {
        assert!(txn.is_balanced(), "{txn}");
        assert_eq!(txn.links.len(), 1);
    }

    assert_eq!(
        opened(&output.directives),
        vec![
            ("Assets:Hold:Expenses:Rent", date("2014-02-01")),
            ("Liabilities:Hold:Liabilities:Mastercard", date("2014-02-01")),
        ]
    );
}

#[test]
fn test_expense_and_asset_with_same_path_held_apart() {
    let entries = vec![make_transaction(
        "2014-02-01",
        "Prepay",
        vec![
            make_posting("Assets:Checking", dec!(-300)),
            make_deferred("Expenses:Prepaid", dec!(100), "2014-03-01"),
            make_deferred("Assets:Prepaid", dec!(200), "2014-03-01"),
        ],
    )];

    let output = run(entries);
    assert!(output.errors.is_empty());

    let results = transactions_with_narration(&output.directives, "Prepay");
    let held: Vec<_> = results[0].postings[1..]
        .iter()
        .map(|p| (p.account.as_str(), p.units.number))
        .collect();
    assert_eq!(
        held,
        vec![
            ("Assets:Hold:Expenses:Prepaid", dec!(100)),
            ("Assets:Hold:Assets:Prepaid", dec!(200)),
        ]
    );
    assert_eq!(opened(&output.directives).len(), 2);
}

#[test]
fn test_existing_hold_account_not_reopened() {
    let entries = vec![
        make_open("2010-01-01", "Assets:Hold:Expenses:Rent"),
        make_transaction(
            "2014-02-01",
            "Rent",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-2000)),
                make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"),
            ],
        ),
    ];

    let output = run(entries);
    assert_eq!(output.directives.len(), 3);
    assert_eq!(
        opened(&output.directives),
        vec![("Assets:Hold:Expenses:Rent", date("2010-01-01"))]
    );
}

#[test]
fn test_split_keeps_transaction_attributes() {
    let txn = Transaction::new(date("2014-02-01"), "Rent")
        .with_flag('!')
        .with_payee("Landlord")
        .with_tag("home")
        .with_link("lease-2014")
        .with_posting(make_posting("Liabilities:Mastercard", dec!(-2000)))
        .with_posting(make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"));

    let output = run(vec![Directive::Transaction(txn)]);
    for result in transactions_with_narration(&output.directives, "Rent") {
        assert_eq!(result.flag, '!');
        assert_eq!(result.payee.as_deref(), Some("Landlord"));
        assert_eq!(result.tags, vec!["home"]);
        assert_eq!(result.links[0], "lease-2014");
        assert_eq!(result.links.len(), 2);
    }
}

// ============================================================================
// Links
// ============================================================================

#[test]
fn test_link_collision() {
    let mut entries = vec![
        make_open("2014-01-01", "Liabilities:Mastercard"),
        make_open("2014-01-01", "Expenses:Insurance:SportsCards"),
    ];
    for i in 0..1000u32 {
        let cost = Decimal::new(100 + i64::from(i), 2);
        entries.push(Directive::Transaction(
            Transaction::new(date("2014-02-01"), "Insure sports card: 1 month")
                .with_meta("card_id", MetaValue::String(format!("A{i:03}")))
                .with_posting(make_posting("Liabilities:Mastercard", -cost))
                .with_posting(make_deferred(
                    "Expenses:Insurance:SportsCards",
                    cost,
                    "2014-03-01",
                )),
        ));
    }

    let output = run(entries);
    assert!(output.errors.is_empty());
    assert_eq!(output.directives.len(), 1 + 2 + 2000);

    let mut uses: HashMap<&str, usize> = HashMap::new();
    for txn in output.directives.iter().filter_map(Directive::as_transaction) {
        assert_eq!(txn.links.len(), 1);
        *uses.entry(txn.links[0].as_str()).or_default() += 1;
    }
    assert_eq!(uses.len(), 1000);
    assert!(uses.values().all(|&n| n == 2));
}

#[test]
fn test_links_unique_across_invocations() {
    let registry = NativePluginRegistry::new();
    let plugin = registry.find("effective_date").unwrap();
    let ledger = || {
        vec![make_transaction(
            "2014-02-01",
            "Rent",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-2000)),
                make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"),
            ],
        )]
    };

    let first = plugin.process(make_input(ledger()));
    let second = plugin.process(make_input(ledger()));

    let link_of = |output: &reds_plugins::PluginOutput| {
        output
            .directives
            .iter()
            .find_map(Directive::as_transaction)
            .map(|t| t.links[0].clone())
            .unwrap()
    };
    assert_ne!(link_of(&first), link_of(&second));
    assert_eq!(registry.link_sequence().peek(), 3);
}

#[test]
fn test_injected_link_sequence() {
    let links = Arc::new(LinkSequence::starting_at(900));
    let plugin = EffectiveDatePlugin::with_links(Arc::clone(&links));

    let output = plugin.process(make_input(vec![make_transaction(
        "2014-02-01",
        "Rent",
        vec![
            make_posting("Liabilities:Mastercard", dec!(-2000)),
            make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"),
        ],
    )]));

    let txn = output.directives[1].as_transaction().unwrap();
    assert_eq!(txn.links, vec!["edate-20140201-900"]);
    assert_eq!(links.peek(), 901);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_malformed_effective_date() {
    let entries = vec![make_transaction(
        "2014-02-01",
        "Rent",
        vec![
            make_posting("Liabilities:Mastercard", dec!(-2000)),
            make_posting("Expenses:Rent", dec!(2000))
                .with_meta(EFFECTIVE_DATE_KEY, MetaValue::String("May 1st".to_string())),
        ],
    )];

    let output = run(entries.clone());
    assert_eq!(output.directives, entries);
    assert_eq!(output.errors.len(), 1);
    let error = &output.errors[0];
    assert_eq!(error.severity, PluginErrorSeverity::Error);
    assert_eq!(error.source_file.as_deref(), Some("ledger.beancount"));
    assert_eq!(error.line_number, Some(4));
    assert!(error.message.contains("May 1st"), "{}", error.message);
}

#[test]
fn test_unknown_root_passes_through() {
    let entries = vec![make_transaction(
        "2014-02-01",
        "Budgeted",
        vec![
            make_posting("Liabilities:Mastercard", dec!(-10)),
            make_deferred("Budget:Food", dec!(10), "2014-03-01"),
        ],
    )];

    let output = run(entries.clone());
    assert_eq!(output.directives, entries);
    assert_eq!(output.errors.len(), 1);
}

#[test]
fn test_deferred_posting_at_cost_rejected() {
    let entries = vec![
        make_transaction(
            "2014-02-01",
            "Buy shares",
            vec![
                make_posting("Assets:Cash", dec!(-1000)),
                Posting::new("Assets:Brokerage", Amount::new(dec!(10), "AAPL"))
                    .with_cost(reds_core::Cost::new(dec!(100), "USD"))
                    .with_meta(EFFECTIVE_DATE_KEY, MetaValue::Date(date("2014-02-04"))),
            ],
        ),
        make_transaction(
            "2014-02-01",
            "Rent",
            vec![
                make_posting("Liabilities:Mastercard", dec!(-2000)),
                make_deferred("Expenses:Rent", dec!(2000), "2014-05-01"),
            ],
        ),
    ];

    let output = run(entries.clone());
    assert_eq!(output.errors.len(), 1);
    // The bad transaction passes through; the good one is still split.
    assert_eq!(output.directives[1], entries[0]);
    assert_eq!(output.directives.len(), 1 + 1 + 2);
}

#[test]
fn test_config_is_ignored_with_warning() {
    let input = make_input(Vec::new()).with_config("{\"hold\": \"Assets:Deferred\"}");
    let output = EffectiveDatePlugin::new().process(input);
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].severity, PluginErrorSeverity::Warning);
}
