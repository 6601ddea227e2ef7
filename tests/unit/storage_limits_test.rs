// Validation limits against the schema
//
// Everything the models accept must fit the columns it is written to, or a
// valid save fails inside the transaction. The column sizes are read from the
// migration itself.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use obrabudget::core::money::{check_budget_subtotal, max_budget_subtotal, max_line_input};
use obrabudget::modules::budgets::models::{Breakdown, CascadeCalculator, CascadeRates, LineItem};

const SCHEMA: &str = include_str!("../../migrations/20261016000001_create_budgets.sql");

/// Size arguments of every `<column> <kind>(...)` definition in the schema
fn column_sizes(column: &str, kind: &str) -> Vec<Vec<u32>> {
    let prefix = format!("{} {}(", column, kind);
    let sizes: Vec<Vec<u32>> = SCHEMA
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|rest| {
            let args = &rest[..rest.find(')').expect("unterminated column size")];
            args.split(',')
                .map(|n| n.trim().parse().expect("numeric column size"))
                .collect()
        })
        .collect();

    assert!(!sizes.is_empty(), "no {} column named {}", kind, column);
    sizes
}

fn varchar_len(column: &str) -> usize {
    column_sizes(column, "VARCHAR")
        .into_iter()
        .map(|size| size[0] as usize)
        .min()
        .unwrap()
}

/// Smallest value that no longer fits any `DECIMAL(p, s)` column of this name
fn decimal_capacity(column: &str) -> Decimal {
    column_sizes(column, "DECIMAL")
        .into_iter()
        .map(|size| Decimal::from_i128_with_scale(10i128.pow(size[0] - size[1]), 0))
        .min()
        .unwrap()
}

fn line_item(code: &str, unit: &str, quantity: Decimal, unit_price: Decimal) -> LineItem {
    LineItem::new(
        code.to_string(),
        "Partida".to_string(),
        unit.to_string(),
        quantity,
        unit_price,
    )
    .unwrap()
}

#[test]
fn test_longest_accepted_unit_fits_its_column() {
    let widest = "u".repeat(varchar_len("unit"));
    assert!(LineItem::new(
        "01".to_string(),
        "Partida".to_string(),
        format!("{}u", widest),
        dec!(1),
        dec!(1),
    )
    .is_err());

    let item = line_item("01", &widest, dec!(1), dec!(1));
    assert_eq!(item.unit, widest);
}

#[test]
fn test_longest_accepted_code_fits_its_column() {
    // Duplicates carry the longest codes the models produce
    let mut item = line_item(&"C".repeat(50), "m2", dec!(1), dec!(1));
    item = item.duplicate();

    assert!(item.code.len() <= varchar_len("code"));
}

#[test]
fn test_largest_line_item_fits_its_columns() {
    let item = line_item("01", "m3", max_line_input(), max_line_input());

    assert!(max_line_input() < decimal_capacity("quantity"));
    assert!(max_line_input() < decimal_capacity("unit_price"));
    assert_eq!(item.amount(), max_line_input() * max_line_input());
    assert!(item.amount() < decimal_capacity("amount"));
}

#[test]
fn test_largest_subtotal_fits_chapter_and_budget_columns() {
    assert!(check_budget_subtotal(max_budget_subtotal()).is_none());
    assert!(max_budget_subtotal() < decimal_capacity("subtotal"));
}

#[test]
fn test_steepest_cascade_fits_breakdown_columns() {
    // Every rate at its ceiling except the discount, which only lowers totals
    let rates = CascadeRates::new(dec!(100), dec!(100), dec!(0), dec!(100));
    let breakdown: Breakdown = CascadeCalculator::new()
        .calculate(max_budget_subtotal(), &rates)
        .for_storage();

    assert_eq!(breakdown.total, max_budget_subtotal() * dec!(8));

    let columns = [
        ("subtotal", breakdown.subtotal),
        ("general_expenses", breakdown.general_expenses),
        ("with_expenses", breakdown.with_expenses),
        ("industrial_benefit", breakdown.industrial_benefit),
        ("with_benefit", breakdown.with_benefit),
        ("discount", breakdown.discount),
        ("base_before_tax", breakdown.base_before_tax),
        ("tax_amount", breakdown.tax_amount),
        ("total", breakdown.total),
    ];
    for (column, value) in columns {
        assert!(
            value < decimal_capacity(column),
            "{} = {} overflows its column",
            column,
            value
        );
    }
}
