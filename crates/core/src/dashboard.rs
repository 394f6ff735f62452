//! Live reconciliation math for one month: groups ledger rows by category,
//! totals expected against actual, and reports the difference at line,
//! category, and month level. `build_dashboard` is pure; the finalization
//! path calls it exactly once to produce the frozen payload, and the live
//! dashboard endpoint calls it on demand.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ledger::LedgerRow;
use crate::domain::month::Month;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetLineDetail {
    pub budget_line_id: i64,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: i64,
    pub category_name: String,
    pub category_color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expected: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_actual: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
    pub budget_lines: Vec<BudgetLineDetail>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub month_id: i64,
    pub year: i32,
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expected: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_actual: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_difference: Decimal,
    pub category_summaries: Vec<CategorySummary>,
}

/// Positive differences mean under budget. Categories come out ordered by
/// id ascending, lines within a category by budget line id ascending,
/// regardless of input order.
pub fn build_dashboard(month: &Month, rows: &[LedgerRow]) -> DashboardPayload {
    let mut groups: BTreeMap<i64, CategorySummary> = BTreeMap::new();

    for row in rows {
        let summary = groups.entry(row.category_id).or_insert_with(|| CategorySummary {
            category_id: row.category_id,
            category_name: row.category_name.clone(),
            category_color: row.category_color.clone(),
            total_expected: Decimal::ZERO,
            total_actual: Decimal::ZERO,
            difference: Decimal::ZERO,
            budget_lines: Vec::new(),
        });

        summary.total_expected += row.expected;
        summary.total_actual += row.actual_amount;
        summary.budget_lines.push(BudgetLineDetail {
            budget_line_id: row.id,
            label: row.label.clone(),
            expected_amount: row.expected,
            actual_amount: row.actual_amount,
            difference: row.expected - row.actual_amount,
        });
    }

    let mut total_expected = Decimal::ZERO;
    let mut total_actual = Decimal::ZERO;
    let mut category_summaries = Vec::with_capacity(groups.len());

    for (_, mut summary) in groups {
        summary.difference = summary.total_expected - summary.total_actual;
        summary.budget_lines.sort_by_key(|line| line.budget_line_id);
        total_expected += summary.total_expected;
        total_actual += summary.total_actual;
        category_summaries.push(summary);
    }

    DashboardPayload {
        month_id: month.id,
        year: month.year,
        month: month.name().to_string(),
        total_expected,
        total_actual,
        total_difference: total_expected - total_actual,
        category_summaries,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::build_dashboard;
    use crate::domain::ledger::LedgerRow;
    use crate::domain::month::{Month, MonthState};

    fn march() -> Month {
        Month { id: 1, year: 2024, month: 3, state: MonthState::Open }
    }

    fn row(
        id: i64,
        category_id: i64,
        category_name: &str,
        label: &str,
        expected: Decimal,
        actual: Decimal,
    ) -> LedgerRow {
        LedgerRow {
            id,
            month_id: 1,
            category_id,
            label: label.to_string(),
            expected,
            category_name: category_name.to_string(),
            category_color: "#888888".to_string(),
            actual_amount: actual,
            actual_id: if actual.is_zero() { None } else { Some(id + 100) },
        }
    }

    fn cents(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    #[test]
    fn groceries_and_utilities_reconcile_exactly() {
        let rows = vec![
            row(1, 1, "Groceries", "Weekly shop", cents(20000), cents(18550)),
            row(2, 2, "Utilities", "Power", cents(7500), cents(7210)),
        ];

        let payload = build_dashboard(&march(), &rows);

        assert_eq!(payload.total_expected, cents(27500));
        assert_eq!(payload.total_actual, cents(25760));
        assert_eq!(payload.total_difference, cents(1740));

        assert_eq!(payload.category_summaries[0].category_name, "Groceries");
        assert_eq!(payload.category_summaries[0].difference, cents(1450));
        assert_eq!(payload.category_summaries[1].category_name, "Utilities");
        assert_eq!(payload.category_summaries[1].difference, cents(290));
    }

    #[test]
    fn category_totals_sum_to_grand_totals() {
        let rows = vec![
            row(1, 3, "Transport", "Fuel", cents(12345), cents(9999)),
            row(2, 1, "Groceries", "Weekly shop", cents(20000), cents(18550)),
            row(3, 3, "Transport", "Transit pass", cents(5500), Decimal::ZERO),
            row(4, 2, "Utilities", "Power", cents(7500), cents(7210)),
        ];

        let payload = build_dashboard(&march(), &rows);

        let expected_sum: Decimal =
            payload.category_summaries.iter().map(|s| s.total_expected).sum();
        let actual_sum: Decimal = payload.category_summaries.iter().map(|s| s.total_actual).sum();
        let diff_sum: Decimal = payload.category_summaries.iter().map(|s| s.difference).sum();

        assert_eq!(expected_sum, payload.total_expected);
        assert_eq!(actual_sum, payload.total_actual);
        assert_eq!(diff_sum, payload.total_difference);
    }

    #[test]
    fn difference_is_expected_minus_actual_at_every_level() {
        let rows = vec![
            row(1, 1, "Groceries", "Weekly shop", cents(20000), cents(21075)),
            row(2, 1, "Groceries", "Farmers market", cents(4000), cents(1200)),
        ];

        let payload = build_dashboard(&march(), &rows);
        let summary = &payload.category_summaries[0];

        for line in &summary.budget_lines {
            assert_eq!(line.difference, line.expected_amount - line.actual_amount);
        }
        assert_eq!(summary.difference, summary.total_expected - summary.total_actual);
        assert_eq!(payload.total_difference, payload.total_expected - payload.total_actual);
        // Line 1 alone runs over: 200.00 expected vs 210.75 spent.
        assert_eq!(summary.budget_lines[0].difference, cents(-1075));
    }

    #[test]
    fn ordering_is_by_category_id_then_line_id() {
        let rows = vec![
            row(9, 5, "Leisure", "Streaming", cents(1500), Decimal::ZERO),
            row(2, 5, "Leisure", "Cinema", cents(3000), Decimal::ZERO),
            row(4, 1, "Groceries", "Weekly shop", cents(20000), Decimal::ZERO),
        ];

        let payload = build_dashboard(&march(), &rows);

        let category_ids: Vec<i64> =
            payload.category_summaries.iter().map(|s| s.category_id).collect();
        assert_eq!(category_ids, vec![1, 5]);

        let leisure_lines: Vec<i64> =
            payload.category_summaries[1].budget_lines.iter().map(|l| l.budget_line_id).collect();
        assert_eq!(leisure_lines, vec![2, 9]);
    }

    #[test]
    fn empty_month_produces_zeroed_payload() {
        let payload = build_dashboard(&march(), &[]);

        assert_eq!(payload.month, "March");
        assert_eq!(payload.year, 2024);
        assert_eq!(payload.total_expected, Decimal::ZERO);
        assert_eq!(payload.total_actual, Decimal::ZERO);
        assert_eq!(payload.total_difference, Decimal::ZERO);
        assert!(payload.category_summaries.is_empty());
    }

    #[test]
    fn payload_serializes_with_wire_field_names() {
        let rows = vec![row(1, 1, "Groceries", "Weekly shop", cents(20000), cents(18550))];
        let value = serde_json::to_value(build_dashboard(&march(), &rows)).expect("serialize");

        assert_eq!(value["month_id"], serde_json::json!(1));
        assert_eq!(value["month"], serde_json::json!("March"));
        assert_eq!(value["total_expected"], serde_json::json!(200.0));
        assert_eq!(value["total_actual"], serde_json::json!(185.5));
        assert_eq!(value["total_difference"], serde_json::json!(14.5));

        let summary = &value["category_summaries"][0];
        assert_eq!(summary["category_id"], serde_json::json!(1));
        assert_eq!(summary["category_color"], serde_json::json!("#888888"));

        let line = &summary["budget_lines"][0];
        assert_eq!(line["budget_line_id"], serde_json::json!(1));
        assert_eq!(line["expected_amount"], serde_json::json!(200.0));
        assert_eq!(line["actual_amount"], serde_json::json!(185.5));
        assert_eq!(line["difference"], serde_json::json!(14.5));
    }
}
