//! Sales aggregation and report rendering

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One completed order as read for the sales report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompletedSale {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Product price at the time the report is generated
    pub unit_price: Decimal,
}

/// Per-product totals for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesLine {
    pub product_name: String,
    pub total_sold: i64,
    pub total_price: Decimal,
    pub product_id: Uuid,
}

/// Aggregated sales for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub date: NaiveDate,
    /// Sorted by product name, then product id
    pub lines: Vec<SalesLine>,
    pub total_revenue: Decimal,
}

impl SalesSummary {
    /// Group completed sales by product and total them
    pub fn aggregate<I>(date: NaiveDate, sales: I) -> Self
    where
        I: IntoIterator<Item = CompletedSale>,
    {
        let mut groups: BTreeMap<(String, Uuid), (i64, Decimal)> = BTreeMap::new();

        for sale in sales {
            let entry = groups
                .entry((sale.product_name, sale.product_id))
                .or_insert((0, Decimal::ZERO));
            entry.0 += i64::from(sale.quantity);
            entry.1 += Decimal::from(sale.quantity) * sale.unit_price;
        }

        let lines: Vec<SalesLine> = groups
            .into_iter()
            .map(|((product_name, product_id), (total_sold, total_price))| SalesLine {
                product_name,
                total_sold,
                total_price,
                product_id,
            })
            .collect();

        let total_revenue = lines.iter().map(|line| line.total_price).sum();

        Self {
            date,
            lines,
            total_revenue,
        }
    }

    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|line| line.total_sold).sum()
    }

    /// Human-readable report body
    pub fn render(&self) -> String {
        let mut out = vec![
            format!("Sales Report - {}", self.date.format("%B %d, %Y")),
            String::new(),
        ];

        for line in &self.lines {
            out.push(format!(
                "{}: {} units | {}",
                line.product_name,
                line.total_sold,
                money(line.total_price)
            ));
        }

        out.push(String::new());
        out.push(format!("Total Revenue: {}", money(self.total_revenue)));
        out.join("\n")
    }
}

/// A product at or below the low-stock threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LowStockEntry {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
}

/// Render a low-stock alert body, or `None` when nothing is low
pub fn render_low_stock(entries: &[LowStockEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let mut sorted: Vec<&LowStockEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));

    Some(
        sorted
            .iter()
            .map(|entry| format!("{}: Only {} left!", entry.name, entry.quantity))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Format an amount as dollars with exactly two decimals
pub fn money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    format!("${}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(Decimal::from(4000)), "$4000.00");
        assert_eq!(money(Decimal::new(12345, 3)), "$12.35");
        assert_eq!(money(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_render_empty_day() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let summary = SalesSummary::aggregate(date, Vec::new());
        assert_eq!(
            summary.render(),
            "Sales Report - October 17, 2026\n\n\nTotal Revenue: $0.00"
        );
    }

    #[test]
    fn test_low_stock_none_when_empty() {
        assert_eq!(render_low_stock(&[]), None);
    }
}
