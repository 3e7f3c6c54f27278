//! Sales and royalty reports.
//!
//! Lines come from paid, non-refunded orders. A single pass buckets them by
//! month and by book; the buckets are then sorted for display.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::money::round_currency;
use crate::types::{BookId, OrderId};

/// One sold order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub book_id: BookId,
    pub title: String,
    pub quantity: i32,
    /// Line revenue (unit price times quantity).
    pub amount: Decimal,
    /// Author's royalty percentage at the time of the report.
    pub royalty_rate: Decimal,
}

impl SaleLine {
    fn royalty(&self) -> Decimal {
        round_currency(self.amount * self.royalty_rate / Decimal::ONE_HUNDRED)
    }
}

/// Grand totals of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub orders: usize,
    pub units: i64,
    pub revenue: Decimal,
    pub royalty: Decimal,
}

/// Sales in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub units: i64,
    pub revenue: Decimal,
}

/// Sales of one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSales {
    pub book_id: BookId,
    pub title: String,
    pub units: i64,
    pub revenue: Decimal,
    pub royalty: Decimal,
}

/// Aggregated sales report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub year: Option<i32>,
    pub totals: SalesTotals,
    /// Oldest month first.
    pub by_month: Vec<MonthlySales>,
    /// Highest revenue first.
    pub by_book: Vec<BookSales>,
}

impl SalesReport {
    /// Build a report, optionally restricted to one calendar year.
    #[must_use]
    pub fn build<'a, I>(lines: I, year: Option<i32>) -> Self
    where
        I: IntoIterator<Item = &'a SaleLine>,
    {
        let mut totals = SalesTotals::default();
        let mut orders = HashSet::new();
        let mut months: BTreeMap<(i32, u32), (i64, Decimal)> = BTreeMap::new();
        let mut books: HashMap<BookId, BookSales> = HashMap::new();

        for line in lines {
            let (line_year, line_month) = (line.placed_at.year(), line.placed_at.month());
            if year.is_some_and(|y| y != line_year) {
                continue;
            }

            let units = i64::from(line.quantity);
            let royalty = line.royalty();

            orders.insert(line.order_id);
            totals.units += units;
            totals.revenue += line.amount;
            totals.royalty += royalty;

            let month = months.entry((line_year, line_month)).or_default();
            month.0 += units;
            month.1 += line.amount;

            let book = books.entry(line.book_id).or_insert_with(|| BookSales {
                book_id: line.book_id,
                title: line.title.clone(),
                units: 0,
                revenue: Decimal::ZERO,
                royalty: Decimal::ZERO,
            });
            book.units += units;
            book.revenue += line.amount;
            book.royalty += royalty;
        }

        totals.orders = orders.len();

        let by_month = months
            .into_iter()
            .map(|((year, month), (units, revenue))| MonthlySales {
                year,
                month,
                units,
                revenue,
            })
            .collect();

        let mut by_book: Vec<BookSales> = books.into_values().collect();
        by_book.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.book_id.cmp(&b.book_id))
        });

        Self {
            year,
            totals,
            by_month,
            by_book,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn line(order: i32, y: i32, m: u32, book: i32, qty: i32, amount: i64) -> SaleLine {
        SaleLine {
            order_id: OrderId::new(order),
            placed_at: Utc.with_ymd_and_hms(y, m, 15, 10, 0, 0).single().unwrap_or_default(),
            book_id: BookId::new(book),
            title: format!("Book {book}"),
            quantity: qty,
            amount: Decimal::from(amount),
            royalty_rate: Decimal::from(10),
        }
    }

    #[test]
    fn test_empty_report() {
        let report = SalesReport::build(&Vec::<SaleLine>::new(), None);
        assert_eq!(report.totals, SalesTotals::default());
        assert!(report.by_month.is_empty());
        assert!(report.by_book.is_empty());
    }

    #[test]
    fn test_totals_count_distinct_orders() {
        let lines = vec![
            line(1, 2024, 3, 10, 2, 600),
            line(1, 2024, 3, 11, 1, 199),
            line(2, 2024, 4, 10, 1, 300),
        ];
        let report = SalesReport::build(&lines, None);
        assert_eq!(report.totals.orders, 2);
        assert_eq!(report.totals.units, 4);
        assert_eq!(report.totals.revenue, Decimal::from(1099));
        assert_eq!(report.totals.royalty, Decimal::new(10_990, 2));
    }

    #[test]
    fn test_months_sorted_chronologically() {
        let lines = vec![
            line(1, 2024, 11, 10, 1, 100),
            line(2, 2023, 12, 10, 1, 100),
            line(3, 2024, 2, 10, 1, 100),
        ];
        let report = SalesReport::build(&lines, None);
        let months: Vec<_> = report.by_month.iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(months, vec![(2023, 12), (2024, 2), (2024, 11)]);
    }

    #[test]
    fn test_books_sorted_by_revenue() {
        let lines = vec![
            line(1, 2024, 1, 10, 1, 100),
            line(2, 2024, 1, 11, 3, 900),
            line(3, 2024, 1, 10, 1, 100),
        ];
        let report = SalesReport::build(&lines, None);
        assert_eq!(report.by_book.len(), 2);
        assert_eq!(report.by_book.first().map(|b| b.book_id), Some(BookId::new(11)));
        assert_eq!(report.by_book.get(1).map(|b| b.units), Some(2));
    }

    #[test]
    fn test_year_filter() {
        let lines = vec![line(1, 2023, 6, 10, 1, 100), line(2, 2024, 6, 10, 2, 400)];
        let report = SalesReport::build(&lines, Some(2024));
        assert_eq!(report.year, Some(2024));
        assert_eq!(report.totals.orders, 1);
        assert_eq!(report.totals.revenue, Decimal::from(400));
        assert_eq!(report.by_month.len(), 1);
    }

    #[test]
    fn test_royalty_rounded_per_line() {
        let mut l = line(1, 2024, 1, 10, 1, 0);
        l.amount = Decimal::new(33_333, 2);
        l.royalty_rate = Decimal::new(125, 1);
        // 333.33 * 12.5% = 41.66625
        let report = SalesReport::build(&[l], None);
        assert_eq!(report.totals.royalty, Decimal::new(4_167, 2));
    }
}
