//! Transaction dataset loading and normalization using Polars

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

use crate::error::DataFormatError;
use crate::frame::{self, FrameIssue};

pub const ORDER_ID: &str = "Order ID";
pub const ORDER_DATE: &str = "Order Date";
pub const CATEGORY: &str = "Category";
pub const SUB_CATEGORY: &str = "Sub-Category";
pub const REGION: &str = "Region";
pub const SEGMENT: &str = "Segment";
pub const SALES: &str = "Sales";
pub const PROFIT: &str = "Profit";
pub const DISCOUNT: &str = "Discount";
pub const QUANTITY: &str = "Quantity";

/// Columns every transaction source must carry. Anything else is ignored.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    ORDER_ID,
    ORDER_DATE,
    CATEGORY,
    SUB_CATEGORY,
    REGION,
    SEGMENT,
    SALES,
    PROFIT,
    DISCOUNT,
    QUANTITY,
];

/// One retail order line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Shared by every line of the same order
    pub order_id: String,
    pub order_date: NaiveDate,
    pub category: String,
    /// Only unique within its category
    pub sub_category: String,
    pub region: String,
    pub segment: String,
    /// Non-negative currency amount
    pub sales: f64,
    /// Signed currency amount
    pub profit: f64,
    /// Fraction in [0, 1]
    pub discount: f64,
    /// Positive unit count
    pub quantity: i64,
}

impl TransactionRecord {
    pub fn year(&self) -> i32 {
        self.order_date.year()
    }
}

/// Immutable snapshot of a transaction source
#[derive(Debug)]
pub struct Dataset {
    records: Vec<TransactionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    /// Records in source order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a transaction CSV into typed records.
///
/// Reads the whole file (UTF-8 or Latin-1), checks the required columns,
/// parses `Order Date` as a calendar date and validates numeric ranges.
/// Any failure aborts the load; no partial dataset is returned.
///
/// Prefer [`crate::cache::DatasetCache::load`], which memoizes this per
/// source fingerprint.
pub fn load_dataset(path: &Path) -> Result<Dataset, DataFormatError> {
    let start = Instant::now();

    let bytes = std::fs::read(path).map_err(|source| DataFormatError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let text = frame::decode_text(bytes);

    let records = parse_records(text).map_err(|issue| issue.into_data_error(path))?;

    log::info!(
        "loaded {} transactions from {} in {:.2}s",
        records.len(),
        path.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(Dataset::new(records))
}

fn parse_records(text: String) -> Result<Vec<TransactionRecord>, FrameIssue> {
    let df = frame::parse_csv(text)?;
    frame::require_columns(&df, &REQUIRED_COLUMNS)?;

    let order_ids = frame::string_column(&df, ORDER_ID)?;
    let dates = frame::date_column(&df, ORDER_DATE)?;
    let categories = frame::string_column(&df, CATEGORY)?;
    let sub_categories = frame::string_column(&df, SUB_CATEGORY)?;
    let regions = frame::string_column(&df, REGION)?;
    let segments = frame::string_column(&df, SEGMENT)?;
    let sales = frame::f64_column(&df, SALES)?;
    let profits = frame::f64_column(&df, PROFIT)?;
    let discounts = frame::f64_column(&df, DISCOUNT)?;
    let quantities = frame::i64_column(&df, QUANTITY)?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = i + 1;
        check_range(SALES, row, sales[i] >= 0.0, || format!("{} is negative", sales[i]))?;
        check_range(DISCOUNT, row, (0.0..=1.0).contains(&discounts[i]), || {
            format!("{} is outside [0, 1]", discounts[i])
        })?;
        check_range(QUANTITY, row, quantities[i] > 0, || {
            format!("{} is not positive", quantities[i])
        })?;

        records.push(TransactionRecord {
            order_id: order_ids[i].clone(),
            order_date: dates[i],
            category: categories[i].clone(),
            sub_category: sub_categories[i].clone(),
            region: regions[i].clone(),
            segment: segments[i].clone(),
            sales: sales[i],
            profit: profits[i],
            discount: discounts[i],
            quantity: quantities[i],
        });
    }

    Ok(records)
}

fn check_range(
    column: &str,
    row: usize,
    ok: bool,
    detail: impl FnOnce() -> String,
) -> Result<(), FrameIssue> {
    if ok {
        Ok(())
    } else {
        Err(FrameIssue::BadValue {
            column: column.to_string(),
            row,
            detail: detail(),
        })
    }
}
