//! KPI, trend and group-by aggregation over transaction records
//!
//! Every function here is pure over a borrowed slice of records and treats
//! an empty slice as a valid input with a zeroed or empty result.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::data::TransactionRecord;

/// Headline totals for a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_sales: f64,
    pub total_profit: f64,
    /// Distinct order identifiers, not rows
    pub total_orders: usize,
    pub total_quantity: i64,
}

/// Numeric columns that can be aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Sales,
    Profit,
    Discount,
    Quantity,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Sales,
        Metric::Profit,
        Metric::Discount,
        Metric::Quantity,
    ];

    pub fn value(self, record: &TransactionRecord) -> f64 {
        match self {
            Metric::Sales => record.sales,
            Metric::Profit => record.profit,
            Metric::Discount => record.discount,
            Metric::Quantity => record.quantity as f64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Sales => "Sales",
            Metric::Profit => "Profit",
            Metric::Discount => "Discount",
            Metric::Quantity => "Quantity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calendar month used as the trend grouping axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBucket {
    pub year: i32,
    pub month: u32,
}

impl TimeBucket {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The bucket immediately after this one
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One month of a trend series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub bucket: TimeBucket,
    pub values: BTreeMap<Metric, f64>,
}

impl TrendPoint {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// Categorical grouping axis for [`group_summary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    Region,
    Segment,
    /// Keyed by the ordered pair (category, sub-category)
    CategorySubCategory,
}

impl Dimension {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Dimension::Category => &["Category"],
            Dimension::Region => &["Region"],
            Dimension::Segment => &["Segment"],
            Dimension::CategorySubCategory => &["Category", "Sub-Category"],
        }
    }

    fn key(self, record: &TransactionRecord) -> Vec<String> {
        match self {
            Dimension::Category => vec![record.category.clone()],
            Dimension::Region => vec![record.region.clone()],
            Dimension::Segment => vec![record.segment.clone()],
            Dimension::CategorySubCategory => {
                vec![record.category.clone(), record.sub_category.clone()]
            }
        }
    }
}

/// Aggregated metrics for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// One value per column of the dimension, in [`Dimension::columns`] order
    pub key: Vec<String>,
    pub rows: usize,
    pub sales: f64,
    pub profit: f64,
    /// Present only when [`Metric::Discount`] was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_discount: Option<f64>,
    /// Present only when [`Metric::Quantity`] was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_quantity: Option<f64>,
}

impl GroupSummary {
    fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Sales => self.sales,
            Metric::Profit => self.profit,
            Metric::Discount => self.mean_discount.unwrap_or(0.0),
            Metric::Quantity => self.mean_quantity.unwrap_or(0.0),
        }
    }
}

/// Headline totals over `records`.
///
/// # Arguments
/// * `records` - Transaction lines to total; may be empty
///
/// # Returns
/// * `Kpis` with summed sales, profit and quantity and the number of distinct
///   order ids. An empty input yields all zeros.
pub fn kpis(records: &[TransactionRecord]) -> Kpis {
    let orders: HashSet<&str> = records.iter().map(|r| r.order_id.as_str()).collect();

    Kpis {
        total_sales: records.iter().map(|r| r.sales).sum(),
        total_profit: records.iter().map(|r| r.profit).sum(),
        total_orders: orders.len(),
        total_quantity: records.iter().map(|r| r.quantity).sum(),
    }
}

/// Sum `metrics` per calendar month, in chronological order.
///
/// `metrics` is treated as a set: listing a metric twice sums it once.
/// Months with no records do not appear in the output; the series is not
/// zero-filled.
pub fn monthly_trend(records: &[TransactionRecord], metrics: &[Metric]) -> Vec<TrendPoint> {
    let metrics: BTreeSet<Metric> = metrics.iter().copied().collect();
    let mut buckets: BTreeMap<TimeBucket, BTreeMap<Metric, f64>> = BTreeMap::new();

    for record in records {
        let values = buckets.entry(TimeBucket::of(record.order_date)).or_default();
        for &metric in &metrics {
            *values.entry(metric).or_insert(0.0) += metric.value(record);
        }
    }

    buckets
        .into_iter()
        .map(|(bucket, values)| TrendPoint { bucket, values })
        .collect()
}

/// Records whose order date falls in `year`, in their original order.
///
/// A year with no orders gives an empty vector, not an error.
pub fn filter_by_year(records: &[TransactionRecord], year: i32) -> Vec<TransactionRecord> {
    records.iter().filter(|r| r.year() == year).cloned().collect()
}

/// Distinct order years, ascending
pub fn available_years(records: &[TransactionRecord]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().map(|r| r.year()).collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Sum sales and profit per distinct value of `dimension`.
///
/// Groups come out in the order their first record appears. Requesting
/// [`Metric::Discount`] or [`Metric::Quantity`] adds the per-group mean of
/// that column.
pub fn group_summary(
    records: &[TransactionRecord],
    dimension: Dimension,
    metrics: &[Metric],
) -> Vec<GroupSummary> {
    let with_discount = metrics.contains(&Metric::Discount);
    let with_quantity = metrics.contains(&Metric::Quantity);

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(GroupSummary, f64, f64)> = Vec::new();

    for record in records {
        let key = dimension.key(record);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((
                GroupSummary {
                    key,
                    rows: 0,
                    sales: 0.0,
                    profit: 0.0,
                    mean_discount: None,
                    mean_quantity: None,
                },
                0.0,
                0.0,
            ));
            groups.len() - 1
        });

        let (summary, discount_sum, quantity_sum) = &mut groups[slot];
        summary.rows += 1;
        summary.sales += record.sales;
        summary.profit += record.profit;
        *discount_sum += record.discount;
        *quantity_sum += record.quantity as f64;
    }

    groups
        .into_iter()
        .map(|(mut summary, discount_sum, quantity_sum)| {
            let n = summary.rows as f64;
            if with_discount {
                summary.mean_discount = Some(discount_sum / n);
            }
            if with_quantity {
                summary.mean_quantity = Some(quantity_sum / n);
            }
            summary
        })
        .collect()
}

/// Sort summaries by `metric`, largest first. Ties keep their existing
/// (first-seen) order.
pub fn sort_by_metric(summaries: &mut [GroupSummary], metric: Metric) {
    summaries.sort_by(|a, b| b.metric(metric).total_cmp(&a.metric(metric)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(
        order: &str,
        date: (i32, u32, u32),
        category: &str,
        sub: &str,
        region: &str,
        sales: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            order_id: order.to_string(),
            order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category: category.to_string(),
            sub_category: sub.to_string(),
            region: region.to_string(),
            segment: "Consumer".to_string(),
            sales,
            profit: sales / 10.0,
            discount: 0.2,
            quantity: 2,
        }
    }

    fn worked_example() -> Vec<TransactionRecord> {
        vec![
            record("A", (2024, 1, 5), "Furniture", "Chairs", "West", 100.0),
            record("A", (2024, 1, 20), "Technology", "Phones", "East", 50.0),
            record("B", (2024, 2, 1), "Furniture", "Tables", "West", 30.0),
        ]
    }

    #[test]
    fn test_kpis_worked_example() {
        let kpis = kpis(&worked_example());
        assert_relative_eq!(kpis.total_sales, 180.0);
        assert_relative_eq!(kpis.total_profit, 18.0);
        assert_eq!(kpis.total_orders, 2);
        assert_eq!(kpis.total_quantity, 6);
    }

    #[test]
    fn test_kpis_empty() {
        assert_eq!(kpis(&[]), Kpis::default());
        assert_eq!(kpis(&[]).total_orders, 0);
    }

    #[test]
    fn test_monthly_trend_worked_example() {
        let trend = monthly_trend(&worked_example(), &[Metric::Sales]);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].bucket, TimeBucket { year: 2024, month: 1 });
        assert_relative_eq!(trend[0].get(Metric::Sales).unwrap(), 150.0);
        assert_eq!(trend[1].bucket.to_string(), "2024-02");
        assert_relative_eq!(trend[1].get(Metric::Sales).unwrap(), 30.0);
        assert_eq!(trend[0].get(Metric::Profit), None);
    }

    #[test]
    fn test_monthly_trend_sorted_and_gaps_omitted() {
        let records = vec![
            record("C", (2024, 6, 1), "Furniture", "Chairs", "West", 5.0),
            record("A", (2023, 12, 31), "Furniture", "Chairs", "West", 1.0),
            record("B", (2024, 3, 15), "Furniture", "Chairs", "West", 2.0),
        ];

        let trend = monthly_trend(&records, &[Metric::Sales, Metric::Profit, Metric::Discount]);
        let buckets: Vec<String> = trend.iter().map(|p| p.bucket.to_string()).collect();
        assert_eq!(buckets, vec!["2023-12", "2024-03", "2024-06"]);
        assert_relative_eq!(trend[2].get(Metric::Discount).unwrap(), 0.2);
        assert!(monthly_trend(&[], &[Metric::Sales]).is_empty());
    }

    #[test]
    fn test_monthly_trend_repeated_metric_counted_once() {
        let records = vec![record("A", (2024, 1, 5), "Furniture", "Chairs", "West", 100.0)];

        let trend = monthly_trend(&records, &[Metric::Sales, Metric::Sales, Metric::Profit]);
        assert_eq!(trend.len(), 1);
        assert_relative_eq!(trend[0].get(Metric::Sales).unwrap(), 100.0);
        assert_relative_eq!(trend[0].get(Metric::Profit).unwrap(), 10.0);
        assert_eq!(trend[0].values.len(), 2);
    }

    #[test]
    fn test_filter_by_year() {
        let mut records = worked_example();
        records.push(record("Z", (2023, 7, 4), "Furniture", "Chairs", "West", 9.0));

        let filtered = filter_by_year(&records, 2023);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].order_id, "Z");

        assert_eq!(filter_by_year(&records, 2024).len(), 3);
        assert!(filter_by_year(&records, 1999).is_empty());
        assert_eq!(available_years(&records), vec![2023, 2024]);
    }

    #[test]
    fn test_group_summary_conservation() {
        let records = worked_example();
        let total = kpis(&records).total_sales;

        for dimension in [Dimension::Category, Dimension::Region, Dimension::Segment] {
            let summed: f64 = group_summary(&records, dimension, &[Metric::Sales])
                .iter()
                .map(|g| g.sales)
                .sum();
            assert_relative_eq!(summed, total);
        }
    }

    #[test]
    fn test_group_summary_first_seen_order() {
        let groups = group_summary(
            &worked_example(),
            Dimension::Category,
            &[Metric::Sales, Metric::Profit],
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, vec!["Furniture"]);
        assert_relative_eq!(groups[0].sales, 130.0);
        assert_eq!(groups[0].rows, 2);
        assert_eq!(groups[1].key, vec!["Technology"]);
        assert_eq!(groups[0].mean_discount, None);
    }

    #[test]
    fn test_sub_category_scoped_within_category() {
        let records = vec![
            record("A", (2024, 1, 5), "Furniture", "Storage", "West", 10.0),
            record("B", (2024, 1, 6), "Office Supplies", "Storage", "West", 20.0),
            record("C", (2024, 1, 7), "Furniture", "Storage", "West", 5.0),
        ];

        let groups = group_summary(&records, Dimension::CategorySubCategory, &[]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, vec!["Furniture", "Storage"]);
        assert_relative_eq!(groups[0].sales, 15.0);
        assert_eq!(groups[1].key, vec!["Office Supplies", "Storage"]);
    }

    #[test]
    fn test_group_summary_means() {
        let mut records = worked_example();
        records[0].discount = 0.0;
        records[0].quantity = 4;

        let groups = group_summary(
            &records,
            Dimension::Region,
            &[Metric::Discount, Metric::Quantity],
        );
        let west = &groups[0];
        assert_eq!(west.key, vec!["West"]);
        assert_relative_eq!(west.mean_discount.unwrap(), 0.1);
        assert_relative_eq!(west.mean_quantity.unwrap(), 3.0);
    }

    #[test]
    fn test_sort_by_metric_ties_keep_first_seen() {
        let records = vec![
            record("A", (2024, 1, 5), "Furniture", "Chairs", "South", 10.0),
            record("B", (2024, 1, 5), "Furniture", "Chairs", "East", 30.0),
            record("C", (2024, 1, 5), "Furniture", "Chairs", "North", 10.0),
            record("D", (2024, 1, 5), "Furniture", "Chairs", "West", 20.0),
        ];

        let mut groups = group_summary(&records, Dimension::Region, &[]);
        sort_by_metric(&mut groups, Metric::Sales);
        let order: Vec<&str> = groups.iter().map(|g| g.key[0].as_str()).collect();
        assert_eq!(order, vec!["East", "West", "South", "North"]);
    }

    #[test]
    fn test_group_summary_empty() {
        assert!(group_summary(&[], Dimension::Segment, &Metric::ALL).is_empty());
    }
}
