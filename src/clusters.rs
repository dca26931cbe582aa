//! Per-cluster statistics and human-readable cluster interpretation

use serde::Serialize;
use std::collections::BTreeMap;

use crate::artifacts::ClusterPoint;

/// Labels attached to cluster identifiers.
///
/// Ids without an entry stay unlabelled; the table is not assumed to cover
/// every id an upstream model may emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInterpretation {
    labels: BTreeMap<i64, String>,
}

impl ClusterInterpretation {
    pub fn new(labels: BTreeMap<i64, String>) -> Self {
        Self { labels }
    }

    pub fn label(&self, cluster: i64) -> Option<&str> {
        self.labels.get(&cluster).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ClusterInterpretation {
    /// The four segments identified for the Superstore K-Means model
    fn default() -> Self {
        Self::new(default_labels())
    }
}

pub fn default_labels() -> BTreeMap<i64, String> {
    [
        (0, "Regular Customers"),
        (1, "VIPs - High Value Clients"),
        (2, "Medium Segment - Stable"),
        (3, "Risky - Discount Loss Group"),
    ]
    .into_iter()
    .map(|(id, label)| (id, label.to_string()))
    .collect()
}

/// Descriptive statistics for one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster: i64,
    pub size: usize,
    pub mean_sales: f64,
    pub mean_profit: f64,
    pub mean_discount: f64,
    pub mean_quantity: f64,
    /// `None` when the interpretation has no entry for this id
    pub label: Option<String>,
}

/// Round to two decimals, halves away from zero.
///
/// `round2(0.125) == 0.13`, `round2(-0.125) == -0.13`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean metrics per distinct cluster id, ascending by id.
pub fn summarize(
    clusters: &[ClusterPoint],
    interpretation: &ClusterInterpretation,
) -> Vec<ClusterSummary> {
    #[derive(Default)]
    struct Acc {
        n: usize,
        sales: f64,
        profit: f64,
        discount: f64,
        quantity: f64,
    }

    let mut groups: BTreeMap<i64, Acc> = BTreeMap::new();
    for point in clusters {
        let acc = groups.entry(point.cluster).or_default();
        acc.n += 1;
        acc.sales += point.sales;
        acc.profit += point.profit;
        acc.discount += point.discount;
        acc.quantity += point.quantity;
    }

    groups
        .into_iter()
        .map(|(cluster, acc)| {
            let n = acc.n as f64;
            let label = interpretation.label(cluster).map(str::to_string);
            if label.is_none() {
                log::debug!("cluster {} has no interpretation label", cluster);
            }

            ClusterSummary {
                cluster,
                size: acc.n,
                mean_sales: round2(acc.sales / n),
                mean_profit: round2(acc.profit / n),
                mean_discount: round2(acc.discount / n),
                mean_quantity: round2(acc.quantity / n),
                label,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(cluster: i64, sales: f64, profit: f64, discount: f64, quantity: f64) -> ClusterPoint {
        ClusterPoint {
            cluster,
            sales,
            profit,
            discount,
            quantity,
        }
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_summarize_all_labelled() {
        let points = vec![
            point(2, 50.0, 5.0, 0.1, 3.0),
            point(0, 10.0, 1.0, 0.0, 1.0),
            point(1, 900.0, 300.0, 0.0, 5.0),
            point(3, 40.0, -20.0, 0.7, 2.0),
            point(0, 20.0, 2.0, 0.2, 2.0),
        ];

        let summary = summarize(&points, &ClusterInterpretation::default());
        assert_eq!(summary.len(), 4);
        assert!(summary.iter().all(|s| s.label.is_some()));

        let ids: Vec<i64> = summary.iter().map(|s| s.cluster).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let regular = &summary[0];
        assert_eq!(regular.size, 2);
        assert_eq!(regular.mean_sales, 15.0);
        assert_eq!(regular.mean_profit, 1.5);
        assert_eq!(regular.mean_discount, 0.1);
        assert_eq!(regular.mean_quantity, 1.5);
        assert_eq!(regular.label.as_deref(), Some("Regular Customers"));
    }

    #[test]
    fn test_unknown_cluster_unlabelled() {
        let points = vec![point(0, 1.0, 1.0, 0.0, 1.0), point(4, 2.0, 2.0, 0.0, 1.0)];

        let summary = summarize(&points, &ClusterInterpretation::default());
        assert_eq!(summary.len(), 2);
        assert!(summary[0].label.is_some());
        assert_eq!(summary[1].cluster, 4);
        assert_eq!(summary[1].label, None);
    }

    #[test]
    fn test_injected_interpretation() {
        let mut labels = BTreeMap::new();
        labels.insert(7, "Seven".to_string());
        let interpretation = ClusterInterpretation::new(labels);

        let points = [point(7, 1.0, 1.0, 0.0, 1.0), point(0, 1.0, 1.0, 0.0, 1.0)];
        let summary = summarize(&points, &interpretation);
        assert_eq!(summary[0].label, None);
        assert_eq!(summary[1].label.as_deref(), Some("Seven"));
    }

    #[test]
    fn test_means_are_rounded() {
        let points = vec![
            point(0, 1.0, 0.0, 0.0, 1.0),
            point(0, 1.0, 0.0, 0.0, 1.0),
            point(0, 2.0, 0.0, 0.0, 2.0),
        ];

        let summary = summarize(&points, &ClusterInterpretation::default());
        assert_eq!(summary[0].mean_sales, 1.33);
        assert_eq!(summary[0].mean_quantity, 1.33);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[], &ClusterInterpretation::default()).is_empty());
    }
}
