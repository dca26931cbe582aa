//! Loading of upstream forecast and cluster artifacts
//!
//! Both artifacts are produced outside this crate and consumed as flat CSV
//! files. Schema problems make the artifact unavailable; ordering problems
//! in a forecast are reported as [`ValidationWarning`]s and loading carries
//! on.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::aggregate::{Metric, TimeBucket, TrendPoint};
use crate::error::{ArtifactSchemaError, ValidationWarning, WarningKind};
use crate::frame::{self, FrameIssue};

pub const FORECAST_COLUMNS: [&str; 4] = ["ds", "yhat", "yhat_lower", "yhat_upper"];
pub const CLUSTER_COLUMNS: [&str; 5] = ["Cluster", "Sales", "Profit", "Discount", "Quantity"];

/// Column headings the presentation layer shows for forecast rows
pub const FORECAST_DISPLAY_COLUMNS: [&str; 4] = ["Date", "Forecast", "Lower Bound", "Upper Bound"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(rename = "Date")]
    pub ds: NaiveDate,
    #[serde(rename = "Forecast")]
    pub yhat: f64,
    #[serde(rename = "Lower Bound")]
    pub yhat_lower: f64,
    #[serde(rename = "Upper Bound")]
    pub yhat_upper: f64,
}

/// A loaded forecast and whatever its validation turned up
#[derive(Debug, Clone, Default, Serialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub warnings: Vec<ValidationWarning>,
}

impl Forecast {
    pub fn tail(&self, n: usize) -> &[ForecastPoint] {
        tail(&self.points, n)
    }
}

/// One row of the cluster artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterPoint {
    pub cluster: i64,
    pub sales: f64,
    pub profit: f64,
    pub discount: f64,
    pub quantity: f64,
}

/// Load a forecast artifact and run the non-fatal checks over it.
///
/// # Arguments
/// * `path` - CSV with `ds`, `yhat`, `yhat_lower` and `yhat_upper` columns
///
/// # Returns
/// * `Forecast` with rows in file order plus any validation warnings. Only
///   an unreadable file or a schema problem is an error.
pub fn load_forecast(path: &Path) -> Result<Forecast, ArtifactSchemaError> {
    let text = read_artifact("forecast", path)?;
    let points = parse_forecast(text).map_err(|issue| issue.into_artifact_error("forecast", path))?;
    let warnings = validate_forecast(&points);

    for warning in &warnings {
        log::warn!("forecast {}: {}", path.display(), warning);
    }
    log::info!(
        "loaded {} forecast rows from {} ({} warnings)",
        points.len(),
        path.display(),
        warnings.len()
    );

    Ok(Forecast { points, warnings })
}

/// Load per-row cluster assignments.
///
/// # Arguments
/// * `path` - CSV with `Sales`, `Profit`, `Discount`, `Quantity` and `Cluster`;
///   extra columns are ignored
///
/// # Returns
/// * One `ClusterPoint` per data row, in file order
pub fn load_clusters(path: &Path) -> Result<Vec<ClusterPoint>, ArtifactSchemaError> {
    let text = read_artifact("cluster", path)?;
    let points = parse_clusters(text).map_err(|issue| issue.into_artifact_error("cluster", path))?;

    log::info!("loaded {} cluster rows from {}", points.len(), path.display());
    Ok(points)
}

/// The last `n` rows, in their original order. Asking for more rows than
/// exist returns all of them.
pub fn tail<T>(rows: &[T], n: usize) -> &[T] {
    &rows[rows.len().saturating_sub(n)..]
}

fn read_artifact(artifact: &'static str, path: &Path) -> Result<String, ArtifactSchemaError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactSchemaError::Unreadable {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(frame::decode_text(bytes))
}

fn parse_forecast(text: String) -> Result<Vec<ForecastPoint>, FrameIssue> {
    let df = frame::parse_csv(text)?;
    frame::require_columns(&df, &FORECAST_COLUMNS)?;

    let dates = frame::date_column(&df, "ds")?;
    let yhat = frame::f64_column(&df, "yhat")?;
    let lower = frame::f64_column(&df, "yhat_lower")?;
    let upper = frame::f64_column(&df, "yhat_upper")?;

    Ok((0..df.height())
        .map(|i| ForecastPoint {
            ds: dates[i],
            yhat: yhat[i],
            yhat_lower: lower[i],
            yhat_upper: upper[i],
        })
        .collect())
}

fn parse_clusters(text: String) -> Result<Vec<ClusterPoint>, FrameIssue> {
    let df = frame::parse_csv(text)?;
    frame::require_columns(&df, &CLUSTER_COLUMNS)?;

    let clusters = frame::i64_column(&df, "Cluster")?;
    let sales = frame::f64_column(&df, "Sales")?;
    let profit = frame::f64_column(&df, "Profit")?;
    let discount = frame::f64_column(&df, "Discount")?;
    let quantity = frame::f64_column(&df, "Quantity")?;

    Ok((0..df.height())
        .map(|i| ClusterPoint {
            cluster: clusters[i],
            sales: sales[i],
            profit: profit[i],
            discount: discount[i],
            quantity: quantity[i],
        })
        .collect())
}

/// Check interval ordering per row and strictly increasing, month-contiguous
/// dates across rows.
pub fn validate_forecast(points: &[ForecastPoint]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, point) in points.iter().enumerate() {
        let row = i + 1;

        if !(point.yhat_lower <= point.yhat && point.yhat <= point.yhat_upper) {
            warnings.push(ValidationWarning {
                row,
                kind: WarningKind::IntervalOrder,
                message: format!(
                    "interval out of order: lower {} / point {} / upper {}",
                    point.yhat_lower, point.yhat, point.yhat_upper
                ),
            });
        }

        let Some(prev) = i.checked_sub(1).map(|p| &points[p]) else {
            continue;
        };

        if point.ds <= prev.ds {
            warnings.push(ValidationWarning {
                row,
                kind: WarningKind::NonMonotonicDate,
                message: format!("date {} does not follow {}", point.ds, prev.ds),
            });
        } else {
            let previous = TimeBucket::of(prev.ds);
            let actual = TimeBucket::of(point.ds);
            if actual == previous {
                warnings.push(ValidationWarning {
                    row,
                    kind: WarningKind::DuplicateMonth,
                    message: format!(
                        "date {} falls in month {} already covered by {}",
                        point.ds, actual, prev.ds
                    ),
                });
            } else if actual > previous.next() {
                warnings.push(ValidationWarning {
                    row,
                    kind: WarningKind::MonthGap,
                    message: format!(
                        "expected month {} after {}, found {}",
                        previous.next(),
                        prev.ds,
                        point.ds
                    ),
                });
            }
        }
    }

    warnings
}

/// Actual monthly sales joined with forecast rows on their calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRow {
    pub bucket: TimeBucket,
    pub actual_sales: Option<f64>,
    pub forecast: Option<ForecastPoint>,
}

/// Outer-join an actual sales trend with a forecast, ordered by month.
///
/// Months that only one side covers keep `None` for the other side. If
/// several forecast rows fall into one month the last one wins; loading
/// reports those rows as [`WarningKind::DuplicateMonth`].
pub fn forecast_overlay(actual: &[TrendPoint], forecast: &[ForecastPoint]) -> Vec<OverlayRow> {
    let mut rows: BTreeMap<TimeBucket, OverlayRow> = BTreeMap::new();

    for point in actual {
        let row = rows.entry(point.bucket).or_insert_with(|| empty_row(point.bucket));
        row.actual_sales = point.get(Metric::Sales);
    }
    for point in forecast {
        let bucket = TimeBucket::of(point.ds);
        let row = rows.entry(bucket).or_insert_with(|| empty_row(bucket));
        row.forecast = Some(point.clone());
    }

    rows.into_values().collect()
}

fn empty_row(bucket: TimeBucket) -> OverlayRow {
    OverlayRow {
        bucket,
        actual_sales: None,
        forecast: None,
    }
}
