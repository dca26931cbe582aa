//! SalesForge: sales analytics over a retail transaction snapshot
//!
//! This library loads a transaction dataset once per source fingerprint and
//! derives KPIs, monthly trends and categorical breakdowns from it. It also
//! loads precomputed forecast and customer-cluster artifacts and attaches
//! human-readable interpretations to cluster identifiers.

pub mod aggregate;
pub mod artifacts;
pub mod cache;
pub mod cli;
pub mod clusters;
pub mod config;
pub mod data;
pub mod error;
mod frame;

// Re-export public items for easier access
pub use aggregate::{
    available_years, filter_by_year, group_summary, kpis, monthly_trend, sort_by_metric, Dimension,
    GroupSummary, Kpis, Metric, TimeBucket, TrendPoint,
};
pub use artifacts::{
    forecast_overlay, load_clusters, load_forecast, tail, ClusterPoint, Forecast, ForecastPoint,
    OverlayRow,
};
pub use cache::{DatasetCache, Fingerprint};
pub use cli::Args;
pub use clusters::{round2, summarize, ClusterInterpretation, ClusterSummary};
pub use config::AppConfig;
pub use data::{load_dataset, Dataset, TransactionRecord};
pub use error::{
    ArtifactSchemaError, ConfigError, DataFormatError, Error, Result, ValidationWarning,
    WarningKind,
};
pub use frame::parse_date;
