//! Command-line interface definitions and argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::aggregate::{Dimension, Metric};
use crate::config::AppConfig;

/// Sales analytics over a retail transaction snapshot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the transaction CSV file
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Path to the forecast CSV artifact
    #[arg(long, global = true)]
    pub forecast: Option<PathBuf>,

    /// Path to the cluster CSV artifact
    #[arg(long, global = true)]
    pub clusters_file: Option<PathBuf>,

    /// Emit JSON instead of text tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Headline KPIs and the monthly sales trend
    Overview,

    /// Monthly sales, profit and discount trend
    Trends {
        /// Restrict the trend to one order year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Sales and profit broken down by a categorical dimension
    Breakdown {
        #[arg(short, long, value_enum, default_value = "category")]
        by: BreakdownBy,

        /// Sort groups by this metric, largest first
        #[arg(short, long, value_enum)]
        sort: Option<SortBy>,
    },

    /// Forecast rows with their confidence interval
    Forecast {
        /// Show only the last N rows (defaults to the configured tail)
        #[arg(short, long)]
        tail: Option<usize>,

        /// Show every row
        #[arg(long, conflicts_with = "tail")]
        all: bool,
    },

    /// Actual monthly sales joined with the forecast
    Overlay,

    /// Per-cluster statistics with interpretation labels
    Clusters,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownBy {
    Category,
    Region,
    Segment,
    SubCategory,
}

impl From<BreakdownBy> for Dimension {
    fn from(by: BreakdownBy) -> Self {
        match by {
            BreakdownBy::Category => Dimension::Category,
            BreakdownBy::Region => Dimension::Region,
            BreakdownBy::Segment => Dimension::Segment,
            BreakdownBy::SubCategory => Dimension::CategorySubCategory,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Sales,
    Profit,
}

impl From<SortBy> for Metric {
    fn from(sort: SortBy) -> Self {
        match sort {
            SortBy::Sales => Metric::Sales,
            SortBy::Profit => Metric::Profit,
        }
    }
}

impl Args {
    /// Apply path flags on top of an already resolved configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ref path) = self.data {
            config.transactions = path.clone();
        }
        if let Some(ref path) = self.forecast {
            config.forecast = path.clone();
        }
        if let Some(ref path) = self.clusters_file {
            config.clusters = path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_breakdown() {
        let args = Args::parse_from([
            "salesforge",
            "breakdown",
            "--by",
            "sub-category",
            "--sort",
            "profit",
        ]);
        assert_eq!(
            args.command,
            Command::Breakdown {
                by: BreakdownBy::SubCategory,
                sort: Some(SortBy::Profit),
            }
        );
        assert_eq!(Dimension::from(BreakdownBy::SubCategory), Dimension::CategorySubCategory);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "salesforge", "trends", "--year", "2016", "--json", "-d", "x.csv",
        ]);
        assert_eq!(args.command, Command::Trends { year: Some(2016) });
        assert!(args.json);
        assert_eq!(args.data.as_deref(), Some(Path::new("x.csv")));
    }

    #[test]
    fn test_forecast_flags_conflict() {
        assert!(Args::try_parse_from(["salesforge", "forecast", "--tail", "3", "--all"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from(["salesforge", "--clusters-file", "c.csv", "clusters"]);
        let mut config = AppConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.clusters, Path::new("c.csv"));
        assert_eq!(config.transactions, Path::new("data/Superstore.csv"));
    }
}
