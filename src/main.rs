//! SalesForge: sales analytics CLI over a retail transaction snapshot
//!
//! This is the main entrypoint: it resolves configuration, loads the
//! dataset or artifacts a command needs, and prints the derived tables.

use anyhow::{Context, Result};
use clap::Parser;
use salesforge::cli::{Args, Command};
use salesforge::{
    aggregate, artifacts, clusters, AppConfig, DatasetCache, Dimension, GroupSummary, Metric,
    TrendPoint,
};
use serde::Serialize;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config =
        AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply_overrides(&mut config);

    let start_time = Instant::now();
    match args.command.clone() {
        Command::Overview => run_overview(&args, &config)?,
        Command::Trends { year } => run_trends(&args, &config, year)?,
        Command::Breakdown { by, sort } => {
            run_breakdown(&args, &config, by.into(), sort.map(Metric::from))?
        }
        Command::Forecast { tail, all } => {
            let n = if all { None } else { Some(tail.unwrap_or(config.forecast_tail)) };
            run_forecast(&args, &config, n)?
        }
        Command::Overlay => run_overlay(&args, &config)?,
        Command::Clusters => run_clusters(&args, &config)?,
    }
    log::debug!("command finished in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_dataset(config: &AppConfig) -> Result<std::sync::Arc<salesforge::Dataset>> {
    DatasetCache::global()
        .load(&config.transactions)
        .with_context(|| format!("failed to load dataset {}", config.transactions.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Headline KPIs and the monthly sales trend
fn run_overview(args: &Args, config: &AppConfig) -> Result<()> {
    let dataset = load_dataset(config)?;
    let kpis = aggregate::kpis(dataset.records());
    let trend = aggregate::monthly_trend(dataset.records(), &[Metric::Sales]);

    if args.json {
        #[derive(Serialize)]
        struct Overview<'a> {
            kpis: aggregate::Kpis,
            monthly_sales: &'a [TrendPoint],
        }
        return print_json(&Overview {
            kpis,
            monthly_sales: &trend,
        });
    }

    println!("=== Superstore Overview ===\n");
    println!("Total Sales:    ${:.0}", kpis.total_sales);
    println!("Total Orders:   {}", kpis.total_orders);
    println!("Total Quantity: {}", kpis.total_quantity);
    println!("Total Profit:   ${:.0}", kpis.total_profit);

    println!("\n=== Monthly Sales Trend ===");
    print_trend(&trend, &[Metric::Sales]);
    Ok(())
}

fn run_trends(args: &Args, config: &AppConfig, year: Option<i32>) -> Result<()> {
    let dataset = load_dataset(config)?;
    let metrics = [Metric::Sales, Metric::Profit, Metric::Discount];

    let years = aggregate::available_years(dataset.records());
    let trend = match year {
        Some(y) => {
            aggregate::monthly_trend(&aggregate::filter_by_year(dataset.records(), y), &metrics)
        }
        None => aggregate::monthly_trend(dataset.records(), &metrics),
    };

    if args.json {
        #[derive(Serialize)]
        struct Trends<'a> {
            available_years: &'a [i32],
            year: Option<i32>,
            trend: &'a [TrendPoint],
        }
        return print_json(&Trends {
            available_years: &years,
            year,
            trend: &trend,
        });
    }

    match year {
        Some(y) => println!("=== Monthly Sales, Profit & Discount Trends: {} ===", y),
        None => println!("=== Sales, Profit & Discount Trends Over the Years ==="),
    }
    if trend.is_empty() {
        println!("(no orders in the selected period)");
    } else {
        print_trend(&trend, &metrics);
    }

    let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    println!("\nAvailable years: {}", years.join(", "));
    Ok(())
}

fn run_breakdown(
    args: &Args,
    config: &AppConfig,
    dimension: Dimension,
    sort: Option<Metric>,
) -> Result<()> {
    let dataset = load_dataset(config)?;
    let mut groups = aggregate::group_summary(
        dataset.records(),
        dimension,
        &[Metric::Sales, Metric::Profit],
    );
    if let Some(metric) = sort {
        aggregate::sort_by_metric(&mut groups, metric);
    }

    if args.json {
        return print_json(&groups);
    }

    print_groups(dimension, &groups);
    Ok(())
}

fn run_forecast(args: &Args, config: &AppConfig, tail: Option<usize>) -> Result<()> {
    let forecast = artifacts::load_forecast(&config.forecast)
        .with_context(|| format!("forecast unavailable: {}", config.forecast.display()))?;
    let rows = match tail {
        Some(n) => forecast.tail(n),
        None => &forecast.points[..],
    };

    if args.json {
        #[derive(Serialize)]
        struct ForecastView<'a> {
            rows: &'a [artifacts::ForecastPoint],
            warnings: &'a [salesforge::ValidationWarning],
        }
        return print_json(&ForecastView {
            rows,
            warnings: &forecast.warnings,
        });
    }

    match tail {
        Some(n) => println!("=== Forecast Table (last {} rows) ===", n.min(forecast.points.len())),
        None => println!("=== Forecast Table ==="),
    }
    let [date, point, lower, upper] = artifacts::FORECAST_DISPLAY_COLUMNS;
    println!("{:<12} {:>14} {:>14} {:>14}", date, point, lower, upper);
    for row in rows {
        println!(
            "{:<12} {:>14.2} {:>14.2} {:>14.2}",
            row.ds.to_string(),
            row.yhat,
            row.yhat_lower,
            row.yhat_upper
        );
    }

    if !forecast.warnings.is_empty() {
        println!("\n{} validation warning(s):", forecast.warnings.len());
        for warning in &forecast.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}

fn run_overlay(args: &Args, config: &AppConfig) -> Result<()> {
    let dataset = load_dataset(config)?;
    let forecast = artifacts::load_forecast(&config.forecast)
        .with_context(|| format!("forecast unavailable: {}", config.forecast.display()))?;

    let actual = aggregate::monthly_trend(dataset.records(), &[Metric::Sales]);
    let rows = artifacts::forecast_overlay(&actual, &forecast.points);

    if args.json {
        return print_json(&rows);
    }

    println!("=== Actual vs Forecast Sales ===");
    println!(
        "{:<8} {:>14} {:>14} {:>14} {:>14}",
        "Month", "Actual", "Forecast", "Lower Bound", "Upper Bound"
    );
    for row in &rows {
        let actual = row.actual_sales.map(|v| format!("{:.2}", v)).unwrap_or_default();
        let (yhat, lower, upper) = match &row.forecast {
            Some(f) => (
                format!("{:.2}", f.yhat),
                format!("{:.2}", f.yhat_lower),
                format!("{:.2}", f.yhat_upper),
            ),
            None => Default::default(),
        };
        println!(
            "{:<8} {:>14} {:>14} {:>14} {:>14}",
            row.bucket.to_string(),
            actual,
            yhat,
            lower,
            upper
        );
    }
    Ok(())
}

fn run_clusters(args: &Args, config: &AppConfig) -> Result<()> {
    let points = artifacts::load_clusters(&config.clusters)
        .with_context(|| format!("cluster data unavailable: {}", config.clusters.display()))?;
    let summary = clusters::summarize(&points, &config.interpretation());

    if args.json {
        return print_json(&summary);
    }

    println!("=== Cluster Summary Stats ===");
    println!(
        "{:>7} {:>6} {:>10} {:>10} {:>9} {:>9}  Interpretation",
        "Cluster", "Rows", "Sales", "Profit", "Discount", "Quantity"
    );
    for row in &summary {
        println!(
            "{:>7} {:>6} {:>10.2} {:>10.2} {:>9.2} {:>9.2}  {}",
            row.cluster,
            row.size,
            row.mean_sales,
            row.mean_profit,
            row.mean_discount,
            row.mean_quantity,
            row.label.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn print_trend(trend: &[TrendPoint], metrics: &[Metric]) {
    let header: Vec<String> = metrics.iter().map(|m| format!("{:>14}", m.name())).collect();
    println!("{:<8} {}", "Month", header.join(" "));
    for point in trend {
        let values: Vec<String> = metrics
            .iter()
            .map(|&m| format!("{:>14.2}", point.get(m).unwrap_or(0.0)))
            .collect();
        println!("{:<8} {}", point.bucket.to_string(), values.join(" "));
    }
}

fn print_groups(dimension: Dimension, groups: &[GroupSummary]) {
    let key_header = dimension.columns().join(" / ");
    println!("{:<36} {:>14} {:>14}", key_header, "Sales", "Profit");
    for group in groups {
        println!("{:<36} {:>14.2} {:>14.2}", group.key.join(" / "), group.sales, group.profit);
    }
}
