//! Sentilab CLI — backtest, export, and chart commands.
//!
//! Commands:
//! - `backtest` — run the sentiment strategy over a merged parquet table
//! - `export` — turn a saved backtest frame into chart-record JSON
//! - `chart` — resolve chart data through the configured source chain

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use sentilab_chart::{
    build_points, render_records, ChartRequest, ChartResolver, ResolverConfig, TimeFormat,
};
use sentilab_core::data::{load_backtest_frame, load_merged_rows, save_backtest_frame, MergedRow};
use sentilab_core::{
    BacktestEngine, BacktestReport, DecayParams, EngineConfig, PriceBar, SentimentPoint,
    StrategyParams,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sentilab",
    about = "Sentilab CLI — sentiment-driven backtests and chart data"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sentiment strategy over a merged price+sentiment parquet table.
    Backtest {
        /// Merged parquet table (timestamp, price column, sentiment).
        input: PathBuf,

        /// Name of the price column in the input table.
        #[arg(long, default_value = "close")]
        price_column: String,

        /// Write the resulting backtest frame here as parquet.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Rolling window for the sentiment mean, in bars.
        #[arg(long, default_value_t = 12)]
        window: usize,

        /// Bullish trend threshold on the sentiment mean.
        #[arg(long, default_value_t = 0.2)]
        upper_th: f64,

        /// Bearish trend threshold on the sentiment mean.
        #[arg(long, default_value_t = -0.2, allow_hyphen_values = true)]
        lower_th: f64,

        /// Momentum threshold on the sentiment mean difference.
        #[arg(long, default_value_t = 0.1)]
        delta_th: f64,

        /// Blend weight of the trend signal.
        #[arg(long, default_value_t = 0.7)]
        w_trend: f64,

        /// Blend weight of the momentum signal.
        #[arg(long, default_value_t = 0.3)]
        w_mom: f64,

        /// Sentiment magnitude mapped to a full position.
        #[arg(long, default_value_t = 0.5)]
        max_strength: f64,

        /// Position smoothing factor in [0, 1].
        #[arg(long, default_value_t = 0.3)]
        alpha: f64,

        /// Drawdown kill-switch threshold.
        #[arg(long, default_value_t = 0.2)]
        max_drawdown: f64,

        /// Proportional fee per trade side.
        #[arg(long, default_value_t = 0.001)]
        fee_rate: f64,

        /// Starting capital.
        #[arg(long, default_value_t = 100_000.0)]
        initial_capital: f64,

        /// Sentiment decay half-life in hours; omit to disable decay.
        #[arg(long)]
        half_life: Option<f64>,
    },
    /// Turn a saved backtest frame into chart-record JSON.
    Export {
        /// Backtest frame parquet file.
        input: PathBuf,

        /// Write JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Capital used to scale the value curves.
        #[arg(long, default_value_t = 100_000.0)]
        initial_capital: f64,

        /// strftime pattern for timestamps; defaults to ISO-8601 millis.
        #[arg(long)]
        time_format: Option<String>,
    },
    /// Resolve chart data through the configured source chain.
    Chart {
        /// Resolver TOML config; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Explicit backtest frame to chart, skipping the chain.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Name of the price column in merged slices.
        #[arg(long, default_value = "close")]
        price_column: String,

        /// Capital used to scale and rebase the value curves.
        #[arg(long, default_value_t = 100_000.0)]
        initial_capital: f64,

        /// Maximum records to return; adaptive when omitted.
        #[arg(long)]
        points: Option<usize>,

        /// Window start (RFC 3339 or YYYY-MM-DDTHH:MM:SS, UTC).
        #[arg(long, value_parser = parse_utc)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339 or YYYY-MM-DDTHH:MM:SS, UTC).
        #[arg(long, value_parser = parse_utc)]
        end: Option<DateTime<Utc>>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            input,
            price_column,
            output,
            window,
            upper_th,
            lower_th,
            delta_th,
            w_trend,
            w_mom,
            max_strength,
            alpha,
            max_drawdown,
            fee_rate,
            initial_capital,
            half_life,
        } => {
            let params = StrategyParams {
                window,
                upper_th,
                lower_th,
                delta_th,
                w_trend,
                w_mom,
                max_strength,
                alpha,
                max_drawdown,
            };
            let cfg = EngineConfig {
                fee_rate,
                initial_capital,
                decay: half_life.map(|half_life_hours| DecayParams { half_life_hours }),
            };
            run_backtest(&input, &price_column, output.as_deref(), &params, &cfg)
        }
        Commands::Export {
            input,
            output,
            initial_capital,
            time_format,
        } => run_export(&input, output.as_deref(), initial_capital, time_format),
        Commands::Chart {
            config,
            source,
            price_column,
            initial_capital,
            points,
            start,
            end,
        } => {
            let resolver_config = match config {
                Some(path) => ResolverConfig::from_toml_file(&path)
                    .with_context(|| format!("loading resolver config {}", path.display()))?,
                None => ResolverConfig::default(),
            };
            let request = ChartRequest {
                source,
                price_column,
                initial_capital,
                points,
                start,
                end,
                time_format: TimeFormat::Iso,
            };
            let resolver = ChartResolver::new(resolver_config);
            let response = resolver.resolve(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn run_backtest(
    input: &std::path::Path,
    price_column: &str,
    output: Option<&std::path::Path>,
    params: &StrategyParams,
    cfg: &EngineConfig,
) -> Result<()> {
    let rows = load_merged_rows(input, price_column)
        .with_context(|| format!("loading merged table {}", input.display()))?;
    let (prices, sentiment) = split_rows(&rows);

    let report = BacktestEngine::run(&prices, &sentiment, params, cfg)?;
    print_report(&report);

    if let Some(path) = output {
        save_backtest_frame(&report.frame, path)
            .with_context(|| format!("writing frame to {}", path.display()))?;
        println!("\nframe written to {}", path.display());
    }
    Ok(())
}

fn run_export(
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    initial_capital: f64,
    time_format: Option<String>,
) -> Result<()> {
    let frame = load_backtest_frame(input)
        .with_context(|| format!("loading backtest frame {}", input.display()))?;
    let format = match time_format {
        Some(pattern) => TimeFormat::Pattern(pattern),
        None => TimeFormat::Iso,
    };

    let points = build_points(&frame, initial_capital);
    let records = render_records(&points, &format);
    let json = serde_json::to_string_pretty(&records)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} records written to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn split_rows(rows: &[MergedRow]) -> (Vec<PriceBar>, Vec<SentimentPoint>) {
    let prices = rows
        .iter()
        .map(|r| PriceBar {
            timestamp: r.timestamp,
            open: r.price,
            high: r.price,
            low: r.price,
            close: r.price,
            volume: 0.0,
        })
        .collect();
    let sentiment = rows
        .iter()
        .map(|r| SentimentPoint::new(r.timestamp, r.sentiment))
        .collect();
    (prices, sentiment)
}

fn print_report(report: &BacktestReport) {
    let s = &report.stats;
    println!("bars              {}", report.frame.len());
    println!("total_return      {:>8.2}%", s.total_return * 100.0);
    println!("annualized_return {:>8.2}%", s.annualized_return * 100.0);
    println!("volatility        {:>8.2}%", s.volatility * 100.0);
    println!("sharpe_ratio      {:>8.2}", s.sharpe_ratio);
    println!("max_drawdown      {:>8.2}%", s.max_drawdown * 100.0);
    println!("trades            {}", s.num_trades);
    println!("win_rate          {:>8.2}%", s.win_rate * 100.0);
}

fn parse_utc(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("cannot parse '{raw}' as a UTC timestamp"))
}
