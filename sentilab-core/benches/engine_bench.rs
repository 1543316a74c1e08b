//! Criterion benchmarks for the backtest hot path.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sentilab_core::{
    BacktestEngine, DecayParams, EngineConfig, PriceBar, SentimentPoint, StrategyParams,
};

fn make_prices(n: usize) -> Vec<PriceBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            PriceBar {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn make_sentiment(prices: &[PriceBar]) -> Vec<SentimentPoint> {
    // Sparse: roughly one point every 48 bars (4 hours of 5m bars).
    prices
        .iter()
        .step_by(48)
        .enumerate()
        .map(|(i, bar)| SentimentPoint::new(bar.timestamp, ((i as f64) * 1.7).sin()))
        .collect()
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_run");
    let params = StrategyParams::default();
    let plain = EngineConfig::default();
    let decayed = EngineConfig {
        decay: Some(DecayParams::default()),
        ..Default::default()
    };

    for &bars in &[2_880, 28_800, 105_120] {
        let prices = make_prices(bars);
        let sentiment = make_sentiment(&prices);

        group.bench_with_input(BenchmarkId::new("plain", bars), &bars, |b, _| {
            b.iter(|| {
                BacktestEngine::run(
                    black_box(&prices),
                    black_box(&sentiment),
                    &params,
                    &plain,
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("decayed", bars), &bars, |b, _| {
            b.iter(|| {
                BacktestEngine::run(
                    black_box(&prices),
                    black_box(&sentiment),
                    &params,
                    &decayed,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
