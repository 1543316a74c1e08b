//! Chart record construction.
//!
//! A chart record pairs a buy-and-hold value with the strategy value
//! at one instant, plus any trade events fired there. Points keep the
//! real timestamp so shaping can filter and rebase; records are the
//! formatted wire shape.

use chrono::{DateTime, Utc};
use sentilab_core::BacktestFrame;
use serde::{Deserialize, Serialize};

/// Marker text attached to every generated trade event.
pub const EVENT_TRIGGER: &str = "Sentiment strategy signal";

const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub timestamp: String,
    pub action: EventAction,
    pub trigger: String,
}

/// One formatted chart sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    pub time: String,
    #[serde(rename = "holdValue")]
    pub hold_value: f64,
    #[serde(rename = "strategyValue")]
    pub strategy_value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ChartEvent>,
}

/// An unformatted chart sample; what the shaping pass operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub hold_value: f64,
    pub strategy_value: f64,
    pub actions: Vec<EventAction>,
}

/// How timestamps are rendered in records and events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// `%Y-%m-%dT%H:%M:%S%.3fZ`
    #[default]
    Iso,
    /// Custom strftime pattern.
    Pattern(String),
}

impl TimeFormat {
    pub fn render(&self, ts: DateTime<Utc>) -> String {
        match self {
            TimeFormat::Iso => ts.format(ISO_MILLIS).to_string(),
            TimeFormat::Pattern(p) => ts.format(p).to_string(),
        }
    }
}

/// Build chart points from a backtest frame.
///
/// Hold curve: cumulative product of price returns scaled by capital.
/// Strategy curve: equity multiple scaled by capital. Events fire on
/// position sign transitions: entering from flat emits the entry side,
/// leaving a long emits SELL, leaving a short emits BUY.
pub fn build_points(frame: &BacktestFrame, initial_capital: f64) -> Vec<ChartPoint> {
    let n = frame.len();
    let mut points = Vec::with_capacity(n);
    let mut hold = 1.0;
    let mut prev_sign = 0i8;

    for i in 0..n {
        if i > 0 && frame.price[i - 1] != 0.0 {
            hold *= frame.price[i] / frame.price[i - 1];
        }

        let sign = sign_of(frame.position[i]);
        let mut actions = Vec::new();
        if sign != prev_sign {
            match (prev_sign, sign) {
                (0, 1) => actions.push(EventAction::Buy),
                (0, -1) => actions.push(EventAction::Sell),
                (1, _) => actions.push(EventAction::Sell),
                (-1, _) => actions.push(EventAction::Buy),
                _ => {}
            }
        }
        prev_sign = sign;

        points.push(ChartPoint {
            timestamp: frame.timestamp[i],
            hold_value: hold * initial_capital,
            strategy_value: frame.equity[i] * initial_capital,
            actions,
        });
    }

    points
}

/// Format shaped points into wire records.
pub fn render_records(points: &[ChartPoint], format: &TimeFormat) -> Vec<ChartRecord> {
    points
        .iter()
        .map(|p| {
            let time = format.render(p.timestamp);
            ChartRecord {
                events: p
                    .actions
                    .iter()
                    .map(|&action| ChartEvent {
                        timestamp: time.clone(),
                        action,
                        trigger: EVENT_TRIGGER.to_string(),
                    })
                    .collect(),
                time,
                hold_value: p.hold_value,
                strategy_value: p.strategy_value,
            }
        })
        .collect()
}

fn sign_of(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
