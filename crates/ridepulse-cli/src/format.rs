//! Output formatting for snapshots and scan results.

use anyhow::Result;
use ridepulse_core::{DiscoveredSensor, Snapshot};
use ridepulse_types::{MetricKind, TrendIndicator};
use serde::Serialize;
use time::OffsetDateTime;

use crate::style;

/// Wall-clock `HH:MM:SS` (UTC) of a millisecond timestamp.
pub fn format_clock(timestamp_ms: i64) -> String {
    match OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000) {
        Ok(t) => format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
        Err(_) => "--:--:--".to_string(),
    }
}

/// One rendered line per published snapshot, e.g. `[12:00:01] HR 142bpm ⬆`.
///
/// Returns `None` for an empty window.
pub fn format_snapshot_text(metric: MetricKind, snapshot: &Snapshot, no_color: bool) -> Option<String> {
    let latest = snapshot.latest()?;
    let mut line = format!(
        "[{}] {} {}{}",
        format_clock(latest.timestamp()),
        style::format_label(metric, no_color),
        latest.value(),
        metric.unit()
    );
    let trend = style::format_trend(snapshot.trend, no_color);
    if !trend.is_empty() {
        line.push(' ');
        line.push_str(&trend);
    }
    line.push('\n');
    Some(line)
}

/// JSON record of the newest sample in a snapshot.
#[derive(Debug, Serialize)]
pub struct SnapshotRecord {
    pub metric: MetricKind,
    pub timestamp: i64,
    pub value: i32,
    pub unit: &'static str,
    pub trend: Option<TrendIndicator>,
    pub window: usize,
}

impl SnapshotRecord {
    pub fn new(metric: MetricKind, snapshot: &Snapshot) -> Option<Self> {
        let latest = snapshot.latest()?;
        Some(Self {
            metric,
            timestamp: latest.timestamp(),
            value: latest.value(),
            unit: metric.unit(),
            trend: snapshot.trend,
            window: snapshot.len(),
        })
    }
}

/// Newline-delimited JSON line for a snapshot.
pub fn format_snapshot_json(metric: MetricKind, snapshot: &Snapshot) -> Result<Option<String>> {
    match SnapshotRecord::new(metric, snapshot) {
        Some(record) => Ok(Some(format!("{}\n", serde_json::to_string(&record)?))),
        None => Ok(None),
    }
}

fn metrics_column(metrics: &[MetricKind]) -> String {
    metrics
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table of sensors found by a scan.
pub fn format_scan_text(sensors: &[DiscoveredSensor], no_color: bool) -> String {
    if sensors.is_empty() {
        return "No sensors found.\n".to_string();
    }

    let name_width = sensors
        .iter()
        .map(|s| s.display_name().chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = format!(
        "Found {} sensor(s):\n\n{:<name_width$}  {:<12}  SIGNAL\n",
        sensors.len(),
        "NAME",
        "METRICS",
    );
    for sensor in sensors {
        out.push_str(&format!(
            "{:<name_width$}  {:<12}  {}\n",
            sensor.display_name(),
            metrics_column(&sensor.metrics),
            style::format_signal_bar(sensor.rssi, no_color),
        ));
        out.push_str(&format!("  {}\n", sensor.id));
    }
    out
}

pub fn format_scan_json(sensors: &[DiscoveredSensor]) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(sensors)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridepulse_types::Sample;

    fn snapshot(values: &[(i64, i32)], trend: Option<TrendIndicator>) -> Snapshot {
        Snapshot {
            metric: MetricKind::HeartRate,
            samples: values.iter().map(|&(t, v)| Sample::new(t, v)).collect(),
            trend,
        }
    }

    #[test]
    fn test_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3_723_000), "01:02:03");
        assert_eq!(format_clock(i64::MAX), "--:--:--");
    }

    #[test]
    fn test_snapshot_text() {
        let snap = snapshot(&[(1_000, 140), (61_000, 142)], Some(TrendIndicator::Up));
        let line = format_snapshot_text(MetricKind::HeartRate, &snap, true).unwrap();
        assert_eq!(line, "[00:01:01] HR 142bpm ⬆\n");
    }

    #[test]
    fn test_snapshot_text_power_without_trend() {
        let mut snap = snapshot(&[(0, 250)], None);
        snap.metric = MetricKind::Power;
        let line = format_snapshot_text(MetricKind::Power, &snap, true).unwrap();
        assert_eq!(line, "[00:00:00] Power 250W\n");
    }

    #[test]
    fn test_empty_snapshot_renders_nothing() {
        let snap = snapshot(&[], None);
        assert!(format_snapshot_text(MetricKind::HeartRate, &snap, true).is_none());
        assert!(format_snapshot_json(MetricKind::HeartRate, &snap).unwrap().is_none());
    }

    #[test]
    fn test_snapshot_json() {
        let snap = snapshot(&[(10, 100), (20, 90)], Some(TrendIndicator::Down));
        let line = format_snapshot_json(MetricKind::HeartRate, &snap)
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["metric"], "heart_rate");
        assert_eq!(value["value"], 90);
        assert_eq!(value["unit"], "bpm");
        assert_eq!(value["trend"], "down");
        assert_eq!(value["window"], 2);
    }

    #[test]
    fn test_scan_text() {
        let sensors = vec![DiscoveredSensor {
            id: "AA:BB:CC:DD:EE:FF".into(),
            name: Some("Polar H10".into()),
            rssi: Some(-30),
            metrics: vec![MetricKind::HeartRate],
        }];
        let out = format_scan_text(&sensors, true);
        assert!(out.starts_with("Found 1 sensor(s):"));
        assert!(out.contains("Polar H10"));
        assert!(out.contains("AA:BB:CC:DD:EE:FF"));
        assert!(out.contains("██████████"));
        assert_eq!(format_scan_text(&[], true), "No sensors found.\n");
    }

    #[test]
    fn test_scan_json() {
        let sensors = vec![DiscoveredSensor {
            id: "kickr".into(),
            name: None,
            rssi: None,
            metrics: vec![MetricKind::Power, MetricKind::HeartRate],
        }];
        let json = format_scan_json(&sensors).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["id"], "kickr");
        assert_eq!(value[0]["metrics"][0], "power");
    }
}
