//! Visual styling utilities for the CLI.

use owo_colors::OwoColorize;
use ridepulse_types::{ConnectionState, MetricKind, TrendIndicator};

/// Trend arrow, green when rising and red when falling.
pub fn format_trend(trend: Option<TrendIndicator>, no_color: bool) -> String {
    let Some(trend) = trend else {
        return String::new();
    };
    if no_color {
        return trend.symbol().to_string();
    }
    match trend {
        TrendIndicator::Up => format!("{}", trend.symbol().green()),
        TrendIndicator::Down => format!("{}", trend.symbol().red()),
        TrendIndicator::Steady => format!("{}", trend.symbol().dimmed()),
    }
}

/// Metric label in its dashboard color.
pub fn format_label(metric: MetricKind, no_color: bool) -> String {
    let label = metric.label();
    if no_color {
        return label.to_string();
    }
    match metric {
        MetricKind::HeartRate => format!("{}", label.red().bold()),
        MetricKind::Power => format!("{}", label.yellow().bold()),
    }
}

/// Connection state, colored by health.
pub fn format_state(state: &ConnectionState, no_color: bool) -> String {
    let text = state.to_string();
    if no_color {
        return text;
    }
    match state {
        ConnectionState::Subscribed => format!("{}", text.green()),
        ConnectionState::Connecting => format!("{}", text.yellow()),
        ConnectionState::Idle => format!("{}", text.dimmed()),
        ConnectionState::Failed(_) => format!("{}", text.red()),
    }
}

/// Message shown when a metric's sensor could not be connected.
pub fn connect_failure(metric: MetricKind) -> String {
    format!("Cannot connect {} sensor!", metric)
}

/// Format RSSI as a signal strength bar.
pub fn format_signal_bar(rssi: Option<i16>, no_color: bool) -> String {
    let rssi = match rssi {
        Some(r) => r,
        None => return "N/A".to_string(),
    };

    // -30 dBm fills the bar, -100 dBm empties it
    let strength = ((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize;
    let filled = strength.min(10);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));

    if no_color {
        format!("{} {:>4}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>4}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>4}", bar.yellow(), rssi)
    } else {
        format!("{} {:>4}", bar.red(), rssi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_plain() {
        assert_eq!(format_trend(Some(TrendIndicator::Up), true), "⬆");
        assert_eq!(format_trend(Some(TrendIndicator::Down), true), "⬇");
        assert_eq!(format_trend(Some(TrendIndicator::Steady), true), "⇿");
        assert_eq!(format_trend(None, true), "");
    }

    #[test]
    fn test_trend_colored_keeps_symbol() {
        let up = format_trend(Some(TrendIndicator::Up), false);
        assert!(up.contains('⬆'));
        assert!(up.contains("\x1b["));
    }

    #[test]
    fn test_connect_failure_message() {
        assert_eq!(
            connect_failure(MetricKind::HeartRate),
            "Cannot connect heart rate sensor!"
        );
        assert_eq!(connect_failure(MetricKind::Power), "Cannot connect power sensor!");
    }

    #[test]
    fn test_signal_bar() {
        assert_eq!(format_signal_bar(None, true), "N/A");
        assert_eq!(format_signal_bar(Some(-30), true), "██████████  -30");
        assert_eq!(format_signal_bar(Some(-100), true), "░░░░░░░░░░ -100");
        assert_eq!(format_signal_bar(Some(-65), true), "█████░░░░░  -65");
    }

    #[test]
    fn test_state_plain() {
        assert_eq!(format_state(&ConnectionState::Subscribed, true), "subscribed");
        assert_eq!(
            format_state(&ConnectionState::Failed("connection lost".into()), true),
            "failed: connection lost"
        );
    }
}
