//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ridepulse_types::{DecodeMode, MetricKind};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| <Self as ValueEnum>::from_str(v, true).ok())
    }
}

/// Which metric streams to watch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Heart rate (0x180D)
    #[value(alias = "heart-rate")]
    Hr,
    /// Cycling power (0x1818)
    Power,
    /// Both metrics
    #[default]
    All,
}

impl MetricArg {
    pub fn metrics(self) -> Vec<MetricKind> {
        match self {
            MetricArg::Hr => vec![MetricKind::HeartRate],
            MetricArg::Power => vec![MetricKind::Power],
            MetricArg::All => MetricKind::ALL.to_vec(),
        }
    }
}

/// Payload decode rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecodeArg {
    /// Signed byte at offset 1 for both metrics
    Compatible,
    /// GATT layouts (16-bit heart rate, signed 16-bit power)
    Standard,
}

impl From<DecodeArg> for DecodeMode {
    fn from(arg: DecodeArg) -> Self {
        match arg {
            DecodeArg::Compatible => DecodeMode::Compatible,
            DecodeArg::Standard => DecodeMode::Standard,
        }
    }
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format (defaults to the configured format, then text)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Parser)]
#[command(name = "ridepulse")]
#[command(author, version, about = "Live heart-rate and power telemetry from BLE sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also set by NO_COLOR)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby heart-rate and power sensors
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Connect to sensors and print every update with its trend
    Watch {
        /// Metric stream(s) to subscribe to
        #[arg(short, long, value_enum, default_value = "all")]
        metric: MetricArg,

        /// Only offer heart-rate sensors whose name contains this text
        #[arg(long, env = "RIDEPULSE_HR_DEVICE")]
        hr_device: Option<String>,

        /// Only offer power sensors whose name contains this text
        #[arg(long, env = "RIDEPULSE_POWER_DEVICE")]
        power_device: Option<String>,

        /// Payload decode rule
        #[arg(short, long, value_enum)]
        decode: Option<DecodeArg>,

        /// Samples kept per metric
        #[arg(short, long)]
        capacity: Option<usize>,

        /// Seconds to scan before choosing a sensor
        #[arg(short = 's', long)]
        scan_secs: Option<u64>,

        /// Stop after this many updates (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Pick the sensor from a list instead of taking the strongest signal
        #[arg(short, long)]
        interactive: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default heart-rate sensor name filter
    HrDevice,
    /// Default power sensor name filter
    PowerDevice,
    /// Payload decode rule (compatible, standard)
    DecodeMode,
    /// Samples kept per metric
    Capacity,
    /// Start buffers pre-filled with zeros
    Prefill,
    /// Scan duration in seconds
    ScanSecs,
    /// Default output format
    Format,
    /// Disable colored output
    NoColor,
}

impl ConfigKey {
    /// Name as typed on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::HrDevice => "hr-device",
            ConfigKey::PowerDevice => "power-device",
            ConfigKey::DecodeMode => "decode-mode",
            ConfigKey::Capacity => "capacity",
            ConfigKey::Prefill => "prefill",
            ConfigKey::ScanSecs => "scan-secs",
            ConfigKey::Format => "format",
            ConfigKey::NoColor => "no-color",
        }
    }
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (reset) a configuration value
    Unset {
        /// Configuration key to reset
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["ridepulse", "watch"]).unwrap();
        match cli.command {
            Commands::Watch {
                metric,
                count,
                interactive,
                decode,
                output,
                ..
            } => {
                assert_eq!(metric, MetricArg::All);
                assert_eq!(count, 0);
                assert!(!interactive);
                assert!(decode.is_none());
                assert!(output.format.is_none());
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_watch_options() {
        let cli = Cli::try_parse_from([
            "ridepulse", "watch", "--metric", "hr", "--decode", "standard", "-n", "5", "-f", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                metric,
                decode,
                count,
                output,
                ..
            } => {
                assert_eq!(metric.metrics(), vec![MetricKind::HeartRate]);
                assert_eq!(decode.map(DecodeMode::from), Some(DecodeMode::Standard));
                assert_eq!(count, 5);
                assert_eq!(output.format, Some(OutputFormat::Json));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["ridepulse", "-v", "-q", "scan"]).is_err());
    }

    #[test]
    fn test_metric_all_expands() {
        assert_eq!(MetricArg::All.metrics(), MetricKind::ALL.to_vec());
    }

    #[test]
    fn test_config_key_names_parse_back() {
        for key in ConfigKey::value_variants() {
            assert_eq!(ConfigKey::from_str(key.name(), false), Ok(*key));
        }
    }

    #[test]
    fn test_format_from_config() {
        assert_eq!(OutputFormat::from_config(Some("JSON")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config(Some("csv")), None);
        assert_eq!(OutputFormat::from_config(None), None);
    }
}
