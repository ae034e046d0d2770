use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "resetline",
    version,
    about = "Daily and weekly reset timeline with countdowns",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(long = "catalog")]
    pub catalog: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Reference clock offset from UTC in minutes (e.g. 480 for UTC+8).
    #[arg(long = "offset", allow_negative_numbers = true)]
    pub offset: Option<i32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Draw every event's occurrences across the timeline window.
    Timeline {
        /// Redraw once a minute.
        #[arg(long)]
        watch: bool,
    },
    /// Countdown to each event's next reset.
    Next {
        /// Refresh every second.
        #[arg(long)]
        watch: bool,
    },
    /// List one event's occurrences in the window with their keys.
    Segments { event_id: String },
    /// Toggle the done flag of the occurrence running at an instant.
    Done {
        event_id: String,
        /// `now`, RFC3339, or reference-local `YYYY-MM-DD HH:MM`.
        #[arg(long, default_value = "now")]
        at: String,
    },
    /// Validate the catalog and report rejected entries.
    Check,
}

impl GlobalCli {
    /// Command-line overrides in config-key form, `--rc` entries last.
    pub fn config_overrides(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(offset) = self.offset {
            out.push(("offset_minutes".to_string(), offset.to_string()));
        }
        if let Some(catalog) = &self.catalog {
            out.push(("catalog".to_string(), catalog.display().to_string()));
        }
        out.extend(
            self.rc_overrides
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.clone())),
        );
        out
    }

    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Timeline { watch: false })
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn defaults_to_timeline() {
        let cli = GlobalCli::parse_from(["resetline"]);
        assert_eq!(cli.command(), Command::Timeline { watch: false });
        assert!(cli.config_overrides().is_empty());
    }

    #[test]
    fn collects_overrides_in_order() {
        let cli = GlobalCli::parse_from([
            "resetline",
            "--offset",
            "-300",
            "--rc",
            "timeline.days_ahead=14",
            "--catalog",
            "events.json",
            "next",
            "--watch",
        ]);
        assert_eq!(cli.command(), Command::Next { watch: true });
        assert_eq!(
            cli.config_overrides(),
            vec![
                ("offset_minutes".to_string(), "-300".to_string()),
                ("catalog".to_string(), "events.json".to_string()),
                ("timeline.days_ahead".to_string(), "14".to_string()),
            ]
        );
    }

    #[test]
    fn done_takes_an_instant() {
        let cli = GlobalCli::parse_from(["resetline", "done", "fashion", "--at", "2024-01-05 20:00"]);
        assert_eq!(
            cli.command(),
            Command::Done {
                event_id: "fashion".to_string(),
                at: "2024-01-05 20:00".to_string(),
            }
        );
    }

    #[test]
    fn rejects_bad_rc_pairs() {
        assert!(GlobalCli::try_parse_from(["resetline", "--rc", "novalue", "check"]).is_err());
    }
}
