use clap::{Parser, Subcommand};

/// Futures watchlist monitor: candle drop and bearish-high breakout alerts.
#[derive(Parser, Debug)]
#[command(name = "candlewatch", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (can also be set via CANDLEWATCH_CONFIG)
    #[arg(short, long, env = "CANDLEWATCH_CONFIG", default_value = "candlewatch.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run exactly one monitor cycle (default)
    Run,
    /// Manage the watchlist
    #[command(subcommand)]
    Watchlist(WatchlistCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum WatchlistCommand {
    /// Print the watchlist
    List,
    /// Add a ticker after checking it resolves on the configured exchange
    Add { ticker: String },
    /// Remove a ticker (case-insensitive)
    Remove { ticker: String },
}
