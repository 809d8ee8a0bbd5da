use {
    anyhow::Result,
    clap::{
        crate_authors,
        crate_description,
        crate_name,
        crate_version,
        Args,
        Parser,
    },
    gavel_api_types::Amount,
    std::{
        fs,
        time::Duration,
    },
};

mod server;

pub use server::Options as ServerOptions;

#[derive(Parser, Debug)]
#[command(name = crate_name!())]
#[command(author = crate_authors!())]
#[command(about = crate_description!())]
#[command(version = crate_version!())]
pub enum Options {
    /// Run the auction server service.
    Run(RunOptions),
}

#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    /// Server Options
    #[command(flatten)]
    pub server: server::Options,

    #[command(flatten)]
    pub config: ConfigOptions,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Config Options")]
#[group(id = "Config")]
pub struct ConfigOptions {
    /// Path to a configuration file containing the service parameters.
    #[arg(long = "config")]
    #[arg(env = "GAVEL_CONFIG")]
    #[arg(default_value = "config.yaml")]
    pub config: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bidding:   BiddingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub websocket: WebsocketConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        let yaml_content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&yaml_content)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BiddingConfig {
    /// The least amount a bid must exceed the current bid by.
    #[serde(default = "default_minimum_increment")]
    pub minimum_increment: Amount,
    /// How many recent bids the auction detail endpoint returns.
    #[serde(default = "default_recent_bids_limit")]
    pub recent_bids_limit: i64,
}

impl Default for BiddingConfig {
    fn default() -> Self {
        Self {
            minimum_increment: default_minimum_increment(),
            recent_bids_limit: default_recent_bids_limit(),
        }
    }
}

fn default_minimum_increment() -> Amount {
    100
}

fn default_recent_bids_limit() -> i64 {
    50
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LifecycleConfig {
    /// How often the scheduler scans for due state transitions.
    #[serde(with = "humantime_serde", default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Auctions ending within this window get an ending soon alert.
    #[serde(with = "humantime_serde", default = "default_ending_soon_window")]
    pub ending_soon_window: Duration,

    /// Minimum spacing between two ending soon alerts for the same auction.
    #[serde(with = "humantime_serde", default = "default_ending_alert_cooldown")]
    pub ending_alert_cooldown: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            tick_interval:         default_tick_interval(),
            ending_soon_window:    default_ending_soon_window(),
            ending_alert_cooldown: default_ending_alert_cooldown(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_ending_soon_window() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_ending_alert_cooldown() -> Duration {
    Duration::from_secs(10 * 60)
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WebsocketConfig {
    /// Header carrying the client IP, as set by the upstream proxy.
    #[serde(default = "default_requester_ip_header_name")]
    pub requester_ip_header_name: String,
    #[serde(default = "default_broadcast_channel_size")]
    pub broadcast_channel_size:   usize,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            requester_ip_header_name: default_requester_ip_header_name(),
            broadcast_channel_size:   default_broadcast_channel_size(),
        }
    }
}

fn default_requester_ip_header_name() -> String {
    "X-Forwarded-For".to_string()
}

fn default_broadcast_channel_size() -> usize {
    1000
}
