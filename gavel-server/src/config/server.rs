use {
    clap::Args,
    std::net::SocketAddr,
};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:8081";

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Server Options")]
#[group(id = "Server")]
pub struct Options {
    /// Address and port the REST and websocket API binds to.
    #[arg(long = "listen-addr")]
    #[arg(default_value = DEFAULT_LISTEN_ADDR)]
    #[arg(env = "GAVEL_LISTEN_ADDR")]
    pub listen_addr:  SocketAddr,

    /// Postgres connection url for the auction store.
    #[arg(long = "database-url")]
    #[arg(env = "DATABASE_URL")]
    pub database_url: String,

    /// Address and port the Prometheus scrape endpoint binds to.
    #[arg(long = "metrics-addr")]
    #[arg(default_value = DEFAULT_METRICS_ADDR)]
    #[arg(env = "GAVEL_METRICS_ADDR")]
    pub metrics_addr: SocketAddr,
}
