use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use url::Url;

/// Command-line arguments for the headwind binary.
#[derive(Debug, Parser)]
#[command(
    name = "headwind",
    version,
    about = "Cache invalidation and preview tokens for headless CMS frontends"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "HEADWIND_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Issue a preview token and print the frontend preview link.
    #[command(name = "issue-token")]
    IssueToken(IssueTokenArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the frontend revalidation endpoint.
    #[arg(long = "revalidation-endpoint", value_name = "URL")]
    pub revalidation_endpoint: Option<Url>,

    /// Enable or disable CDN purging.
    #[arg(
        long = "cdn-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cdn_enabled: Option<bool>,

    /// Enable or disable the response cache.
    #[arg(
        long = "response-cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub response_cache_enabled: Option<bool>,

    /// Override the response cache TTL.
    #[arg(long = "response-cache-ttl-seconds", value_name = "SECONDS")]
    pub response_cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct IssueTokenArgs {
    /// Entity the token grants preview access to.
    #[arg(long = "entity-id", value_name = "ID")]
    pub entity_id: i64,

    /// User the token is issued for.
    #[arg(long = "actor-id", value_name = "ID")]
    pub actor_id: i64,

    /// Token lifetime; defaults to `preview.ttl_seconds`.
    #[arg(long = "ttl-seconds", value_name = "SECONDS", allow_negative_numbers = true)]
    pub ttl_seconds: Option<i64>,

    /// Override the frontend preview base URL.
    #[arg(long = "frontend-url", value_name = "URL")]
    pub frontend_url: Option<Url>,
}
