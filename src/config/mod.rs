//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::preview::DEFAULT_PREVIEW_TTL_SECONDS;
use crate::cache::{DEFAULT_CACHE_GROUP, DEFAULT_MUTATION_KEYWORD, DEFAULT_TTL_SECONDS};
use crate::invalidation::{DEFAULT_ALLOWED_KINDS, DEFAULT_PUBLIC_STATUSES};

mod cli;

pub use cli::{CliArgs, Command, IssueTokenArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "headwind";
const ENV_PREFIX: &str = "HEADWIND";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 1000;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub revalidation: RevalidationSettings,
    pub cdn: CdnSettings,
    pub response_cache: ResponseCacheSettings,
    pub preview: PreviewSettings,
    pub hooks: HookSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Frontend revalidation webhook. Dispatch stays inert until both
/// `endpoint` and `secret` are set.
#[derive(Debug, Clone)]
pub struct RevalidationSettings {
    pub endpoint: Option<Url>,
    pub secret: Option<String>,
    pub allowed_kinds: Vec<String>,
    pub public_statuses: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CdnSettings {
    pub enabled: bool,
    pub purge_url: Option<Url>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResponseCacheSettings {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub mutation_keyword: String,
    pub group: String,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub secret: Option<String>,
    pub ttl_seconds: i64,
    pub frontend_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct HookSettings {
    /// Shared secret expected in `x-headwind-hook-secret`; unset accepts all.
    pub secret: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("revalidation.allowed_kinds")
            .with_list_parse_key("revalidation.public_statuses")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::IssueToken(args)) => raw.apply_issue_token_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    revalidation: RawRevalidationSettings,
    cdn: RawCdnSettings,
    response_cache: RawResponseCacheSettings,
    preview: RawPreviewSettings,
    hooks: RawHookSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(endpoint) = overrides.revalidation_endpoint.as_ref() {
            self.revalidation.endpoint = Some(endpoint.to_string());
        }
        if let Some(enabled) = overrides.cdn_enabled {
            self.cdn.enabled = Some(enabled);
        }
        if let Some(enabled) = overrides.response_cache_enabled {
            self.response_cache.enabled = Some(enabled);
        }
        if let Some(ttl) = overrides.response_cache_ttl_seconds {
            self.response_cache.ttl_seconds = Some(ttl);
        }
    }

    fn apply_issue_token_overrides(&mut self, args: &IssueTokenArgs) {
        if let Some(url) = args.frontend_url.as_ref() {
            self.preview.frontend_url = Some(url.to_string());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            revalidation,
            cdn,
            response_cache,
            preview,
            hooks,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            revalidation: build_revalidation_settings(revalidation)?,
            cdn: build_cdn_settings(cdn)?,
            response_cache: build_response_cache_settings(response_cache)?,
            preview: build_preview_settings(preview)?,
            hooks: HookSettings {
                secret: non_empty(hooks.secret),
            },
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_revalidation_settings(
    revalidation: RawRevalidationSettings,
) -> Result<RevalidationSettings, LoadError> {
    let endpoint = parse_url(revalidation.endpoint, "revalidation.endpoint")?;

    let allowed_kinds = revalidation
        .allowed_kinds
        .unwrap_or_else(|| DEFAULT_ALLOWED_KINDS.map(String::from).to_vec());
    let public_statuses = revalidation
        .public_statuses
        .unwrap_or_else(|| DEFAULT_PUBLIC_STATUSES.map(String::from).to_vec());

    Ok(RevalidationSettings {
        endpoint,
        secret: non_empty(revalidation.secret),
        allowed_kinds,
        public_statuses,
    })
}

fn build_cdn_settings(cdn: RawCdnSettings) -> Result<CdnSettings, LoadError> {
    let enabled = cdn.enabled.unwrap_or(false);
    let purge_url = parse_url(cdn.purge_url, "cdn.purge_url")?;

    if enabled && purge_url.is_none() {
        return Err(LoadError::invalid(
            "cdn.purge_url",
            "required when CDN purging is enabled",
        ));
    }

    Ok(CdnSettings {
        enabled,
        purge_url,
        api_token: non_empty(cdn.api_token),
    })
}

fn build_response_cache_settings(
    cache: RawResponseCacheSettings,
) -> Result<ResponseCacheSettings, LoadError> {
    let capacity = cache.capacity.unwrap_or(DEFAULT_RESPONSE_CACHE_CAPACITY);
    if capacity == 0 {
        return Err(LoadError::invalid(
            "response_cache.capacity",
            "must be greater than zero",
        ));
    }

    Ok(ResponseCacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        ttl_seconds: cache.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS),
        mutation_keyword: non_empty(cache.mutation_keyword)
            .unwrap_or_else(|| DEFAULT_MUTATION_KEYWORD.to_string()),
        group: non_empty(cache.group).unwrap_or_else(|| DEFAULT_CACHE_GROUP.to_string()),
        capacity,
    })
}

fn build_preview_settings(preview: RawPreviewSettings) -> Result<PreviewSettings, LoadError> {
    Ok(PreviewSettings {
        secret: non_empty(preview.secret),
        ttl_seconds: preview
            .ttl_seconds
            .unwrap_or(DEFAULT_PREVIEW_TTL_SECONDS)
            .max(1),
        frontend_url: parse_url(preview.frontend_url, "preview.frontend_url")?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidationSettings {
    endpoint: Option<String>,
    secret: Option<String>,
    allowed_kinds: Option<Vec<String>>,
    public_statuses: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCdnSettings {
    enabled: Option<bool>,
    purge_url: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResponseCacheSettings {
    enabled: Option<bool>,
    ttl_seconds: Option<u64>,
    mutation_keyword: Option<String>,
    group: Option<String>,
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPreviewSettings {
    secret: Option<String>,
    ttl_seconds: Option<i64>,
    frontend_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHookSettings {
    secret: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: Option<String>, key: &'static str) -> Result<Option<Url>, LoadError> {
    non_empty(value)
        .map(|raw| {
            Url::parse(&raw).map_err(|err| LoadError::invalid(key, format!("invalid URL `{raw}`: {err}")))
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
