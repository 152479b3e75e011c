use std::{future::IntoFuture, process, sync::Arc};

use headwind::{
    application::{
        error::AppError,
        preview::{PreviewConfigError, PreviewTokenService, preview_url},
    },
    cache::{MemoryObjectCache, ObjectCacheBackend, ResponseCache, ResponseCacheConfig},
    config::{self, IssueTokenArgs, Settings},
    events::EventLog,
    infra::{
        cdn::HttpCdnIntegration,
        error::InfraError,
        http::{self, HookState, PreviewState, RouterState},
        telemetry,
        webhook::ReqwestRevalidationTransport,
    },
    invalidation::{
        CdnIntegration, CdnPurgeCoordinator, InvalidationPipeline, PublishGuard,
        RevalidationConfig, RevalidationDispatcher, TagDeriver,
    },
    util::clock::SystemClock,
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::IssueToken(args) => run_issue_token(&settings, args),
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let router_state = build_router_state(&settings)?;
    let router = http::build_router(router_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "headwind listening");

    let shutdown = Arc::new(Notify::new());
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            shutdown.notify_one();
        }
    };

    let mut server = std::pin::pin!(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(signal)
            .into_future()
    );

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown.notified() => {}
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    }
}

fn build_router_state(settings: &Settings) -> Result<RouterState, AppError> {
    let events = Arc::new(EventLog::new());

    let cache_config = ResponseCacheConfig::from(&settings.response_cache);
    let backend: Arc<dyn ObjectCacheBackend> =
        Arc::new(MemoryObjectCache::new(cache_config.capacity_non_zero()));
    let response_cache = Arc::new(ResponseCache::new(cache_config, backend, events.clone()));

    let guard = Arc::new(PublishGuard::new(
        settings.revalidation.allowed_kinds.clone(),
        settings.revalidation.public_statuses.clone(),
    ));

    let revalidation = RevalidationConfig::from(&settings.revalidation);
    if !revalidation.is_configured() {
        info!("revalidation endpoint or secret not configured; webhook dispatch disabled");
    }
    let dispatcher = RevalidationDispatcher::new(
        revalidation,
        guard.clone(),
        Arc::new(ReqwestRevalidationTransport::new()?),
        events.clone(),
    );

    let cdn = HttpCdnIntegration::from_settings(&settings.cdn)?
        .map(|cdn| Arc::new(cdn) as Arc<dyn CdnIntegration>);
    let purge = CdnPurgeCoordinator::new(cdn, guard, response_cache, events);

    let pipeline = Arc::new(InvalidationPipeline::new(
        TagDeriver::new(),
        dispatcher,
        purge,
    ));

    let tokens = match PreviewTokenService::from_settings(&settings.preview, Arc::new(SystemClock))
    {
        Ok(service) => Some(Arc::new(service)),
        Err(PreviewConfigError::EmptySecret) => {
            warn!("preview secret not configured; every preview token will be rejected");
            None
        }
        Err(err) => return Err(err.into()),
    };

    Ok(RouterState {
        hooks: HookState {
            pipeline,
            secret: settings.hooks.secret.as_deref().map(Arc::from),
        },
        preview: PreviewState { tokens },
    })
}

fn run_issue_token(settings: &Settings, args: IssueTokenArgs) -> Result<(), AppError> {
    let service = PreviewTokenService::from_settings(&settings.preview, Arc::new(SystemClock))?;
    let ttl = args.ttl_seconds.unwrap_or_else(|| service.default_ttl());
    let token = service.issue(args.entity_id, args.actor_id, ttl);

    info!(
        entity_id = args.entity_id,
        actor_id = args.actor_id,
        ttl_seconds = ttl.max(1),
        "preview token issued"
    );

    println!("{token}");
    match settings.preview.frontend_url.as_ref() {
        Some(base) => println!("{}", preview_url(base, args.entity_id, &token)),
        None => warn!("preview.frontend_url not configured; no preview link printed"),
    }

    Ok(())
}
