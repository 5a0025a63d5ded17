use std::{process, sync::Arc, time::Duration};

use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        blog::BlogService,
        catalog::CatalogService,
        contact::ContactService,
        error::AppError,
        overview::OverviewService,
        repos::{ContactRepo, HealthRepo, OverviewRepo, PostsRepo, ProjectsRepo, SubscribersRepo},
        views::ViewCounter,
    },
    cache::{CacheInvalidator, CacheKeyEngine, MemoryCacheStore, ReadThroughCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{AdminState, PublicState, build_admin_router, build_public_router},
        images::DerivativePipeline,
        telemetry,
        uploads::UploadStorage,
    },
    rate_limit::{MemoryRateStore, RateLimiter},
};

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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    serve(settings).await
}

async fn serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    // Sweep elapsed rate windows so idle identities do not accumulate.
    let prune_interval = Duration::from_secs(settings.rate_limit.prune_interval_secs.max(1));
    let rate_store = app.rate_store.clone();
    let prune_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_interval);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            rate_store.prune_expired();
        }
    });

    let result = serve_http(&settings, app.public_state, app.admin_state).await;

    prune_handle.abort();
    let _ = prune_handle.await;

    result
}

struct ApplicationContext {
    public_state: PublicState,
    admin_state: AdminState,
    rate_store: Arc<MemoryRateStore>,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let projects_repo: Arc<dyn ProjectsRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let contact_repo: Arc<dyn ContactRepo> = repositories.clone();
    let subscribers_repo: Arc<dyn SubscribersRepo> = repositories.clone();
    let overview_repo: Arc<dyn OverviewRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    let cache_store = Arc::new(MemoryCacheStore::new(settings.cache.entry_limit));
    let cache = Arc::new(ReadThroughCache::new(cache_store.clone()));
    let invalidator = CacheInvalidator::new(cache_store);
    let keys = CacheKeyEngine::new(settings.cache.max_key_length);
    let views = ViewCounter::new(repositories.clone());

    let rate_store = Arc::new(MemoryRateStore::new());
    let limiter = RateLimiter::new(rate_store.clone());

    let upload_storage = Arc::new(
        UploadStorage::new(
            settings.uploads.directory.clone(),
            settings.uploads.max_request_bytes.get(),
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let pipeline = Arc::new(
        DerivativePipeline::new(
            settings.uploads.derivative_directory.clone(),
            settings.images.background,
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    // read-only handle over the derivative tree for the media routes
    let derivative_files = Arc::new(
        UploadStorage::new(
            settings.uploads.derivative_directory.clone(),
            settings.uploads.max_request_bytes.get(),
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let catalog = Arc::new(CatalogService::new(
        projects_repo,
        cache.clone(),
        invalidator.clone(),
        keys.clone(),
        views.clone(),
        settings.cache.clone(),
        upload_storage.clone(),
        pipeline,
        settings.images.derivative_specs(),
    ));
    let blog = Arc::new(BlogService::new(
        posts_repo,
        cache.clone(),
        invalidator,
        keys.clone(),
        views,
        settings.cache.clone(),
    ));
    let contact = Arc::new(ContactService::new(
        contact_repo,
        subscribers_repo,
        limiter,
        settings.rate_limit.contact_budget(),
        settings.rate_limit.subscribe_budget(),
    ));
    let overview = Arc::new(OverviewService::new(
        overview_repo,
        cache,
        keys,
        settings.cache.clone(),
    ));

    let public_state = PublicState {
        catalog: catalog.clone(),
        blog: blog.clone(),
        contact: contact.clone(),
        overview,
        health: health_repo,
        media_sources: upload_storage,
        media_derivatives: derivative_files,
    };

    let admin_state = AdminState {
        catalog,
        blog,
        contact,
    };

    Ok(ApplicationContext {
        public_state,
        admin_state,
        rate_store,
    })
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = build_public_router(public_state);
    let upload_body_limit = settings.uploads.max_request_bytes.get() as usize;
    let admin_router = build_admin_router(admin_state, upload_body_limit);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "vitrine listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
