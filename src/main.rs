use hirehub_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    app_router, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let scheduler = JobScheduler::new().await?;

    {
        let state = app_state.clone();
        // Daily at 09:00 UTC: due check-ins and resends.
        let job = Job::new_async("0 0 9 * * *", move |_uuid, _lock| {
            let state = state.clone();
            Box::pin(async move {
                if let Err(e) = state.scheduler.run().await {
                    tracing::error!(error = ?e, "scheduled check-in run failed");
                }
            })
        })?;
        scheduler.add(job).await?;
    }

    {
        let state = app_state.clone();
        // Daily at 08:00 UTC: protection expiry warnings and markings.
        let job = Job::new_async("0 0 8 * * *", move |_uuid, _lock| {
            let state = state.clone();
            Box::pin(async move {
                if let Err(e) = state.monitor.run_expiry_alerts().await {
                    tracing::error!(error = ?e, "scheduled expiry sweep failed");
                }
            })
        })?;
        scheduler.add(job).await?;
    }

    {
        let state = app_state.clone();
        // Daily at 08:30 UTC: placement guarantee sweep.
        let job = Job::new_async("0 30 8 * * *", move |_uuid, _lock| {
            let state = state.clone();
            Box::pin(async move {
                if let Err(e) = state.monitor.run_guarantee_checks().await {
                    tracing::error!(error = ?e, "scheduled guarantee sweep failed");
                }
            })
        })?;
        scheduler.add(job).await?;
    }

    scheduler.start().await?;

    let app = app_router(app_state, config.public_rps, config.admin_rps)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
