use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use medora_assistant_server::{
    auth::JwtManager,
    build_router,
    config::Settings,
    database::{DbPool, Repository},
    logging,
    services::{
        conversation::{AssistantVariant, SessionStore},
        AssistantService, ClinicDataProvider, LlmProvider, LlmService,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_telemetry()?;

    info!("🚀 Starting Medora Assistant Server...");

    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let llm_provider: Option<Arc<dyn LlmProvider>> = match settings.llm_api_key() {
        Some(key) => {
            let service = LlmService::new(settings.llm.clone(), key.to_string())?;
            Some(Arc::new(service) as Arc<dyn LlmProvider>)
        }
        None => None,
    };

    let db_pool = match settings.database.url.as_deref() {
        Some(url) => {
            let pool = DbPool::new(&settings.database, url).await?;
            info!("✅ Database connection established");
            Some(pool)
        }
        None => {
            warn!("⚠️ No database url configured");
            None
        }
    };

    let clinic_data = db_pool.clone().map(|pool| {
        Arc::new(Repository::new(pool)) as Arc<dyn ClinicDataProvider>
    });

    let assistant = Arc::new(AssistantService::new(
        SessionStore::new(
            AssistantVariant::Patient,
            settings.conversation.patient_max_messages,
        ),
        SessionStore::new(
            AssistantVariant::Clinic,
            settings.conversation.clinic_max_messages,
        ),
        llm_provider,
        clinic_data,
    ));

    if settings.conversation.idle_sweep_seconds > 0 {
        assistant.clone().spawn_idle_sweep(
            Duration::from_secs(settings.conversation.idle_sweep_seconds),
            chrono::Duration::seconds(settings.conversation.idle_ttl_seconds),
        );
    }

    let state = AppState {
        assistant,
        jwt_manager: Arc::new(JwtManager::new(&settings.auth.jwt_secret)),
        db_pool: db_pool.clone(),
        system: Arc::new(parking_lot::Mutex::new(sysinfo::System::new())),
    };

    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = db_pool {
        pool.close().await;
    }
    info!("👋 Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
