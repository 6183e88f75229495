//! HTTP server implementation

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::config::SessionBackend;
use crate::conversation::ConversationOrchestrator;
use crate::conversation::ConversationStore;
use crate::conversation::FileConversationStore;
use crate::conversation::MemoryConversationStore;
use crate::embeddings::EmbeddingClient;
use crate::export::MailTransport;
use crate::export::PdfExporter;
use crate::export::SmtpMailer;
use crate::knowledge::VectorIndex;
use crate::llm::LlmClient;
use crate::rag::PromptComposer;
use crate::rag::Retriever;
use crate::BarcraftError;
use crate::Result;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn open_store(config: &AppConfig) -> Result<Arc<dyn ConversationStore>> {
    Ok(match config.sessions.backend {
        SessionBackend::Memory => Arc::new(MemoryConversationStore::new()),
        SessionBackend::File => Arc::new(FileConversationStore::new(&config.sessions.dir)?),
    })
}

fn load_system_prompt(config: &AppConfig) -> Result<String> {
    let path = &config.prompt.system_prompt_path;
    std::fs::read_to_string(path).map_err(|e| {
        BarcraftError::Config(format!("cannot read system prompt {}: {e}", path.display()))
    })
}

/// Wire every collaborator from configuration
///
/// Fails with [`BarcraftError::RetrievalUnavailable`] when the knowledge index
/// cannot be loaded; the service does not start without it.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let store = open_store(config)?;
    let system_prompt = load_system_prompt(config)?;

    let embedder = Arc::new(EmbeddingClient::from_app_config(config)?);
    let index = VectorIndex::load(
        config.index_path(),
        embedder,
        Some(config.embedding_dimension()),
    )?;
    let retriever = Retriever::new(Arc::new(index), config.top_k());

    let composer = PromptComposer::new(system_prompt, config.knowledge.label.clone())
        .with_history_budget(config.prompt.history_char_budget);
    let completion = Arc::new(LlmClient::new(&config.llm)?);
    info!(
        "Completion provider {:?}, model {}",
        completion.provider(),
        completion.model()
    );

    let orchestrator = ConversationOrchestrator::new(store, retriever, composer, completion)
        .with_timeouts(
            Duration::from_secs(config.embeddings.timeout_secs),
            Duration::from_secs(config.llm.timeout_secs),
        );

    let mailer = match &config.smtp {
        Some(smtp) => {
            info!("Mail delivery via {}:{}", smtp.server, smtp.port);
            Some(Arc::new(SmtpMailer::new(smtp)?) as Arc<dyn MailTransport>)
        }
        None => {
            info!("No [smtp] section, mail delivery disabled");
            None
        }
    };

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        exporter: Arc::new(PdfExporter::new(&config.export)),
        mailer,
        cookie_name: Arc::from(config.server.cookie_name.as_str()),
    })
}

/// Periodically drop idle sessions and their locks
pub fn spawn_session_sweeper(orchestrator: Arc<ConversationOrchestrator>, ttl_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match orchestrator.purge_idle(ttl_secs).await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} idle sessions", n),
                Err(e) => error!("Session sweep failed: {}", e),
            }
            orchestrator.release_idle_locks();
        }
    });
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("🍸 Starting barcraft server...");

    let state = build_state(config)?;
    spawn_session_sweeper(state.orchestrator.clone(), config.session_ttl_secs());

    let mut app: Router = routes::app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new()),
    );

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /                  - Chat page");
    info!("  POST /api/chat          - Submit concept and/or prompt");
    info!("  GET  /api/conversation  - Current conversation");
    info!("  POST /api/reset         - Start over");
    info!("  POST /api/download      - Transcript PDF");
    info!("  POST /api/email         - Mail transcript PDF");
    info!("  GET  /api/health        - Health check");

    axum::serve(listener, app).await?;

    Ok(())
}
