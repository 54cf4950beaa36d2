// Módulos de la aplicación
mod api;
mod app_state;
mod classifier;
mod config;
mod lexicon;
mod llm;
mod models;
mod neo4j_client;
mod pipeline;
mod sentiment;
mod store;
mod youtube;

use crate::app_state::AppState;
use crate::classifier::SentimentClassifier;
use crate::llm::SentimentBackend;
use crate::pipeline::AnalysisPipeline;
use crate::store::{AnalysisStore, MemoryStore, Neo4jStore};
use crate::youtube::YouTubeClient;
use axum::Router;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().expect("Error al cargar la configuración");

    // 3. Almacén: Neo4j si está configurado, si no en memoria
    let store: Arc<dyn AnalysisStore> = match &cfg.neo4j {
        Some(neo4j_cfg) => {
            let graph = neo4j_client::connect_from_config(neo4j_cfg)
                .await
                .expect("Error conectando a Neo4j");
            neo4j_client::ensure_schema(&graph)
                .await
                .expect("Error asegurando el esquema de Neo4j");
            Arc::new(Neo4jStore::new(Arc::new(graph)))
        }
        None => {
            warn!("NEO4J_URI no definido: los análisis se guardarán sólo en memoria.");
            Arc::new(MemoryStore::new())
        }
    };

    // 4. Fuente de comentarios y clasificador
    let youtube = YouTubeClient::from_config(&cfg);
    if !youtube.is_configured() {
        warn!("YOUTUBE_API_KEY no definido: las peticiones de análisis fallarán.");
    }

    let backend: Option<Arc<dyn SentimentBackend>> = match llm::LlmManager::from_config(&cfg) {
        Some(manager) => {
            info!("Clasificador remoto activo ({:?}, modelo {}).", manager.provider, manager.chat_model);
            Some(Arc::new(manager))
        }
        None => {
            info!("Sin credencial de LLM: se usará sólo el clasificador léxico.");
            None
        }
    };
    let classifier = Arc::new(SentimentClassifier::new(backend));

    let pipeline = AnalysisPipeline::new(
        Arc::new(youtube),
        classifier,
        store.clone(),
        cfg.youtube_max_results,
    );

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // 5. Crear estado compartido de la aplicación
    let app_state = AppState {
        config: cfg.clone(),
        pipeline: Arc::new(pipeline),
        store,
        shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    // 6. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 7. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .unwrap();
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .unwrap();

    info!("✅ Servidor cerrado correctamente.");
}
