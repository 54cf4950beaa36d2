use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use crate::{config::AppConfig, pipeline::AnalysisPipeline, store::AnalysisStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<AnalysisPipeline>,
    pub store: Arc<dyn AnalysisStore>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
