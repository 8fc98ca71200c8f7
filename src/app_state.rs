use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use crate::{config::AppConfig, error::PipelineError, graph_store::GraphStore, llm::TextGenerator};

/// Servicios compartidos por todos los handlers. Se construye una sola vez en
/// `main` y cada etapa recibe los clientes por referencia.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub graph: Arc<dyn GraphStore>,
    pub llm: Arc<dyn TextGenerator>,
    pub status: Arc<Mutex<Status>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub progress: f32, // Valor entre 0.0 y 1.0
}

/// Marca el servidor como ocupado mientras dura una ingesta y lo libera al
/// salir de ámbito, también si la ingesta falla.
pub struct BusyGuard {
    status: Arc<Mutex<Status>>,
}

impl BusyGuard {
    pub fn acquire(status: &Arc<Mutex<Status>>, message: String) -> Result<Self, PipelineError> {
        let mut current = lock_status(status);
        if current.is_busy {
            return Err(PipelineError::Busy);
        }
        current.is_busy = true;
        current.message = message;
        current.progress = 0.0;
        Ok(Self { status: status.clone() })
    }

    /// Deja el mensaje final que verá el frontend en `/api/status`.
    pub fn finish(self, message: String) {
        lock_status(&self.status).message = message;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut status = lock_status(&self.status);
        status.is_busy = false;
        status.progress = 0.0;
    }
}

/// Bloquea el estado aunque otro hilo haya entrado en pánico con él tomado:
/// `Status` sigue siendo coherente campo a campo.
pub fn lock_status(status: &Mutex<Status>) -> MutexGuard<'_, Status> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}
