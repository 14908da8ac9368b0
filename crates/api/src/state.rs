use std::sync::Arc;

use texgen_comfyui::ComfyUIApi;
use texgen_events::EventBus;
use texgen_pipeline::Sequencer;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: texgen_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Browser WebSocket connections.
    pub ws_manager: Arc<WsManager>,
    /// Queue sequencer. Also owns the session state, presets and notifier.
    pub sequencer: Arc<Sequencer>,
    /// Render backend client used by the admin passthrough routes.
    pub comfyui: Arc<ComfyUIApi>,
    pub event_bus: Arc<EventBus>,
}
