use std::sync::Arc;

use flora_engine::{Engine, HttpBackend};

#[derive(Clone)]
pub struct AppState {
	pub cfg: Arc<flora_config::Config>,
	pub engine: Arc<Engine<HttpBackend>>,
}

impl AppState {
	pub fn new(config: flora_config::Config) -> Self {
		let cfg = Arc::new(config);
		let backend = HttpBackend::new(cfg.clone());
		let engine = Arc::new(Engine::new(cfg.clone(), backend));

		Self { cfg, engine }
	}
}
