//! Identification pipeline: turns one vision-model reply (plus optional
//! session state) into a ranked candidate list and a continue-or-stop
//! decision. All provider traffic goes through the [`SearchBackend`] seam.

pub mod backend;
pub mod boost;
pub mod error;
pub mod identify;
pub mod merge;
pub mod readiness;
pub mod session;

pub use backend::{HttpBackend, SearchBackend};
pub use error::{Error, Result};

use std::sync::Arc;

use flora_config::Config;

use crate::readiness::{Clock, ReadinessCache, SystemClock};

pub struct Engine<B> {
	cfg: Arc<Config>,
	backend: B,
	clock: Box<dyn Clock>,
	readiness: ReadinessCache,
}

impl<B> Engine<B>
where
	B: SearchBackend,
{
	pub fn new(cfg: Arc<Config>, backend: B) -> Self {
		Self::with_clock(cfg, backend, Box::new(SystemClock))
	}

	pub fn with_clock(cfg: Arc<Config>, backend: B, clock: Box<dyn Clock>) -> Self {
		let readiness = ReadinessCache::new(cfg.retrieval.readiness_ttl_secs);

		Self { cfg, backend, clock, readiness }
	}

	pub fn config(&self) -> &Config {
		&self.cfg
	}
}
