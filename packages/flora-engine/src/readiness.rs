use std::sync::RwLock;

use time::{Duration, OffsetDateTime};

use flora_providers::vector::Health;

/// Injectable time source so cache-expiry tests need not sleep.
pub trait Clock: Send + Sync {
	fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
	pub health: Health,
	pub checked_at: OffsetDateTime,
}

/// Last embedding-index health probe, shared across requests. Both healthy and
/// unhealthy outcomes are held for the full TTL; a flapping index must not be
/// re-probed on every request.
pub struct ReadinessCache {
	ttl: Duration,
	slot: RwLock<Option<Snapshot>>,
}

impl ReadinessCache {
	pub fn new(ttl_secs: u64) -> Self {
		Self { ttl: Duration::seconds(ttl_secs as i64), slot: RwLock::new(None) }
	}

	/// The cached health, or `None` when absent or older than the TTL.
	pub fn fresh(&self, clock: &dyn Clock) -> Option<Health> {
		let slot = self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner());
		let snapshot = (*slot)?;

		(clock.now() - snapshot.checked_at <= self.ttl).then_some(snapshot.health)
	}

	pub fn store(&self, health: Health, clock: &dyn Clock) {
		let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());

		*slot = Some(Snapshot { health, checked_at: clock.now() });
	}
}
