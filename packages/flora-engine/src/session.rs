use serde::{Deserialize, Serialize};

use flora_domain::traits::TraitSet;

use crate::{Result, error::Error, merge::Candidate};

/// Round-trip state for the multi-photo loop. The service keeps nothing
/// server-side; the whole session rides in the response and comes back with
/// the next photo, sealed against tampering.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SessionPayload {
	/// Latest vision reply, trimmed for display.
	pub description: String,
	/// Every vision reply so far, concatenated in round order.
	pub detailed_description: String,
	/// One validated trait set per round, oldest first.
	pub traits: Vec<TraitSet>,
	pub plants: Vec<Candidate>,
	/// Round number the next photo belongs to.
	pub photo_count: u8,
	#[serde(default)]
	pub checksum: String,
}

/// Fills in the checksum over the canonical serialization of everything else.
pub fn seal(payload: &mut SessionPayload) -> Result<()> {
	payload.checksum = digest(payload)?;

	Ok(())
}

/// Whether the payload still matches its own checksum. Callers treat a failed
/// check as "no session", never as an error; a stale client just starts over.
pub fn verify(payload: &SessionPayload) -> bool {
	digest(payload).map(|digest| digest == payload.checksum).unwrap_or(false)
}

fn digest(payload: &SessionPayload) -> Result<String> {
	let mut unsealed = payload.clone();

	unsealed.checksum = String::new();

	let bytes = serde_json::to_vec(&unsealed)
		.map_err(|source| Error::SessionEncode { source })?;

	Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::merge::test_candidate;

	fn payload() -> SessionPayload {
		SessionPayload {
			description: "喬木，葉互生。".to_string(),
			detailed_description: "喬木，葉互生，樹皮灰褐色。".to_string(),
			traits: vec![TraitSet::new()],
			plants: vec![test_candidate("樟樹", 0.72, 0.4, 2)],
			photo_count: 2,
			checksum: String::new(),
		}
	}

	#[test]
	fn sealed_payload_verifies() {
		let mut payload = payload();

		seal(&mut payload).unwrap();

		assert!(verify(&payload));
	}

	#[test]
	fn tampered_payload_fails_verification() {
		let mut payload = payload();

		seal(&mut payload).unwrap();
		payload.photo_count = 3;

		assert!(!verify(&payload));
	}

	#[test]
	fn blank_checksum_fails_verification() {
		assert!(!verify(&payload()));
	}

	#[test]
	fn sealing_twice_is_stable() {
		let mut first = payload();
		let mut second = payload();

		seal(&mut first).unwrap();
		seal(&mut second).unwrap();

		assert_eq!(first.checksum, second.checksum);
	}
}
