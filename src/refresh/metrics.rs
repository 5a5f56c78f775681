// std
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to one refresh round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefreshEvent {
	Issued,
	Renewed,
	SessionExpired,
	Failed,
}

/// Per-client tally of refresh round trips, one slot per outcome.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	tally: [AtomicU64; 4],
}
impl RefreshMetrics {
	/// Refresh calls issued.
	pub fn attempts(&self) -> u64 {
		self.read(RefreshEvent::Issued)
	}

	/// Refreshes that produced a new credential.
	pub fn successes(&self) -> u64 {
		self.read(RefreshEvent::Renewed)
	}

	/// Refreshes answered with an unrecoverable session.
	pub fn session_expired(&self) -> u64 {
		self.read(RefreshEvent::SessionExpired)
	}

	/// Refreshes that ended in an error.
	pub fn failures(&self) -> u64 {
		self.read(RefreshEvent::Failed)
	}

	pub(crate) fn record(&self, event: RefreshEvent) {
		self.tally[event as usize].fetch_add(1, Ordering::Relaxed);
	}

	fn read(&self, event: RefreshEvent) -> u64 {
		self.tally[event as usize].load(Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_land_in_their_own_slot() {
		let metrics = RefreshMetrics::default();

		metrics.record(RefreshEvent::Issued);
		metrics.record(RefreshEvent::Issued);
		metrics.record(RefreshEvent::Renewed);
		metrics.record(RefreshEvent::SessionExpired);

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.successes(), 1);
		assert_eq!(metrics.session_expired(), 1);
		assert_eq!(metrics.failures(), 0);
	}
}
