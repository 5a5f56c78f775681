// self
use crate::obs::{FlowKind, FlowOutcome};

/// Bumps `diary_session_flow_total{flow, outcome}` on the global recorder.
pub fn count_flow(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"diary_session_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn every_label_pair_is_countable() {
		for outcome in [
			FlowOutcome::Attempt,
			FlowOutcome::Success,
			FlowOutcome::Failure,
			FlowOutcome::Reauthenticate,
		] {
			count_flow(FlowKind::Refresh, outcome);
		}
	}
}
