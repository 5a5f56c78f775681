//! Optional observability for session flows.
//!
//! # Feature Flags
//!
//! - `tracing`: every observed flow runs inside a `diary_session.flow` span carrying `flow`
//!   and `stage` fields; refresh and terminal transitions also emit events.
//! - `metrics`: `diary_session_flow_total` is incremented once on entry and once on exit,
//!   labeled by `flow` and `outcome`.
//!
//! Without either feature every helper here compiles down to the wrapped future.

mod metrics;
mod tracing;

pub use self::metrics::count_flow;
pub use self::tracing::FlowSpan;

// self
use crate::_prelude::*;

/// Session flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorized request under the refresh protocol.
	Request,
	/// Access-token refresh round trip.
	Refresh,
	/// Profile lookup and auto-login.
	UserInfo,
	/// Session teardown.
	Logout,
}
impl FlowKind {
	/// Label used for the `flow` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
			FlowKind::UserInfo => "user_info",
			FlowKind::Logout => "logout",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How an observed flow ended, plus the entry marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Flow entered.
	Attempt,
	/// Flow produced its value.
	Success,
	/// Flow returned an error or was declined by the server.
	Failure,
	/// Flow ended in a state that needs an interactive login.
	Reauthenticate,
}
impl FlowOutcome {
	/// Label used for the `outcome` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Reauthenticate => "reauthenticate",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a flow span, counting the entry and the outcome `classify` assigns.
pub(crate) async fn observe<Fut>(
	kind: FlowKind,
	stage: &'static str,
	fut: Fut,
	classify: impl FnOnce(&Fut::Output) -> FlowOutcome,
) -> Fut::Output
where
	Fut: Future,
{
	count_flow(kind, FlowOutcome::Attempt);

	let output = FlowSpan::new(kind, stage).instrument(fut).await;

	count_flow(kind, classify(&output));

	output
}
