//! Submission state machine.
//!
//! A submission moves Received -> Deserializing -> Submitting ->
//! AwaitingConfirmation and ends in exactly one terminal state. A submission
//! whose block reference is already stale may expire straight from
//! Deserializing. Nothing is shared between submissions; the tracker only
//! validates and logs the path a single submit call takes.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
	Received,
	Deserializing,
	Submitting,
	AwaitingConfirmation,
	Confirmed,
	OnChainFailed,
	Expired,
	UpstreamError,
	/// Rejected before reaching the ledger.
	Rejected,
}

impl SubmissionState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			SubmissionState::Confirmed
				| SubmissionState::OnChainFailed
				| SubmissionState::Expired
				| SubmissionState::UpstreamError
				| SubmissionState::Rejected
		)
	}
}

impl fmt::Display for SubmissionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

static TRANSITIONS: Lazy<HashMap<SubmissionState, HashSet<SubmissionState>>> = Lazy::new(|| {
	use SubmissionState::*;
	let mut m = HashMap::new();
	m.insert(Received, HashSet::from([Deserializing, Rejected]));
	m.insert(Deserializing, HashSet::from([Submitting, Expired, Rejected]));
	m.insert(
		Submitting,
		HashSet::from([AwaitingConfirmation, OnChainFailed, Expired, UpstreamError]),
	);
	m.insert(
		AwaitingConfirmation,
		HashSet::from([Confirmed, OnChainFailed, Expired, UpstreamError]),
	);
	m
});

/// Tracks the state of one submission.
#[derive(Debug)]
pub struct SubmissionTracker {
	payment_id: String,
	state: SubmissionState,
}

impl SubmissionTracker {
	pub fn new(payment_id: Option<&str>) -> Self {
		Self {
			payment_id: payment_id.unwrap_or("-").to_string(),
			state: SubmissionState::Received,
		}
	}

	pub fn state(&self) -> SubmissionState {
		self.state
	}

	fn is_valid_transition(from: SubmissionState, to: SubmissionState) -> bool {
		TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
	}

	/// Moves to `next`. Returns false and keeps the current state when the
	/// transition is not allowed.
	pub fn advance(&mut self, next: SubmissionState) -> bool {
		if !Self::is_valid_transition(self.state, next) {
			tracing::warn!(
				payment_id = %self.payment_id,
				from = %self.state,
				to = %next,
				"Ignoring invalid submission transition"
			);
			return false;
		}
		tracing::debug!(
			payment_id = %self.payment_id,
			from = %self.state,
			to = %next,
			"Submission state changed"
		);
		self.state = next;
		true
	}
}
