//! Order status workflow.
//!
//! pending -> accepted | rejected, accepted -> completed | cancelled.
//! completed, rejected and cancelled are terminal. Operators move orders
//! along these edges through [`Action`]s.

use once_cell::sync::Lazy;
use orderdesk_types::OrderStatus;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Static transition table - each state maps to allowed next states.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([OrderStatus::Accepted, OrderStatus::Rejected]),
	);
	m.insert(
		OrderStatus::Accepted,
		HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Completed, HashSet::new());
	m.insert(OrderStatus::Rejected, HashSet::new());
	m.insert(OrderStatus::Cancelled, HashSet::new());
	m
});

/// An operator action on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	Accept,
	Reject,
	Cancel,
	Complete,
}

impl Action {
	/// Status an order ends up in after this action.
	pub fn target(self) -> OrderStatus {
		match self {
			Action::Accept => OrderStatus::Accepted,
			Action::Reject => OrderStatus::Rejected,
			Action::Cancel => OrderStatus::Cancelled,
			Action::Complete => OrderStatus::Completed,
		}
	}

	/// Button caption shown to the operator.
	pub fn label(self) -> &'static str {
		match self {
			Action::Accept => "Accept",
			Action::Reject => "Reject",
			Action::Cancel => "Cancel",
			Action::Complete => "Complete",
		}
	}

	fn name(self) -> &'static str {
		match self {
			Action::Accept => "accept",
			Action::Reject => "reject",
			Action::Cancel => "cancel",
			Action::Complete => "complete",
		}
	}

	pub fn all() -> [Action; 4] {
		[Action::Accept, Action::Reject, Action::Cancel, Action::Complete]
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Action {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Action::all()
			.into_iter()
			.find(|action| action.name() == s)
			.ok_or_else(|| format!("Unknown action: {}", s))
	}
}

/// Checks whether the workflow allows moving from `from` to `to`.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Actions offered to the operator for an order in `status`, in display order.
pub fn available_actions(status: OrderStatus) -> &'static [Action] {
	match status {
		OrderStatus::Pending => &[Action::Accept, Action::Reject],
		OrderStatus::Accepted => &[Action::Cancel, Action::Complete],
		OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled => &[],
	}
}

/// True for statuses with no outgoing transitions.
pub fn is_terminal(status: OrderStatus) -> bool {
	TRANSITIONS.get(&status).is_none_or(HashSet::is_empty)
}

/// Operator-facing name of a status.
pub fn status_label(status: OrderStatus) -> &'static str {
	match status {
		OrderStatus::Pending => "Pending",
		OrderStatus::Accepted => "In progress",
		OrderStatus::Completed => "Order completed",
		OrderStatus::Rejected => "Rejected",
		OrderStatus::Cancelled => "Cancelled",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transition_table() {
		use OrderStatus::*;

		assert!(is_valid_transition(Pending, Accepted));
		assert!(is_valid_transition(Pending, Rejected));
		assert!(is_valid_transition(Accepted, Completed));
		assert!(is_valid_transition(Accepted, Cancelled));

		assert!(!is_valid_transition(Pending, Completed));
		assert!(!is_valid_transition(Pending, Pending));
		assert!(!is_valid_transition(Accepted, Rejected));
		assert!(!is_valid_transition(Completed, Pending));
		assert!(!is_valid_transition(Cancelled, Accepted));
	}

	#[test]
	fn test_terminal_states_offer_no_actions() {
		for status in OrderStatus::all() {
			assert_eq!(is_terminal(status), available_actions(status).is_empty());
		}
		assert!(is_terminal(OrderStatus::Rejected));
		assert!(!is_terminal(OrderStatus::Accepted));
	}

	#[test]
	fn test_every_offered_action_is_a_legal_edge() {
		for status in OrderStatus::all() {
			for action in available_actions(status) {
				assert!(
					is_valid_transition(status, action.target()),
					"{} offered from {}",
					action,
					status
				);
			}
		}
	}

	#[test]
	fn test_labels() {
		assert_eq!(status_label(OrderStatus::Accepted), "In progress");
		assert_eq!(status_label(OrderStatus::Completed), "Order completed");
		assert_eq!(Action::Complete.label(), "Complete");
	}

	#[test]
	fn test_action_parsing() {
		assert_eq!("accept".parse::<Action>().unwrap(), Action::Accept);
		assert_eq!(Action::Cancel.to_string(), "cancel");
		assert!("approve".parse::<Action>().is_err());
	}
}
