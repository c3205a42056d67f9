//! Broadcast channel carrying [`ConsoleEvent`]s to whoever renders them.

use orderdesk_types::ConsoleEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the console event channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ConsoleEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event. Having no subscribers is not an error.
	pub fn publish(&self, event: ConsoleEvent) {
		if self.sender.send(event).is_err() {
			tracing::trace!("Console event dropped, no subscribers");
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(64)
	}
}
