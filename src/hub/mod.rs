//! Broadcast hub: single-writer, multi-reader fan-out of [`Message`]s to
//! connected clients.
//!
//! Every register, unregister and broadcast is a command on one unbounded
//! channel consumed by a single run loop, which owns the subscriber set. The
//! loop never waits on a subscriber: each has a bounded buffer, and one that
//! is full or closed when a message arrives is dropped from the set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::registry::{TaskEvent, TaskObserver};

mod session;

pub use session::serve_subscriber;

/// Event name broadcast when a task is registered
pub const EVENT_TASK_ADDED: &str = "task added";
/// Event name broadcast when a task ends
pub const EVENT_TASK_ENDED: &str = "task ended";

/// One broadcast event, as sent to every subscriber
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Unique message identity
    pub id: Uuid,
    /// Event name, e.g. "task added"
    pub event: String,
    /// Event payload
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

impl Message {
    /// Create a message with a fresh identity
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: event.into(),
            data,
        }
    }

    /// Serialize to the JSON text sent over the wire
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Identity of a hub subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live registration: the subscriber's identity and its message buffer.
///
/// The receiver yields `None` once the subscriber has been unregistered,
/// dropped for being slow, or the hub has stopped.
#[derive(Debug)]
pub struct Subscription {
    /// Subscriber identity, used to unregister
    pub id: SubscriberId,
    /// Messages delivered to this subscriber, in hub order
    pub receiver: mpsc::Receiver<Message>,
}

#[derive(Debug)]
enum HubCommand {
    Register {
        id: SubscriberId,
        sender: mpsc::Sender<Message>,
    },
    Unregister(SubscriberId),
    Broadcast(Message),
    LiveCount(oneshot::Sender<usize>),
    Shutdown,
}

/// Handle to a running hub. Cheap to clone.
///
/// The run loop stops when [`Hub::shutdown`] is called or every handle has
/// been dropped; all subscriber buffers close with it.
#[derive(Clone, Debug)]
pub struct Hub {
    commands: mpsc::UnboundedSender<HubCommand>,
    buffer: usize,
}

impl Hub {
    /// Spawn the run loop on the current tokio runtime.
    ///
    /// `buffer` is the number of undelivered messages a subscriber may hold
    /// before it is dropped. Values below 1 are raised to 1.
    pub fn spawn(buffer: usize) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self {
            commands,
            buffer: buffer.max(1),
        }
    }

    /// Add a subscriber. Always succeeds; if the hub has already stopped the
    /// returned receiver is closed immediately.
    pub fn register(&self) -> Subscription {
        let id = SubscriberId(Uuid::new_v4());
        let (sender, receiver) = mpsc::channel(self.buffer);
        if self
            .commands
            .send(HubCommand::Register { id, sender })
            .is_err()
        {
            tracing::debug!(subscriber_id = %id, "Hub stopped, subscription closed");
        }
        Subscription { id, receiver }
    }

    /// Remove a subscriber if it is still live. Its buffer closes.
    pub fn unregister(&self, id: SubscriberId) {
        let _ = self.commands.send(HubCommand::Unregister(id));
    }

    /// Queue `payload` under `event` for every live subscriber.
    ///
    /// Never blocks. Payloads that fail to serialize are logged and dropped.
    pub fn broadcast(&self, event: &str, payload: impl Serialize) {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(event, error = %e, "Failed to serialize broadcast payload");
                return;
            }
        };
        self.publish(Message::new(event, data));
    }

    /// Queue an already built message
    pub fn publish(&self, message: Message) {
        if self.commands.send(HubCommand::Broadcast(message)).is_err() {
            tracing::trace!("Hub stopped, broadcast discarded");
        }
    }

    /// Number of live subscribers, as seen by the run loop after every
    /// previously queued command. Zero once the hub has stopped.
    pub async fn live_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(HubCommand::LiveCount(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Stop the run loop after the commands already queued
    pub fn shutdown(&self) {
        let _ = self.commands.send(HubCommand::Shutdown);
    }

    /// Whether the run loop has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

async fn run(mut commands: mpsc::UnboundedReceiver<HubCommand>) {
    let mut subscribers: HashMap<SubscriberId, mpsc::Sender<Message>> = HashMap::new();
    tracing::debug!("Hub started");

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Register { id, sender } => {
                subscribers.insert(id, sender);
                tracing::debug!(subscriber_id = %id, live = subscribers.len(), "Subscriber registered");
            }
            HubCommand::Unregister(id) => {
                if subscribers.remove(&id).is_some() {
                    tracing::debug!(subscriber_id = %id, live = subscribers.len(), "Subscriber unregistered");
                }
            }
            HubCommand::Broadcast(message) => deliver(&mut subscribers, &message),
            HubCommand::LiveCount(reply) => {
                let _ = reply.send(subscribers.len());
            }
            HubCommand::Shutdown => break,
        }
    }

    tracing::debug!(dropped = subscribers.len(), "Hub stopped");
}

fn deliver(subscribers: &mut HashMap<SubscriberId, mpsc::Sender<Message>>, message: &Message) {
    subscribers.retain(|id, sender| match sender.try_send(message.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(subscriber_id = %id, event = %message.event, "Subscriber buffer full, dropping subscriber");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(subscriber_id = %id, "Subscriber gone, removing");
            false
        }
    });
}

/// Registry observer forwarding task transitions to the hub
#[derive(Clone, Debug)]
pub struct HubNotifier {
    hub: Hub,
}

impl HubNotifier {
    /// Forward task events to `hub`
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

impl TaskObserver for HubNotifier {
    fn on_task_event(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Added { task, .. } => self.hub.broadcast(EVENT_TASK_ADDED, task),
            TaskEvent::Ended { task, .. } => self.hub.broadcast(EVENT_TASK_ENDED, task),
            TaskEvent::Removed { id, .. } => {
                tracing::trace!(task_id = %id, "Task removed");
            }
        }
    }
}
