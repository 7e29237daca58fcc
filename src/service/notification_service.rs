// service/notification_service.rs
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, PoisonError,
    },
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::models::{chatmodels::Message, offermodels::JobOffer};

/// Events pushed to connected parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    NewMessage {
        message: Message,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        offer: Option<JobOffer>,
    },
    OfferStatusUpdate {
        offer: JobOffer,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::NewMessage { .. } => "new_message",
            MarketEvent::OfferStatusUpdate { .. } => "offer_status_update",
        }
    }
}

/// Fire-and-forget sink for events. Implementations must never block.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, party_a: Uuid, party_b: Uuid, event: MarketEvent);
}

/// Emits the message for an offer change followed by its status update.
pub fn emit_offer_change(emitter: &dyn EventEmitter, offer: &JobOffer, message: Option<&Message>) {
    if let Some(message) = message {
        emitter.emit(
            offer.client_id,
            offer.freelancer_id,
            MarketEvent::NewMessage {
                message: message.clone(),
                offer: Some(offer.clone()),
            },
        );
    }
    emitter.emit(
        offer.client_id,
        offer.freelancer_id,
        MarketEvent::OfferStatusUpdate {
            offer: offer.clone(),
        },
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(u64);

struct Connection {
    user_id: Uuid,
    sender: mpsc::Sender<MarketEvent>,
}

/// Registry of live connections. Created at startup, torn down by `shutdown`.
pub struct NotificationHub {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            capacity: capacity.max(1),
        }
    }

    pub fn register(&self, user_id: Uuid) -> (ConnectionId, mpsc::Receiver<MarketEvent>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.capacity);

        if self.closed.load(Ordering::Acquire) {
            // sender dropped here, the receiver ends immediately
            return (id, receiver);
        }

        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Connection { user_id, sender });
        tracing::debug!("Connection {:?} registered for user {}", id, user_id);

        (id, receiver)
    }

    pub fn unregister(&self, id: ConnectionId) {
        let removed = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(conn) = removed {
            tracing::debug!("Connection {:?} unregistered for user {}", id, conn.user_id);
        }
    }

    /// Pushes to every connection of `user_id` without waiting; an event that
    /// does not fit a full queue is dropped. Returns how many queues took it.
    pub fn send_to_user(&self, user_id: Uuid, event: &MarketEvent) -> usize {
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, conn) in connections.iter().filter(|(_, c)| c.user_id == user_id) {
            match conn.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Dropping {} event for user {}: connection {:?} queue full",
                        event.kind(),
                        user_id,
                        id
                    );
                }
                Err(TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            connections.remove(&id);
        }

        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes every outbound queue; later registrations end immediately.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let mut connections = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = connections.len();
        connections.clear();
        tracing::info!("Notification hub shut down, closed {} connections", count);
    }
}

impl EventEmitter for NotificationHub {
    fn emit(&self, party_a: Uuid, party_b: Uuid, event: MarketEvent) {
        if self.is_closed() {
            return;
        }
        self.send_to_user(party_a, &event);
        if party_b != party_a {
            self.send_to_user(party_b, &event);
        }
    }
}
