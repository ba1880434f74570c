//! Connection table for the two match slots
//!
//! Tracks which connection currently holds each [`Side`]. Every connection gets
//! a fresh [`ConnectionId`] so that a late disconnect from a previous occupant
//! can be told apart from the connection that holds the slot now.

use crate::connection::Connection;
use log::info;
use shared::Side;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub type ConnectionId = u64;

/// A slot held by a specific connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub side: Side,
    pub id: ConnectionId,
}

/// A seated client and its outbound channel.
pub struct Client {
    pub slot: Slot,
    pub connection: Arc<dyn Connection>,
    pub connected_at: Instant,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("slot", &self.slot)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ClientManager {
    clients: HashMap<Side, Client>,
    next_connection_id: ConnectionId,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_connection_id: 1,
        }
    }

    /// Seats a connection on `side`.
    ///
    /// Returns `None` if the side is already held.
    pub fn add_client(&mut self, side: Side, connection: Arc<dyn Connection>) -> Option<Slot> {
        if self.clients.contains_key(&side) {
            return None;
        }

        let slot = Slot {
            side,
            id: self.next_connection_id,
        };
        self.next_connection_id += 1;

        info!("Connection {} took the {:?} slot", slot.id, side);
        self.clients.insert(
            side,
            Client {
                slot,
                connection,
                connected_at: Instant::now(),
            },
        );
        Some(slot)
    }

    /// Frees `side`, but only if `owner` is unset or still holds it.
    pub fn remove_client(&mut self, side: Side, owner: Option<ConnectionId>) -> Option<Client> {
        let holds = self
            .clients
            .get(&side)
            .is_some_and(|client| owner.map_or(true, |id| client.slot.id == id));
        if !holds {
            return None;
        }

        let client = self.clients.remove(&side)?;
        info!(
            "Connection {} left the {:?} slot after {:.1}s",
            client.slot.id,
            side,
            client.connected_at.elapsed().as_secs_f32()
        );
        Some(client)
    }

    pub fn holds(&self, slot: Slot) -> bool {
        self.clients
            .get(&slot.side)
            .is_some_and(|client| client.slot == slot)
    }

    /// Snapshot of the outbound channels currently seated, used for broadcasting.
    pub fn recipients(&self) -> Vec<(Slot, Arc<dyn Connection>)> {
        self.clients
            .values()
            .map(|client| (client.slot, Arc::clone(&client.connection)))
            .collect()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
