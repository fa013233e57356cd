//! Client Pool Module
//!
//! Gives every concurrent caller its own store client. Clients are opened
//! lazily through the connector and handed back to the pool when the caller is
//! done, so each one is only ever driven by a single caller at a time.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{StoreClient, StoreConnector};

// == Client Pool ==
pub struct ClientPool<C: StoreConnector> {
    connector: C,
    idle: Mutex<Vec<C::Client>>,
}

impl<C: StoreConnector> ClientPool<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn idle(&self) -> MutexGuard<'_, Vec<C::Client>> {
        // A panic while holding this lock cannot leave the Vec half-updated.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Checkout ==
    /// Borrows an idle client, or opens a new one if none is idle.
    pub fn checkout(&self) -> Result<PooledClient<'_, C>> {
        let reused = self.idle().pop();
        let client = match reused {
            Some(client) => client,
            None => {
                debug!("Opening new store client");
                self.connector.connect()?
            }
        };

        Ok(PooledClient {
            pool: self,
            client: Some(client),
        })
    }

    /// Number of clients waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    // == Close ==
    /// Disconnects and drops every idle client. Checked-out clients are
    /// returned as usual and reused or closed later.
    pub fn close(&self) {
        let clients: Vec<C::Client> = self.idle().drain(..).collect();
        for mut client in clients {
            client.disconnect();
        }
    }
}

impl<C: StoreConnector> fmt::Debug for ClientPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("idle", &self.idle_count())
            .finish()
    }
}

// == Pooled Client ==
/// A client on loan from a [`ClientPool`]; goes back to the pool on drop.
pub struct PooledClient<'a, C: StoreConnector> {
    pool: &'a ClientPool<C>,
    client: Option<C::Client>,
}

impl<C: StoreConnector> PooledClient<'_, C> {
    /// Disconnects the client instead of returning it, for when its connection
    /// state can no longer be trusted.
    pub fn discard(mut self) {
        if let Some(mut client) = self.client.take() {
            warn!("Discarding store client after failure");
            client.disconnect();
        }
    }
}

impl<C: StoreConnector> Deref for PooledClient<'_, C> {
    type Target = C::Client;

    fn deref(&self) -> &Self::Target {
        // Only `discard` and `drop` take the client, and both consume the guard.
        self.client
            .as_ref()
            .unwrap_or_else(|| unreachable!("client already released"))
    }
}

impl<C: StoreConnector> DerefMut for PooledClient<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
            .as_mut()
            .unwrap_or_else(|| unreachable!("client already released"))
    }
}

impl<C: StoreConnector> Drop for PooledClient<'_, C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.idle().push(client);
        }
    }
}
