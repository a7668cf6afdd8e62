//! The shared outbound HTTP client.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use config::TimeoutsConfig;
use reqwest::Client;

use crate::error::BackendError;

enum PoolState {
    Idle,
    Open(Client),
    Closed,
}

/// Owns the single HTTP client shared by all backend adapters.
///
/// The client is built on first use. After [`ConnectionPool::close`] no new calls can be made;
/// calls already in flight keep their clone of the client until they finish.
pub struct ConnectionPool {
    connect_timeout: Duration,
    request_timeout: Duration,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// Create a pool. No connection is made until a client is acquired.
    pub fn new(timeouts: &TimeoutsConfig) -> Self {
        Self {
            connect_timeout: timeouts.connect,
            request_timeout: timeouts.request,
            state: Mutex::new(PoolState::Idle),
        }
    }

    /// The shared client, built on first call.
    pub fn client(&self) -> Result<Client, BackendError> {
        let mut state = self.lock();

        match &*state {
            PoolState::Open(client) => Ok(client.clone()),
            PoolState::Closed => Err(BackendError::new("Connection pool is closed")),
            PoolState::Idle => {
                let client = Client::builder()
                    .connect_timeout(self.connect_timeout)
                    .build()
                    .map_err(|e| BackendError::new(format!("Failed to create HTTP client: {e}")))?;

                log::debug!("Created backend HTTP client");
                *state = PoolState::Open(client.clone());

                Ok(client)
            }
        }
    }

    /// Bound for non-streaming backend calls.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        matches!(*self.lock(), PoolState::Open(_))
    }

    /// Release the shared client. Calling this more than once has no further effect.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock(), PoolState::Closed);

        if let PoolState::Open(client) = previous {
            drop(client);
            log::debug!("Closed backend HTTP client");
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
