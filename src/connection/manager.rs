//! Connection manager with an explicit lifecycle.
//!
//! Owns the database client as an injectable resource rather than ambient
//! global state; the executor borrows the client for exactly one call at a
//! time. Status reads never touch the database.

use std::fmt;

use crate::config::DatabaseConfig;
use crate::db::{DatabaseClient, MySqlClient};
use crate::error::{GatekeeperError, Result};

/// Lifecycle state of the managed connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No pool has been created yet.
    #[default]
    Uninitialized,

    /// A pool is being created.
    Initializing,

    /// The pool is live and statements may execute.
    Ready,

    /// The pool was shut down.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Manages the database client and its lifecycle state.
pub struct ConnectionManager {
    client: Option<Box<dyn DatabaseClient>>,
    state: ConnectionState,
}

impl ConnectionManager {
    /// Creates a manager with no connection.
    pub fn new() -> Self {
        Self {
            client: None,
            state: ConnectionState::Uninitialized,
        }
    }

    /// Creates a manager around an existing client, already ready.
    ///
    /// This is the injection point for test doubles.
    pub fn with_client(client: Box<dyn DatabaseClient>) -> Self {
        Self {
            client: Some(client),
            state: ConnectionState::Ready,
        }
    }

    /// Connects to the database described by the configuration.
    ///
    /// On failure the manager returns to `Uninitialized` so a later attempt
    /// can retry.
    pub async fn connect(&mut self, config: &DatabaseConfig) -> Result<()> {
        if let Some(old) = self.client.take() {
            let _ = old.close().await;
        }
        self.state = ConnectionState::Initializing;

        match MySqlClient::connect(config).await {
            Ok(client) => {
                self.client = Some(Box::new(client));
                self.state = ConnectionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Returns the client, or a connectivity error unless the pool is ready.
    pub fn client(&self) -> Result<&dyn DatabaseClient> {
        match self.state {
            ConnectionState::Ready => self
                .client
                .as_deref()
                .ok_or_else(|| GatekeeperError::internal("ready manager without a client")),
            _ => Err(GatekeeperError::connection("database is not connected")),
        }
    }

    /// Returns the current lifecycle state. Pure read, no database contact.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns true if statements may execute.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Closes the client and marks the manager closed.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        self.state = ConnectionState::Closed;
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
