//! Guarded native handles shared by every engine adapter.

use crate::error::SqlBridgeError;
use crate::types::TransactionState;

/// Optional native client handle with fail-fast access.
///
/// Adapters hold their native connection here. The handle is absent before `connect()` /
/// `acquire()` and after `close()` / `release()`; [`ClientSlot::get`] turns that absence into
/// [`SqlBridgeError::NotConnected`] so adapter methods never reach the native client without one.
#[derive(Debug)]
pub struct ClientSlot<C> {
    engine: &'static str,
    client: Option<C>,
}

impl<C> ClientSlot<C> {
    #[must_use]
    pub const fn empty(engine: &'static str) -> Self {
        Self {
            engine,
            client: None,
        }
    }

    #[must_use]
    pub fn occupied(engine: &'static str, client: C) -> Self {
        Self {
            engine,
            client: Some(client),
        }
    }

    /// # Errors
    ///
    /// Returns `SqlBridgeError::NotConnected` when no handle is bound.
    pub fn get(&self) -> Result<&C, SqlBridgeError> {
        self.client.as_ref().ok_or(SqlBridgeError::NotConnected {
            engine: self.engine,
        })
    }

    /// # Errors
    ///
    /// Returns `SqlBridgeError::NotConnected` when no handle is bound.
    pub fn get_mut(&mut self) -> Result<&mut C, SqlBridgeError> {
        self.client.as_mut().ok_or(SqlBridgeError::NotConnected {
            engine: self.engine,
        })
    }

    /// Store or clear the handle, returning the previous one.
    pub fn set(&mut self, client: Option<C>) -> Option<C> {
        std::mem::replace(&mut self.client, client)
    }

    pub fn take(&mut self) -> Option<C> {
        self.client.take()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.client.is_some()
    }

    #[must_use]
    pub fn engine(&self) -> &'static str {
        self.engine
    }
}

/// Native transaction handle plus its lifecycle state.
///
/// Starts `Open`. [`TransactionHandle::finish`] hands the native transaction out for the final
/// commit or rollback and moves to the terminal state; every later access fails with
/// [`SqlBridgeError::TransactionClosed`].
#[derive(Debug)]
pub struct TransactionHandle<C> {
    engine: &'static str,
    client: Option<C>,
    state: TransactionState,
}

impl<C> TransactionHandle<C> {
    #[must_use]
    pub fn open(engine: &'static str, client: C) -> Self {
        Self {
            engine,
            client: Some(client),
            state: TransactionState::Open,
        }
    }

    fn closed(&self) -> SqlBridgeError {
        SqlBridgeError::TransactionClosed {
            engine: self.engine,
            state: self.state,
        }
    }

    /// # Errors
    ///
    /// Returns `SqlBridgeError::TransactionClosed` after commit or rollback.
    pub fn get(&self) -> Result<&C, SqlBridgeError> {
        match &self.client {
            Some(client) if self.state.is_open() => Ok(client),
            _ => Err(self.closed()),
        }
    }

    /// # Errors
    ///
    /// Returns `SqlBridgeError::TransactionClosed` after commit or rollback.
    pub fn get_mut(&mut self) -> Result<&mut C, SqlBridgeError> {
        if !self.state.is_open() {
            return Err(self.closed());
        }
        let engine = self.engine;
        let state = self.state;
        self.client
            .as_mut()
            .ok_or(SqlBridgeError::TransactionClosed { engine, state })
    }

    /// Take the native handle and enter the terminal `state`.
    ///
    /// # Errors
    ///
    /// Returns `SqlBridgeError::TransactionClosed` if the transaction is already closed.
    pub fn finish(&mut self, state: TransactionState) -> Result<C, SqlBridgeError> {
        if !self.state.is_open() {
            return Err(self.closed());
        }
        let client = self.client.take().ok_or_else(|| self.closed())?;
        self.state = state;
        Ok(client)
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The native handle if the transaction is still open, for drop-time cleanup.
    pub fn take_if_open(&mut self) -> Option<C> {
        if self.state.is_open() {
            self.state = TransactionState::RolledBack;
            self.client.take()
        } else {
            None
        }
    }
}
