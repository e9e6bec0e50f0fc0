//! Cancellable model loads
//!
//! Every load request gets a [`LoadTicket`]. Starting a new load aborts the
//! previous ticket, and the session checks its ticket before each step of
//! attaching a model, so a slow stale load can never replace a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Load errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The external loader could not produce a tree
    #[error("Loader failed: {0}")]
    Loader(String),

    /// A newer load superseded this one, or it was cancelled
    #[error("Load {0} was aborted")]
    Aborted(u64),
}

/// Shared cancellation flag handed to the external loader
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    /// Request cancellation
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Identity of one load request
#[derive(Debug, Clone)]
pub struct LoadTicket {
    id: u64,
    token: AbortToken,
}

impl LoadTicket {
    /// Sequence number, increasing per request
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancellation flag to poll while fetching and decoding
    pub fn token(&self) -> &AbortToken {
        &self.token
    }

    /// Whether this request was aborted
    pub fn is_aborted(&self) -> bool {
        self.token.is_aborted()
    }
}

/// Load lifecycle as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Waiting for the loader
    Loading(u64),
    /// A model is attached
    Ready,
    /// The most recent request failed
    Failed(String),
}

/// What happened to a finished load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The model was indexed and attached
    Attached {
        /// Indexed links
        links: usize,
        /// Indexed joints
        joints: usize,
        /// Indexed meshes
        meshes: usize,
    },
    /// The load was stale; its tree was disposed
    Discarded,
    /// The latest load failed
    Failed(LoadError),
}

/// Issues tickets and tracks which one is current
#[derive(Debug, Default)]
pub struct LoadCoordinator {
    next_id: u64,
    current: Option<LoadTicket>,
    state: LoadState,
    has_model: bool,
}

impl LoadCoordinator {
    /// Create a coordinator with no outstanding load
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, aborting any outstanding one
    pub fn begin(&mut self) -> LoadTicket {
        if let Some(previous) = self.current.take() {
            log::info!("Aborting load {} in favour of {}", previous.id, self.next_id);
            previous.token.abort();
        }
        let ticket = LoadTicket {
            id: self.next_id,
            token: AbortToken::default(),
        };
        self.next_id += 1;
        self.state = LoadState::Loading(ticket.id);
        self.current = Some(ticket.clone());
        ticket
    }

    /// Whether `ticket` is the outstanding, non-aborted request
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        !ticket.is_aborted() && self.current.as_ref().is_some_and(|c| c.id == ticket.id)
    }

    /// Fail with [`LoadError::Aborted`] unless `ticket` is current
    pub fn check(&self, ticket: &LoadTicket) -> Result<(), LoadError> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(LoadError::Aborted(ticket.id))
        }
    }

    /// Abort the outstanding request, if any
    pub fn cancel(&mut self) -> bool {
        let Some(current) = self.current.take() else {
            return false;
        };
        current.token.abort();
        self.state = if self.has_model {
            LoadState::Ready
        } else {
            LoadState::Idle
        };
        true
    }

    /// Mark the current request attached
    pub fn complete(&mut self, ticket: &LoadTicket) {
        if self.current.as_ref().is_some_and(|c| c.id == ticket.id) {
            self.current = None;
        }
        self.has_model = true;
        self.state = LoadState::Ready;
    }

    /// Mark the current request failed
    pub fn fail(&mut self, ticket: &LoadTicket, reason: impl Into<String>) {
        if self.current.as_ref().is_some_and(|c| c.id == ticket.id) {
            self.current = None;
        }
        self.state = LoadState::Failed(reason.into());
    }

    /// Current lifecycle state
    pub fn state(&self) -> &LoadState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_aborts_previous() {
        let mut loads = LoadCoordinator::new();
        let first = loads.begin();
        let second = loads.begin();

        assert!(first.is_aborted());
        assert!(!loads.is_current(&first));
        assert!(loads.is_current(&second));
        assert_eq!(loads.check(&first), Err(LoadError::Aborted(first.id())));
        assert_eq!(loads.state(), &LoadState::Loading(second.id()));
    }

    #[test]
    fn test_external_abort_invalidates_ticket() {
        let mut loads = LoadCoordinator::new();
        let ticket = loads.begin();
        ticket.token().clone().abort();
        assert!(!loads.is_current(&ticket));
    }

    #[test]
    fn test_cancel_returns_to_previous_state() {
        let mut loads = LoadCoordinator::new();
        let first = loads.begin();
        loads.complete(&first);
        loads.begin();

        assert!(loads.cancel());
        assert_eq!(loads.state(), &LoadState::Ready);
        assert!(!loads.cancel());
    }
}
