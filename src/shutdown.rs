//! Hierarchical cancellation scopes.
//!
//! A [`ShutdownManager`] owns one cancellation scope. Scopes created with
//! [`ShutdownManager::with_parent`] observe shutdown requests of all their
//! ancestors, while a request on a child is invisible to its parent and to
//! its siblings.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

/// Raised by long-running operations that noticed a shutdown request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interrupted: {reason}")]
pub struct Interrupted {
    pub reason: String,
}

struct Scope {
    requested: AtomicBool,
    reason: Mutex<Option<String>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn requested_here(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn find_requested(&self) -> Option<&Scope> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if s.requested_here() {
                return Some(s);
            }
            scope = s.parent.as_deref();
        }
        None
    }
}

/// Read-only view of a cancellation scope, cheap to clone and share.
#[derive(Clone)]
pub struct ShutdownNotifier {
    scope: Arc<Scope>,
}

impl ShutdownNotifier {
    /// Notifier of a fresh root scope that nobody can cancel.
    pub fn never() -> Self {
        ShutdownManager::new().notifier()
    }

    /// Check if shutdown was requested on this scope or any ancestor.
    pub fn should_shutdown(&self) -> bool {
        self.scope.find_requested().is_some()
    }

    /// Reason given by the closest scope that requested shutdown.
    pub fn reason(&self) -> Option<String> {
        self.scope
            .find_requested()
            .map(|s| s.reason.lock().clone().unwrap_or_default())
    }

    /// Return `Err(Interrupted)` if shutdown was requested.
    pub fn shutdown_if_necessary(&self) -> Result<(), Interrupted> {
        match self.reason() {
            Some(reason) => Err(Interrupted { reason }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ShutdownNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownNotifier")
            .field("should_shutdown", &self.should_shutdown())
            .finish()
    }
}

/// Owner of a cancellation scope; the only handle allowed to request shutdown.
pub struct ShutdownManager {
    scope: Arc<Scope>,
}

impl ShutdownManager {
    /// Create a root scope.
    pub fn new() -> Self {
        Self {
            scope: Arc::new(Scope {
                requested: AtomicBool::new(false),
                reason: Mutex::new(None),
                parent: None,
            }),
        }
    }

    /// Create a scope that is cancelled whenever `parent` is.
    pub fn with_parent(parent: &ShutdownNotifier) -> Self {
        Self {
            scope: Arc::new(Scope {
                requested: AtomicBool::new(false),
                reason: Mutex::new(None),
                parent: Some(Arc::clone(&parent.scope)),
            }),
        }
    }

    pub fn notifier(&self) -> ShutdownNotifier {
        ShutdownNotifier {
            scope: Arc::clone(&self.scope),
        }
    }

    /// Request shutdown of this scope and all its descendants.
    ///
    /// Only the first request's reason is kept.
    pub fn request_shutdown(&self, reason: impl Into<String>) {
        let mut guard = self.scope.reason.lock();
        if guard.is_none() {
            let reason = reason.into();
            debug!("Shutdown requested: {}", reason);
            *guard = Some(reason);
        }
        self.scope.requested.store(true, Ordering::Release);
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownManager")
            .field("should_shutdown", &self.notifier().should_shutdown())
            .finish()
    }
}
