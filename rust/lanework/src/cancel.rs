//! Cooperative cancellation from outside an execution.

use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicBool, Ordering},
};

/// Something that can be told to stop; implemented by the shared outcome of
/// a running execution.
pub(crate) trait Cancellable: Send + Sync {
    fn cancel(&self);
}

/// A cloneable handle for stopping one or more executions.
///
/// Cancelling claims the first-error slot of every attached execution with
/// [`Error::Cancelled`](crate::Error::Cancelled) (unless a lane failed
/// first) and wakes the waiting caller right away. Lanes finish the item
/// they are currently processing and start no new ones.
///
/// A token stays cancelled; executions started with an already cancelled
/// token return `Cancelled` without processing any item.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<TokenState>);

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    attached: Mutex<Vec<Weak<dyn Cancellable>>>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Default::default()
    }

    pub fn cancel(&self) {
        if self.0.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let attached = std::mem::take(
            &mut *self
                .0
                .attached
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        log::debug!("cancelling {} attached executions", attached.len());
        attached
            .iter()
            .filter_map(Weak::upgrade)
            .for_each(|target| target.cancel());
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Registers `target` to be cancelled along with this token. If the token
    /// is already cancelled, `target` is cancelled immediately.
    pub(crate) fn attach(&self, target: Weak<dyn Cancellable>) {
        let mut attached = self
            .0
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            drop(attached);
            if let Some(target) = target.upgrade() {
                target.cancel();
            }
            return;
        }
        attached.retain(|t| t.strong_count() > 0);
        attached.push(target);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
