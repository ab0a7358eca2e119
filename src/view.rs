//! Mount/teardown contract for view controllers.
//!
//! Requests cannot be cancelled once sent. A view instead takes a [`Ticket`]
//! before each request and applies the response only while that ticket is
//! still current: the view is mounted and no newer request was started.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Proof that a request was started at a given point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
struct ScopeInner {
    generation: AtomicU64,
    mounted: AtomicBool,
}

/// Lifetime of one mounted view
#[derive(Debug, Clone)]
pub struct ViewScope {
    inner: Arc<ScopeInner>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    /// A freshly mounted scope
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                generation: AtomicU64::new(0),
                mounted: AtomicBool::new(true),
            }),
        }
    }

    /// Start a request, superseding every earlier ticket
    pub fn begin(&self) -> Ticket {
        Ticket(self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a response for `ticket` may still be applied
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.is_mounted() && self.inner.generation.load(Ordering::SeqCst) == ticket.0
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// Tear the view down; every outstanding ticket becomes stale
    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
    }

    /// Run `fut` under a new ticket and return its output only if the
    /// ticket is still current when it completes
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let ticket = self.begin();
        let output = fut.await;
        self.is_current(ticket).then_some(output)
    }
}
