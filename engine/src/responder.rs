//! Single-admission responder gate.
//!
//! ResponderState is the process-wide "is responding" flag: true for the
//! entire interval between an orchestration's invocation and its resolution,
//! false otherwise. Admission control has no queue: a request arriving while
//! the flag is held is dropped silently by the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{EngineEvent, EventBus};

/// The admission gate.
#[derive(Debug)]
pub struct ResponderGate {
    flag: Arc<AtomicBool>,
    events: EventBus,
}

impl ResponderGate {
    pub(crate) fn new(events: EventBus) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    #[must_use]
    pub fn is_responding(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Try to start an orchestration.
    ///
    /// Returns `None` when one is already in flight. The returned guard holds
    /// the flag and releases it on drop, so the state clears no matter how
    /// the owning operation exits.
    pub(crate) fn try_begin(&self) -> Option<ResponderGuard> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.events.emit(EngineEvent::ResponderChanged(true));
        Some(ResponderGuard {
            flag: Arc::clone(&self.flag),
            events: self.events.clone(),
        })
    }
}

/// Proof that its holder is the in-flight orchestration.
#[derive(Debug)]
pub(crate) struct ResponderGuard {
    flag: Arc<AtomicBool>,
    events: EventBus,
}

impl Drop for ResponderGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.events.emit(EngineEvent::ResponderChanged(false));
    }
}
