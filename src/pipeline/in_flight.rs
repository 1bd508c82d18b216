//! Single-slot in-flight guard per wizard session.
//!
//! A wizard session may have at most one model request outstanding. A second
//! submission for the same session while the first is running is refused
//! (not queued). Different sessions never contend: each request is
//! independent and stateless upstream.
//!
//! - `try_acquire()` claims the slot or returns `None` if it is taken
//! - dropping the `InFlightGuard` frees the slot. The guard owns its registry
//!   handle, so it can travel with the blocking model call
//! - `current()` / `active_count()` give observability for the health endpoint

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// What kind of model request holds the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    ClinicalSummary,
    GatewayPassthrough,
}

impl RequestKind {
    /// Body of the 409 sent when this kind already holds the slot.
    pub fn busy_message(&self) -> &'static str {
        match self {
            Self::ClinicalSummary => "Summary request already in progress",
            Self::GatewayPassthrough => "Generation request already in progress",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClinicalSummary => write!(f, "Clinical summary"),
            Self::GatewayPassthrough => write!(f, "Gateway passthrough"),
        }
    }
}

/// Snapshot of an outstanding request.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRequest {
    pub session_id: String,
    pub kind: RequestKind,
    /// ISO 8601
    pub started_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InFlightError {
    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Default)]
pub struct InFlightRegistry {
    active: Mutex<HashMap<String, ActiveRequest>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `session_id`. `Ok(None)` if a request is already outstanding.
    pub fn try_acquire(
        self: &Arc<Self>,
        session_id: &str,
        kind: RequestKind,
    ) -> Result<Option<InFlightGuard>, InFlightError> {
        let mut active = self.active.lock().map_err(|_| InFlightError::LockPoisoned)?;
        if let Some(existing) = active.get(session_id) {
            tracing::warn!(
                session_id,
                running = %existing.kind,
                since = %existing.started_at,
                "Rejected duplicate submission"
            );
            return Ok(None);
        }

        active.insert(
            session_id.to_string(),
            ActiveRequest {
                session_id: session_id.to_string(),
                kind,
                started_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        Ok(Some(InFlightGuard {
            registry: Arc::clone(self),
            session_id: session_id.to_string(),
            kind,
        }))
    }

    /// What is running for this session, if anything.
    pub fn current(&self, session_id: &str) -> Option<ActiveRequest> {
        self.active.lock().ok()?.get(session_id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Always frees the slot, even past a poisoned lock.
    fn release(&self, session_id: &str) {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| {
            tracing::error!(session_id, "In-flight lock poisoned, releasing anyway");
            PoisonError::into_inner(poisoned)
        });
        active.remove(session_id);
    }
}

/// RAII claim on a session's slot. Dropping it frees the slot.
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    session_id: String,
    kind: RequestKind,
}

impl InFlightGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<InFlightRegistry> {
        Arc::new(InFlightRegistry::new())
    }

    #[test]
    fn second_acquire_for_same_session_is_refused() {
        let registry = registry();
        let guard = registry
            .try_acquire("wizard-1", RequestKind::ClinicalSummary)
            .unwrap();
        assert!(guard.is_some());
        assert!(registry
            .try_acquire("wizard-1", RequestKind::ClinicalSummary)
            .unwrap()
            .is_none());
    }

    #[test]
    fn sessions_do_not_contend() {
        let registry = registry();
        let _a = registry.try_acquire("a", RequestKind::ClinicalSummary).unwrap().unwrap();
        let _b = registry.try_acquire("b", RequestKind::GatewayPassthrough).unwrap().unwrap();
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn dropping_guard_frees_slot() {
        let registry = registry();
        {
            let guard = registry.try_acquire("s", RequestKind::ClinicalSummary).unwrap().unwrap();
            assert_eq!(guard.session_id(), "s");
            assert_eq!(guard.kind(), RequestKind::ClinicalSummary);
            let current = registry.current("s").unwrap();
            assert_eq!(current.kind, RequestKind::ClinicalSummary);
            assert!(!current.started_at.is_empty());
        }
        assert!(registry.current("s").is_none());
        assert_eq!(registry.active_count(), 0);
        assert!(registry.try_acquire("s", RequestKind::ClinicalSummary).unwrap().is_some());
    }

    #[test]
    fn guard_holds_slot_on_another_thread() {
        let registry = registry();
        let guard = registry.try_acquire("t", RequestKind::ClinicalSummary).unwrap().unwrap();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (finish_tx, finish_rx) = std::sync::mpsc::channel::<()>();

        let worker = std::thread::spawn(move || {
            let _slot = guard;
            started_tx.send(()).unwrap();
            finish_rx.recv().unwrap();
        });

        started_rx.recv().unwrap();
        assert!(registry.try_acquire("t", RequestKind::ClinicalSummary).unwrap().is_none());

        finish_tx.send(()).unwrap();
        worker.join().unwrap();
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn release_survives_poisoned_lock() {
        let registry = registry();
        let guard = registry.try_acquire("p", RequestKind::ClinicalSummary).unwrap().unwrap();

        let r = registry.clone();
        let _ = std::thread::spawn(move || {
            let _held = r.active.lock().unwrap();
            panic!("poison the in-flight lock");
        })
        .join();
        assert!(registry.active.is_poisoned());

        drop(guard);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn busy_message_names_the_request_kind() {
        assert_eq!(
            RequestKind::ClinicalSummary.busy_message(),
            "Summary request already in progress"
        );
        assert_eq!(
            RequestKind::GatewayPassthrough.busy_message(),
            "Generation request already in progress"
        );
    }

    #[test]
    fn kind_display() {
        assert_eq!(RequestKind::ClinicalSummary.to_string(), "Clinical summary");
    }
}
