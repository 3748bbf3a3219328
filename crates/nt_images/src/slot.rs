use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::resolver::{ImageResolver, ResolutionState};

struct Sequence {
    reference: Option<String>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// One displayed image. Owns at most one running resolution sequence;
/// pointing it at a new reference cancels the old sequence, and dropping the
/// slot cancels whatever is running.
pub struct ImageSlot {
    resolver: Arc<ImageResolver>,
    state: Arc<watch::Sender<ResolutionState>>,
    current: Option<Sequence>,
}

impl ImageSlot {
    pub fn new(resolver: Arc<ImageResolver>) -> Self {
        let (state, _) = watch::channel(ResolutionState::Idle);
        Self {
            resolver,
            state: Arc::new(state),
            current: None,
        }
    }

    /// Starts resolving `reference`. The same reference again is a no-op.
    pub fn set_reference(&mut self, reference: Option<&str>) {
        if let Some(current) = &self.current {
            if current.reference.as_deref() == reference {
                return;
            }
        }
        self.cancel();

        let cancel = CancellationToken::new();
        let owned = reference.map(str::to_string);
        self.state.send_replace(ResolutionState::Idle);

        let handle = {
            let resolver = Arc::clone(&self.resolver);
            let state = Arc::clone(&self.state);
            let cancel = cancel.clone();
            let reference = owned.clone();
            tokio::spawn(async move {
                resolver.resolve(reference.as_deref(), &cancel, &state).await;
            })
        };

        self.current = Some(Sequence {
            reference: owned,
            cancel,
            handle,
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    /// What to render now: the settled source, or the placeholder while the
    /// sequence is still running.
    pub fn display_source(&self) -> String {
        self.state
            .borrow()
            .source()
            .unwrap_or(self.resolver.placeholder())
            .to_string()
    }

    /// Waits until the current sequence settles. Returns the current state
    /// right away when no reference was ever set.
    pub async fn settled(&self) -> ResolutionState {
        if self.current.is_none() {
            return self.state();
        }
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(ResolutionState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    fn cancel(&mut self) {
        if let Some(sequence) = self.current.take() {
            sequence.cancel.cancel();
            // The task is left to finish its in-flight probe; the token keeps
            // its result from being applied.
            drop(sequence.handle);
        }
    }
}

impl Drop for ImageSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{resolver, ScriptedProbe, PLACEHOLDER};

    #[tokio::test]
    async fn test_slot_resolves() {
        let probe = Arc::new(ScriptedProbe::succeeding(&["https://a.com/x.jpg"]));
        let mut slot = ImageSlot::new(Arc::new(resolver(probe)));
        assert_eq!(slot.display_source(), PLACEHOLDER);

        slot.set_reference(Some("https://a.com/x.jpg"));
        assert_eq!(slot.settled().await, ResolutionState::Resolved("https://a.com/x.jpg".to_string()));
        assert_eq!(slot.display_source(), "https://a.com/x.jpg");
    }

    #[tokio::test]
    async fn test_settled_waits_for_terminal_state() {
        let probe = Arc::new(ScriptedProbe::succeeding(&[]));
        let mut slot = ImageSlot::new(Arc::new(resolver(probe.clone())));

        slot.set_reference(Some("https://a.com/x.jpg"));
        let settled = slot.settled().await;

        assert_eq!(settled, ResolutionState::Exhausted(PLACEHOLDER.to_string()));
        assert_eq!(settled, slot.state());
        assert_eq!(probe.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_settled_without_reference_returns_idle() {
        let probe = Arc::new(ScriptedProbe::succeeding(&[]));
        let slot = ImageSlot::new(Arc::new(resolver(probe.clone())));

        let settled = tokio::time::timeout(std::time::Duration::from_secs(1), slot.settled()).await;

        assert_eq!(settled.unwrap(), ResolutionState::Idle);
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_same_reference_does_not_restart() {
        let probe = Arc::new(ScriptedProbe::succeeding(&["https://a.com/x.jpg"]));
        let mut slot = ImageSlot::new(Arc::new(resolver(probe.clone())));

        slot.set_reference(Some("https://a.com/x.jpg"));
        slot.settled().await;
        slot.set_reference(Some("https://a.com/x.jpg"));
        tokio::task::yield_now().await;

        assert_eq!(probe.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reference_change_discards_stale_result() {
        let (probe, gate) = ScriptedProbe::succeeding(&["https://old.com/a.jpg", "https://new.com/b.jpg"])
            .gate("https://old.com/a.jpg");
        let probe = Arc::new(probe);
        let mut slot = ImageSlot::new(Arc::new(resolver(probe.clone())));

        slot.set_reference(Some("https://old.com/a.jpg"));
        probe.started.notified().await;

        slot.set_reference(Some("https://new.com/b.jpg"));
        assert_eq!(slot.settled().await, ResolutionState::Resolved("https://new.com/b.jpg".to_string()));

        // Let the old probe complete; its success must not overwrite the new source.
        gate.notify_one();
        probe.wait_finished(2).await;

        assert_eq!(slot.state(), ResolutionState::Resolved("https://new.com/b.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_no_mutation_after_teardown() {
        let (probe, gate) = ScriptedProbe::succeeding(&["https://a.com/x.jpg"]).gate("https://a.com/x.jpg");
        let probe = Arc::new(probe);
        let slot_resolver = Arc::new(resolver(probe.clone()));
        let mut slot = ImageSlot::new(slot_resolver);
        let observer = slot.subscribe();

        slot.set_reference(Some("https://a.com/x.jpg"));
        probe.started.notified().await;
        drop(slot);

        gate.notify_one();
        probe.wait_finished(1).await;

        assert!(matches!(*observer.borrow(), ResolutionState::Attempting { index: 0, .. }));
        assert_eq!(probe.calls().len(), 1);
    }
}
