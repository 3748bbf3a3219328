use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::{build_candidates, Candidate};
use crate::probe::ImageProbe;

/// Where one image reference is in its fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    /// Nothing attempted yet
    Idle,
    /// Probing the candidate at `index`
    Attempting { index: usize, candidate: Candidate },
    /// A candidate loaded and is the display source
    Resolved(String),
    /// Every candidate failed, or there were none; the placeholder is shown
    Exhausted(String),
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Resolved(_) | ResolutionState::Exhausted(_))
    }

    /// The URL to display right now, if the sequence has settled.
    pub fn source(&self) -> Option<&str> {
        match self {
            ResolutionState::Resolved(url) | ResolutionState::Exhausted(url) => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionState::Idle => write!(f, "Idle"),
            ResolutionState::Attempting { index, candidate } => {
                write!(f, "Attempting #{} ({}) {}", index, candidate.kind, candidate.url)
            }
            ResolutionState::Resolved(url) => write!(f, "Resolved {}", url),
            ResolutionState::Exhausted(url) => write!(f, "Exhausted {}", url),
        }
    }
}

/// Result of probing one candidate. Failures are diagnostics, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub candidate: Candidate,
    pub error: Option<String>,
}

impl CandidateOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A finished (not cancelled) resolution sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: ResolutionState,
    pub outcomes: Vec<CandidateOutcome>,
}

impl Resolution {
    pub fn source(&self) -> &str {
        self.state.source().unwrap_or_default()
    }
}

/// Walks the candidate chain for image references.
///
/// Candidates are probed strictly in order and the first success wins; later
/// candidates are never started. The resolver holds no per-reference state,
/// so one instance can serve any number of display contexts.
pub struct ImageResolver {
    probe: Arc<dyn ImageProbe>,
    proxy_base: String,
    placeholder: String,
}

impl ImageResolver {
    /// Creates a resolver.
    ///
    /// # Parameters
    /// * `probe` - How a candidate is checked before being applied
    /// * `proxy_base` - Backend base URL serving `/api/images/proxy`
    /// * `placeholder` - Source shown when no candidate loads
    pub fn new(probe: Arc<dyn ImageProbe>, proxy_base: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            probe,
            proxy_base: proxy_base.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn candidates(&self, reference: Option<&str>) -> Vec<Candidate> {
        build_candidates(reference, &self.proxy_base)
    }

    /// Runs the full chain for `reference`, publishing every transition on
    /// `state`.
    ///
    /// `cancel` is checked before each state change. Once it fires no further
    /// change is published and `None` is returned. A probe already in flight
    /// cannot be interrupted; its result is dropped.
    ///
    /// # Returns
    /// The settled resolution, or `None` if the sequence was cancelled
    pub async fn resolve(
        &self,
        reference: Option<&str>,
        cancel: &CancellationToken,
        state: &watch::Sender<ResolutionState>,
    ) -> Option<Resolution> {
        let candidates = self.candidates(reference);
        let mut outcomes = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.into_iter().enumerate() {
            publish(
                cancel,
                state,
                ResolutionState::Attempting {
                    index,
                    candidate: candidate.clone(),
                },
            )?;

            let result = self.probe.probe(&candidate.url).await;
            if cancel.is_cancelled() {
                debug!(url = %candidate.url, "discarding probe result after cancellation");
                return None;
            }

            match result {
                Ok(()) => {
                    info!(kind = %candidate.kind, url = %candidate.url, "🖼️ image loaded");
                    let resolved = ResolutionState::Resolved(candidate.url.clone());
                    outcomes.push(CandidateOutcome { candidate, error: None });
                    publish(cancel, state, resolved.clone())?;
                    return Some(Resolution { state: resolved, outcomes });
                }
                Err(e) => {
                    debug!(kind = %candidate.kind, url = %candidate.url, error = %e, "image candidate failed");
                    outcomes.push(CandidateOutcome {
                        candidate,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if !outcomes.is_empty() {
            warn!(attempts = outcomes.len(), "all image candidates failed, using placeholder");
        }
        let exhausted = ResolutionState::Exhausted(self.placeholder.clone());
        publish(cancel, state, exhausted.clone())?;
        Some(Resolution {
            state: exhausted,
            outcomes,
        })
    }

    /// Resolves without an observer or cancellation, for one-off callers.
    pub async fn resolve_detached(&self, reference: Option<&str>) -> Resolution {
        let (state, _) = watch::channel(ResolutionState::Idle);
        let cancel = CancellationToken::new();
        match self.resolve(reference, &cancel, &state).await {
            Some(resolution) => resolution,
            None => Resolution {
                state: ResolutionState::Exhausted(self.placeholder.clone()),
                outcomes: Vec::new(),
            },
        }
    }
}

/// Liveness check, then mutation. Both happen under the channel lock.
fn publish(cancel: &CancellationToken, state: &watch::Sender<ResolutionState>, next: ResolutionState) -> Option<()> {
    let published = state.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        *current = next;
        true
    });
    published.then_some(())
}
