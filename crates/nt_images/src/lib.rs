//! Resolves an article's illustrative image through an ordered chain of
//! candidate URLs, falling back to a placeholder when every candidate fails.

pub mod candidates;
pub mod probe;
pub mod resolver;
pub mod slot;

pub use candidates::{build_candidates, Candidate, CandidateKind};
pub use probe::{HttpImageProbe, ImageProbe};
pub use resolver::{CandidateOutcome, ImageResolver, Resolution, ResolutionState};
pub use slot::ImageSlot;

pub const DEFAULT_PLACEHOLDER: &str = "/placeholder.svg";
