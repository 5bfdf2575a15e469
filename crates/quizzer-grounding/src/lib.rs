//! quizzer-grounding — Document grounding store.
//!
//! Parses course PDF notes into page-indexed passages and serves keyword
//! searches with file+page citations. Implements the core `PassageSource`
//! trait; the store is read-only after load.

pub mod extract;
pub mod store;

pub use store::GroundingStore;
