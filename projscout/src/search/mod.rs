//! Project-wide search: pattern compilation, traversal, scanning and the
//! session that drives them on a worker thread.
//!
//! # Pipeline
//!
//! ```text
//! SearchQuery ──► matcher::compile ──► FileProcessor
//!                                          │
//! ProjectRegistry ──► engine::resolve_scope ──► walker::walk (per root)
//!                                          │
//!                            ProjectBatch ──► ResultPublisher
//! ```
//!
//! Everything below [`session`] is synchronous and runs on the calling
//! thread. [`SearchSession`] adds the worker thread, the stop flag and the
//! one-session-at-a-time rule.
//!
//! # Cancellation
//!
//! The stop flag is an `Arc<AtomicBool>`. The engine looks at it before each
//! project root, the walker before each entry and the scanner every
//! [`processor::CANCEL_CHECK_LINES`] lines:
//! ```rust,ignore
//! if cancel.load(Ordering::Relaxed) {
//!     return Err(SearchError::Cancelled);
//! }
//! ```
//! The session turns that error into `SessionOutcome::Cancelled`.

pub mod engine;
pub mod matcher;
pub mod processor;
pub mod session;
pub mod walker;

pub use engine::{resolve_scope, run, search};
pub use matcher::{compile, CompiledPattern, WrapStyle};
pub use processor::FileProcessor;
pub use session::{SearchSession, SessionId, SessionOutcome, SessionState};
pub use walker::walk;
