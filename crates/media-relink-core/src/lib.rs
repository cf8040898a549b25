//! # media-relink core
//!
//! Store-agnostic logic for rewriting legacy video asset references into
//! media-library global references: typed field paths, the reference locator,
//! resolver, patch planner, patch executor, and the store traits they run
//! against.
//!
//! This crate performs no network I/O and pulls in no runtime. The HTTP
//! clients live in the `media-relink` binary crate; tests use
//! [`store::memory::InMemoryStore`].
//!
//! ## Pipeline
//!
//! ```text
//! legacy asset ──▶ resolve ──▶ referencing documents ──▶ locate ──▶ plan
//!                                                                   │
//!                              execute (preview | apply) ◀──────────┘
//! ```

pub mod execute;
pub mod locate;
pub mod models;
pub mod path;
pub mod plan;
pub mod reference;
pub mod resolve;
pub mod store;
