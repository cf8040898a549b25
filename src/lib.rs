//! # media-relink
//!
//! Rewrites references to legacy video asset documents into global references
//! that point at the same video in a media library.
//!
//! Every document field `asset` holding a local reference to a legacy video
//! asset is replaced, together with its sibling `media` field, by a pair of
//! weak global references: `asset` to the media-library instance and `media`
//! to the asset container that owns it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────────────┐   ┌───────────────┐
//! │ content store │──▶│ resolve/locate/plan  │◀──│ media library │
//! │ (query)       │   │ (media-relink-core)  │   │ (query)       │
//! └───────────────┘   └──────────┬───────────┘   └───────────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │ execute: preview or  │
//!                     │ one commit/document  │
//!                     └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! media-relink <projectId> <token> production --dry-run   # preview
//! media-relink <projectId> <token> production             # apply
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and run settings |
//! | [`content_lake`] | HTTP [`DocumentStore`](media_relink_core::store::DocumentStore) client |
//! | [`media_library`] | HTTP [`MediaRegistry`](media_relink_core::store::MediaRegistry) client |
//! | [`migrate`] | Orchestrator and run summary |
//! | [`progress`] | Progress reporting on stderr |
//! | [`report`] | Human and JSON output |

pub mod config;
pub mod content_lake;
mod http;
pub mod media_library;
pub mod migrate;
pub mod progress;
pub mod report;

pub use media_relink_core;
