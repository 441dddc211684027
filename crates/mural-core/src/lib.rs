//! mural-core: the data/access engine of the mural social platform.
//!
//! Users, projects, posts, comments, votes, bookmarks, lurks, locks,
//! follows, blacklists, whitelists and private messages over SQLite.
//! The core is the feed engine: given a viewer and options, select a
//! correctly windowed ([`page`]), ordered and filtered ([`visibility`],
//! [`feed`]) set of content items from two parallel content domains,
//! and annotate each with viewer capabilities and counters
//! ([`capability`]). Mutations live in [`actions`].
//!
//! The engine is stateless: every operation takes a `&Connection`
//! explicitly, so tests run against in-memory stores and callers own
//! pooling and lifecycle.
//!
//! # Conventions
//!
//! - **Errors**: public operations return [`error::Result`] with typed
//!   kinds; see [`error::Error::code`] for transport mapping.
//! - **Logging**: `tracing` macros (`debug!` on read paths, mutation
//!   events at `debug!`); subscriber setup belongs to the binary.

pub mod actions;
pub mod capability;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod language;
pub mod model;
pub mod page;
pub mod relations;
pub mod visibility;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
