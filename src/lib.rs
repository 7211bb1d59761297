//! # Tailstream
//!
//! Tailstream provides a bounded, in-memory, append-only buffer built for
//! long-poll tailing by many concurrent readers.
//!
//! ## Tail
//!
//! A [`Tail`] holds the most recently appended items in two fixed size
//! retention windows and tracks a monotonic write cursor. Writers append
//! without ever blocking; readers ask for items from a logical offset and,
//! when nothing is there yet, park until a write lands or their
//! [`CancellationToken`] fires. Readers that fall behind retention are
//! skipped forward to the oldest retained item and told how much they
//! missed via [`Chunk::skipped`].

pub(crate) mod gate;
pub(crate) mod tail;
pub(crate) mod window;

// Externally exposed types.
pub use tail::{Chunk, ConfigError, Tail};

// Part of the read signature, re-exported so callers need no direct
// dependency on tokio-util.
pub use tokio_util::sync::CancellationToken;
