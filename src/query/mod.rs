//! Request caching and invalidation.
//!
//! Reads go through a [`QueryClient`], which keeps one cache entry per
//! [`QueryKey`]. Writes declare which keys they make stale; a successful
//! write invalidates them before returning, and every enabled subscription
//! on a matching key refetches.

mod client;
mod entry;
mod key;
mod mutation;
mod retry;
mod subscription;

pub use client::{QueryClient, QueryConfig};
pub use entry::{EntrySnapshot, EntryStatus};
pub use key::{KeyFilter, KeySegment, QueryKey};
pub use mutation::{Mutation, MutationRequest, MutationStatus};
pub use retry::RetryConfig;
pub use subscription::{QueryOptions, QueryState, Subscription};
