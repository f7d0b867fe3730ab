//! deckhand-cache: normalized query cache over a generic invoke RPC.
//!
//! Entries are keyed by `(domain, command, args)`. Patching an entry that
//! was never populated is a logic error upstream and fails loudly.

pub mod cache;
pub mod client;
pub mod error;
pub mod key;
pub mod list;

pub use cache::{QueryCache, Rollback};
pub use client::{Invoke, QueryClient};
pub use error::{CacheError, InvokeError};
pub use key::{QueryDomain, QueryKey};
pub use list::{remove_list_item_from_array, replace_list_item_in_array};
