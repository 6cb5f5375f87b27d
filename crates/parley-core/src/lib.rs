//! Threaded direct messaging on top of `parley-db`.
//!
//! Writes go through [`MutationPipeline`], which derives notifications and edit history
//! inside the same transaction as the message write. Reads go through [`ThreadAssembler`]
//! and [`Inbox`]; [`ThreadCache`] memoizes assembled threads for a fixed ttl.

pub mod accounts;
pub mod cache;
mod convert;
pub mod error;
pub mod inbox;
pub mod pipeline;
pub mod thread;

pub use accounts::{AccountEvents, run_account_listener};
pub use cache::ThreadCache;
pub use error::{Error, Result};
pub use inbox::Inbox;
pub use pipeline::MutationPipeline;
pub use thread::ThreadAssembler;
