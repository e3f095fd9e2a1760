//! Task collection state and the controllers that mutate it.
//!
//! - [`sync::TaskSync`]: the collection, kept equal to the last server list
//! - [`edit::InlineEditor`]: single-row inline edit mode
//! - [`page::EditPage`]: the dedicated edit view
//! - [`sequence::RequestSequence`]: tickets that discard stale list responses

pub mod edit;
pub mod page;
pub mod sequence;
pub mod sync;

pub use edit::{EditSession, InlineEditor};
pub use page::EditPage;
pub use sequence::{RequestSequence, Ticket};
pub use sync::{ListOutcome, MutationOutcome, TaskSync};
