//! Request and response types for the signal-cli JSON-RPC API.

mod reaction;
mod send;

pub use reaction::ReactionParams;
pub use send::{RecipientAddress, RecipientResult, SendParams, SendResult, SendTarget};
