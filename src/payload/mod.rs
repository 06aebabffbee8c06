//! Payloads: the annotation model, inbound message parsing, and the live registry.

pub mod message;
pub mod registry;
pub mod types;

pub use message::{parse_message, MessageAction, ParsedMessage};
pub use registry::PayloadRegistry;
pub use types::{Payload, PayloadKind, VectorPoint};
