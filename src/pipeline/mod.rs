//! Auto-reply pipeline.
//!
//! Every inbound message flows through:
//! 1. `RulesEngine::evaluate()` — keyword matching, no I/O
//! 2. `MessageProcessor` — fallback reply when nothing fires
//! 3. `OutboundSender::send()` — one HTTP call per response

pub mod loader;
pub mod processor;
pub mod rules;
pub mod types;

pub use processor::{MessageProcessor, ProcessReport};
pub use rules::{RulesEngine, match_rules};
pub use types::{InboundEvent, OutboundResponse, ResponseType, Rule};
