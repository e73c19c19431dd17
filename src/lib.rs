//! DM auto-responder — keyword rules over an Instagram messaging webhook.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod webhook;
