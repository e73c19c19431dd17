//! Message processor — matches inbound events and dispatches replies.
//!
//! Flow per event:
//! 1. Rules engine → zero or more responses
//! 2. No responses → one fallback text reply
//! 3. Each response → one outbound send
//!
//! Send failures are counted, never returned.

use std::sync::Arc;

use tracing::{debug, info};

use crate::channels::OutboundSender;
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::types::{InboundEvent, OutboundResponse};

/// Outcome of one webhook delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Events found in the delivery.
    pub events_seen: usize,
    /// Events dropped for lacking a sender or text.
    pub events_skipped: usize,
    /// Responses handed to the sender.
    pub responses_sent: usize,
    /// Responses the sender reported as failed.
    pub send_failures: usize,
}

/// Matches events against the rule table and sends the results.
pub struct MessageProcessor {
    rules: Arc<RulesEngine>,
    sender: Arc<dyn OutboundSender>,
    fallback_reply: String,
}

impl MessageProcessor {
    pub fn new(
        rules: Arc<RulesEngine>,
        sender: Arc<dyn OutboundSender>,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            sender,
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Responses for a message, falling back to the default reply.
    pub fn responses_for(&self, text: &str) -> Vec<OutboundResponse> {
        let responses = self.rules.evaluate(text);
        if responses.is_empty() {
            vec![OutboundResponse::text(self.fallback_reply.clone())]
        } else {
            responses
        }
    }

    /// Process one event. Returns (sent, failed).
    pub async fn process(&self, event: &InboundEvent) -> (usize, usize) {
        info!(
            sender = %event.sender_id,
            channel = self.sender.name(),
            "Received message"
        );
        debug!(sender = %event.sender_id, text = %event.text, "Message text");

        let mut sent = 0;
        let mut failed = 0;
        for response in self.responses_for(&event.text) {
            sent += 1;
            if self.sender.send(&event.sender_id, &response).await.is_none() {
                failed += 1;
            }
        }
        (sent, failed)
    }

    /// Process every candidate event of a delivery in order.
    ///
    /// Candidates that did not yield an `InboundEvent` are dropped before
    /// anything is dispatched.
    pub async fn process_batch<I>(&self, candidates: I) -> ProcessReport
    where
        I: IntoIterator<Item = Option<InboundEvent>>,
    {
        let (events_seen, events) = valid_events(candidates);
        let mut report = ProcessReport {
            events_seen,
            events_skipped: events_seen - events.len(),
            ..ProcessReport::default()
        };
        if report.events_skipped > 0 {
            debug!(skipped = report.events_skipped, "Skipping events without sender or text");
        }

        for event in &events {
            let (sent, failed) = self.process(event).await;
            report.responses_sent += sent;
            report.send_failures += failed;
        }

        info!(
            seen = report.events_seen,
            skipped = report.events_skipped,
            sent = report.responses_sent,
            failed = report.send_failures,
            "Webhook delivery processed"
        );
        report
    }
}

/// Count the candidates and keep the ones that are usable events, in order.
pub fn valid_events<I>(candidates: I) -> (usize, Vec<InboundEvent>)
where
    I: IntoIterator<Item = Option<InboundEvent>>,
{
    let mut seen = 0;
    let events: Vec<InboundEvent> = candidates
        .into_iter()
        .inspect(|_| seen += 1)
        .flatten()
        .collect();
    (seen, events)
}
