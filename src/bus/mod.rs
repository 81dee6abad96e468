pub mod local;
pub mod nats;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BusError;

pub use local::LocalBus;
pub use nats::NatsBus;

/// A message delivered by a queue subscription: the subject it was
/// published on, the reply subject to respond to (if the publisher used
/// `request`), and the raw payload.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub reply: Option<String>,
    pub payload: Vec<u8>,
}

/// A live queue subscription. Each call to `next` yields the next message
/// delivered to this subscriber's queue group.
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> Option<BusMessage>;
}

/// The request/reply broker ingress and egress talk through. `NatsBus`
/// backs this with a real `async_nats::Client`; `LocalBus` is an
/// in-process stand-in used by tests and the embedded test harness.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publishes `payload` on `subject` and awaits a single reply,
    /// bounded by `timeout`.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError>;

    /// Publishes `payload` on `subject` with no reply expected — used by
    /// egress to answer a message's reply inbox.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Subscribes to `subject` as a member of queue group `queue`: the
    /// bus delivers each published message to exactly one member of the
    /// group.
    async fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
    ) -> Result<Box<dyn Subscription>, BusError>;

    /// Halts new delivery, flushes in-flight messages, then closes the
    /// connection.
    async fn drain(&self) -> Result<(), BusError>;
}

/// Matches a concrete subject against a subscription pattern using NATS
/// token semantics: `.`-delimited tokens, `*` matches exactly one token,
/// a trailing `>` matches one or more remaining tokens.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');
    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some(p), Some(_)) if p == "*" => continue,
            (Some(p), Some(s)) => {
                if p != s {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Fills a subject pattern's two `*` wildcards, in order, with `module`
/// then `method`. E.g. `rpc.*.*` with `("calculateSum", "calculateSum")`
/// becomes `rpc.calculateSum.calculateSum`.
pub fn subject_for(pattern: &str, module: &str, method: &str) -> String {
    let mut result = String::with_capacity(pattern.len() + module.len() + method.len());
    let mut replaced = 0u8;
    for ch in pattern.chars() {
        if ch == '*' && replaced < 2 {
            result.push_str(if replaced == 0 { module } else { method });
            replaced += 1;
        } else {
            result.push(ch);
        }
    }
    result
}
