use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;

use super::{subject_matches, Bus, BusMessage, Subscription};

struct GroupState {
    senders: Vec<mpsc::UnboundedSender<BusMessage>>,
    next: usize,
}

#[derive(Default)]
struct Inner {
    // subject -> queue name -> group state
    subscribers: HashMap<String, HashMap<String, GroupState>>,
    pending_replies: HashMap<String, oneshot::Sender<Vec<u8>>>,
}

/// An in-process stand-in for a running NATS server. Implements the same
/// queue-group contract the real bus does: publishing to a subject
/// delivers to exactly one subscriber per queue group registered on that
/// subject, chosen by round robin. Used by unit/integration tests and by
/// the embedded test harness described in spec's testable-properties
/// section, which calls for an in-process bus rather than a live broker.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<Mutex<Inner>>,
    reply_counter: Arc<AtomicU64>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            reply_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Matches `subject` against every registered subscription pattern
    /// using the same wildcard semantics a real NATS server applies
    /// server-side, since production code (egress in particular) passes
    /// its config's subject pattern straight to `queue_subscribe` without
    /// pre-expanding it — `LocalBus` has to do that matching itself to
    /// stand in for the real broker.
    fn dispatch(&self, subject: &str, message: BusMessage) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let mut delivered = false;
        for (pattern, groups) in inner.subscribers.iter_mut() {
            if !subject_matches(pattern, subject) {
                continue;
            }
            for group in groups.values_mut() {
                if group.senders.is_empty() {
                    continue;
                }
                let idx = group.next % group.senders.len();
                group.next = group.next.wrapping_add(1);
                if group.senders[idx].send(message.clone()).is_ok() {
                    delivered = true;
                }
            }
        }
        delivered
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError> {
        let reply_subject =
            format!("_INBOX.{}", self.reply_counter.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().pending_replies.insert(reply_subject.clone(), tx);

        let delivered = self.dispatch(
            subject,
            BusMessage {
                subject: subject.to_string(),
                reply: Some(reply_subject.clone()),
                payload,
            },
        );
        if !delivered {
            self.inner.lock().unwrap().pending_replies.remove(&reply_subject);
            return Err(BusError::Publish(format!("no subscriber for subject {subject}")));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(_)) => Err(BusError::Timeout),
            Err(_) => {
                self.inner.lock().unwrap().pending_replies.remove(&reply_subject);
                Err(BusError::Timeout)
            }
        }
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if let Some(tx) = self.inner.lock().unwrap().pending_replies.remove(subject) {
            let _ = tx.send(payload);
            return Ok(());
        }
        self.dispatch(subject, BusMessage { subject: subject.to_string(), reply: None, payload });
        Ok(())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
    ) -> Result<Box<dyn Subscription>, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        inner
            .subscribers
            .entry(subject.to_string())
            .or_default()
            .entry(queue.to_string())
            .or_insert_with(|| GroupState { senders: Vec::new(), next: 0 })
            .senders
            .push(tx);
        Ok(Box::new(LocalSubscription { rx }))
    }

    async fn drain(&self) -> Result<(), BusError> {
        // No in-flight network I/O to flush for an in-process bus; kept
        // for interface parity with NatsBus.
        Ok(())
    }
}

struct LocalSubscription {
    rx: mpsc::UnboundedReceiver<BusMessage>,
}

#[async_trait]
impl Subscription for LocalSubscription {
    async fn next(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}
