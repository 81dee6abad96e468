use std::time::Duration;

use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use futures::StreamExt;

use crate::error::BusError;

use super::{Bus, BusMessage, Subscription};

/// `Bus` backed by a real `async_nats::Client`. The original system's
/// broker choice (NATS, via `nats-io/nats.go` on the Go side) maps
/// directly onto `async_nats` here; `drain` forwards to the client's own
/// drain, which already implements the glossary's "halt new delivery,
/// flush in-flight, then close" semantics.
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    pub async fn connect(server_url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(server_url)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError> {
        let fut = self.client.request(subject.to_string(), payload.into());
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(msg)) => Ok(msg.payload.to_vec()),
            Ok(Err(e)) => Err(BusError::Publish(e.to_string())),
            Err(_) => Err(BusError::Timeout),
        }
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
    ) -> Result<Box<dyn Subscription>, BusError> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), queue.to_string())
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        Ok(Box::new(NatsSubscription { inner: subscriber }))
    }

    async fn drain(&self) -> Result<(), BusError> {
        self.client.drain().await.map_err(|e| BusError::Drain(e.to_string()))
    }
}

struct NatsSubscription {
    inner: Subscriber,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Option<BusMessage> {
        let msg = self.inner.next().await?;
        Some(BusMessage {
            subject: msg.subject.to_string(),
            reply: msg.reply.map(|s| s.to_string()),
            payload: msg.payload.to_vec(),
        })
    }
}
