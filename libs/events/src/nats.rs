//! JetStream-backed `EventBus` (spec.md §4.7).
//!
//! Publishes are acked by JetStream before `publish()` returns, so a
//! publisher that gets an `Ok` knows the event is durably stored. Delivery
//! to this process's subscribers is via a durable pull consumer on the
//! `sample_id` subject token, which keeps all events about one sample in
//! order; a background task pulls, forwards to an in-process broadcast
//! channel, and acks only after the forward succeeds, so a crash mid-pull
//! redelivers rather than silently drops.

use std::time::Duration;

use async_nats::jetstream::{self, consumer::PullConsumer};
use async_nats::Client;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::bus::{EventBus, EventBusError};
use crate::event_types::WorkflowEvent;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("failed to connect to NATS: {0}")]
    ConnectionError(#[from] async_nats::ConnectError),

    #[error("failed to create or bind stream: {0}")]
    StreamError(#[from] async_nats::jetstream::context::CreateStreamError),

    #[error("failed to create consumer: {0}")]
    ConsumerError(#[from] async_nats::jetstream::stream::ConsumerError),

    #[error("failed to publish: {0}")]
    PublishError(String),
}

/// Configuration for the NATS connection.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    /// JetStream stream name, e.g. `"WORKFLOW_EVENTS"`.
    pub stream_name: String,
    /// Durable consumer name for this process's subscription.
    pub consumer_name: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: String::from("nats://localhost:4222"),
            stream_name: String::from("WORKFLOW_EVENTS"),
            consumer_name: String::from("workflow-engine"),
        }
    }
}

/// Create a new NATS client.
pub async fn create_nats_client(config: &NatsConfig) -> Result<Client, MessagingError> {
    let client = async_nats::connect(&config.url).await?;
    Ok(client)
}

const SUBJECT_PREFIX: &str = "workflow.events";

fn subject_for(event: &WorkflowEvent) -> String {
    format!("{SUBJECT_PREFIX}.{}.{}", event.event_type(), event.sample_id())
}

/// A JetStream-backed event bus.
pub struct JetStreamEventBus {
    jetstream: jetstream::Context,
    local: broadcast::Sender<WorkflowEvent>,
}

impl JetStreamEventBus {
    /// Bind to (creating if absent) the configured stream and start the
    /// background pull-and-forward task.
    pub async fn connect(client: Client, config: &NatsConfig) -> Result<Self, MessagingError> {
        let jetstream = jetstream::new(client);

        let stream = jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream_name.clone(),
                subjects: vec![format!("{SUBJECT_PREFIX}.>")],
                ..Default::default()
            })
            .await?;

        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                &config.consumer_name,
                jetstream::consumer::pull::Config {
                    durable_name: Some(config.consumer_name.clone()),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ack_wait: Duration::from_secs(30),
                    ..Default::default()
                },
            )
            .await?;

        let (local, _receiver) = broadcast::channel(1024);
        let forward_to = local.clone();

        tokio::spawn(async move {
            forward_loop(consumer, forward_to).await;
        });

        Ok(Self { jetstream, local })
    }
}

async fn forward_loop(consumer: PullConsumer, forward_to: broadcast::Sender<WorkflowEvent>) {
    use futures::StreamExt;

    loop {
        let Ok(mut messages) = consumer.messages().await else {
            tokio::time::sleep(Duration::from_secs(1)).await;
            continue;
        };

        while let Some(Ok(message)) = messages.next().await {
            match serde_json::from_slice::<WorkflowEvent>(&message.payload) {
                Ok(event) => {
                    // Ignore send errors: no subscribers is not a delivery failure.
                    let _ = forward_to.send(event);
                    if let Err(e) = message.ack().await {
                        tracing::warn!("failed to ack JetStream message: {e}");
                    }
                }
                Err(e) => {
                    tracing::warn!("dropping unparsable JetStream message: {e}");
                    let _ = message.ack().await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl EventBus for JetStreamEventBus {
    async fn publish(&self, event: &WorkflowEvent) -> Result<(), EventBusError> {
        let payload =
            serde_json::to_vec(event).map_err(|e| EventBusError::Publish(e.to_string()))?;

        let ack = self
            .jetstream
            .publish(subject_for(event), payload.into())
            .await
            .map_err(|e| EventBusError::Publish(e.to_string()))?;

        ack.await.map_err(|e| EventBusError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<broadcast::Receiver<WorkflowEvent>, EventBusError> {
        Ok(self.local.subscribe())
    }
}
