//! Event Bus — publishes workflow state changes as notifications so that
//! interested subsystems (the aggregator, the dashboard, external
//! collaborators per spec.md's Non-goals) can react, without being loaded
//! into the critical path of a state transition.
//!
//! This is pub/sub, not event sourcing: events announce changes that
//! already happened and were committed to Postgres. Replaying the event
//! stream never reconstructs state — `nanopore-db` is the only source of
//! truth. Losing an event (a crashed subscriber, an unacked redelivery
//! that's dropped) never corrupts state, only delays a reaction to it.

pub mod bus;
pub mod event_types;
pub mod nats;

pub use bus::{EventBus, EventBusError, InMemoryEventBus};
pub use event_types::WorkflowEvent;
pub use nats::{create_nats_client, JetStreamEventBus, MessagingError, NatsConfig};
