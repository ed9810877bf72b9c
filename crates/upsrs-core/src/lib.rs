//! Worklist domain core for UPSRS.
//!
//! The in-memory graph linking work items, subscriptions, and push
//! channels, plus the services that drive it. The HTTP surface lives in
//! `upsrs-server`; everything here is transport-agnostic.
//!
//! # Modules
//!
//! - [`model`] - Work items, the state machine, subscriptions
//! - [`store`] - In-memory work item and subscription stores
//! - [`events`] - Event report construction
//! - [`channel`] - The push-channel registry
//! - [`pending`] - The pending-event queue
//! - [`notifier`] - Fan-out and delivery
//! - [`service`] - The work item and subscription services
//! - [`error`] - Domain error types

pub mod channel;
pub mod error;
pub mod events;
pub mod model;
pub mod notifier;
pub mod pending;
pub mod service;
pub mod store;

pub use channel::{ChannelRegistry, ConnectCallback, Frame};
pub use error::Error;
pub use events::{EventBuilder, EventType, RestartStatus, ScpStatus};
pub use model::{
    ProcedureStepState, Subscription, WorkItem, FILTERED_SUBSCRIPTION_UID,
    GLOBAL_SUBSCRIPTION_UID, UPS_PUSH_SOP_CLASS_UID,
};
pub use notifier::Notifier;
pub use pending::PendingEventQueue;
pub use service::{CancelOutcome, SubscriptionService, UpdateOutcome, WorkItemService};
pub use store::{SubscriptionStore, WorkItemStore};
