//! In-memory stores.
//!
//! Both stores follow an exclusive-writer / shared-reader discipline with
//! one coarse lock each; callers never hold a store lock across I/O.

pub mod subscription;
pub mod workitem;

pub use subscription::SubscriptionStore;
pub use workitem::WorkItemStore;
