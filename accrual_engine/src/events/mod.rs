//! Notifications and the background accrual processor.
//!
//! The boundary layer publishes an [`OrderCreatedEvent`] through an [`EventProducer`] for every order it registers.
//! The [`AccrualProcessor`] consumes these notifications and advances *some* registered order for each of them. A
//! notification means "work may be available", not "this particular order is ready".
mod channel;
mod event_types;
#[cfg(feature = "sqlite")]
mod processor;

pub use channel::{EventProducer, InFlightJobs};
pub use event_types::OrderCreatedEvent;
#[cfg(feature = "sqlite")]
pub use processor::AccrualProcessor;
