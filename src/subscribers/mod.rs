//! # Event subscribers.
//!
//! [`Subscribe`] implementations receive every lifecycle [`Event`](crate::Event)
//! published on the registry's [`Bus`](crate::events::Bus). [`SubscriberSet`]
//! gives each one its own queue and worker so a slow or panicking subscriber
//! cannot stall node management.
//!
//! ```text
//! NodeInstance / NodeRegistry ── publish ──► Bus ──► registry listener ──► SubscriberSet
//!                                                                           ├─► reporter
//!                                                                           └─► audit ...
//! ```

mod set;
mod subscriber;

pub use set::{SubscriberSet, SubscriberStats};
pub use subscriber::Subscribe;
