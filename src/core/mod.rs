//! Registry core: configuration, builder and the port table.
//!
//! - [`RegistryConfig`]: start / stop-poll policies, bus capacity, default options;
//! - [`RegistryBuilder`]: wires the bus, subscribers and launcher together;
//! - [`NodeRegistry`]: hands out one started [`NodeInstance`](crate::NodeInstance) per port.

mod builder;
mod config;
mod registry;

pub use builder::RegistryBuilder;
pub use config::RegistryConfig;
pub use registry::NodeRegistry;
