//! # Node instances and the capabilities they drive.
//!
//! - [`NodeInstance`] one disposable node bound to one port (start / quit / queries)
//! - [`NodeStatus`]   discrete lifecycle state read from the process
//! - [`NodeOptions`], [`NodeOverrides`] launch options and caller overrides
//! - [`Balance`]      exact wei amount with whole-token formatting
//! - [`Launch`], [`NodeProcess`], [`Provider`] seams to the node implementation

mod balance;
mod instance;
mod options;
mod process;
mod status;

pub use balance::{Balance, WEI_PER_TOKEN};
pub use instance::NodeInstance;
pub use options::{NodeOptions, NodeOverrides, DEFAULT_MNEMONIC, DEFAULT_PORT};
pub use process::{Launch, LauncherRef, NodeProcess, ProcessRef, Provider};
pub use status::NodeStatus;
