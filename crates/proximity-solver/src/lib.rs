//! Proximity Solver
//!
//! Watches the world model for transmitters attached to entities and for
//! per-link signal strength, decides which receiver each transmitter is
//! closest to, and publishes changed decisions back as `proximity`
//! attributes.
//!
//! # Architecture
//!
//! - **Config**: positional arguments plus environment overrides
//! - **Shutdown**: cooperative cancellation shared by every loop
//! - **Service**: the identity loop and the evaluation loop
//!
//! # Example
//!
//! ```no_run
//! use proximity_solver::{ProximitySolver, Shutdown, SolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SolverConfig::new("127.0.0.1", 7010, 7009, -70.0);
//!     ProximitySolver::new(config).run(Shutdown::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod shutdown;

pub use config::{AggregatorConfig, ParsedArgs, SolverConfig, USAGE};
pub use error::{Error, Result};
pub use service::{register_sensors, run_cycle, run_evaluation_loop, run_identity_loop, ProximitySolver};
pub use shutdown::{spawn_signal_handler, Shutdown};
