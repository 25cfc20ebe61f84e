//! Proximity solver binary.
//!
//! Usage: `proximity-solver <world model ip> <client port> <solver port> <threshold> [<aggregator ip> <aggregator port>]`

use proximity_solver::{spawn_signal_handler, ParsedArgs, ProximitySolver, Shutdown, SolverConfig, USAGE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "proximity_solver=info,proximity_core=info,proximity_world=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match SolverConfig::from_args(std::env::args().skip(1))? {
        ParsedArgs::Run(config) => config,
        ParsedArgs::Usage => {
            println!("{}", USAGE);
            return Ok(());
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone())?;

    ProximitySolver::new(config).run(shutdown).await?;

    Ok(())
}
