//! Solver configuration from positional arguments and the environment.

use std::time::Duration;

use proximity_core::Rss;

use crate::error::{Error, Result};

/// Usage text printed when the argument count is wrong.
pub const USAGE: &str = "This program requires the following arguments:
\t<world model ip> <client port> <solver port> <threshold>
or, to read samples from a packet aggregator instead of link medians:
\t<world model ip> <client port> <solver port> <threshold> <aggregator ip> <aggregator port>";

/// Origin name pushed solutions are attributed to.
pub const DEFAULT_ORIGIN: &str = "proximity solver";

/// Aggregator endpoint for the packet-fed variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub host: String,
    pub port: u16,
}

impl AggregatorConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for a solver instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// World model host
    pub world_model_host: String,

    /// World model client port (streaming queries)
    pub client_port: u16,

    /// World model solver port (solution pushes)
    pub solver_port: u16,

    /// Samples strictly above this RSS count as "in proximity"
    pub threshold: Rss,

    /// Read samples from a packet aggregator instead of link medians
    pub aggregator: Option<AggregatorConfig>,

    /// Refresh interval of the `sensor.*` query
    pub sensor_interval: Duration,

    /// Refresh interval of the `link median` query
    pub rss_interval: Duration,

    /// Aggregator forwarding interval
    pub aggregator_interval: Duration,

    /// How long a loop waits when its feed has nothing ready
    pub idle_wait: Duration,

    /// Origin name for pushed solutions
    pub origin: String,
}

/// Outcome of argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedArgs {
    Run(SolverConfig),
    /// Wrong argument count: print [`USAGE`] and exit.
    Usage,
}

impl SolverConfig {
    /// Build a config with default intervals.
    pub fn new(world_model_host: impl Into<String>, client_port: u16, solver_port: u16, threshold: Rss) -> Self {
        Self {
            world_model_host: world_model_host.into(),
            client_port,
            solver_port,
            threshold,
            aggregator: None,
            sensor_interval: Duration::from_millis(10_000),
            rss_interval: Duration::from_millis(1_000),
            aggregator_interval: Duration::from_millis(1_000),
            idle_wait: Duration::from_millis(100),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }

    /// Parse positional arguments (without the program name), applying
    /// overrides from the process environment.
    pub fn from_args<I>(args: I) -> Result<ParsedArgs>
    where
        I: IntoIterator<Item = String>,
    {
        Self::from_args_with_env(args, |key| std::env::var(key).ok())
    }

    /// Parse positional arguments, reading overrides through `env`.
    pub fn from_args_with_env<I, F>(args: I, env: F) -> Result<ParsedArgs>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        if args.len() != 4 && args.len() != 6 {
            return Ok(ParsedArgs::Usage);
        }

        let threshold = args[3]
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Config(format!("threshold must be an integer, got {:?}", args[3])))?;

        let mut config = Self::new(
            args[0].clone(),
            parse_port("client port", &args[1])?,
            parse_port("solver port", &args[2])?,
            Rss::from(threshold),
        );

        if args.len() == 6 {
            config.aggregator = Some(AggregatorConfig {
                host: args[4].clone(),
                port: parse_port("aggregator port", &args[5])?,
            });
        }

        config.apply_env(env)?;
        Ok(ParsedArgs::Run(config))
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = env_millis(&env, "PROXIMITY_SENSOR_INTERVAL_MS")? {
            self.sensor_interval = ms;
        }
        if let Some(ms) = env_millis(&env, "PROXIMITY_RSS_INTERVAL_MS")? {
            self.rss_interval = ms;
            self.aggregator_interval = ms;
        }
        if let Some(ms) = env_millis(&env, "PROXIMITY_IDLE_WAIT_MS")? {
            self.idle_wait = ms;
        }
        if let Some(origin) = env("PROXIMITY_ORIGIN").filter(|o| !o.trim().is_empty()) {
            self.origin = origin;
        }
        Ok(())
    }

    /// Address of the world model client port.
    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.world_model_host, self.client_port)
    }

    /// Address of the world model solver port.
    pub fn solver_addr(&self) -> String {
        format!("{}:{}", self.world_model_host, self.solver_port)
    }
}

fn parse_port(what: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid {}: {:?}", what, value)))
}

fn env_millis<F>(env: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| Error::Config(format!("{} must be milliseconds, got {:?}", key, value))),
    }
}
