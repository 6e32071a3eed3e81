//! Agent binary: wires the lifecycle core to the embedded collaborators.
//!
//! The tracing subscriber is installed once, before any other component
//! runs, and every component logs through it; fatal stage errors are
//! logged with their stage label before the process exits non-zero.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atomizer_agent::{Agent, Args, LocalConnector, LocalEngines, TracingSink};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(error) = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atomizer_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("unable to install the global logger: {error}");
        return ExitCode::FAILURE;
    }

    let args = Args::parse();
    tracing::info!(
        use_env = args.use_env,
        exchange = %args.exchange,
        topic = %args.topic,
        "atomizer agent starting"
    );

    let agent = Agent::new(
        Arc::new(LocalConnector),
        Arc::new(LocalEngines::new()),
        Arc::new(TracingSink::new()),
    );

    match agent.run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(stage = error.as_label(), "{}", error.as_message());
            ExitCode::FAILURE
        }
    }
}
