//! Main MPC executable entry point.
//!
//! # Architecture
//!
//! The executable is a server the simulator connects to:
//!
//!     - Initialise the session, logging and parameters
//!     - Listen on the configured port
//!     - For each simulator connection:
//!         - Build a fresh optimizer for the session
//!         - Run each telemetry frame through the pipeline
//!         - Release the resulting command once the actuation latency has passed
//!
//! Plain HTTP requests on the same port get a static page.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Result};
use log::{debug, info};
use std::sync::Arc;
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use mpc_lib::{
    mpc_ctrl::{KinematicOptimizer, LatencyModel, Optimizer, OptimizerFactory},
    params::ExecParams,
    sim_server::{SessionConfig, SimServer},
};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(name = "mpc_exec", about = "Predictive controller bridge for the driving simulator")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "mpc_exec.toml")]
    params: String,

    /// Network parameter file, relative to the params directory
    #[structopt(long, default_value = "net.toml")]
    net_params: String,

    /// Port to listen on, overriding the network parameters
    #[structopt(long)]
    port: Option<u16>,

    /// Log level (info, debug or trace)
    #[structopt(long, default_value = "debug")]
    log_level: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "mpc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = parse_level(&opt.log_level)
        .ok_or_else(|| eyre!("Unknown log level \"{}\"", opt.log_level))?;
    logger_init(level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MPC Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: ExecParams = util::params::load(&opt.params)
        .wrap_err("Could not load exec params")?;

    let mut net_params: NetParams = util::params::load(&opt.net_params)
        .wrap_err("Could not load net params")?;

    if let Some(port) = opt.port {
        net_params.port = port;
    }

    info!("Parameters loaded");

    // ---- SERVER INITIALISATION ----

    let optimizer_params = params.mpc_ctrl.optimizer.clone();
    let optimizer_factory: OptimizerFactory = Arc::new(move || {
        Box::new(KinematicOptimizer::new(optimizer_params.clone())) as Box<dyn Optimizer>
    });

    let latency = LatencyModel::from_millis(params.mpc_ctrl.actuation_latency_ms);
    let config = SessionConfig {
        optimizer_factory,
        latency,
        gateway: params.gateway.clone(),
    };

    let server = SimServer::bind(&net_params, config)
        .await
        .wrap_err("Failed to initialise the server")?;

    info!(
        "Listening to port {} (actuation latency {:?})",
        net_params.port,
        latency.latency()
    );

    // ---- MAIN LOOP ----

    server.run().await.wrap_err("Server stopped")?;

    Ok(())
}
