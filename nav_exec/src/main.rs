//! Evacuation navigation demonstration executable.
//!
//! # Architecture
//!
//! The executable routes a small crowd out of a demonstration building:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the floor fields (if enabled) and the router
//!     - Main loop, once per control interval:
//!         - Periodic sensor update for all agents
//!         - For every agent still inside:
//!             - Choose the door to head for
//!             - Get the steering point from the direction strategy
//!             - Walk towards it
//!     - Save the routing report and optional floor field dumps

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod demo;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;
use std::time::Instant;
use structopt::StructOpt;

// Internal
use building_if::AgentId;
use demo::{AgentReport, AgentStatus, RoutingReport, Step};
use nav_lib::{
    floor_field::{DirectionStrategy, DomainId, FloorFieldParams},
    hazard::HazardParams,
    router::{Router, RouterError, RouterParams},
};
use util::{
    logger::{logger_init, parse_level, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Duration of one control interval.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Number of control intervals between periodic sensor updates.
const PERIODIC_CYCLES: usize = 10;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec", about = "Route a crowd out of a demonstration building")]
struct Opts {
    /// Minimum log level, one of trace, debug or info
    #[structopt(short, long, default_value = "info")]
    log_level: String,

    /// Maximum number of control intervals to simulate
    #[structopt(short, long, default_value = "1200")]
    steps: usize,

    /// Number of agents, at most 32
    #[structopt(short, long, default_value = "20")]
    num_agents: usize,

    /// Fill the building with smoke spreading from the lobby exit
    #[structopt(long)]
    smoke: bool,

    /// Write the floor field grids to the session's dump directory
    #[structopt(long)]
    dump: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    let min_level = parse_level(&opts.log_level).unwrap_or(LevelFilter::Info);
    logger_init(
        min_level,
        &[("nav_lib::floor_field", LevelFilter::Info)],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Evacuation Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let ff_params: FloorFieldParams = load_params("floor_field.toml");
    let router_params: RouterParams = load_params("router.toml");
    let hazard_params: HazardParams = load_params("hazard.toml");

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let building = Arc::new(demo::building().wrap_err("Failed to build the demo building")?);
    let mut agents = demo::agents(&building, opts.num_agents);

    let start = Instant::now();
    let strategy = DirectionStrategy::new(&building, ff_params)
        .wrap_err("Failed to build the floor fields")?;
    info!(
        "Direction strategy ({:?}) ready in {:.3} s",
        strategy.granularity(),
        start.elapsed().as_secs_f64()
    );

    if opts.dump {
        write_dumps(&session, &strategy).wrap_err("Failed to dump the floor fields")?;
    }

    let mut router = Router::new(building.clone(), router_params)
        .wrap_err("Failed to initialise the router")?;
    if opts.smoke {
        let smoke = demo::smoke(hazard_params).wrap_err("Failed to generate the smoke")?;
        info!("Generated {} smoke meshes", smoke.len());
        router = router.with_hazard(Arc::new(smoke));
    }

    info!("Routing {} agents\n", agents.len());

    // ---- MAIN LOOP ----

    let mut report = RoutingReport::default();
    let mut evacuated: BTreeMap<AgentId, f64> = BTreeMap::new();
    let mut time_s = 0.0;

    for cycle in 0..opts.steps {
        time_s = cycle as f64 * CYCLE_PERIOD_S;
        report.num_steps = cycle + 1;

        if cycle % PERIODIC_CYCLES == 0 {
            router.periodic(&agents, time_s);
        }

        for agent in agents.iter_mut() {
            match router.find_exit(agent, time_s) {
                Ok(_) => (),
                Err(RouterError::Unroutable(_)) => continue,
                Err(e) => return Err(e).wrap_err("Routing failed"),
            }

            let target = match strategy.target(&building, &*agent) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Agent {} has no steering target: {}", agent.id, e);
                    continue;
                }
            };

            if demo::step(&building, agent, &target, CYCLE_PERIOD_S) == Step::Evacuated {
                info!("Agent {} left the building at {:.1} s", agent.id, time_s);
                evacuated.insert(agent.id, time_s);
            }
        }

        // Hand evacuated agents over to the report
        for (id, t) in evacuated.iter() {
            if let Some(cog_map) = router.remove_agent(*id) {
                report.agents.push(AgentReport {
                    agent: *id,
                    doors: cog_map.history_doors(),
                    status: AgentStatus::Evacuated { time_s: *t },
                });
            }
        }
        agents.retain(|a| !evacuated.contains_key(&a.id));

        if agents.iter().all(|a| router.is_unroutable(a.id)) {
            break;
        }
    }

    // ---- REPORT ----

    for agent in agents.iter() {
        let status = if router.is_unroutable(agent.id) {
            AgentStatus::Unroutable
        } else {
            AgentStatus::StillInside
        };
        report.agents.push(AgentReport {
            agent: agent.id,
            doors: router
                .cognitive_map(agent.id)
                .map(|m| m.history_doors())
                .unwrap_or_default(),
            status,
        });
    }
    report.agents.sort_by_key(|a| a.agent);
    report.final_time_s = time_s;

    info!(
        "{} agents evacuated, {} still inside after {:.1} s",
        evacuated.len(),
        agents.len(),
        time_s
    );
    if router.unroutable().count() > 0 {
        warn!(
            "Unroutable agents: {:?}",
            router.unroutable().collect::<Vec<_>>()
        );
    }

    session.save("routing_report.json", report);
    session.exit();

    Ok(())
}

/// Load a parameter file, falling back to the defaults if it can't be loaded.
fn load_params<P: DeserializeOwned + Default>(file: &str) -> P {
    match util::params::load(file) {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not load {}, using defaults: {}", file, e);
            P::default()
        }
    }
}

/// Write a CSV grid dump of every floor field domain.
fn write_dumps(session: &Session, strategy: &DirectionStrategy) -> Result<(), Report> {
    let ff = match strategy.floor_fields() {
        Some(ff) => ff,
        None => {
            warn!("Floor fields are disabled, nothing to dump");
            return Ok(());
        }
    };

    for domain in ff.domain_ids() {
        let name = match domain {
            DomainId::Room(id) => format!("floor_field_room_{}.csv", id),
            DomainId::SubRoom(uid) => format!("floor_field_subroom_{}.csv", uid),
        };
        let path = session.dump_path(&name)?;
        let targets = ff.known_targets(domain)?;
        let num_rows = ff.write_dump(domain, &targets, File::create(&path)?)?;

        info!("Wrote {} rows to {:?}", num_rows, path);
    }

    Ok(())
}
