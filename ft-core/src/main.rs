use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ft_core::agent::Agent;
use ft_core::configuration::Config;
use ft_core::fleet;
use ft_core::ledger::LedgerRegistry;
use ft_core::missions::MissionContext;
use ft_core::scheduler::Scheduler;
use ft_core::universe::Universe;
use ft_domain::AgentSymbol;
use ft_store::{Bmc, Ctx, FsBmc, FsModelManager};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!("running {} agent(s) against {}", config.callsigns.len(), config.base_url);

    let bmc: Arc<dyn Bmc> = Arc::new(FsBmc::new(FsModelManager::new(config.data_dir.clone())));

    let mut agents = Vec::new();
    for callsign in config.callsigns.clone() {
        let handle = tokio::spawn(run_agent(config.clone(), Arc::clone(&bmc), callsign.clone()));
        agents.push((callsign, handle));
    }

    // one agent's failure never stops the others
    for (callsign, handle) in agents {
        match handle.await {
            Ok(Ok(())) => info!(agent = %callsign, "agent run finished"),
            Ok(Err(e)) => error!(agent = %callsign, "agent run failed: {:#}", e),
            Err(e) => error!(agent = %callsign, "agent task panicked: {}", e),
        }
    }
    Ok(())
}

async fn run_agent(config: Config, bmc: Arc<dyn Bmc>, callsign: String) -> Result<()> {
    let ctx = Ctx::for_agent(AgentSymbol(callsign));
    let mut agent = Agent::load(
        bmc.agent_bmc(),
        ctx.clone(),
        &config.base_url,
        &config.faction,
        config.requests_per_second,
    )
    .await?;

    let universe = Arc::new(Universe::load(Arc::clone(&agent.api), bmc.world_cache_bmc()).await?);
    let mission_ctx = MissionContext {
        universe: Arc::clone(&universe),
        missions: bmc.mission_bmc(),
        ledgers: Arc::new(LedgerRegistry::new(bmc.ledger_bmc())),
    };

    // the fleet operates in the system it was born in
    let home_system = { agent.info.lock().await.headquarters.system_symbol() };
    let specs = fleet::desired_jobs(&universe, &home_system, &config.fleet_plan()).await?;
    info!(agent = %ctx.agent_symbol, "derived {} jobs for {}", specs.len(), home_system);

    let scheduler = Scheduler {
        ctx,
        specs,
        job_store: bmc.job_bmc(),
        mission_ctx,
        purchase_failure_policy: config.purchase_failure_policy,
    };
    scheduler.run(&mut agent).await
}
