use std::sync::Arc;

use anyhow::Result;
use ft_domain::{JobKind, MarketData, SystemSymbol};
use ft_store::MissionBmcTrait;
use rand::Rng;

use crate::ledger::LedgerRegistry;
use crate::ship::ShipOperations;
use crate::universe::Universe;

pub mod construction;
pub mod extraction;
pub mod probe;
pub mod trading;

pub use extraction::ExtractionMethod;

/// Everything a mission task needs besides its ship.
#[derive(Debug, Clone)]
pub struct MissionContext {
    pub universe: Arc<Universe>,
    pub missions: Arc<dyn MissionBmcTrait>,
    pub ledgers: Arc<LedgerRegistry>,
}

/// Entry point of one ship's task. Runs until the job is cancelled or the
/// workflow hits a fatal error.
pub async fn run_job(ctx: MissionContext, mut ship: ShipOperations, kind: JobKind) -> Result<()> {
    match kind {
        JobKind::IdleProbe { waypoint } => probe::run_probe(&ctx, &mut ship, &waypoint).await,
        JobKind::Trade { system } => trading::run_trading(&ctx, &mut ship, &system).await,
        JobKind::SupplyConstruction { system } => construction::run_construction(&ctx, &mut ship, &system).await,
        JobKind::ExtractOres {
            extraction_waypoint,
            sell_waypoint,
            keep,
        } => extraction::run_extraction(&ctx, &mut ship, &extraction_waypoint, &sell_waypoint, &keep, ExtractionMethod::Mine).await,
        JobKind::SiphonGases {
            extraction_waypoint,
            sell_waypoint,
            keep,
        } => extraction::run_extraction(&ctx, &mut ship, &extraction_waypoint, &sell_waypoint, &keep, ExtractionMethod::Siphon).await,
    }
}

/// Sleep 3 to 5 minutes before re-evaluating. Jittered so ships that ran
/// out of work together don't re-plan in lockstep.
pub(crate) async fn no_work_backoff() {
    let secs = { rand::thread_rng().gen_range(180..=300) };
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

/// All detailed market snapshots the probes have gathered for a system.
pub(crate) async fn cached_markets(ctx: &MissionContext, system_symbol: &SystemSymbol) -> Result<Vec<MarketData>> {
    let system = ctx.universe.get_system(system_symbol).await?;
    let mut markets = Vec::new();
    for waypoint in system.market_waypoints() {
        if let Some(market) = ctx.universe.get_local_market(&waypoint.symbol).await? {
            if market.has_detailed_price_information() {
                markets.push(market);
            }
        }
    }
    Ok(markets)
}
