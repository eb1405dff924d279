use std::time::Duration;

use anyhow::Result;
use ft_domain::WaypointSymbol;
use tracing::debug;

use crate::missions::MissionContext;
use crate::ship::ShipOperations;

/// How often a parked probe re-reads its market and shipyard.
const REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Park at the assigned waypoint and keep its snapshots fresh. Probes are
/// the fleet's eyes; every trade and supply run plans against the documents
/// written here.
pub async fn run_probe(ctx: &MissionContext, ship: &mut ShipOperations, waypoint: &WaypointSymbol) -> Result<()> {
    ship.goto(&ctx.universe, waypoint).await?;

    let system = ctx.universe.get_system(&waypoint.system_symbol()).await?;
    let is_shipyard = system.waypoint(waypoint).map(|w| w.is_shipyard()).unwrap_or(false);

    loop {
        let market = ship.refresh_market().await?;
        ctx.universe.save_local_market(market).await?;
        if is_shipyard {
            let shipyard = ship.refresh_shipyard().await?;
            ctx.universe.save_local_shipyard(shipyard).await?;
        }
        debug!(ship = %ship.symbol, "snapshots at {} refreshed", waypoint);
        tokio::time::sleep(REFRESH_INTERVAL).await;
    }
}
