use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use ft_domain::{
    Construction, ConstructionMission, ConstructionMissionStatus, FlowKey, MarketData, Mission, SystemSymbol, TradeStop, WaypointSymbol,
};
use itertools::Itertools;
use tracing::{info, warn};

use crate::ledger::SharedLedger;
use crate::missions::{cached_markets, no_work_backoff, MissionContext};
use crate::ship::ShipOperations;

/// Credits kept untouched for fuel and emergencies.
const CREDIT_RESERVE: i64 = 20_000;

/// Buy materials only at MODERATE supply or better.
const MIN_BUY_SUPPLY_RANK: u8 = 3;

/// Poll interval once the site is complete.
const COMPLETE_IDLE: Duration = Duration::from_secs(60);

fn buy_key(mission: &ConstructionMission) -> FlowKey {
    FlowKey {
        waypoint: mission.buy.waypoint.clone(),
        good: mission.good.clone(),
    }
}

/// Pick the next material run: the first unfulfilled material with a
/// well-supplied source, capped by hold space, the site's remaining need
/// and the spendable credits.
pub(crate) fn plan_supply_purchase(
    construction: &Construction,
    markets: &[MarketData],
    cargo_space: u32,
    credits: i64,
) -> Option<(ConstructionMission, i64)> {
    for material in construction
        .materials
        .iter()
        .filter(|m| m.remaining() > 0)
        .sorted_by_key(|m| m.trade_symbol.clone())
    {
        let best_buy = markets
            .iter()
            .filter_map(|market| {
                market.trade_good(&material.trade_symbol).map(|listing| TradeStop {
                    waypoint: market.symbol.clone(),
                    trade_volume: listing.trade_volume,
                    price: listing.purchase_price as i64,
                    supply: listing.supply,
                    activity: listing.activity.clone(),
                })
            })
            .filter(|stop| stop.supply.rank() >= MIN_BUY_SUPPLY_RANK)
            .min_by_key(|stop| stop.price);
        let Some(buy) = best_buy else {
            continue;
        };

        let affordable = ((credits - CREDIT_RESERVE) / buy.price).max(0) as u32;
        let quantity = material.remaining().min(cargo_space).min(affordable);
        if quantity == 0 {
            continue;
        }

        let mission = ConstructionMission {
            good: material.trade_symbol.clone(),
            units: quantity,
            buy,
            site: construction.symbol.clone(),
            status: ConstructionMissionStatus::Buy,
        };
        return Some((mission, quantity as i64));
    }
    None
}

async fn plan_mission(
    ctx: &MissionContext,
    ledger: &SharedLedger,
    ship: &ShipOperations,
    system_symbol: &SystemSymbol,
    construction: &Construction,
) -> Result<Option<ConstructionMission>> {
    if !ship.cargo.inventory.is_empty() {
        bail!("ship {} still has cargo while planning a supply run", ship.symbol);
    }

    let markets = cached_markets(ctx, system_symbol).await?;
    let Some((mission, quantity)) = plan_supply_purchase(construction, &markets, ship.cargo.space_left(), ship.credits().await) else {
        return Ok(None);
    };

    let key = buy_key(&mission);
    if !ledger
        .accepts_purchase(&key, quantity, mission.buy.supply, mission.buy.trade_volume)
        .await
    {
        return Ok(None);
    }
    ledger.reserve(&ship.symbol, BTreeMap::from([(key, -quantity)])).await?;
    ctx.missions
        .save_mission(&ship.symbol, &Mission::Construction(mission.clone()))
        .await?;
    info!(
        ship = %ship.symbol,
        "planned supply run: {} x{} from {} to {}", mission.good, mission.units, mission.buy.waypoint, mission.site
    );
    Ok(Some(mission))
}

async fn execute_buy(
    ctx: &MissionContext,
    ledger: &SharedLedger,
    ship: &mut ShipOperations,
    mission: &mut ConstructionMission,
) -> Result<()> {
    ship.goto(&ctx.universe, &mission.buy.waypoint).await?;
    let market = ship.refresh_market().await?;
    ctx.universe.save_local_market(market).await?;

    let abort_price = mission.buy.price * 3 / 2;

    loop {
        let market = ctx
            .universe
            .get_local_market(&mission.buy.waypoint)
            .await?
            .ok_or_else(|| anyhow!("no cached market at {}", mission.buy.waypoint))?;
        let listing = market
            .trade_good(&mission.good)
            .ok_or_else(|| anyhow!("{} no longer lists {}", mission.buy.waypoint, mission.good))?;

        let held = ship.cargo.units_of(&mission.good);
        if held >= mission.units || ship.cargo.space_left() == 0 {
            break;
        }
        if listing.purchase_price as i64 > abort_price {
            warn!(ship = %ship.symbol, "{} price rose to {}, stopping buys", mission.good, listing.purchase_price);
            break;
        }
        if listing.supply.rank() < MIN_BUY_SUPPLY_RANK {
            warn!(ship = %ship.symbol, "{} supply fell to {}, stopping buys", mission.good, listing.supply);
            break;
        }
        let affordable = ((ship.credits().await - CREDIT_RESERVE) / listing.purchase_price as i64).max(0) as u32;
        let chunk = (mission.units - held)
            .min(listing.trade_volume.max(0) as u32)
            .min(affordable)
            .min(ship.cargo.space_left());
        if chunk == 0 {
            break;
        }

        ship.buy_good(&mission.good, chunk).await?;
        let refreshed = ship.refresh_market().await?;
        ctx.universe.save_local_market(refreshed).await?;
    }

    let held = ship.cargo.units_of(&mission.good);
    if held == 0 {
        warn!(ship = %ship.symbol, "bought nothing, abandoning supply run of {}", mission.good);
        ledger.clear(&ship.symbol).await?;
        mission.status = ConstructionMissionStatus::Complete;
    } else {
        ledger.release_key(&ship.symbol, &buy_key(mission)).await?;
        mission.units = held;
        mission.status = ConstructionMissionStatus::Deliver;
    }
    ctx.missions
        .save_mission(&ship.symbol, &Mission::Construction(mission.clone()))
        .await
}

/// Hand the cargo over at the site, updating the cached construction after
/// every delivery so sibling planners see the progress.
async fn execute_deliver(
    ctx: &MissionContext,
    ledger: &SharedLedger,
    ship: &mut ShipOperations,
    mission: &mut ConstructionMission,
) -> Result<()> {
    ship.goto(&ctx.universe, &mission.site).await?;

    loop {
        let held = ship.cargo.units_of(&mission.good);
        if held == 0 {
            break;
        }
        let construction = ctx.universe.get_remote_construction(&mission.site).await?;
        let remaining = construction.material(&mission.good).map(|m| m.remaining()).unwrap_or(0);
        if remaining == 0 {
            warn!(ship = %ship.symbol, "{} no longer needs {}, jettisoning {}", mission.site, mission.good, held);
            ship.jettison(&mission.good, held).await?;
            break;
        }
        let chunk = held.min(remaining);
        let updated = ship.supply_construction(&mission.site, &mission.good, chunk).await?;
        ctx.universe.save_remote_construction(updated).await?;
    }

    ledger.clear(&ship.symbol).await?;
    mission.status = ConstructionMissionStatus::Complete;
    ctx.missions
        .save_mission(&ship.symbol, &Mission::Construction(mission.clone()))
        .await
}

/// The system must resolve to exactly one site under construction; more
/// than one means the mission has no well-defined target.
fn construction_site(system: &ft_domain::System) -> Result<WaypointSymbol> {
    system
        .waypoints
        .iter()
        .filter(|w| w.is_under_construction)
        .map(|w| w.symbol.clone())
        .exactly_one()
        .map_err(|candidates| anyhow!("expected exactly one site under construction in {}, got {}", system.symbol, candidates.count()))
}

/// Supply loop for one hauler: buy a needed material, deliver it, repeat
/// until the site is complete, then idle.
pub async fn run_construction(ctx: &MissionContext, ship: &mut ShipOperations, system_symbol: &SystemSymbol) -> Result<()> {
    let ledger = ctx.ledgers.ledger_for(system_symbol).await?;
    let system = ctx.universe.get_system(system_symbol).await?;
    let site = construction_site(&system)?;

    loop {
        let mission = match ctx.missions.load_mission(&ship.symbol).await? {
            Some(Mission::Construction(mission)) => Some(mission),
            Some(other) => bail!("ship {} carries a non-construction mission: {:?}", ship.symbol, other),
            None => None,
        };

        match mission {
            Some(mut mission) => match mission.status {
                ConstructionMissionStatus::Buy => execute_buy(ctx, &ledger, ship, &mut mission).await?,
                ConstructionMissionStatus::Deliver => execute_deliver(ctx, &ledger, ship, &mut mission).await?,
                ConstructionMissionStatus::Complete => plan_or_idle(ctx, &ledger, ship, system_symbol, &site).await?,
            },
            None => plan_or_idle(ctx, &ledger, ship, system_symbol, &site).await?,
        }
    }
}

async fn plan_or_idle(
    ctx: &MissionContext,
    ledger: &SharedLedger,
    ship: &mut ShipOperations,
    system_symbol: &SystemSymbol,
    site: &WaypointSymbol,
) -> Result<()> {
    let construction = ctx.universe.get_remote_construction(site).await?;
    if construction.is_complete {
        info!(ship = %ship.symbol, "construction at {} is complete, idling", site);
        ledger.clear(&ship.symbol).await?;
        tokio::time::sleep(COMPLETE_IDLE).await;
        return Ok(());
    }
    if plan_mission(ctx, ledger, ship, system_symbol, &construction).await?.is_none() {
        no_work_backoff().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_domain::{ActivityLevel, ConstructionMaterial, MarketTradeGood, SupplyLevel, TradeGoodSymbol, TradeGoodType};

    fn material(good: &str, required: u32, fulfilled: u32) -> ConstructionMaterial {
        ConstructionMaterial {
            trade_symbol: TradeGoodSymbol(good.to_string()),
            required,
            fulfilled,
        }
    }

    fn gate(materials: Vec<ConstructionMaterial>) -> Construction {
        Construction {
            symbol: WaypointSymbol("X1-GY87-I55".to_string()),
            materials,
            is_complete: false,
        }
    }

    fn market(waypoint: &str, good: &str, supply: SupplyLevel, price: i32) -> MarketData {
        MarketData {
            symbol: WaypointSymbol(waypoint.to_string()),
            exports: vec![],
            imports: vec![],
            exchange: vec![],
            trade_goods: Some(vec![MarketTradeGood {
                symbol: TradeGoodSymbol(good.to_string()),
                trade_good_type: TradeGoodType::Export,
                trade_volume: 60,
                supply,
                activity: Some(ActivityLevel::Growing),
                purchase_price: price,
                sell_price: price - 200,
            }]),
            retrieved_at: None,
        }
    }

    #[test]
    fn fulfilled_materials_are_skipped() {
        let construction = gate(vec![material("FAB_MATS", 4_000, 4_000), material("ADVANCED_CIRCUITRY", 1_200, 0)]);
        let markets = vec![
            market("X1-GY87-A1", "FAB_MATS", SupplyLevel::Abundant, 2_000),
            market("X1-GY87-B3", "ADVANCED_CIRCUITRY", SupplyLevel::Moderate, 9_000),
        ];

        let (mission, _) = plan_supply_purchase(&construction, &markets, 80, 1_000_000).unwrap();
        assert_eq!(mission.good, TradeGoodSymbol("ADVANCED_CIRCUITRY".to_string()));
        assert_eq!(mission.buy.waypoint, WaypointSymbol("X1-GY87-B3".to_string()));
    }

    #[test]
    fn quantity_is_capped_by_the_sites_remaining_need() {
        let construction = gate(vec![material("FAB_MATS", 4_000, 3_970)]);
        let markets = vec![market("X1-GY87-A1", "FAB_MATS", SupplyLevel::Abundant, 2_000)];

        let (mission, _) = plan_supply_purchase(&construction, &markets, 80, 10_000_000).unwrap();
        assert_eq!(mission.units, 30);
    }

    #[test]
    fn quantity_is_capped_by_spendable_credits() {
        let construction = gate(vec![material("FAB_MATS", 4_000, 0)]);
        let markets = vec![market("X1-GY87-A1", "FAB_MATS", SupplyLevel::Abundant, 2_000)];

        // 30_000 spendable credits after the reserve buy 5 units at 2_000
        let (mission, _) = plan_supply_purchase(&construction, &markets, 80, 30_000).unwrap();
        assert_eq!(mission.units, 5);
    }

    #[test]
    fn starved_sources_are_not_bought_from() {
        let construction = gate(vec![material("FAB_MATS", 4_000, 0)]);
        let markets = vec![market("X1-GY87-A1", "FAB_MATS", SupplyLevel::Limited, 2_000)];

        assert!(plan_supply_purchase(&construction, &markets, 80, 1_000_000).is_none());
    }

    #[test]
    fn broke_agents_plan_nothing() {
        let construction = gate(vec![material("FAB_MATS", 4_000, 0)]);
        let markets = vec![market("X1-GY87-A1", "FAB_MATS", SupplyLevel::Abundant, 2_000)];

        assert!(plan_supply_purchase(&construction, &markets, 80, CREDIT_RESERVE).is_none());
    }
}
