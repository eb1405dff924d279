use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use ft_domain::{
    target_buy_flow, target_sell_flow, FlowKey, MarketData, Mission, SystemSymbol, TradeGoodSymbol, TradeMission,
    TradeMissionStatus, TradeStop,
};
use itertools::Itertools;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::ledger::SharedLedger;
use crate::missions::{cached_markets, no_work_backoff, MissionContext};
use crate::ship::ShipOperations;

/// Candidates below this margin are not worth the flight.
const MIN_PROFIT_PER_UNIT: i64 = 100;

/// Credits kept untouched for fuel and emergencies.
const CREDIT_RESERVE: i64 = 20_000;

/// Buy only at MODERATE supply or better.
const MIN_BUY_SUPPLY_RANK: u8 = 3;

/// Sell only at MODERATE supply or worse.
const MAX_SELL_SUPPLY_RANK: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TradeCandidate {
    pub good: TradeGoodSymbol,
    pub buy: TradeStop,
    pub sell: TradeStop,
}

impl TradeCandidate {
    pub fn profit_per_unit(&self) -> i64 {
        self.sell.price - self.buy.price
    }
}

fn stop(market: &MarketData, good: &TradeGoodSymbol, buying: bool) -> Option<TradeStop> {
    market.trade_good(good).map(|listing| TradeStop {
        waypoint: market.symbol.clone(),
        trade_volume: listing.trade_volume,
        price: if buying { listing.purchase_price as i64 } else { listing.sell_price as i64 },
        supply: listing.supply,
        activity: listing.activity.clone(),
    })
}

/// Build the arbitrage table from cached market snapshots: per good, the
/// cheapest well-supplied source and the best-paying starved destination,
/// kept when the margin clears [`MIN_PROFIT_PER_UNIT`]. Sorted by margin,
/// best first.
pub(crate) fn plan_trades(markets: &[MarketData]) -> Vec<TradeCandidate> {
    let goods: Vec<TradeGoodSymbol> = markets
        .iter()
        .filter_map(|m| m.trade_goods.as_deref())
        .flatten()
        .map(|g| g.symbol.clone())
        .unique()
        .collect();

    let mut candidates = Vec::new();
    for good in goods {
        let best_buy = markets
            .iter()
            .filter_map(|m| stop(m, &good, true))
            .filter(|s| s.supply.rank() >= MIN_BUY_SUPPLY_RANK)
            .min_by_key(|s| s.price);
        let best_sell = markets
            .iter()
            .filter_map(|m| stop(m, &good, false))
            .filter(|s| s.supply.rank() <= MAX_SELL_SUPPLY_RANK)
            .max_by_key(|s| s.price);
        if let (Some(buy), Some(sell)) = (best_buy, best_sell) {
            if buy.waypoint == sell.waypoint {
                continue;
            }
            let candidate = TradeCandidate { good, buy, sell };
            if candidate.profit_per_unit() >= MIN_PROFIT_PER_UNIT {
                candidates.push(candidate);
            }
        }
    }
    candidates.sort_by_key(|c| std::cmp::Reverse(c.profit_per_unit()));
    candidates
}

fn buy_key(mission: &TradeMission) -> FlowKey {
    FlowKey {
        waypoint: mission.buy.waypoint.clone(),
        good: mission.good.clone(),
    }
}

fn sell_key(mission: &TradeMission) -> FlowKey {
    FlowKey {
        waypoint: mission.sell.waypoint.clone(),
        good: mission.good.clone(),
    }
}

/// Pick the next trade, reserve its flows and persist the mission in `buy`.
/// `None` when nothing clears the margin and ledger filters.
async fn plan_mission(
    ctx: &MissionContext,
    ledger: &SharedLedger,
    ship: &ShipOperations,
    system_symbol: &SystemSymbol,
) -> Result<Option<TradeMission>> {
    if !ship.cargo.inventory.is_empty() {
        bail!("ship {} still has cargo while planning a new trade", ship.symbol);
    }

    let markets = cached_markets(ctx, system_symbol).await?;
    let mut candidates = plan_trades(&markets);
    // equal margins get a random order, so sibling planners fan out
    candidates.shuffle(&mut rand::thread_rng());
    candidates.sort_by_key(|c| std::cmp::Reverse(c.profit_per_unit()));

    for candidate in candidates {
        let buy_target = target_buy_flow(candidate.buy.supply, candidate.buy.trade_volume);
        let sell_target = target_sell_flow(candidate.sell.supply, candidate.sell.trade_volume);
        let (Some(buy_target), Some(sell_target)) = (buy_target, sell_target) else {
            continue;
        };
        let quantity = buy_target.min(sell_target).min(ship.cargo.capacity as i64);
        if quantity <= 0 {
            continue;
        }

        let mission = TradeMission {
            good: candidate.good,
            units: quantity as u32,
            buy: candidate.buy,
            sell: candidate.sell,
            status: TradeMissionStatus::Buy,
        };
        let buy_key = buy_key(&mission);
        let sell_key = sell_key(&mission);
        if !ledger
            .accepts_purchase(&buy_key, quantity, mission.buy.supply, mission.buy.trade_volume)
            .await
        {
            continue;
        }
        if !ledger
            .accepts_sale(&sell_key, quantity, mission.sell.supply, mission.sell.trade_volume)
            .await
        {
            continue;
        }

        ledger
            .reserve(&ship.symbol, BTreeMap::from([(buy_key, -quantity), (sell_key, quantity)]))
            .await?;
        ctx.missions.save_mission(&ship.symbol, &Mission::Trade(mission.clone())).await?;
        info!(
            ship = %ship.symbol,
            "planned trade: {} x{} from {} at {} to {} at {}",
            mission.good, mission.units, mission.buy.waypoint, mission.buy.price, mission.sell.waypoint, mission.sell.price
        );
        return Ok(Some(mission));
    }
    Ok(None)
}

/// Buy up to the planned quantity, re-reading the market between chunks.
/// Breaks out early when the price or supply moves against the plan or
/// funds run low; an empty hold afterwards aborts the mission.
async fn execute_buy(ctx: &MissionContext, ledger: &SharedLedger, ship: &mut ShipOperations, mission: &mut TradeMission) -> Result<()> {
    ship.goto(&ctx.universe, &mission.buy.waypoint).await?;
    let market = ship.refresh_market().await?;
    ctx.universe.save_local_market(market).await?;

    // once the price passes the midpoint, the remaining margin is not
    // worth the exposure
    let abort_price = (mission.buy.price + mission.sell.price) / 2;

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
        warn!(ship = %ship.symbol, "bought nothing, abandoning trade of {}", mission.good);
        ledger.clear(&ship.symbol).await?;
        mission.status = TradeMissionStatus::Complete;
    } else {
        ledger.release_key(&ship.symbol, &buy_key(mission)).await?;
        mission.units = held;
        mission.status = TradeMissionStatus::Sell;
    }
    ctx.missions.save_mission(&ship.symbol, &Mission::Trade(mission.clone())).await
}

/// Sell everything bought, chunked by the live trade volume.
async fn execute_sell(ctx: &MissionContext, ledger: &SharedLedger, ship: &mut ShipOperations, mission: &mut TradeMission) -> Result<()> {
    ship.goto(&ctx.universe, &mission.sell.waypoint).await?;

    while ship.cargo.units_of(&mission.good) > 0 {
        let market = ship.refresh_market().await?;
        let trade_volume = market
            .trade_good(&mission.good)
            .map(|g| g.trade_volume)
            .unwrap_or(mission.sell.trade_volume);
        ctx.universe.save_local_market(market).await?;

        let chunk = ship.cargo.units_of(&mission.good).min(trade_volume.max(1) as u32);
        ship.sell_good(&mission.good, chunk).await?;
    }

    let market = ship.refresh_market().await?;
    ctx.universe.save_local_market(market).await?;

    ledger.clear(&ship.symbol).await?;
    mission.status = TradeMissionStatus::Complete;
    ctx.missions.save_mission(&ship.symbol, &Mission::Trade(mission.clone())).await
}

/// Arbitrage loop for one hauler: plan, buy, sell, repeat.
pub async fn run_trading(ctx: &MissionContext, ship: &mut ShipOperations, system_symbol: &SystemSymbol) -> Result<()> {
    let ledger = ctx.ledgers.ledger_for(system_symbol).await?;

    loop {
        let mission = match ctx.missions.load_mission(&ship.symbol).await? {
            Some(Mission::Trade(mission)) => Some(mission),
            Some(other) => bail!("ship {} carries a non-trade mission: {:?}", ship.symbol, other),
            None => None,
        };

        match mission {
            Some(mut mission) => match mission.status {
                TradeMissionStatus::Buy => execute_buy(ctx, &ledger, ship, &mut mission).await?,
                TradeMissionStatus::Sell => execute_sell(ctx, &ledger, ship, &mut mission).await?,
                TradeMissionStatus::Complete => {
                    if plan_mission(ctx, &ledger, ship, system_symbol).await?.is_none() {
                        no_work_backoff().await;
                    }
                }
            },
            None => {
                if plan_mission(ctx, &ledger, ship, system_symbol).await?.is_none() {
                    no_work_backoff().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_domain::{ActivityLevel, MarketTradeGood, SupplyLevel, TradeGoodType, WaypointSymbol};

    fn listing(good: &str, supply: SupplyLevel, purchase: i32, sell: i32) -> MarketTradeGood {
        MarketTradeGood {
            symbol: TradeGoodSymbol(good.to_string()),
            trade_good_type: TradeGoodType::Exchange,
            trade_volume: 40,
            supply,
            activity: Some(ActivityLevel::Strong),
            purchase_price: purchase,
            sell_price: sell,
        }
    }

    fn market(waypoint: &str, goods: Vec<MarketTradeGood>) -> MarketData {
        MarketData {
            symbol: WaypointSymbol(waypoint.to_string()),
            exports: vec![],
            imports: vec![],
            exchange: vec![],
            trade_goods: Some(goods),
            retrieved_at: None,
        }
    }

    #[test]
    fn picks_the_widest_margin_between_two_markets() {
        let markets = vec![
            market("X1-GY87-A1", vec![listing("FAB_MATS", SupplyLevel::Abundant, 2_000, 1_900)]),
            market("X1-GY87-B3", vec![listing("FAB_MATS", SupplyLevel::Scarce, 3_300, 3_100)]),
        ];

        let candidates = plan_trades(&markets);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.buy.waypoint, WaypointSymbol("X1-GY87-A1".to_string()));
        assert_eq!(c.sell.waypoint, WaypointSymbol("X1-GY87-B3".to_string()));
        assert_eq!(c.profit_per_unit(), 1_100);
    }

    #[test]
    fn thin_margins_are_dropped() {
        let markets = vec![
            market("X1-GY87-A1", vec![listing("IRON", SupplyLevel::High, 1_000, 950)]),
            market("X1-GY87-B3", vec![listing("IRON", SupplyLevel::Limited, 1_150, 1_099)]),
        ];
        assert!(plan_trades(&markets).is_empty());
    }

    #[test]
    fn starved_markets_are_never_buy_candidates() {
        // the only cheap source is SCARCE, which rules it out for buying
        let markets = vec![
            market("X1-GY87-A1", vec![listing("FUEL", SupplyLevel::Scarce, 100, 90)]),
            market("X1-GY87-B3", vec![listing("FUEL", SupplyLevel::Limited, 900, 800)]),
        ];
        assert!(plan_trades(&markets).is_empty());
    }

    #[test]
    fn oversupplied_markets_are_never_sell_candidates() {
        let markets = vec![
            market("X1-GY87-A1", vec![listing("FUEL", SupplyLevel::Abundant, 100, 90)]),
            market("X1-GY87-B3", vec![listing("FUEL", SupplyLevel::High, 900, 800)]),
        ];
        assert!(plan_trades(&markets).is_empty());
    }

    #[test]
    fn candidates_are_sorted_by_margin() {
        let markets = vec![
            market(
                "X1-GY87-A1",
                vec![
                    listing("IRON", SupplyLevel::Abundant, 100, 90),
                    listing("COPPER", SupplyLevel::Abundant, 100, 90),
                ],
            ),
            market(
                "X1-GY87-B3",
                vec![
                    listing("IRON", SupplyLevel::Scarce, 400, 350),
                    listing("COPPER", SupplyLevel::Scarce, 900, 850),
                ],
            ),
        ];

        let candidates = plan_trades(&markets);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].good, TradeGoodSymbol("COPPER".to_string()));
        assert_eq!(candidates[0].profit_per_unit(), 750);
        assert_eq!(candidates[1].good, TradeGoodSymbol("IRON".to_string()));
    }

    #[test]
    fn a_single_market_cannot_trade_with_itself() {
        let markets = vec![market(
            "X1-GY87-A1",
            vec![listing("IRON", SupplyLevel::Moderate, 100, 500)],
        )];
        assert!(plan_trades(&markets).is_empty());
    }
}
