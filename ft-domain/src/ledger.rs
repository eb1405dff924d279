use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{ShipSymbol, SupplyLevel, TradeGoodSymbol, WaypointSymbol};

/// One market position a ship has announced: a good at a waypoint.
///
/// Serialized as `"{waypoint}/{good}"` so ledger documents stay readable
/// and diffable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct FlowKey {
    pub waypoint: WaypointSymbol,
    pub good: TradeGoodSymbol,
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.waypoint.0, self.good.0)
    }
}

impl FromStr for FlowKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (waypoint, good) = s
            .rsplit_once('/')
            .ok_or_else(|| format!("invalid flow key: {s}"))?;
        Ok(FlowKey {
            waypoint: WaypointSymbol(waypoint.to_string()),
            good: TradeGoodSymbol(good.to_string()),
        })
    }
}

impl Serialize for FlowKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlowKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// How many units the fleet is willing to buy at a market without moving
/// the price against itself. `None` means the supply level rules the good
/// out as a purchase altogether.
pub fn target_buy_flow(supply: SupplyLevel, trade_volume: i32) -> Option<i64> {
    let factor = match supply {
        SupplyLevel::Abundant => 3,
        SupplyLevel::High => 2,
        SupplyLevel::Moderate => 1,
        SupplyLevel::Limited | SupplyLevel::Scarce => return None,
    };
    Some(factor * trade_volume as i64)
}

/// Mirror of [`target_buy_flow`] for the sell side.
pub fn target_sell_flow(supply: SupplyLevel, trade_volume: i32) -> Option<i64> {
    let factor = match supply {
        SupplyLevel::Scarce => 3,
        SupplyLevel::Limited => 2,
        SupplyLevel::Moderate => 1,
        SupplyLevel::High | SupplyLevel::Abundant => return None,
    };
    Some(factor * trade_volume as i64)
}

/// Advisory record of in-flight trades for one system.
///
/// Every ship that commits to a trade writes its intended flows here before
/// departing, so sibling ships planning against the same cached markets
/// don't all pile onto the same opportunity. Negative quantities are
/// planned purchases, positive quantities planned sales.
///
/// The ledger is advisory only. Checks and reservations are not atomic
/// across ships; a stale reservation costs margin, never correctness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemLedger {
    #[serde(default)]
    pub flows: HashMap<ShipSymbol, BTreeMap<FlowKey, i64>>,
}

impl SystemLedger {
    /// Sum of the flow for `key` across all ships.
    pub fn total_flow(&self, key: &FlowKey) -> i64 {
        self.flows
            .values()
            .filter_map(|per_ship| per_ship.get(key))
            .sum()
    }

    /// Whether another purchase of `quantity` units fits under the target
    /// buy flow for the market's current supply.
    pub fn accepts_purchase(&self, key: &FlowKey, quantity: i64, supply: SupplyLevel, trade_volume: i32) -> bool {
        match target_buy_flow(supply, trade_volume) {
            Some(target) => self.total_flow(key) - quantity >= -target,
            None => false,
        }
    }

    /// Whether another sale of `quantity` units fits under the target sell
    /// flow for the market's current supply.
    pub fn accepts_sale(&self, key: &FlowKey, quantity: i64, supply: SupplyLevel, trade_volume: i32) -> bool {
        match target_sell_flow(supply, trade_volume) {
            Some(target) => self.total_flow(key) + quantity <= target,
            None => false,
        }
    }

    /// Replace a ship's announced flows.
    pub fn reserve(&mut self, ship: &ShipSymbol, flows: BTreeMap<FlowKey, i64>) {
        self.flows.insert(ship.clone(), flows);
    }

    /// Drop a single key from a ship's reservation, e.g. the buy side once
    /// the cargo is aboard.
    pub fn release_key(&mut self, ship: &ShipSymbol, key: &FlowKey) {
        if let Some(per_ship) = self.flows.get_mut(ship) {
            per_ship.remove(key);
        }
    }

    /// Drop everything the ship had announced.
    pub fn clear(&mut self, ship: &ShipSymbol) {
        self.flows.remove(ship);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(waypoint: &str, good: &str) -> FlowKey {
        FlowKey {
            waypoint: WaypointSymbol(waypoint.to_string()),
            good: TradeGoodSymbol(good.to_string()),
        }
    }

    fn ship(symbol: &str) -> ShipSymbol {
        ShipSymbol(symbol.to_string())
    }

    #[test]
    fn flow_key_round_trips_through_its_string_form() {
        let k = key("X1-GY87-A1", "FAB_MATS");
        let parsed: FlowKey = k.to_string().parse().unwrap();
        assert_eq!(parsed, k);
    }

    #[test]
    fn buy_targets_scale_with_supply() {
        assert_eq!(target_buy_flow(SupplyLevel::Abundant, 40), Some(120));
        assert_eq!(target_buy_flow(SupplyLevel::High, 40), Some(80));
        assert_eq!(target_buy_flow(SupplyLevel::Moderate, 40), Some(40));
        assert_eq!(target_buy_flow(SupplyLevel::Limited, 40), None);
        assert_eq!(target_buy_flow(SupplyLevel::Scarce, 40), None);
    }

    #[test]
    fn sell_targets_scale_with_scarcity() {
        assert_eq!(target_sell_flow(SupplyLevel::Scarce, 10), Some(30));
        assert_eq!(target_sell_flow(SupplyLevel::Limited, 10), Some(20));
        assert_eq!(target_sell_flow(SupplyLevel::Moderate, 10), Some(10));
        assert_eq!(target_sell_flow(SupplyLevel::High, 10), None);
        assert_eq!(target_sell_flow(SupplyLevel::Abundant, 10), None);
    }

    #[test]
    fn concurrent_reservations_saturate_the_buy_target() {
        let mut ledger = SystemLedger::default();
        let k = key("X1-GY87-A1", "FAB_MATS");

        // MODERATE at trade volume 40 allows 40 units of planned purchases
        assert!(ledger.accepts_purchase(&k, 40, SupplyLevel::Moderate, 40));

        ledger.reserve(&ship("AGENT-1"), BTreeMap::from([(k.clone(), -40)]));
        assert!(!ledger.accepts_purchase(&k, 1, SupplyLevel::Moderate, 40));

        // a second ship fits again once the first releases its buy side
        ledger.release_key(&ship("AGENT-1"), &k);
        assert!(ledger.accepts_purchase(&k, 40, SupplyLevel::Moderate, 40));
    }

    #[test]
    fn sell_side_counts_flows_from_all_ships() {
        let mut ledger = SystemLedger::default();
        let k = key("X1-GY87-B3", "FAB_MATS");

        ledger.reserve(&ship("AGENT-1"), BTreeMap::from([(k.clone(), 20)]));
        ledger.reserve(&ship("AGENT-2"), BTreeMap::from([(k.clone(), 20)]));

        // SCARCE at trade volume 20 allows 60 planned sale units in total
        assert!(ledger.accepts_sale(&k, 20, SupplyLevel::Scarce, 20));
        assert!(!ledger.accepts_sale(&k, 21, SupplyLevel::Scarce, 20));
    }

    #[test]
    fn clearing_a_ship_releases_everything_it_held() {
        let mut ledger = SystemLedger::default();
        let buy = key("X1-GY87-A1", "IRON");
        let sell = key("X1-GY87-B3", "IRON");
        ledger.reserve(&ship("AGENT-1"), BTreeMap::from([(buy.clone(), -30), (sell.clone(), 30)]));

        ledger.clear(&ship("AGENT-1"));
        assert_eq!(ledger.total_flow(&buy), 0);
        assert_eq!(ledger.total_flow(&sell), 0);
    }

    #[test]
    fn ledger_document_round_trips_as_json() {
        let mut ledger = SystemLedger::default();
        ledger.reserve(
            &ship("AGENT-1"),
            BTreeMap::from([(key("X1-GY87-A1", "FAB_MATS"), -40), (key("X1-GY87-B3", "FAB_MATS"), 40)]),
        );
        let json = serde_json::to_string_pretty(&ledger).unwrap();
        let decoded: SystemLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ledger);
    }
}
