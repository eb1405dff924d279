use serde::{Deserialize, Serialize};

use crate::model::{ActivityLevel, SupplyLevel, TradeGoodSymbol, WaypointSymbol};

/// Market conditions a mission was planned against, frozen at planning
/// time. Execution re-reads the live market and aborts when reality has
/// drifted too far from this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeStop {
    pub waypoint: WaypointSymbol,
    pub trade_volume: i32,
    pub price: i64,
    pub supply: SupplyLevel,
    pub activity: Option<ActivityLevel>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TradeMissionStatus {
    Buy,
    Sell,
    Complete,
}

/// Buy low at one market, sell high at another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeMission {
    pub good: TradeGoodSymbol,
    pub units: u32,
    pub buy: TradeStop,
    pub sell: TradeStop,
    pub status: TradeMissionStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConstructionMissionStatus {
    Buy,
    Deliver,
    Complete,
}

/// Buy a required material and deliver it to the construction site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionMission {
    pub good: TradeGoodSymbol,
    pub units: u32,
    pub buy: TradeStop,
    pub site: WaypointSymbol,
    pub status: ConstructionMissionStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionMissionStatus {
    Extract,
    Sell,
}

/// Extract (or siphon) at a resource waypoint until cargo is full, then
/// sell the haul at a market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMission {
    pub extraction_waypoint: WaypointSymbol,
    pub sell_waypoint: WaypointSymbol,
    pub status: ExtractionMissionStatus,
}

/// Durable per-ship workflow state. One document per ship; resuming a ship
/// re-reads this and picks up exactly where the last run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mission {
    Trade(TradeMission),
    Construction(ConstructionMission),
    Extraction(ExtractionMission),
}
