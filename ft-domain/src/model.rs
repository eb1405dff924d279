use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    pub total: u32,
    pub page: u32,
    pub limit: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AgentSymbol(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct SystemSymbol(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct WaypointSymbol(pub String);

impl WaypointSymbol {
    /// `X1-GY87-A1` belongs to system `X1-GY87`. A symbol with fewer than
    /// two dashes maps to itself.
    pub fn system_symbol(&self) -> SystemSymbol {
        match self.0.match_indices('-').nth(1) {
            Some((idx, _)) => SystemSymbol(self.0[..idx].to_string()),
            None => SystemSymbol(self.0.clone()),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ShipSymbol(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TradeGoodSymbol(pub String);

impl std::fmt::Display for AgentSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TradeGoodSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ShipSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for WaypointSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for SystemSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn distance_between(from_x: i64, from_y: i64, to_x: i64, to_y: i64) -> u32 {
    let dx = (to_x - from_x) as f64;
    let dy = (to_y - from_y) as f64;
    // the remote service rounds distances and charges at least one fuel
    ((dx * dx + dy * dy).sqrt().round() as u32).max(1)
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum WaypointTraitSymbol {
    MARKETPLACE,
    SHIPYARD,
    UNCHARTED,
    STRIPPED,
    #[serde(untagged)]
    Other(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaypointTrait {
    pub symbol: WaypointTraitSymbol,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum WaypointType {
    PLANET,
    GAS_GIANT,
    MOON,
    ORBITAL_STATION,
    JUMP_GATE,
    ASTEROID_FIELD,
    ASTEROID,
    ENGINEERED_ASTEROID,
    ASTEROID_BASE,
    NEBULA,
    DEBRIS_FIELD,
    GRAVITY_WELL,
    ARTIFICIAL_GRAVITY_WELL,
    FUEL_STATION,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub symbol: WaypointSymbol,
    #[serde(rename = "type")]
    pub waypoint_type: WaypointType,
    pub system_symbol: SystemSymbol,
    pub x: i64,
    pub y: i64,
    pub traits: Vec<WaypointTrait>,
    #[serde(default)]
    pub is_under_construction: bool,
}

impl Waypoint {
    pub fn has_trait(&self, symbol: &WaypointTraitSymbol) -> bool {
        self.traits.iter().any(|t| &t.symbol == symbol)
    }

    pub fn is_market(&self) -> bool {
        self.has_trait(&WaypointTraitSymbol::MARKETPLACE)
    }

    pub fn is_shipyard(&self) -> bool {
        self.has_trait(&WaypointTraitSymbol::SHIPYARD)
    }

    pub fn distance_to(&self, other: &Waypoint) -> u32 {
        distance_between(self.x, self.y, other.x, other.y)
    }
}

/// Entry of the global systems listing. Waypoints here are stubs without
/// traits; the full waypoints are hydrated once per system and the count is
/// asserted against this listing.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemListingEntry {
    pub symbol: SystemSymbol,
    #[serde(rename = "type")]
    pub system_type: String,
    pub x: i64,
    pub y: i64,
    pub waypoints: Vec<SystemListingWaypoint>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemListingWaypoint {
    pub symbol: WaypointSymbol,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    pub x: i64,
    pub y: i64,
}

/// A system with fully hydrated waypoints.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub symbol: SystemSymbol,
    pub x: i64,
    pub y: i64,
    pub waypoints: Vec<Waypoint>,
}

impl System {
    pub fn waypoint(&self, symbol: &WaypointSymbol) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| &w.symbol == symbol)
    }

    pub fn market_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter().filter(|w| w.is_market())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash, Display, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeGoodType {
    Export,
    Import,
    Exchange,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Display, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyLevel {
    Scarce,
    Limited,
    Moderate,
    High,
    Abundant,
}

impl SupplyLevel {
    /// Ordinal rank, SCARCE = 1 .. ABUNDANT = 5.
    pub fn rank(&self) -> u8 {
        match self {
            SupplyLevel::Scarce => 1,
            SupplyLevel::Limited => 2,
            SupplyLevel::Moderate => 3,
            SupplyLevel::High => 4,
            SupplyLevel::Abundant => 5,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Display, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    Weak,
    Growing,
    Strong,
    Restricted,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketTradeGood {
    pub symbol: TradeGoodSymbol,
    #[serde(rename = "type")]
    pub trade_good_type: TradeGoodType,
    pub trade_volume: i32,
    pub supply: SupplyLevel,
    pub activity: Option<ActivityLevel>,
    pub purchase_price: i32,
    pub sell_price: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeGoodListing {
    pub symbol: TradeGoodSymbol,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub symbol: WaypointSymbol,
    pub exports: Vec<TradeGoodListing>,
    pub imports: Vec<TradeGoodListing>,
    pub exchange: Vec<TradeGoodListing>,
    /// Only present when a ship of ours is at the waypoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_goods: Option<Vec<MarketTradeGood>>,
    /// Stamped locally on save; not part of the wire format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl MarketData {
    pub fn trade_good(&self, symbol: &TradeGoodSymbol) -> Option<&MarketTradeGood> {
        self.trade_goods
            .as_deref()
            .and_then(|goods| goods.iter().find(|g| &g.symbol == symbol))
    }

    pub fn trades(&self, symbol: &TradeGoodSymbol) -> bool {
        self.exports
            .iter()
            .chain(self.imports.iter())
            .chain(self.exchange.iter())
            .any(|g| &g.symbol == symbol)
    }

    pub fn has_detailed_price_information(&self) -> bool {
        self.trade_goods.is_some()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum ShipType {
    SHIP_PROBE,
    SHIP_MINING_DRONE,
    SHIP_SIPHON_DRONE,
    SHIP_LIGHT_HAULER,
    SHIP_COMMAND_FRIGATE,
    SHIP_LIGHT_SHUTTLE,
    SHIP_SURVEYOR,
    SHIP_REFINING_FREIGHTER,
    SHIP_HEAVY_FREIGHTER,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipyardShipListing {
    #[serde(rename = "type")]
    pub ship_type: ShipType,
    pub purchase_price: i64,
    pub supply: Option<SupplyLevel>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipTypeEntry {
    #[serde(rename = "type")]
    pub ship_type: ShipType,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shipyard {
    pub symbol: WaypointSymbol,
    pub ship_types: Vec<ShipTypeEntry>,
    /// Only present when a ship of ours is at the waypoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ships: Option<Vec<ShipyardShipListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl Shipyard {
    pub fn sells(&self, ship_type: &ShipType) -> bool {
        self.ship_types.iter().any(|t| &t.ship_type == ship_type)
    }

    pub fn listed_price(&self, ship_type: &ShipType) -> Option<i64> {
        self.ships
            .as_deref()
            .and_then(|ships| ships.iter().find(|s| &s.ship_type == ship_type))
            .map(|s| s.purchase_price)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionMaterial {
    pub trade_symbol: TradeGoodSymbol,
    pub required: u32,
    pub fulfilled: u32,
}

impl ConstructionMaterial {
    pub fn remaining(&self) -> u32 {
        self.required.saturating_sub(self.fulfilled)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Construction {
    pub symbol: WaypointSymbol,
    pub materials: Vec<ConstructionMaterial>,
    pub is_complete: bool,
}

impl Construction {
    pub fn material(&self, symbol: &TradeGoodSymbol) -> Option<&ConstructionMaterial> {
        self.materials.iter().find(|m| &m.trade_symbol == symbol)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Display, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightMode {
    Drift,
    Stealth,
    Cruise,
    Burn,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, Display, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavStatus {
    Docked,
    InOrbit,
    InTransit,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteEndpoint {
    pub symbol: WaypointSymbol,
    pub x: i64,
    pub y: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavRoute {
    pub origin: RouteEndpoint,
    pub destination: RouteEndpoint,
    pub departure_time: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nav {
    pub system_symbol: SystemSymbol,
    pub waypoint_symbol: WaypointSymbol,
    pub route: NavRoute,
    pub status: NavStatus,
    pub flight_mode: FlightMode,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fuel {
    pub current: u32,
    pub capacity: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CargoItem {
    pub symbol: TradeGoodSymbol,
    pub units: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cargo {
    pub capacity: u32,
    pub units: u32,
    pub inventory: Vec<CargoItem>,
}

impl Cargo {
    pub fn units_of(&self, symbol: &TradeGoodSymbol) -> u32 {
        self.inventory
            .iter()
            .find(|item| &item.symbol == symbol)
            .map(|item| item.units)
            .unwrap_or(0)
    }

    pub fn space_left(&self) -> u32 {
        self.capacity.saturating_sub(self.units)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cooldown {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum ShipFrameSymbol {
    FRAME_PROBE,
    FRAME_DRONE,
    FRAME_FRIGATE,
    FRAME_SHUTTLE,
    FRAME_MINER,
    FRAME_LIGHT_FREIGHTER,
    FRAME_HEAVY_FREIGHTER,
    FRAME_TRANSPORT,
    FRAME_EXPLORER,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub symbol: ShipFrameSymbol,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum ShipEngineSymbol {
    ENGINE_IMPULSE_DRIVE_I,
    ENGINE_ION_DRIVE_I,
    ENGINE_ION_DRIVE_II,
    ENGINE_HYPER_DRIVE_I,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Engine {
    pub symbol: ShipEngineSymbol,
    pub speed: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
#[allow(non_camel_case_types)]
pub enum ShipMountSymbol {
    MOUNT_GAS_SIPHON_I,
    MOUNT_GAS_SIPHON_II,
    MOUNT_SURVEYOR_I,
    MOUNT_SURVEYOR_II,
    MOUNT_SENSOR_ARRAY_I,
    MOUNT_SENSOR_ARRAY_II,
    MOUNT_MINING_LASER_I,
    MOUNT_MINING_LASER_II,
    MOUNT_TURRET_I,
    MOUNT_LASER_CANNON_I,
    MOUNT_MISSILE_LAUNCHER_I,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub symbol: ShipMountSymbol,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipRegistration {
    pub name: String,
    pub faction_symbol: String,
    pub role: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub symbol: ShipSymbol,
    pub registration: ShipRegistration,
    pub nav: Nav,
    pub fuel: Fuel,
    pub cargo: Cargo,
    pub cooldown: Cooldown,
    pub frame: Frame,
    pub engine: Engine,
    pub mounts: Vec<Mount>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub symbol: AgentSymbol,
    pub headquarters: WaypointSymbol,
    pub credits: i64,
    pub starting_faction: String,
    pub ship_count: Option<u32>,
}

// --- wire responses -------------------------------------------------------
//
// Every write returns the authoritative sub-state it touched; callers merge
// these verbatim into the local ship.

pub type GetMarketResponse = Data<MarketData>;
pub type GetShipyardResponse = Data<Shipyard>;
pub type GetConstructionResponse = Data<Construction>;
pub type GetAgentResponse = Data<AgentInfo>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NavOnlyBody {
    pub nav: Nav,
}

pub type DockShipResponse = Data<NavOnlyBody>;
pub type OrbitShipResponse = Data<NavOnlyBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NavAndFuelBody {
    pub nav: Nav,
    pub fuel: Fuel,
}

pub type NavigateShipResponse = Data<NavAndFuelBody>;
pub type PatchShipNavResponse = Data<Nav>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MarketTransaction {
    pub waypoint_symbol: WaypointSymbol,
    pub ship_symbol: ShipSymbol,
    pub trade_symbol: TradeGoodSymbol,
    pub units: u32,
    pub price_per_unit: i64,
    pub total_price: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TradeBody {
    pub agent: AgentInfo,
    pub cargo: Cargo,
    pub transaction: MarketTransaction,
}

pub type PurchaseCargoResponse = Data<TradeBody>;
pub type SellCargoResponse = Data<TradeBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefuelBody {
    pub agent: AgentInfo,
    pub fuel: Fuel,
    pub transaction: MarketTransaction,
}

pub type RefuelShipResponse = Data<RefuelBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub ship_symbol: ShipSymbol,
    #[serde(rename = "yield")]
    pub extraction_yield: CargoItem,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionBody {
    pub extraction: Extraction,
    pub cooldown: Cooldown,
    pub cargo: Cargo,
}

pub type ExtractResourcesResponse = Data<ExtractionBody>;
pub type SiphonResourcesResponse = Data<ExtractionBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub signature: String,
    pub symbol: WaypointSymbol,
    pub deposits: Vec<SurveyDeposit>,
    pub expiration: DateTime<Utc>,
    pub size: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDeposit {
    pub symbol: TradeGoodSymbol,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SurveyBody {
    pub surveys: Vec<Survey>,
    pub cooldown: Cooldown,
}

pub type CreateSurveyResponse = Data<SurveyBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CargoOnlyBody {
    pub cargo: Cargo,
}

pub type JettisonCargoResponse = Data<CargoOnlyBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupplyConstructionBody {
    pub construction: Construction,
    pub cargo: Cargo,
}

pub type SupplyConstructionResponse = Data<SupplyConstructionBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShipyardTransaction {
    pub ship_symbol: Option<ShipSymbol>,
    pub ship_type: Option<ShipType>,
    pub waypoint_symbol: WaypointSymbol,
    pub price: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseShipBody {
    pub agent: AgentInfo,
    pub ship: Ship,
    pub transaction: ShipyardTransaction,
}

pub type PurchaseShipResponse = Data<PurchaseShipBody>;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationBody {
    pub token: String,
    pub agent: AgentInfo,
}

pub type RegistrationResponse = Data<RegistrationBody>;

// --- request bodies --------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub faction: String,
    pub symbol: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NavigateShipRequest {
    pub waypoint_symbol: WaypointSymbol,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PatchShipNavRequest {
    pub flight_mode: FlightMode,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TradeCargoRequest {
    pub symbol: TradeGoodSymbol,
    pub units: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefuelShipRequest {
    pub units: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupplyConstructionRequest {
    pub ship_symbol: ShipSymbol,
    pub trade_symbol: TradeGoodSymbol,
    pub units: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseShipRequest {
    pub ship_type: ShipType,
    pub waypoint_symbol: WaypointSymbol,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_symbol_yields_its_system() {
        let wp = WaypointSymbol("X1-GY87-A1".to_string());
        assert_eq!(wp.system_symbol(), SystemSymbol("X1-GY87".to_string()));
    }

    #[test]
    fn short_waypoint_symbols_map_to_themselves() {
        assert_eq!(
            WaypointSymbol("X1-GY87".to_string()).system_symbol(),
            SystemSymbol("X1-GY87".to_string())
        );
        assert_eq!(WaypointSymbol("X1".to_string()).system_symbol(), SystemSymbol("X1".to_string()));
        assert_eq!(WaypointSymbol("".to_string()).system_symbol(), SystemSymbol("".to_string()));
    }

    #[test]
    fn distance_is_rounded_euclidean_with_floor_of_one() {
        assert_eq!(distance_between(0, 0, 3, 4), 5);
        assert_eq!(distance_between(0, 0, 0, 0), 1);
        assert_eq!(distance_between(-6, 25, -6, 25), 1);
    }

    #[test]
    fn supply_levels_rank_in_order() {
        assert!(SupplyLevel::Scarce.rank() < SupplyLevel::Moderate.rank());
        assert!(SupplyLevel::Moderate.rank() < SupplyLevel::Abundant.rank());
    }

    #[test]
    fn decode_market_data_without_price_details() {
        let json = r#"{"symbol":"X1-BM40-A2","imports":[{"symbol":"SHIP_PLATING"}],"exports":[],"exchange":[{"symbol":"FUEL"}]}"#;
        let market: MarketData = serde_json::from_str(json).unwrap();
        assert!(!market.has_detailed_price_information());
        assert!(market.trades(&TradeGoodSymbol("FUEL".to_string())));
        assert!(!market.trades(&TradeGoodSymbol("IRON".to_string())));
    }

    #[test]
    fn decode_market_trade_good() {
        let json = r#"{"symbol":"FAB_MATS","type":"EXPORT","tradeVolume":40,"supply":"MODERATE","activity":"STRONG","purchasePrice":3012,"sellPrice":2862}"#;
        let good: MarketTradeGood = serde_json::from_str(json).unwrap();
        assert_eq!(good.trade_good_type, TradeGoodType::Export);
        assert_eq!(good.supply, SupplyLevel::Moderate);
        assert_eq!(good.activity, Some(ActivityLevel::Strong));
        assert_eq!(good.trade_volume, 40);
    }
}
