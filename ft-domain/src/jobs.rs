use std::collections::BTreeSet;

use anyhow::anyhow;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::model::{
    Ship, ShipEngineSymbol, ShipFrameSymbol, ShipMountSymbol, ShipSymbol, ShipType, SystemSymbol, TradeGoodSymbol,
    WaypointSymbol,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The work a ship can be told to do, declaratively. The scheduler turns
/// these into running tasks; the job itself carries everything the task
/// needs to start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JobKind {
    /// Park a probe at a waypoint and refresh its market forever.
    IdleProbe { waypoint: WaypointSymbol },
    /// Run arbitrage trades within a system.
    Trade { system: SystemSymbol },
    /// Buy construction materials and deliver them to the system's jump gate.
    SupplyConstruction { system: SystemSymbol },
    /// Mine at a waypoint and sell the yield, jettisoning everything not
    /// on the keep list.
    ExtractOres {
        extraction_waypoint: WaypointSymbol,
        sell_waypoint: WaypointSymbol,
        keep: Vec<TradeGoodSymbol>,
    },
    /// Siphon gas at a waypoint and sell the yield.
    SiphonGases {
        extraction_waypoint: WaypointSymbol,
        sell_waypoint: WaypointSymbol,
        keep: Vec<TradeGoodSymbol>,
    },
}

impl JobKind {
    /// The system the job operates in.
    pub fn system(&self) -> SystemSymbol {
        match self {
            JobKind::IdleProbe { waypoint } => waypoint.system_symbol(),
            JobKind::Trade { system } => system.clone(),
            JobKind::SupplyConstruction { system } => system.clone(),
            JobKind::ExtractOres { extraction_waypoint, .. } => extraction_waypoint.system_symbol(),
            JobKind::SiphonGases { extraction_waypoint, .. } => extraction_waypoint.system_symbol(),
        }
    }

    pub fn required_class(&self) -> ShipClass {
        match self {
            JobKind::IdleProbe { .. } => ShipClass::Probe,
            JobKind::Trade { .. } => ShipClass::LightHauler,
            JobKind::SupplyConstruction { .. } => ShipClass::LightHauler,
            JobKind::ExtractOres { .. } => ShipClass::MiningDrone,
            JobKind::SiphonGases { .. } => ShipClass::SiphonDrone,
        }
    }
}

/// A job as configured, before any ship is attached to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub id: JobId,
    pub kind: JobKind,
    /// Higher priority jobs get ships first.
    pub priority: u32,
}

/// Persisted assignment state for one job. The spec is stored alongside the
/// assignment so a rename or removal in the configuration makes the stale
/// status detectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub spec: JobSpec,
    pub ship: Option<ShipSymbol>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
pub enum ShipClass {
    Probe,
    LightHauler,
    CommandFrigate,
    MiningDrone,
    SiphonDrone,
}

impl ShipClass {
    /// What to ask a shipyard for when the fleet is short of this class.
    pub fn ship_type(&self) -> ShipType {
        match self {
            ShipClass::Probe => ShipType::SHIP_PROBE,
            ShipClass::LightHauler => ShipType::SHIP_LIGHT_HAULER,
            ShipClass::CommandFrigate => ShipType::SHIP_COMMAND_FRIGATE,
            ShipClass::MiningDrone => ShipType::SHIP_MINING_DRONE,
            ShipClass::SiphonDrone => ShipType::SHIP_SIPHON_DRONE,
        }
    }
}

/// The hull configuration that identifies a ship class. The API reports
/// neither the type a ship was bought as nor a class, so we recognize ships
/// by frame, engine and mount set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct HullSignature {
    pub frame: ShipFrameSymbol,
    pub engine: ShipEngineSymbol,
    pub mounts: BTreeSet<ShipMountSymbol>,
}

impl HullSignature {
    pub fn of(ship: &Ship) -> Self {
        HullSignature {
            frame: ship.frame.symbol.clone(),
            engine: ship.engine.symbol.clone(),
            mounts: ship.mounts.iter().map(|m| m.symbol.clone()).collect(),
        }
    }
}

lazy_static! {
    static ref HULL_REGISTRY: Vec<(HullSignature, ShipClass)> = vec![
        (
            HullSignature {
                frame: ShipFrameSymbol::FRAME_PROBE,
                engine: ShipEngineSymbol::ENGINE_IMPULSE_DRIVE_I,
                mounts: BTreeSet::new(),
            },
            ShipClass::Probe,
        ),
        (
            HullSignature {
                frame: ShipFrameSymbol::FRAME_LIGHT_FREIGHTER,
                engine: ShipEngineSymbol::ENGINE_ION_DRIVE_I,
                mounts: BTreeSet::from([ShipMountSymbol::MOUNT_TURRET_I]),
            },
            ShipClass::LightHauler,
        ),
        (
            HullSignature {
                frame: ShipFrameSymbol::FRAME_FRIGATE,
                engine: ShipEngineSymbol::ENGINE_ION_DRIVE_II,
                mounts: BTreeSet::from([
                    ShipMountSymbol::MOUNT_SENSOR_ARRAY_II,
                    ShipMountSymbol::MOUNT_GAS_SIPHON_II,
                    ShipMountSymbol::MOUNT_MINING_LASER_II,
                    ShipMountSymbol::MOUNT_SURVEYOR_II,
                ]),
            },
            ShipClass::CommandFrigate,
        ),
        (
            HullSignature {
                frame: ShipFrameSymbol::FRAME_DRONE,
                engine: ShipEngineSymbol::ENGINE_IMPULSE_DRIVE_I,
                mounts: BTreeSet::from([ShipMountSymbol::MOUNT_MINING_LASER_I]),
            },
            ShipClass::MiningDrone,
        ),
        (
            HullSignature {
                frame: ShipFrameSymbol::FRAME_DRONE,
                engine: ShipEngineSymbol::ENGINE_IMPULSE_DRIVE_I,
                mounts: BTreeSet::from([ShipMountSymbol::MOUNT_GAS_SIPHON_I]),
            },
            ShipClass::SiphonDrone,
        ),
    ];
}

/// Classify an owned ship by its hull. An unrecognized hull is an error;
/// assigning such a ship work it cannot do would fail in confusing ways
/// much later.
pub fn classify_ship(ship: &Ship) -> anyhow::Result<ShipClass> {
    let signature = HullSignature::of(ship);
    HULL_REGISTRY
        .iter()
        .find(|(known, _)| known == &signature)
        .map(|(_, class)| *class)
        .ok_or_else(|| anyhow!("unrecognized hull for ship {}: {:?}", ship.symbol, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::Utc;

    pub fn test_ship(symbol: &str, frame: ShipFrameSymbol, engine: ShipEngineSymbol, mounts: Vec<ShipMountSymbol>) -> Ship {
        let waypoint = WaypointSymbol("X1-GY87-A1".to_string());
        Ship {
            symbol: ShipSymbol(symbol.to_string()),
            registration: ShipRegistration {
                name: symbol.to_string(),
                faction_symbol: "COSMIC".to_string(),
                role: "COMMAND".to_string(),
            },
            nav: Nav {
                system_symbol: waypoint.system_symbol(),
                waypoint_symbol: waypoint.clone(),
                route: NavRoute {
                    origin: RouteEndpoint { symbol: waypoint.clone(), x: 0, y: 0 },
                    destination: RouteEndpoint { symbol: waypoint.clone(), x: 0, y: 0 },
                    departure_time: Utc::now(),
                    arrival: Utc::now(),
                },
                status: NavStatus::Docked,
                flight_mode: FlightMode::Cruise,
            },
            fuel: Fuel { current: 400, capacity: 400 },
            cargo: Cargo { capacity: 40, units: 0, inventory: vec![] },
            cooldown: Cooldown { total_seconds: 0, remaining_seconds: 0, expiration: None },
            frame: Frame { symbol: frame },
            engine: Engine { symbol: engine, speed: 30 },
            mounts: mounts.into_iter().map(|symbol| Mount { symbol }).collect(),
        }
    }

    #[test]
    fn drones_are_told_apart_by_their_mounts() {
        let miner = test_ship(
            "AGENT-3",
            ShipFrameSymbol::FRAME_DRONE,
            ShipEngineSymbol::ENGINE_IMPULSE_DRIVE_I,
            vec![ShipMountSymbol::MOUNT_MINING_LASER_I],
        );
        let siphoner = test_ship(
            "AGENT-4",
            ShipFrameSymbol::FRAME_DRONE,
            ShipEngineSymbol::ENGINE_IMPULSE_DRIVE_I,
            vec![ShipMountSymbol::MOUNT_GAS_SIPHON_I],
        );
        assert_eq!(classify_ship(&miner).unwrap(), ShipClass::MiningDrone);
        assert_eq!(classify_ship(&siphoner).unwrap(), ShipClass::SiphonDrone);
    }

    #[test]
    fn unknown_hulls_are_an_error() {
        let odd = test_ship(
            "AGENT-9",
            ShipFrameSymbol::FRAME_EXPLORER,
            ShipEngineSymbol::ENGINE_HYPER_DRIVE_I,
            vec![],
        );
        assert!(classify_ship(&odd).is_err());
    }

    #[test]
    fn mount_order_does_not_change_the_signature() {
        let a = test_ship(
            "AGENT-1",
            ShipFrameSymbol::FRAME_FRIGATE,
            ShipEngineSymbol::ENGINE_ION_DRIVE_II,
            vec![
                ShipMountSymbol::MOUNT_SENSOR_ARRAY_II,
                ShipMountSymbol::MOUNT_GAS_SIPHON_II,
                ShipMountSymbol::MOUNT_MINING_LASER_II,
                ShipMountSymbol::MOUNT_SURVEYOR_II,
            ],
        );
        let b = test_ship(
            "AGENT-2",
            ShipFrameSymbol::FRAME_FRIGATE,
            ShipEngineSymbol::ENGINE_ION_DRIVE_II,
            vec![
                ShipMountSymbol::MOUNT_SURVEYOR_II,
                ShipMountSymbol::MOUNT_MINING_LASER_II,
                ShipMountSymbol::MOUNT_GAS_SIPHON_II,
                ShipMountSymbol::MOUNT_SENSOR_ARRAY_II,
            ],
        );
        assert_eq!(HullSignature::of(&a), HullSignature::of(&b));
        assert_eq!(classify_ship(&a).unwrap(), ShipClass::CommandFrigate);
        assert_eq!(classify_ship(&b).unwrap(), ShipClass::CommandFrigate);
    }
}
