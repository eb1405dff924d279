use std::collections::BTreeSet;

use anyhow::Result;
use ft_domain::{JobId, JobKind, JobSpec, ShipType, System, SystemSymbol, TradeGoodSymbol, Waypoint, WaypointSymbol, WaypointType};

use crate::universe::Universe;

/// How many working ships of each kind the agent should field. Probes are
/// not counted here; every market gets one.
#[derive(Debug, Clone)]
pub struct FleetPlan {
    pub haulers: u32,
    pub construction_haulers: u32,
    pub mining_drones: u32,
    pub siphon_drones: u32,
}

/// Ores worth hauling to a market; everything else mined is slag.
const ORE_KEEP: [&str; 3] = ["IRON_ORE", "COPPER_ORE", "ALUMINUM_ORE"];

const GAS_KEEP: [&str; 2] = ["LIQUID_HYDROGEN", "LIQUID_NITROGEN"];

fn keep_list(goods: &[&str]) -> Vec<TradeGoodSymbol> {
    goods.iter().map(|g| TradeGoodSymbol(g.to_string())).collect()
}

fn nearest_market(system: &System, from: &Waypoint) -> Option<WaypointSymbol> {
    system
        .market_waypoints()
        .filter(|w| w.symbol != from.symbol)
        .min_by_key(|w| (w.distance_to(from), w.symbol.clone()))
        .map(|w| w.symbol.clone())
}

/// Derive the job list for one system from its discovered waypoints. Ids
/// are stable across runs, so persisted assignments survive restarts.
pub fn plan_jobs(system: &System, probe_selling_shipyards: &BTreeSet<WaypointSymbol>, plan: &FleetPlan) -> Vec<JobSpec> {
    let mut jobs = Vec::new();

    for waypoint in system.waypoints.iter().filter(|w| w.is_market() || w.is_shipyard()) {
        // the shipyard that restocks our probes gets its observer first,
        // otherwise the fleet can never see probe prices to grow
        let priority = if probe_selling_shipyards.contains(&waypoint.symbol) { 100 } else { 0 };
        jobs.push(JobSpec {
            id: JobId(format!("probe-{}", waypoint.symbol)),
            kind: JobKind::IdleProbe {
                waypoint: waypoint.symbol.clone(),
            },
            priority,
        });
    }

    for n in 1..=plan.haulers {
        jobs.push(JobSpec {
            id: JobId(format!("trade-{}-{}", system.symbol, n)),
            kind: JobKind::Trade {
                system: system.symbol.clone(),
            },
            priority: 50,
        });
    }

    if system.waypoints.iter().any(|w| w.is_under_construction) {
        for n in 1..=plan.construction_haulers {
            jobs.push(JobSpec {
                id: JobId(format!("construction-{}-{}", system.symbol, n)),
                kind: JobKind::SupplyConstruction {
                    system: system.symbol.clone(),
                },
                priority: 40,
            });
        }
    }

    let mining_site = system
        .waypoints
        .iter()
        .find(|w| w.waypoint_type == WaypointType::ENGINEERED_ASTEROID)
        .or_else(|| {
            system
                .waypoints
                .iter()
                .find(|w| matches!(w.waypoint_type, WaypointType::ASTEROID | WaypointType::ASTEROID_FIELD))
        });
    if let Some(site) = mining_site {
        if let Some(sell_waypoint) = nearest_market(system, site) {
            for n in 1..=plan.mining_drones {
                jobs.push(JobSpec {
                    id: JobId(format!("extract-{}-{}", site.symbol, n)),
                    kind: JobKind::ExtractOres {
                        extraction_waypoint: site.symbol.clone(),
                        sell_waypoint: sell_waypoint.clone(),
                        keep: keep_list(&ORE_KEEP),
                    },
                    priority: 30,
                });
            }
        }
    }

    if let Some(site) = system.waypoints.iter().find(|w| w.waypoint_type == WaypointType::GAS_GIANT) {
        if let Some(sell_waypoint) = nearest_market(system, site) {
            for n in 1..=plan.siphon_drones {
                jobs.push(JobSpec {
                    id: JobId(format!("siphon-{}-{}", site.symbol, n)),
                    kind: JobKind::SiphonGases {
                        extraction_waypoint: site.symbol.clone(),
                        sell_waypoint: sell_waypoint.clone(),
                        keep: keep_list(&GAS_KEEP),
                    },
                    priority: 30,
                });
            }
        }
    }

    jobs
}

/// Resolve which shipyards stock probes (through the fetch-once cache) and
/// derive the system's jobs.
pub async fn desired_jobs(universe: &Universe, system_symbol: &SystemSymbol, plan: &FleetPlan) -> Result<Vec<JobSpec>> {
    let system = universe.get_system(system_symbol).await?;

    let mut probe_sellers = BTreeSet::new();
    for waypoint in system.waypoints.iter().filter(|w| w.is_shipyard()) {
        let shipyard = universe.get_remote_shipyard(&waypoint.symbol).await?;
        if shipyard.sells(&ShipType::SHIP_PROBE) {
            probe_sellers.insert(waypoint.symbol.clone());
        }
    }

    Ok(plan_jobs(&system, &probe_sellers, plan))
}
