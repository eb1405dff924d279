use std::collections::HashMap;

use ft_domain::{FlightMode, System, Waypoint, WaypointSymbol};
use pathfinding::prelude::dijkstra;
use serde::{Deserialize, Serialize};

/// Travel time for one leg, in seconds.
///
/// <https://github.com/SpaceTradersAPI/api-docs/wiki/Travel-Fuel-and-Time>
pub fn flight_duration(distance: u32, engine_speed: u32, mode: FlightMode) -> u32 {
    let multiplier: f64 = match mode {
        FlightMode::Cruise => 25.0,
        FlightMode::Drift => 250.0,
        FlightMode::Burn => 7.5,
        FlightMode::Stealth => 30.0,
    };
    (distance as f64 * (multiplier / engine_speed as f64) + 15.0).round() as u32
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("cannot plan zero-length route at {0}")]
    ZeroLengthRoute(WaypointSymbol),
    #[error("cannot plan inter-system route from {from} to {to}")]
    DifferentSystems { from: WaypointSymbol, to: WaypointSymbol },
    #[error("waypoint {0} is not in the system")]
    UnknownWaypoint(WaypointSymbol),
    #[error("no route from {from} to {to} under the given fuel bounds")]
    NoRoute { from: WaypointSymbol, to: WaypointSymbol },
}

#[derive(Debug, Clone, Copy)]
pub struct RouteBounds {
    /// Fuel bound for legs between refuel stops.
    pub max_fuel: u32,
    pub engine_speed: u32,
    /// Fuel bound for the first leg when the origin has no market to
    /// refuel at.
    pub initial_leg_max_fuel: u32,
    /// Fuel bound for the last leg when the destination has no market, so
    /// the ship still arrives with enough in the tank to leave again.
    pub final_leg_max_fuel: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub from: WaypointSymbol,
    pub to: WaypointSymbol,
    pub flight_mode: FlightMode,
    pub distance: u32,
    pub fuel_cost: u32,
    pub duration_secs: u32,
}

fn leg(from: &Waypoint, to: &Waypoint, engine_speed: u32) -> RouteLeg {
    let distance = from.distance_to(to);
    RouteLeg {
        from: from.symbol.clone(),
        to: to.symbol.clone(),
        flight_mode: FlightMode::Cruise,
        distance,
        fuel_cost: distance,
        duration_secs: flight_duration(distance, engine_speed, FlightMode::Cruise),
    }
}

/// Plan the time-minimal route between two waypoints of one system.
///
/// Markets double as fuel stops, so intermediate hops only ever land on
/// MARKETPLACE waypoints and every leg flies CRUISE. A non-market origin or
/// destination gets synthetic edges under its own tighter fuel bound. Fuel
/// prices are not considered.
pub fn plan_route(system: &System, from: &WaypointSymbol, to: &WaypointSymbol, bounds: &RouteBounds) -> Result<Vec<RouteLeg>, RouteError> {
    if from == to {
        return Err(RouteError::ZeroLengthRoute(from.clone()));
    }
    if from.system_symbol() != to.system_symbol() {
        return Err(RouteError::DifferentSystems { from: from.clone(), to: to.clone() });
    }

    let src = system
        .waypoint(from)
        .ok_or_else(|| RouteError::UnknownWaypoint(from.clone()))?;
    let dest = system
        .waypoint(to)
        .ok_or_else(|| RouteError::UnknownWaypoint(to.clone()))?;

    let market_waypoints: Vec<&Waypoint> = system.market_waypoints().collect();

    let mut edges: HashMap<WaypointSymbol, Vec<RouteLeg>> = HashMap::new();

    for x in &market_waypoints {
        let outgoing = edges.entry(x.symbol.clone()).or_default();
        for y in &market_waypoints {
            if x.symbol == y.symbol {
                continue;
            }
            let candidate = leg(x, y, bounds.engine_speed);
            if candidate.fuel_cost <= bounds.max_fuel {
                outgoing.push(candidate);
            }
        }
    }

    if !src.is_market() {
        let outgoing = edges.entry(src.symbol.clone()).or_default();
        for x in &market_waypoints {
            let candidate = leg(src, x, bounds.engine_speed);
            if candidate.fuel_cost <= bounds.initial_leg_max_fuel {
                outgoing.push(candidate);
            }
        }
    }
    if !dest.is_market() {
        for x in &market_waypoints {
            let candidate = leg(x, dest, bounds.engine_speed);
            if candidate.fuel_cost <= bounds.final_leg_max_fuel {
                edges.entry(x.symbol.clone()).or_default().push(candidate);
            }
        }
    }
    if !src.is_market() && !dest.is_market() {
        let candidate = leg(src, dest, bounds.engine_speed);
        if candidate.fuel_cost <= bounds.initial_leg_max_fuel.min(bounds.final_leg_max_fuel) {
            edges.entry(src.symbol.clone()).or_default().push(candidate);
        }
    }

    let successors = |node: &WaypointSymbol| -> Vec<(WaypointSymbol, u32)> {
        edges
            .get(node)
            .map(|outgoing| {
                outgoing
                    .iter()
                    .map(|leg| (leg.to.clone(), leg.duration_secs))
                    .collect()
            })
            .unwrap_or_default()
    };

    let (path, _total_duration) = dijkstra(from, successors, |node| node == to).ok_or_else(|| RouteError::NoRoute {
        from: from.clone(),
        to: to.clone(),
    })?;

    let legs = path
        .windows(2)
        .map(|pair| {
            let from_wp = system
                .waypoint(&pair[0])
                .ok_or_else(|| RouteError::UnknownWaypoint(pair[0].clone()))?;
            let to_wp = system
                .waypoint(&pair[1])
                .ok_or_else(|| RouteError::UnknownWaypoint(pair[1].clone()))?;
            Ok(leg(from_wp, to_wp, bounds.engine_speed))
        })
        .collect::<Result<Vec<_>, RouteError>>()?;

    Ok(legs)
}
