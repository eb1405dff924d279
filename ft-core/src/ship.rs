use std::ops::Deref;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use ft_domain::{
    AgentInfo, Construction, ExtractionBody, FlightMode, MarketData, NavStatus, Ship, Shipyard, Survey, SurveyBody,
    TradeGoodSymbol, WaypointSymbol,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api_client::{ApiClientTrait, ApiErrorBody, ERROR_SURVEY_EXPIRED};
use crate::pathfinder::{plan_route, RouteBounds};
use crate::universe::Universe;

/// Refuel in blocks of this size; fuel is sold by the hundred.
const REFUEL_BLOCK: u32 = 100;

/// Don't bother refueling while less than this much is missing.
const DEFAULT_MAX_FUEL_MISSING: u32 = 100;

/// Plan routes so a ship arrives at a non-market destination with at least
/// this much fuel left to get back out.
const ARRIVAL_FUEL_RESERVE: u32 = 100;

/// Outcome of an extraction against a survey. An exhausted or expired
/// survey is part of normal operation and gets its own variant instead of
/// an error.
#[derive(Debug)]
pub enum SurveyExtractionOutcome {
    Extracted(ExtractionBody),
    SurveyExpired,
}

/// A ship plus the api calls that operate it.
///
/// Local state is authoritative between calls: every write merges the
/// nav/fuel/cargo/cooldown/agent sub-states the api returns, so the proxy
/// never needs to re-fetch the ship. Most operations are idempotent and
/// wait out transit themselves, which is what lets resumed missions replay
/// their current step safely.
#[derive(Debug)]
pub struct ShipOperations {
    ship: Ship,
    api: Arc<dyn ApiClientTrait>,
    agent: Arc<Mutex<AgentInfo>>,
}

impl Deref for ShipOperations {
    type Target = Ship;

    fn deref(&self) -> &Self::Target {
        &self.ship
    }
}

impl ShipOperations {
    pub fn new(api: Arc<dyn ApiClientTrait>, agent: Arc<Mutex<AgentInfo>>, ship: Ship) -> Self {
        ShipOperations { ship, api, agent }
    }

    pub fn ship(&self) -> &Ship {
        &self.ship
    }

    pub async fn credits(&self) -> i64 {
        self.agent.lock().await.credits
    }

    /// Sleep until the current transit (if any) has arrived, plus a second
    /// of slack for server clock skew.
    pub async fn wait_for_transit(&self) {
        let arrival = self.ship.nav.route.arrival;
        let wait = arrival - Utc::now() + chrono::Duration::seconds(1);
        if let Ok(wait) = wait.to_std() {
            debug!(ship = %self.ship.symbol, "waiting {}s for navigation", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    /// Sleep until the current cooldown has elapsed.
    pub async fn wait_for_cooldown(&self) {
        let wait = match self.ship.cooldown.expiration {
            Some(expiration) => (expiration - Utc::now()).to_std().ok(),
            None if self.ship.cooldown.remaining_seconds > 0 => {
                Some(std::time::Duration::from_secs(self.ship.cooldown.remaining_seconds as u64))
            }
            None => None,
        };
        if let Some(wait) = wait {
            debug!(ship = %self.ship.symbol, "waiting {}s for cooldown", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn dock(&mut self) -> Result<()> {
        if self.ship.nav.status == NavStatus::Docked {
            return Ok(());
        }
        debug!(ship = %self.ship.symbol, "docking");
        let resp = self.api.dock_ship(&self.ship.symbol).await?;
        self.ship.nav = resp.data.nav;
        Ok(())
    }

    pub async fn orbit(&mut self) -> Result<()> {
        if self.ship.nav.status == NavStatus::InOrbit {
            return Ok(());
        }
        debug!(ship = %self.ship.symbol, "moving to orbit");
        let resp = self.api.orbit_ship(&self.ship.symbol).await?;
        self.ship.nav = resp.data.nav;
        Ok(())
    }

    pub async fn set_flight_mode(&mut self, mode: FlightMode) -> Result<()> {
        if self.ship.nav.flight_mode == mode {
            return Ok(());
        }
        debug!(ship = %self.ship.symbol, "setting flight mode to {}", mode);
        let resp = self.api.set_flight_mode(&self.ship.symbol, &mode).await?;
        self.ship.nav = resp.data;
        Ok(())
    }

    /// Fly directly to a waypoint in the current system. No routing, no
    /// refueling; `goto` is the high-level entry point.
    pub async fn navigate(&mut self, to: &WaypointSymbol) -> Result<()> {
        self.wait_for_transit().await;
        if &self.ship.nav.waypoint_symbol == to {
            return Ok(());
        }
        self.orbit().await?;
        info!(ship = %self.ship.symbol, "navigating to {}", to);
        let resp = self.api.navigate(&self.ship.symbol, to).await?;
        self.ship.nav = resp.data.nav;
        self.ship.fuel = resp.data.fuel;
        self.wait_for_transit().await;
        Ok(())
    }

    /// Travel to any waypoint in the current system, hopping between
    /// markets to refuel as needed.
    pub async fn goto(&mut self, universe: &Universe, to: &WaypointSymbol) -> Result<()> {
        self.wait_for_transit().await;
        if &self.ship.nav.waypoint_symbol == to {
            return Ok(());
        }

        // probes have no tank and travel on solar power
        if self.ship.fuel.capacity == 0 {
            return self.navigate(to).await;
        }

        let system = universe.get_system(&self.ship.nav.system_symbol).await?;
        let bounds = RouteBounds {
            max_fuel: self.ship.fuel.capacity,
            engine_speed: self.ship.engine.speed,
            initial_leg_max_fuel: self.ship.fuel.current,
            final_leg_max_fuel: self.ship.fuel.capacity.saturating_sub(ARRIVAL_FUEL_RESERVE),
        };
        let route = plan_route(&system, &self.ship.nav.waypoint_symbol, to, &bounds)?;
        info!(ship = %self.ship.symbol, "routing to {} in {} legs", to, route.len());

        for leg in route {
            let at_market = system
                .waypoint(&self.ship.nav.waypoint_symbol)
                .map(|w| w.is_market())
                .unwrap_or(false);
            if at_market {
                // the tank must at least cover the upcoming leg
                let max_missing = DEFAULT_MAX_FUEL_MISSING.min(self.ship.fuel.capacity.saturating_sub(leg.fuel_cost));
                self.refuel(max_missing).await?;
            }
            self.set_flight_mode(leg.flight_mode).await?;
            self.navigate(&leg.to).await?;
        }
        Ok(())
    }

    /// Top the tank back up in 100-unit blocks. Does nothing while less
    /// than `max_fuel_missing` is missing.
    pub async fn refuel(&mut self, max_fuel_missing: u32) -> Result<()> {
        self.wait_for_transit().await;
        let target = self.ship.fuel.capacity.saturating_sub(max_fuel_missing);
        let missing = target.saturating_sub(self.ship.fuel.current);
        let units = missing.div_ceil(REFUEL_BLOCK) * REFUEL_BLOCK;
        if units == 0 {
            return Ok(());
        }
        self.dock().await?;
        info!(ship = %self.ship.symbol, "refueling {} units", units);
        let resp = self.api.refuel(&self.ship.symbol, units).await?;
        self.ship.fuel = resp.data.fuel;
        *self.agent.lock().await = resp.data.agent;
        Ok(())
    }

    /// Fetch the detailed market at the current waypoint. Requires being
    /// on site, otherwise the api omits the price table.
    pub async fn refresh_market(&self) -> Result<MarketData> {
        self.wait_for_transit().await;
        let waypoint_symbol = &self.ship.nav.waypoint_symbol;
        debug!(ship = %self.ship.symbol, "refreshing market at {}", waypoint_symbol);
        let market = self.api.get_marketplace(waypoint_symbol).await?.data;
        if !market.has_detailed_price_information() {
            bail!("no trade goods while fetching market at {}", waypoint_symbol);
        }
        Ok(market)
    }

    pub async fn refresh_shipyard(&self) -> Result<Shipyard> {
        self.wait_for_transit().await;
        let waypoint_symbol = &self.ship.nav.waypoint_symbol;
        debug!(ship = %self.ship.symbol, "refreshing shipyard at {}", waypoint_symbol);
        let shipyard = self.api.get_shipyard(waypoint_symbol).await?.data;
        if shipyard.ships.is_none() {
            bail!("no ship listings while fetching shipyard at {}", waypoint_symbol);
        }
        Ok(shipyard)
    }

    pub async fn buy_good(&mut self, good: &TradeGoodSymbol, units: u32) -> Result<()> {
        self.wait_for_transit().await;
        self.dock().await?;
        let resp = self.api.purchase_cargo(&self.ship.symbol, good, units).await?;
        self.ship.cargo = resp.data.cargo;
        info!(
            ship = %self.ship.symbol,
            "bought {} {} for {}", resp.data.transaction.units, resp.data.transaction.trade_symbol, resp.data.transaction.total_price
        );
        *self.agent.lock().await = resp.data.agent;
        Ok(())
    }

    pub async fn sell_good(&mut self, good: &TradeGoodSymbol, units: u32) -> Result<()> {
        self.wait_for_transit().await;
        self.dock().await?;
        let resp = self.api.sell_cargo(&self.ship.symbol, good, units).await?;
        self.ship.cargo = resp.data.cargo;
        info!(
            ship = %self.ship.symbol,
            "sold {} {} for {}", resp.data.transaction.units, resp.data.transaction.trade_symbol, resp.data.transaction.total_price
        );
        *self.agent.lock().await = resp.data.agent;
        Ok(())
    }

    pub async fn jettison(&mut self, good: &TradeGoodSymbol, units: u32) -> Result<()> {
        info!(ship = %self.ship.symbol, "jettisoning {} {}", units, good);
        let resp = self.api.jettison_cargo(&self.ship.symbol, good, units).await?;
        self.ship.cargo = resp.data.cargo;
        Ok(())
    }

    /// Dump everything not on the keep list.
    pub async fn jettison_all_except(&mut self, keep: &[TradeGoodSymbol]) -> Result<()> {
        let unwanted: Vec<_> = self
            .ship
            .cargo
            .inventory
            .iter()
            .filter(|item| !keep.contains(&item.symbol))
            .map(|item| (item.symbol.clone(), item.units))
            .collect();
        for (good, units) in unwanted {
            self.jettison(&good, units).await?;
        }
        Ok(())
    }

    pub async fn extract(&mut self) -> Result<ExtractionBody> {
        self.orbit().await?;
        self.wait_for_cooldown().await;
        let resp = self.api.extract_resources(&self.ship.symbol).await?;
        self.ship.cargo = resp.data.cargo.clone();
        self.ship.cooldown = resp.data.cooldown.clone();
        info!(
            ship = %self.ship.symbol,
            "extracted {} {}", resp.data.extraction.extraction_yield.units, resp.data.extraction.extraction_yield.symbol
        );
        Ok(resp.data)
    }

    pub async fn extract_with_survey(&mut self, survey: &Survey) -> Result<SurveyExtractionOutcome> {
        self.orbit().await?;
        self.wait_for_cooldown().await;
        match self.api.extract_resources_with_survey(&self.ship.symbol, survey).await {
            Ok(resp) => {
                self.ship.cargo = resp.data.cargo.clone();
                self.ship.cooldown = resp.data.cooldown.clone();
                Ok(SurveyExtractionOutcome::Extracted(resp.data))
            }
            Err(e) => match e.downcast_ref::<ApiErrorBody>() {
                Some(api_error) if api_error.code == ERROR_SURVEY_EXPIRED => {
                    warn!(ship = %self.ship.symbol, "survey {} expired", survey.signature);
                    Ok(SurveyExtractionOutcome::SurveyExpired)
                }
                _ => Err(e),
            },
        }
    }

    pub async fn siphon(&mut self) -> Result<ExtractionBody> {
        self.orbit().await?;
        self.wait_for_cooldown().await;
        let resp = self.api.siphon_resources(&self.ship.symbol).await?;
        self.ship.cargo = resp.data.cargo.clone();
        self.ship.cooldown = resp.data.cooldown.clone();
        info!(
            ship = %self.ship.symbol,
            "siphoned {} {}", resp.data.extraction.extraction_yield.units, resp.data.extraction.extraction_yield.symbol
        );
        Ok(resp.data)
    }

    pub async fn survey(&mut self) -> Result<SurveyBody> {
        self.orbit().await?;
        self.wait_for_cooldown().await;
        let resp = self.api.create_survey(&self.ship.symbol).await?;
        self.ship.cooldown = resp.data.cooldown.clone();
        Ok(resp.data)
    }

    pub async fn supply_construction(&mut self, site: &WaypointSymbol, good: &TradeGoodSymbol, units: u32) -> Result<Construction> {
        self.wait_for_transit().await;
        self.dock().await?;
        info!(ship = %self.ship.symbol, "supplying {} {} to {}", units, good, site);
        let resp = self.api.supply_construction(site, &self.ship.symbol, good, units).await?;
        self.ship.cargo = resp.data.cargo;
        Ok(resp.data.construction)
    }
}

#[cfg(test)]
pub mod test_support {
    use chrono::Utc;
    use ft_domain::*;

    /// A docked ship with an arrival time in the past, so proxy operations
    /// never sleep in tests.
    pub fn docked_ship(symbol: &str, at: &str, cargo_capacity: u32) -> Ship {
        let waypoint = WaypointSymbol(at.to_string());
        let arrival = Utc::now() - chrono::Duration::seconds(10);
        Ship {
            symbol: ShipSymbol(symbol.to_string()),
            registration: ShipRegistration {
                name: symbol.to_string(),
                faction_symbol: "COSMIC".to_string(),
                role: "HAULER".to_string(),
            },
            nav: Nav {
                system_symbol: waypoint.system_symbol(),
                waypoint_symbol: waypoint.clone(),
                route: NavRoute {
                    origin: RouteEndpoint { symbol: waypoint.clone(), x: 0, y: 0 },
                    destination: RouteEndpoint { symbol: waypoint, x: 0, y: 0 },
                    departure_time: arrival,
                    arrival,
                },
                status: NavStatus::Docked,
                flight_mode: FlightMode::Cruise,
            },
            fuel: Fuel { current: 400, capacity: 400 },
            cargo: Cargo {
                capacity: cargo_capacity,
                units: 0,
                inventory: vec![],
            },
            cooldown: Cooldown {
                total_seconds: 0,
                remaining_seconds: 0,
                expiration: None,
            },
            frame: Frame {
                symbol: ShipFrameSymbol::FRAME_LIGHT_FREIGHTER,
            },
            engine: Engine {
                symbol: ShipEngineSymbol::ENGINE_ION_DRIVE_I,
                speed: 30,
            },
            mounts: vec![Mount {
                symbol: ShipMountSymbol::MOUNT_TURRET_I,
            }],
        }
    }

    pub fn test_agent_info(symbol: &str, credits: i64) -> AgentInfo {
        AgentInfo {
            symbol: AgentSymbol(symbol.to_string()),
            headquarters: WaypointSymbol("X1-TEST-A1".to_string()),
            credits,
            starting_faction: "COSMIC".to_string(),
            ship_count: Some(2),
        }
    }
}
