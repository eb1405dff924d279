use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use ft_domain::{Construction, MarketData, Shipyard, System, SystemListingEntry, SystemSymbol, WaypointSymbol};
use ft_store::WorldCacheBmcTrait;
use tokio::sync::Mutex;
use tracing::info;

use crate::api_client::ApiClientTrait;
use crate::pagination::fetch_all_pages;

#[derive(Debug, Default)]
struct UniverseCache {
    hydrated_systems: HashMap<SystemSymbol, Arc<System>>,
    local_markets: HashMap<WaypointSymbol, MarketData>,
    local_shipyards: HashMap<WaypointSymbol, Shipyard>,
    remote_markets: HashMap<WaypointSymbol, MarketData>,
    remote_shipyards: HashMap<WaypointSymbol, Shipyard>,
    remote_constructions: HashMap<WaypointSymbol, Construction>,
}

/// Read-through cache over the game world, layered memory -> document
/// store -> api.
///
/// Static data (systems, waypoints) is fetched once and kept forever.
/// Market and shipyard snapshots never expire here either; callers judge
/// staleness themselves via `retrieved_at`. "Local" documents carry price
/// details and are only ever written by a ship on site, so reading one is
/// a pure cache read that never talks to the api.
#[derive(Debug)]
pub struct Universe {
    api: Arc<dyn ApiClientTrait>,
    store: Arc<dyn WorldCacheBmcTrait>,
    systems_listing: HashMap<SystemSymbol, SystemListingEntry>,
    cache: Mutex<UniverseCache>,
}

impl Universe {
    /// Load the global systems listing (from the document store, or the api
    /// on first run) and build the cache around it.
    pub async fn load(api: Arc<dyn ApiClientTrait>, store: Arc<dyn WorldCacheBmcTrait>) -> Result<Universe> {
        let listing = match store.load_systems_listing().await? {
            Some(listing) => listing,
            None => {
                info!("systems listing not cached yet, downloading it");
                let listing = fetch_all_pages(|page| api.list_systems_page(page)).await?;
                store.save_systems_listing(&listing).await?;
                listing
            }
        };

        let systems_listing = listing
            .into_iter()
            .map(|entry| (entry.symbol.clone(), entry))
            .collect();

        Ok(Universe {
            api,
            store,
            systems_listing,
            cache: Mutex::new(UniverseCache::default()),
        })
    }

    /// A system with fully hydrated waypoints.
    ///
    /// The hydrated waypoint count must match the global listing; a mismatch
    /// means the two cached documents are from different universe
    /// generations and nothing built on top of them can be trusted.
    pub async fn get_system(&self, system_symbol: &SystemSymbol) -> Result<Arc<System>> {
        if let Some(system) = self.cache.lock().await.hydrated_systems.get(system_symbol) {
            return Ok(Arc::clone(system));
        }

        let listing_entry = self
            .systems_listing
            .get(system_symbol)
            .ok_or_else(|| anyhow!("system {} is not in the systems listing", system_symbol))?;

        let waypoints = match self.store.load_system_waypoints(system_symbol).await? {
            Some(waypoints) => waypoints,
            None => {
                info!("waypoints of {} not cached yet, downloading them", system_symbol);
                let waypoints = fetch_all_pages(|page| self.api.list_waypoints_of_system_page(system_symbol, page)).await?;
                self.store.save_system_waypoints(system_symbol, &waypoints).await?;
                waypoints
            }
        };

        if waypoints.len() != listing_entry.waypoints.len() {
            bail!(
                "system {} has {} hydrated waypoints but the listing names {}",
                system_symbol,
                waypoints.len(),
                listing_entry.waypoints.len()
            );
        }

        let system = Arc::new(System {
            symbol: listing_entry.symbol.clone(),
            x: listing_entry.x,
            y: listing_entry.y,
            waypoints,
        });

        self.cache
            .lock()
            .await
            .hydrated_systems
            .insert(system_symbol.clone(), Arc::clone(&system));
        Ok(system)
    }

    /// Latest detailed market snapshot, if any ship ever took one. Never
    /// calls the api.
    pub async fn get_local_market(&self, waypoint_symbol: &WaypointSymbol) -> Result<Option<MarketData>> {
        if let Some(market) = self.cache.lock().await.local_markets.get(waypoint_symbol) {
            return Ok(Some(market.clone()));
        }
        let Some(market) = self.store.load_local_market(waypoint_symbol).await? else {
            return Ok(None);
        };
        self.cache
            .lock()
            .await
            .local_markets
            .insert(waypoint_symbol.clone(), market.clone());
        Ok(Some(market))
    }

    pub async fn save_local_market(&self, mut market: MarketData) -> Result<()> {
        market.retrieved_at = Some(Utc::now());
        self.store.save_local_market(&market).await?;
        self.cache
            .lock()
            .await
            .local_markets
            .insert(market.symbol.clone(), market);
        Ok(())
    }

    pub async fn get_local_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> Result<Option<Shipyard>> {
        if let Some(shipyard) = self.cache.lock().await.local_shipyards.get(waypoint_symbol) {
            return Ok(Some(shipyard.clone()));
        }
        let Some(shipyard) = self.store.load_local_shipyard(waypoint_symbol).await? else {
            return Ok(None);
        };
        self.cache
            .lock()
            .await
            .local_shipyards
            .insert(waypoint_symbol.clone(), shipyard.clone());
        Ok(Some(shipyard))
    }

    pub async fn save_local_shipyard(&self, mut shipyard: Shipyard) -> Result<()> {
        shipyard.retrieved_at = Some(Utc::now());
        self.store.save_local_shipyard(&shipyard).await?;
        self.cache
            .lock()
            .await
            .local_shipyards
            .insert(shipyard.symbol.clone(), shipyard);
        Ok(())
    }

    /// Detail-free market data. Fetched from the api at most once; the
    /// import/export/exchange lists it carries are static.
    pub async fn get_remote_market(&self, waypoint_symbol: &WaypointSymbol) -> Result<MarketData> {
        if let Some(market) = self.cache.lock().await.remote_markets.get(waypoint_symbol) {
            return Ok(market.clone());
        }
        let market = match self.store.load_remote_market(waypoint_symbol).await? {
            Some(market) => market,
            None => {
                let market = self.api.get_marketplace(waypoint_symbol).await?.data;
                self.store.save_remote_market(&market).await?;
                market
            }
        };
        self.cache
            .lock()
            .await
            .remote_markets
            .insert(waypoint_symbol.clone(), market.clone());
        Ok(market)
    }

    pub async fn get_remote_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> Result<Shipyard> {
        if let Some(shipyard) = self.cache.lock().await.remote_shipyards.get(waypoint_symbol) {
            return Ok(shipyard.clone());
        }
        let shipyard = match self.store.load_remote_shipyard(waypoint_symbol).await? {
            Some(shipyard) => shipyard,
            None => {
                let shipyard = self.api.get_shipyard(waypoint_symbol).await?.data;
                self.store.save_remote_shipyard(&shipyard).await?;
                shipyard
            }
        };
        self.cache
            .lock()
            .await
            .remote_shipyards
            .insert(waypoint_symbol.clone(), shipyard.clone());
        Ok(shipyard)
    }

    pub async fn get_remote_construction(&self, waypoint_symbol: &WaypointSymbol) -> Result<Construction> {
        if let Some(construction) = self.cache.lock().await.remote_constructions.get(waypoint_symbol) {
            return Ok(construction.clone());
        }
        let construction = match self.store.load_remote_construction(waypoint_symbol).await? {
            Some(construction) => construction,
            None => {
                let construction = self.api.get_construction_site(waypoint_symbol).await?.data;
                self.store.save_remote_construction(&construction).await?;
                construction
            }
        };
        self.cache
            .lock()
            .await
            .remote_constructions
            .insert(waypoint_symbol.clone(), construction.clone());
        Ok(construction)
    }

    /// Construction sites do change, so delivering ships push fresh state
    /// here after every supply call.
    pub async fn save_remote_construction(&self, construction: Construction) -> Result<()> {
        self.store.save_remote_construction(&construction).await?;
        self.cache
            .lock()
            .await
            .remote_constructions
            .insert(construction.symbol.clone(), construction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::MockApiClientTrait;
    use ft_domain::{Data, Meta, SystemListingWaypoint, Waypoint, WaypointType};
    use ft_store::InMemoryWorldCacheBmc;
    use tracing_test::traced_test;

    fn listing_entry(symbol: &str, waypoints: &[&str]) -> SystemListingEntry {
        SystemListingEntry {
            symbol: SystemSymbol(symbol.to_string()),
            system_type: "NEUTRON_STAR".to_string(),
            x: 0,
            y: 0,
            waypoints: waypoints
                .iter()
                .map(|w| SystemListingWaypoint {
                    symbol: WaypointSymbol(w.to_string()),
                    waypoint_type: "PLANET".to_string(),
                    x: 0,
                    y: 0,
                })
                .collect(),
        }
    }

    fn hydrated_waypoint(symbol: &str) -> Waypoint {
        Waypoint {
            symbol: WaypointSymbol(symbol.to_string()),
            waypoint_type: WaypointType::PLANET,
            system_symbol: WaypointSymbol(symbol.to_string()).system_symbol(),
            x: 0,
            y: 0,
            traits: vec![],
            is_under_construction: false,
        }
    }

    fn empty_market(symbol: &str) -> MarketData {
        MarketData {
            symbol: WaypointSymbol(symbol.to_string()),
            exports: vec![],
            imports: vec![],
            exchange: vec![],
            trade_goods: None,
            retrieved_at: None,
        }
    }

    async fn universe_with_listing(api: MockApiClientTrait, store: Arc<InMemoryWorldCacheBmc>) -> Universe {
        store
            .save_systems_listing(&[listing_entry("X1-TEST", &["X1-TEST-A1", "X1-TEST-A2"])])
            .await
            .unwrap();
        Universe::load(Arc::new(api), store).await.unwrap()
    }

    #[tokio::test]
    async fn local_market_is_unknown_until_saved() {
        let api = MockApiClientTrait::new();
        let universe = universe_with_listing(api, Arc::new(InMemoryWorldCacheBmc::default())).await;
        let waypoint = WaypointSymbol("X1-TEST-A1".to_string());

        assert!(universe.get_local_market(&waypoint).await.unwrap().is_none());

        universe.save_local_market(empty_market("X1-TEST-A1")).await.unwrap();

        let market = universe.get_local_market(&waypoint).await.unwrap().unwrap();
        assert!(market.retrieved_at.is_some());
    }

    #[tokio::test]
    async fn remote_market_is_fetched_at_most_once() {
        let mut api = MockApiClientTrait::new();
        api.expect_get_marketplace()
            .times(1)
            .returning(|waypoint| Ok(Data { data: empty_market(&waypoint.0) }));

        let universe = universe_with_listing(api, Arc::new(InMemoryWorldCacheBmc::default())).await;
        let waypoint = WaypointSymbol("X1-TEST-A1".to_string());

        universe.get_remote_market(&waypoint).await.unwrap();
        universe.get_remote_market(&waypoint).await.unwrap();
    }

    #[tokio::test]
    async fn hydrating_a_system_asserts_the_waypoint_count() {
        let mut api = MockApiClientTrait::new();
        // listing says two waypoints, the hydrated page only has one
        api.expect_list_waypoints_of_system_page().returning(|_, input| {
            Ok(crate::pagination::PaginatedResponse {
                data: vec![hydrated_waypoint("X1-TEST-A1")],
                meta: Meta { total: 1, page: input.page, limit: input.limit },
            })
        });

        let universe = universe_with_listing(api, Arc::new(InMemoryWorldCacheBmc::default())).await;

        let err = universe
            .get_system(&SystemSymbol("X1-TEST".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("hydrated waypoints"));
    }

    #[traced_test]
    #[tokio::test]
    async fn hydrated_systems_come_from_the_store_without_api_calls() {
        let api = MockApiClientTrait::new();
        let store = Arc::new(InMemoryWorldCacheBmc::default());
        store
            .save_system_waypoints(
                &SystemSymbol("X1-TEST".to_string()),
                &[hydrated_waypoint("X1-TEST-A1"), hydrated_waypoint("X1-TEST-A2")],
            )
            .await
            .unwrap();

        let universe = universe_with_listing(api, store).await;

        let system = universe.get_system(&SystemSymbol("X1-TEST".to_string())).await.unwrap();
        assert_eq!(system.waypoints.len(), 2);
        assert!(!logs_contain("not cached yet"));
    }
}
