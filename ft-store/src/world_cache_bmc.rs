use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ft_domain::{Construction, MarketData, Shipyard, SystemListingEntry, SystemSymbol, Waypoint, WaypointSymbol};
use mockall::automock;
use tokio::sync::Mutex;

use crate::fs_model_manager::FsModelManager;

/// Persistence for world data: systems, hydrated waypoints, market and
/// shipyard snapshots, construction sites. This data belongs to the game
/// world rather than any agent, so all agents share one copy.
///
/// "Local" market/shipyard documents carry price details and come from
/// refreshes made with a ship at the waypoint; "remote" documents are the
/// detail-free versions anyone can fetch.
#[automock]
#[async_trait]
pub trait WorldCacheBmcTrait: Send + Sync + Debug {
    async fn load_systems_listing(&self) -> anyhow::Result<Option<Vec<SystemListingEntry>>>;
    async fn save_systems_listing(&self, listing: &[SystemListingEntry]) -> anyhow::Result<()>;

    async fn load_system_waypoints(&self, system_symbol: &SystemSymbol) -> anyhow::Result<Option<Vec<Waypoint>>>;
    async fn save_system_waypoints(&self, system_symbol: &SystemSymbol, waypoints: &[Waypoint]) -> anyhow::Result<()>;

    async fn load_local_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>>;
    async fn save_local_market(&self, market: &MarketData) -> anyhow::Result<()>;

    async fn load_remote_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>>;
    async fn save_remote_market(&self, market: &MarketData) -> anyhow::Result<()>;

    async fn load_local_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>>;
    async fn save_local_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()>;

    async fn load_remote_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>>;
    async fn save_remote_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()>;

    async fn load_remote_construction(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Construction>>;
    async fn save_remote_construction(&self, construction: &Construction) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FsWorldCacheBmc {
    pub mm: FsModelManager,
}

#[async_trait]
impl WorldCacheBmcTrait for FsWorldCacheBmc {
    async fn load_systems_listing(&self) -> anyhow::Result<Option<Vec<SystemListingEntry>>> {
        self.mm.load("systems.json").await
    }

    async fn save_systems_listing(&self, listing: &[SystemListingEntry]) -> anyhow::Result<()> {
        self.mm.store("systems.json", &listing).await
    }

    async fn load_system_waypoints(&self, system_symbol: &SystemSymbol) -> anyhow::Result<Option<Vec<Waypoint>>> {
        self.mm
            .load(&format!("system_waypoints/{}.json", system_symbol.0))
            .await
    }

    async fn save_system_waypoints(&self, system_symbol: &SystemSymbol, waypoints: &[Waypoint]) -> anyhow::Result<()> {
        self.mm
            .store(&format!("system_waypoints/{}.json", system_symbol.0), &waypoints)
            .await
    }

    async fn load_local_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>> {
        self.mm
            .load(&format!("local_markets/{}.json", waypoint_symbol.0))
            .await
    }

    async fn save_local_market(&self, market: &MarketData) -> anyhow::Result<()> {
        self.mm
            .store(&format!("local_markets/{}.json", market.symbol.0), market)
            .await
    }

    async fn load_remote_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>> {
        self.mm
            .load(&format!("remote_markets/{}.json", waypoint_symbol.0))
            .await
    }

    async fn save_remote_market(&self, market: &MarketData) -> anyhow::Result<()> {
        self.mm
            .store(&format!("remote_markets/{}.json", market.symbol.0), market)
            .await
    }

    async fn load_local_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>> {
        self.mm
            .load(&format!("local_shipyards/{}.json", waypoint_symbol.0))
            .await
    }

    async fn save_local_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()> {
        self.mm
            .store(&format!("local_shipyards/{}.json", shipyard.symbol.0), shipyard)
            .await
    }

    async fn load_remote_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>> {
        self.mm
            .load(&format!("remote_shipyards/{}.json", waypoint_symbol.0))
            .await
    }

    async fn save_remote_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()> {
        self.mm
            .store(&format!("remote_shipyards/{}.json", shipyard.symbol.0), shipyard)
            .await
    }

    async fn load_remote_construction(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Construction>> {
        self.mm
            .load(&format!("remote_constructions/{}.json", waypoint_symbol.0))
            .await
    }

    async fn save_remote_construction(&self, construction: &Construction) -> anyhow::Result<()> {
        self.mm
            .store(&format!("remote_constructions/{}.json", construction.symbol.0), construction)
            .await
    }
}

#[derive(Debug, Default)]
struct InMemoryWorldCache {
    systems_listing: Option<Vec<SystemListingEntry>>,
    system_waypoints: HashMap<SystemSymbol, Vec<Waypoint>>,
    local_markets: HashMap<WaypointSymbol, MarketData>,
    remote_markets: HashMap<WaypointSymbol, MarketData>,
    local_shipyards: HashMap<WaypointSymbol, Shipyard>,
    remote_shipyards: HashMap<WaypointSymbol, Shipyard>,
    remote_constructions: HashMap<WaypointSymbol, Construction>,
}

#[derive(Debug, Default)]
pub struct InMemoryWorldCacheBmc {
    cache: Arc<Mutex<InMemoryWorldCache>>,
}

#[async_trait]
impl WorldCacheBmcTrait for InMemoryWorldCacheBmc {
    async fn load_systems_listing(&self) -> anyhow::Result<Option<Vec<SystemListingEntry>>> {
        Ok(self.cache.lock().await.systems_listing.clone())
    }

    async fn save_systems_listing(&self, listing: &[SystemListingEntry]) -> anyhow::Result<()> {
        self.cache.lock().await.systems_listing = Some(listing.to_vec());
        Ok(())
    }

    async fn load_system_waypoints(&self, system_symbol: &SystemSymbol) -> anyhow::Result<Option<Vec<Waypoint>>> {
        Ok(self.cache.lock().await.system_waypoints.get(system_symbol).cloned())
    }

    async fn save_system_waypoints(&self, system_symbol: &SystemSymbol, waypoints: &[Waypoint]) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .system_waypoints
            .insert(system_symbol.clone(), waypoints.to_vec());
        Ok(())
    }

    async fn load_local_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>> {
        Ok(self.cache.lock().await.local_markets.get(waypoint_symbol).cloned())
    }

    async fn save_local_market(&self, market: &MarketData) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .local_markets
            .insert(market.symbol.clone(), market.clone());
        Ok(())
    }

    async fn load_remote_market(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<MarketData>> {
        Ok(self.cache.lock().await.remote_markets.get(waypoint_symbol).cloned())
    }

    async fn save_remote_market(&self, market: &MarketData) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .remote_markets
            .insert(market.symbol.clone(), market.clone());
        Ok(())
    }

    async fn load_local_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>> {
        Ok(self.cache.lock().await.local_shipyards.get(waypoint_symbol).cloned())
    }

    async fn save_local_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .local_shipyards
            .insert(shipyard.symbol.clone(), shipyard.clone());
        Ok(())
    }

    async fn load_remote_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Shipyard>> {
        Ok(self.cache.lock().await.remote_shipyards.get(waypoint_symbol).cloned())
    }

    async fn save_remote_shipyard(&self, shipyard: &Shipyard) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .remote_shipyards
            .insert(shipyard.symbol.clone(), shipyard.clone());
        Ok(())
    }

    async fn load_remote_construction(&self, waypoint_symbol: &WaypointSymbol) -> anyhow::Result<Option<Construction>> {
        Ok(self
            .cache
            .lock()
            .await
            .remote_constructions
            .get(waypoint_symbol)
            .cloned())
    }

    async fn save_remote_construction(&self, construction: &Construction) -> anyhow::Result<()> {
        self.cache
            .lock()
            .await
            .remote_constructions
            .insert(construction.symbol.clone(), construction.clone());
        Ok(())
    }
}
