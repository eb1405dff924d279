use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use ft_domain::{FlowKey, ShipSymbol, SupplyLevel, SystemLedger, SystemSymbol};
use ft_store::LedgerBmcTrait;
use tokio::sync::Mutex;
use tracing::debug;

/// The system ledger shared between all ships trading in one system.
///
/// Checks and reservations take the in-process lock, and every mutation is
/// persisted before the lock is released so a crashed process resumes with
/// its reservations intact. The ledger stays advisory: a sibling agent
/// process racing the same file costs margin, not correctness.
#[derive(Debug)]
pub struct SharedLedger {
    system_symbol: SystemSymbol,
    store: Arc<dyn LedgerBmcTrait>,
    ledger: Mutex<SystemLedger>,
}

impl SharedLedger {
    pub async fn load(store: Arc<dyn LedgerBmcTrait>, system_symbol: SystemSymbol) -> Result<Arc<Self>> {
        let ledger = store.load_system_ledger(&system_symbol).await?;
        Ok(Arc::new(SharedLedger {
            system_symbol,
            store,
            ledger: Mutex::new(ledger),
        }))
    }

    pub async fn total_flow(&self, key: &FlowKey) -> i64 {
        self.ledger.lock().await.total_flow(key)
    }

    pub async fn accepts_purchase(&self, key: &FlowKey, quantity: i64, supply: SupplyLevel, trade_volume: i32) -> bool {
        self.ledger.lock().await.accepts_purchase(key, quantity, supply, trade_volume)
    }

    pub async fn accepts_sale(&self, key: &FlowKey, quantity: i64, supply: SupplyLevel, trade_volume: i32) -> bool {
        self.ledger.lock().await.accepts_sale(key, quantity, supply, trade_volume)
    }

    /// Replace the ship's announced flows and persist the document.
    pub async fn reserve(&self, ship: &ShipSymbol, flows: BTreeMap<FlowKey, i64>) -> Result<()> {
        debug!(ship = %ship, system = %self.system_symbol, "reserving {} flows", flows.len());
        let mut ledger = self.ledger.lock().await;
        ledger.reserve(ship, flows);
        self.store.save_system_ledger(&self.system_symbol, &ledger).await
    }

    /// Drop one key from the ship's reservation, e.g. the buy side once the
    /// cargo is aboard.
    pub async fn release_key(&self, ship: &ShipSymbol, key: &FlowKey) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        ledger.release_key(ship, key);
        self.store.save_system_ledger(&self.system_symbol, &ledger).await
    }

    /// Drop everything the ship had announced.
    pub async fn clear(&self, ship: &ShipSymbol) -> Result<()> {
        debug!(ship = %ship, system = %self.system_symbol, "clearing ledger entries");
        let mut ledger = self.ledger.lock().await;
        ledger.clear(ship);
        self.store.save_system_ledger(&self.system_symbol, &ledger).await
    }
}

/// Hands out one [`SharedLedger`] instance per system, so every ship
/// trading in a system goes through the same lock.
#[derive(Debug)]
pub struct LedgerRegistry {
    store: Arc<dyn LedgerBmcTrait>,
    ledgers: Mutex<HashMap<SystemSymbol, Arc<SharedLedger>>>,
}

impl LedgerRegistry {
    pub fn new(store: Arc<dyn LedgerBmcTrait>) -> Self {
        LedgerRegistry {
            store,
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    pub async fn ledger_for(&self, system_symbol: &SystemSymbol) -> Result<Arc<SharedLedger>> {
        let mut ledgers = self.ledgers.lock().await;
        if let Some(ledger) = ledgers.get(system_symbol) {
            return Ok(Arc::clone(ledger));
        }
        let ledger = SharedLedger::load(Arc::clone(&self.store), system_symbol.clone()).await?;
        ledgers.insert(system_symbol.clone(), Arc::clone(&ledger));
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_domain::{TradeGoodSymbol, WaypointSymbol};
    use ft_store::InMemoryLedgerBmc;

    fn key(waypoint: &str, good: &str) -> FlowKey {
        FlowKey {
            waypoint: WaypointSymbol(waypoint.to_string()),
            good: TradeGoodSymbol(good.to_string()),
        }
    }

    #[tokio::test]
    async fn reservations_survive_a_reload() {
        let store: Arc<dyn LedgerBmcTrait> = Arc::new(InMemoryLedgerBmc::default());
        let system = SystemSymbol("X1-GY87".to_string());
        let ship = ShipSymbol("AGENT-1".to_string());
        let k = key("X1-GY87-A1", "FAB_MATS");

        let ledger = SharedLedger::load(Arc::clone(&store), system.clone()).await.unwrap();
        ledger.reserve(&ship, BTreeMap::from([(k.clone(), -40)])).await.unwrap();
        drop(ledger);

        let reloaded = SharedLedger::load(store, system).await.unwrap();
        assert_eq!(reloaded.total_flow(&k).await, -40);
    }

    #[tokio::test]
    async fn releasing_the_buy_key_keeps_the_sell_side() {
        let store: Arc<dyn LedgerBmcTrait> = Arc::new(InMemoryLedgerBmc::default());
        let system = SystemSymbol("X1-GY87".to_string());
        let ship = ShipSymbol("AGENT-1".to_string());
        let buy = key("X1-GY87-A1", "IRON");
        let sell = key("X1-GY87-B3", "IRON");

        let ledger = SharedLedger::load(store, system).await.unwrap();
        ledger
            .reserve(&ship, BTreeMap::from([(buy.clone(), -30), (sell.clone(), 30)]))
            .await
            .unwrap();
        ledger.release_key(&ship, &buy).await.unwrap();

        assert_eq!(ledger.total_flow(&buy).await, 0);
        assert_eq!(ledger.total_flow(&sell).await, 30);
    }

    #[tokio::test]
    async fn the_registry_shares_one_ledger_per_system() {
        let registry = LedgerRegistry::new(Arc::new(InMemoryLedgerBmc::default()));
        let system = SystemSymbol("X1-GY87".to_string());

        let a = registry.ledger_for(&system).await.unwrap();
        let b = registry.ledger_for(&system).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
