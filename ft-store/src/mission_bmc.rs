use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ft_domain::{Mission, ShipSymbol};
use mockall::automock;
use tokio::sync::Mutex;

use crate::fs_model_manager::FsModelManager;

#[automock]
#[async_trait]
pub trait MissionBmcTrait: Send + Sync + Debug {
    async fn load_mission(&self, ship_symbol: &ShipSymbol) -> anyhow::Result<Option<Mission>>;
    async fn save_mission(&self, ship_symbol: &ShipSymbol, mission: &Mission) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FsMissionBmc {
    pub mm: FsModelManager,
}

#[async_trait]
impl MissionBmcTrait for FsMissionBmc {
    async fn load_mission(&self, ship_symbol: &ShipSymbol) -> anyhow::Result<Option<Mission>> {
        self.mm.load(&format!("missions/{}.json", ship_symbol.0)).await
    }

    async fn save_mission(&self, ship_symbol: &ShipSymbol, mission: &Mission) -> anyhow::Result<()> {
        self.mm
            .store(&format!("missions/{}.json", ship_symbol.0), mission)
            .await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMissionBmc {
    missions: Arc<Mutex<HashMap<ShipSymbol, Mission>>>,
}

#[async_trait]
impl MissionBmcTrait for InMemoryMissionBmc {
    async fn load_mission(&self, ship_symbol: &ShipSymbol) -> anyhow::Result<Option<Mission>> {
        Ok(self.missions.lock().await.get(ship_symbol).cloned())
    }

    async fn save_mission(&self, ship_symbol: &ShipSymbol, mission: &Mission) -> anyhow::Result<()> {
        self.missions
            .lock()
            .await
            .insert(ship_symbol.clone(), mission.clone());
        Ok(())
    }
}
