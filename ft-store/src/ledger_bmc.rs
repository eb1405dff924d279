use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ft_domain::{SystemLedger, SystemSymbol};
use mockall::automock;
use tokio::sync::Mutex;

use crate::fs_model_manager::FsModelManager;

#[automock]
#[async_trait]
pub trait LedgerBmcTrait: Send + Sync + Debug {
    /// Loading a ledger that was never written yields an empty one.
    async fn load_system_ledger(&self, system_symbol: &SystemSymbol) -> anyhow::Result<SystemLedger>;
    async fn save_system_ledger(&self, system_symbol: &SystemSymbol, ledger: &SystemLedger) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FsLedgerBmc {
    pub mm: FsModelManager,
}

#[async_trait]
impl LedgerBmcTrait for FsLedgerBmc {
    async fn load_system_ledger(&self, system_symbol: &SystemSymbol) -> anyhow::Result<SystemLedger> {
        let ledger = self
            .mm
            .load(&format!("ledgers/{}.json", system_symbol.0))
            .await?
            .unwrap_or_default();
        Ok(ledger)
    }

    async fn save_system_ledger(&self, system_symbol: &SystemSymbol, ledger: &SystemLedger) -> anyhow::Result<()> {
        self.mm
            .store(&format!("ledgers/{}.json", system_symbol.0), ledger)
            .await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerBmc {
    ledgers: Arc<Mutex<HashMap<SystemSymbol, SystemLedger>>>,
}

#[async_trait]
impl LedgerBmcTrait for InMemoryLedgerBmc {
    async fn load_system_ledger(&self, system_symbol: &SystemSymbol) -> anyhow::Result<SystemLedger> {
        let guard = self.ledgers.lock().await;
        Ok(guard.get(system_symbol).cloned().unwrap_or_default())
    }

    async fn save_system_ledger(&self, system_symbol: &SystemSymbol, ledger: &SystemLedger) -> anyhow::Result<()> {
        let mut guard = self.ledgers.lock().await;
        guard.insert(system_symbol.clone(), ledger.clone());
        Ok(())
    }
}
