use std::fmt::Debug;
use std::sync::Arc;

use mockall::automock;

use crate::agent_bmc::{AgentBmcTrait, FsAgentBmc, InMemoryAgentBmc};
use crate::fs_model_manager::FsModelManager;
use crate::job_bmc::{FsJobBmc, InMemoryJobBmc, JobBmcTrait};
use crate::ledger_bmc::{FsLedgerBmc, InMemoryLedgerBmc, LedgerBmcTrait};
use crate::mission_bmc::{FsMissionBmc, InMemoryMissionBmc, MissionBmcTrait};
use crate::world_cache_bmc::{FsWorldCacheBmc, InMemoryWorldCacheBmc, WorldCacheBmcTrait};

/// One handle for all persistence concerns. Agent code takes an
/// `Arc<dyn Bmc>` so tests can mix file-backed, in-memory and mocked
/// stores freely.
#[automock]
pub trait Bmc: Send + Sync + Debug {
    fn agent_bmc(&self) -> Arc<dyn AgentBmcTrait>;
    fn world_cache_bmc(&self) -> Arc<dyn WorldCacheBmcTrait>;
    fn ledger_bmc(&self) -> Arc<dyn LedgerBmcTrait>;
    fn mission_bmc(&self) -> Arc<dyn MissionBmcTrait>;
    fn job_bmc(&self) -> Arc<dyn JobBmcTrait>;
}

#[derive(Debug)]
pub struct FsBmc {
    agent_bmc: Arc<FsAgentBmc>,
    world_cache_bmc: Arc<FsWorldCacheBmc>,
    ledger_bmc: Arc<FsLedgerBmc>,
    mission_bmc: Arc<FsMissionBmc>,
    job_bmc: Arc<FsJobBmc>,
}

impl FsBmc {
    pub fn new(mm: FsModelManager) -> Self {
        Self {
            agent_bmc: Arc::new(FsAgentBmc { mm: mm.clone() }),
            world_cache_bmc: Arc::new(FsWorldCacheBmc { mm: mm.clone() }),
            ledger_bmc: Arc::new(FsLedgerBmc { mm: mm.clone() }),
            mission_bmc: Arc::new(FsMissionBmc { mm: mm.clone() }),
            job_bmc: Arc::new(FsJobBmc { mm }),
        }
    }
}

impl Bmc for FsBmc {
    fn agent_bmc(&self) -> Arc<dyn AgentBmcTrait> {
        Arc::clone(&self.agent_bmc) as Arc<dyn AgentBmcTrait>
    }

    fn world_cache_bmc(&self) -> Arc<dyn WorldCacheBmcTrait> {
        Arc::clone(&self.world_cache_bmc) as Arc<dyn WorldCacheBmcTrait>
    }

    fn ledger_bmc(&self) -> Arc<dyn LedgerBmcTrait> {
        Arc::clone(&self.ledger_bmc) as Arc<dyn LedgerBmcTrait>
    }

    fn mission_bmc(&self) -> Arc<dyn MissionBmcTrait> {
        Arc::clone(&self.mission_bmc) as Arc<dyn MissionBmcTrait>
    }

    fn job_bmc(&self) -> Arc<dyn JobBmcTrait> {
        Arc::clone(&self.job_bmc) as Arc<dyn JobBmcTrait>
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBmc {
    pub in_mem_agent_bmc: Arc<InMemoryAgentBmc>,
    pub in_mem_world_cache_bmc: Arc<InMemoryWorldCacheBmc>,
    pub in_mem_ledger_bmc: Arc<InMemoryLedgerBmc>,
    pub in_mem_mission_bmc: Arc<InMemoryMissionBmc>,
    pub in_mem_job_bmc: Arc<InMemoryJobBmc>,
}

impl Bmc for InMemoryBmc {
    fn agent_bmc(&self) -> Arc<dyn AgentBmcTrait> {
        Arc::clone(&self.in_mem_agent_bmc) as Arc<dyn AgentBmcTrait>
    }

    fn world_cache_bmc(&self) -> Arc<dyn WorldCacheBmcTrait> {
        Arc::clone(&self.in_mem_world_cache_bmc) as Arc<dyn WorldCacheBmcTrait>
    }

    fn ledger_bmc(&self) -> Arc<dyn LedgerBmcTrait> {
        Arc::clone(&self.in_mem_ledger_bmc) as Arc<dyn LedgerBmcTrait>
    }

    fn mission_bmc(&self) -> Arc<dyn MissionBmcTrait> {
        Arc::clone(&self.in_mem_mission_bmc) as Arc<dyn MissionBmcTrait>
    }

    fn job_bmc(&self) -> Arc<dyn JobBmcTrait> {
        Arc::clone(&self.in_mem_job_bmc) as Arc<dyn JobBmcTrait>
    }
}
