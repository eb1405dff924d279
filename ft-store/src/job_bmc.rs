use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ft_domain::JobStatus;
use mockall::automock;
use tokio::sync::Mutex;

use crate::ctx::Ctx;
use crate::fs_model_manager::FsModelManager;

#[automock]
#[async_trait]
pub trait JobBmcTrait: Send + Sync + Debug {
    async fn load_job_statuses(&self, ctx: &Ctx) -> anyhow::Result<Vec<JobStatus>>;
    async fn save_job_statuses(&self, ctx: &Ctx, statuses: &[JobStatus]) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FsJobBmc {
    pub mm: FsModelManager,
}

fn jobs_path(ctx: &Ctx) -> String {
    format!("jobs/{}.json", ctx.agent_symbol.0)
}

#[async_trait]
impl JobBmcTrait for FsJobBmc {
    async fn load_job_statuses(&self, ctx: &Ctx) -> anyhow::Result<Vec<JobStatus>> {
        let statuses = self.mm.load(&jobs_path(ctx)).await?.unwrap_or_default();
        Ok(statuses)
    }

    async fn save_job_statuses(&self, ctx: &Ctx, statuses: &[JobStatus]) -> anyhow::Result<()> {
        self.mm.store(&jobs_path(ctx), &statuses).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJobBmc {
    statuses: Arc<Mutex<HashMap<String, Vec<JobStatus>>>>,
}

#[async_trait]
impl JobBmcTrait for InMemoryJobBmc {
    async fn load_job_statuses(&self, ctx: &Ctx) -> anyhow::Result<Vec<JobStatus>> {
        let guard = self.statuses.lock().await;
        Ok(guard.get(&ctx.agent_symbol.0).cloned().unwrap_or_default())
    }

    async fn save_job_statuses(&self, ctx: &Ctx, statuses: &[JobStatus]) -> anyhow::Result<()> {
        let mut guard = self.statuses.lock().await;
        guard.insert(ctx.agent_symbol.0.clone(), statuses.to_vec());
        Ok(())
    }
}
