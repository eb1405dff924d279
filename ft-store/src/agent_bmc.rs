use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ft_domain::RegistrationBody;
use mockall::automock;
use tokio::sync::Mutex;

use crate::ctx::Ctx;
use crate::fs_model_manager::FsModelManager;

#[automock]
#[async_trait]
pub trait AgentBmcTrait: Send + Sync + Debug {
    async fn load_registration(&self, ctx: &Ctx) -> anyhow::Result<Option<RegistrationBody>>;
    async fn save_registration(&self, ctx: &Ctx, registration: &RegistrationBody) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FsAgentBmc {
    pub mm: FsModelManager,
}

fn registration_path(ctx: &Ctx) -> String {
    format!("agents/{}.json", ctx.agent_symbol.0)
}

#[async_trait]
impl AgentBmcTrait for FsAgentBmc {
    async fn load_registration(&self, ctx: &Ctx) -> anyhow::Result<Option<RegistrationBody>> {
        self.mm.load(&registration_path(ctx)).await
    }

    async fn save_registration(&self, ctx: &Ctx, registration: &RegistrationBody) -> anyhow::Result<()> {
        self.mm.store(&registration_path(ctx), registration).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAgentBmc {
    registrations: Arc<Mutex<Vec<(String, RegistrationBody)>>>,
}

#[async_trait]
impl AgentBmcTrait for InMemoryAgentBmc {
    async fn load_registration(&self, ctx: &Ctx) -> anyhow::Result<Option<RegistrationBody>> {
        let guard = self.registrations.lock().await;
        Ok(guard
            .iter()
            .find(|(symbol, _)| symbol == &ctx.agent_symbol.0)
            .map(|(_, registration)| registration.clone()))
    }

    async fn save_registration(&self, ctx: &Ctx, registration: &RegistrationBody) -> anyhow::Result<()> {
        let mut guard = self.registrations.lock().await;
        guard.retain(|(symbol, _)| symbol != &ctx.agent_symbol.0);
        guard.push((ctx.agent_symbol.0.clone(), registration.clone()));
        Ok(())
    }
}
