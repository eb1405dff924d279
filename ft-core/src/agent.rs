use std::sync::Arc;

use anyhow::Result;
use ft_domain::{AgentInfo, RegistrationBody, RegistrationRequest, Ship, ShipType, WaypointSymbol};
use ft_store::{AgentBmcTrait, Ctx};
use tokio::sync::Mutex;
use tracing::info;

use crate::api_client::{ApiClient, ApiClientTrait};
use crate::pagination::fetch_all_pages;
use crate::reqwest_helpers::create_client;

/// One registered agent: its token-backed client, live credit balance and
/// ship roster.
#[derive(Debug)]
pub struct Agent {
    pub ctx: Ctx,
    pub api: Arc<dyn ApiClientTrait>,
    pub info: Arc<Mutex<AgentInfo>>,
    pub ships: Vec<Ship>,
}

/// Return the stored registration for this callsign, registering a fresh
/// agent through the unauthenticated client when none exists. The token in
/// the registration response is the only chance to capture it, so the
/// document is persisted before returning.
pub async fn load_or_register(
    store: &Arc<dyn AgentBmcTrait>,
    ctx: &Ctx,
    anon_api: &dyn ApiClientTrait,
    faction: &str,
) -> Result<RegistrationBody> {
    if let Some(registration) = store.load_registration(ctx).await? {
        info!(agent = %ctx.agent_symbol, "using stored registration");
        return Ok(registration);
    }

    info!(agent = %ctx.agent_symbol, "registering new agent with faction {}", faction);
    let resp = anon_api
        .register(RegistrationRequest {
            faction: faction.to_string(),
            symbol: ctx.agent_symbol.0.clone(),
        })
        .await?;
    store.save_registration(ctx, &resp.data).await?;
    Ok(resp.data)
}

impl Agent {
    /// Full bootstrap: load-or-register, then pull agent info and the ship
    /// roster through the authenticated client.
    pub async fn load(
        store: Arc<dyn AgentBmcTrait>,
        ctx: Ctx,
        base_url: &str,
        faction: &str,
        requests_per_second: u32,
    ) -> Result<Agent> {
        let anon_api = ApiClient::new(create_client(None, requests_per_second), base_url.to_string());
        let registration = load_or_register(&store, &ctx, &anon_api, faction).await?;

        let api: Arc<dyn ApiClientTrait> = Arc::new(ApiClient::new(
            create_client(Some(registration.token), requests_per_second),
            base_url.to_string(),
        ));
        Self::load_with_client(ctx, api).await
    }

    pub async fn load_with_client(ctx: Ctx, api: Arc<dyn ApiClientTrait>) -> Result<Agent> {
        let info = api.get_agent().await?.data;
        let ships = fetch_all_pages(|page| api.list_ships(page)).await?;
        info!(agent = %ctx.agent_symbol, "loaded {} ships, {} credits", ships.len(), info.credits);

        Ok(Agent {
            ctx,
            api,
            info: Arc::new(Mutex::new(info)),
            ships,
        })
    }

    /// Buy a ship at a shipyard, merging the authoritative agent state and
    /// appending the new hull to the roster.
    pub async fn purchase_ship(&mut self, ship_type: ShipType, shipyard: &WaypointSymbol) -> Result<Ship> {
        let resp = self.api.purchase_ship(ship_type, shipyard).await?;
        *self.info.lock().await = resp.data.agent;
        info!(
            agent = %self.ctx.agent_symbol,
            "bought {} ({}) at {} for {}", resp.data.ship.symbol, ship_type, shipyard, resp.data.transaction.price
        );
        self.ships.push(resp.data.ship.clone());
        Ok(resp.data.ship)
    }
}
