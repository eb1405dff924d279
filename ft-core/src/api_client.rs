use std::fmt::Debug;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ft_domain::{
    CreateSurveyResponse, Data, DockShipResponse, ExtractResourcesResponse, FlightMode, GetAgentResponse,
    GetConstructionResponse, GetMarketResponse, GetShipyardResponse, JettisonCargoResponse, NavigateShipRequest,
    NavigateShipResponse, OrbitShipResponse, PatchShipNavRequest, PatchShipNavResponse, PurchaseCargoResponse,
    PurchaseShipRequest, PurchaseShipResponse, RefuelShipRequest, RefuelShipResponse, RegistrationRequest,
    RegistrationResponse, SellCargoResponse, Ship, ShipSymbol, ShipType, SiphonResourcesResponse,
    SupplyConstructionRequest, SupplyConstructionResponse, Survey, SystemListingEntry, SystemSymbol,
    TradeCargoRequest, TradeGoodSymbol, Waypoint, WaypointSymbol,
};
use mockall::automock;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::pagination::{PaginatedResponse, PaginationInput};

/// Error payload the api wraps failed calls in. Kept as a typed error so
/// callers can whitelist specific codes (an expired survey, say) without
/// string matching.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("api error {code}: {message}")]
pub struct ApiErrorBody {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

/// An exhausted or expired survey is an expected outcome, not a fault.
pub const ERROR_SURVEY_EXPIRED: i32 = 4224;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub client: ClientWithMiddleware,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: ClientWithMiddleware, base_url: String) -> Self {
        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn make_api_call<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let resp = request.send().await.context("Failed to send request")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to get response body")?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
                return Err(anyhow::Error::new(envelope.error));
            }
            anyhow::bail!("API request failed. Status: {}, Body: {}", status, body);
        }

        let deserializer = &mut serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(deserializer)
            .map_err(|e| anyhow::anyhow!("Error decoding response at '{}': {}. Response body was: '{}'", e.path(), e, body))
    }
}

#[async_trait]
impl ApiClientTrait for ApiClient {
    async fn register(&self, registration_request: RegistrationRequest) -> Result<RegistrationResponse> {
        Self::make_api_call(self.client.post(self.url("/register")).json(&registration_request)).await
    }

    async fn get_agent(&self) -> Result<GetAgentResponse> {
        Self::make_api_call(self.client.get(self.url("/my/agent"))).await
    }

    async fn list_ships(&self, pagination_input: PaginationInput) -> Result<PaginatedResponse<Ship>> {
        let query_param_list = [
            ("page", pagination_input.page.to_string()),
            ("limit", pagination_input.limit.to_string()),
        ];

        let request = self.client.get(self.url("/my/ships")).query(&query_param_list);

        Self::make_api_call(request).await
    }

    async fn list_systems_page(&self, pagination_input: PaginationInput) -> Result<PaginatedResponse<SystemListingEntry>> {
        let query_param_list = [
            ("page", pagination_input.page.to_string()),
            ("limit", pagination_input.limit.to_string()),
        ];

        let request = self.client.get(self.url("/systems")).query(&query_param_list);

        Self::make_api_call(request).await
    }

    async fn list_waypoints_of_system_page(
        &self,
        system_symbol: &SystemSymbol,
        pagination_input: PaginationInput,
    ) -> Result<PaginatedResponse<Waypoint>> {
        let query_param_list = [
            ("page", pagination_input.page.to_string()),
            ("limit", pagination_input.limit.to_string()),
        ];

        let request = self
            .client
            .get(self.url(&format!("/systems/{}/waypoints", system_symbol.0)))
            .query(&query_param_list);

        Self::make_api_call(request).await
    }

    async fn get_marketplace(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetMarketResponse> {
        let request = self.client.get(self.url(&format!(
            "/systems/{}/waypoints/{}/market",
            waypoint_symbol.system_symbol().0,
            waypoint_symbol.0
        )));

        Self::make_api_call(request).await
    }

    async fn get_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetShipyardResponse> {
        let request = self.client.get(self.url(&format!(
            "/systems/{}/waypoints/{}/shipyard",
            waypoint_symbol.system_symbol().0,
            waypoint_symbol.0
        )));

        Self::make_api_call(request).await
    }

    async fn get_construction_site(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetConstructionResponse> {
        let request = self.client.get(self.url(&format!(
            "/systems/{}/waypoints/{}/construction",
            waypoint_symbol.system_symbol().0,
            waypoint_symbol.0
        )));

        Self::make_api_call(request).await
    }

    async fn dock_ship(&self, ship_symbol: &ShipSymbol) -> Result<DockShipResponse> {
        Self::make_api_call(self.client.post(self.url(&format!("/my/ships/{}/dock", ship_symbol.0)))).await
    }

    async fn orbit_ship(&self, ship_symbol: &ShipSymbol) -> Result<OrbitShipResponse> {
        Self::make_api_call(self.client.post(self.url(&format!("/my/ships/{}/orbit", ship_symbol.0)))).await
    }

    async fn set_flight_mode(&self, ship_symbol: &ShipSymbol, mode: &FlightMode) -> Result<PatchShipNavResponse> {
        Self::make_api_call(
            self.client
                .patch(self.url(&format!("/my/ships/{}/nav", ship_symbol.0)))
                .json(&PatchShipNavRequest { flight_mode: *mode }),
        )
        .await
    }

    async fn navigate(&self, ship_symbol: &ShipSymbol, to: &WaypointSymbol) -> Result<NavigateShipResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/navigate", ship_symbol.0)))
                .json(&NavigateShipRequest { waypoint_symbol: to.clone() }),
        )
        .await
    }

    async fn refuel(&self, ship_symbol: &ShipSymbol, units: u32) -> Result<RefuelShipResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/refuel", ship_symbol.0)))
                .json(&RefuelShipRequest { units }),
        )
        .await
    }

    async fn purchase_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<PurchaseCargoResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/purchase", ship_symbol.0)))
                .json(&TradeCargoRequest { symbol: good.clone(), units }),
        )
        .await
    }

    async fn sell_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<SellCargoResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/sell", ship_symbol.0)))
                .json(&TradeCargoRequest { symbol: good.clone(), units }),
        )
        .await
    }

    async fn jettison_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<JettisonCargoResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/jettison", ship_symbol.0)))
                .json(&TradeCargoRequest { symbol: good.clone(), units }),
        )
        .await
    }

    async fn extract_resources(&self, ship_symbol: &ShipSymbol) -> Result<ExtractResourcesResponse> {
        Self::make_api_call(self.client.post(self.url(&format!("/my/ships/{}/extract", ship_symbol.0)))).await
    }

    async fn extract_resources_with_survey(&self, ship_symbol: &ShipSymbol, survey: &Survey) -> Result<ExtractResourcesResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!("/my/ships/{}/extract/survey", ship_symbol.0)))
                .json(survey),
        )
        .await
    }

    async fn siphon_resources(&self, ship_symbol: &ShipSymbol) -> Result<SiphonResourcesResponse> {
        Self::make_api_call(self.client.post(self.url(&format!("/my/ships/{}/siphon", ship_symbol.0)))).await
    }

    async fn create_survey(&self, ship_symbol: &ShipSymbol) -> Result<CreateSurveyResponse> {
        Self::make_api_call(self.client.post(self.url(&format!("/my/ships/{}/survey", ship_symbol.0)))).await
    }

    async fn supply_construction(
        &self,
        waypoint_symbol: &WaypointSymbol,
        ship_symbol: &ShipSymbol,
        good: &TradeGoodSymbol,
        units: u32,
    ) -> Result<SupplyConstructionResponse> {
        Self::make_api_call(
            self.client
                .post(self.url(&format!(
                    "/systems/{}/waypoints/{}/construction/supply",
                    waypoint_symbol.system_symbol().0,
                    waypoint_symbol.0
                )))
                .json(&SupplyConstructionRequest {
                    ship_symbol: ship_symbol.clone(),
                    trade_symbol: good.clone(),
                    units,
                }),
        )
        .await
    }

    async fn purchase_ship(&self, ship_type: ShipType, waypoint_symbol: &WaypointSymbol) -> Result<PurchaseShipResponse> {
        Self::make_api_call(self.client.post(self.url("/my/ships")).json(&PurchaseShipRequest {
            ship_type,
            waypoint_symbol: waypoint_symbol.clone(),
        }))
        .await
    }
}

#[automock]
#[async_trait]
pub trait ApiClientTrait: Send + Sync + Debug {
    async fn register(&self, registration_request: RegistrationRequest) -> Result<RegistrationResponse>;

    async fn get_agent(&self) -> Result<GetAgentResponse>;

    async fn list_ships(&self, pagination_input: PaginationInput) -> Result<PaginatedResponse<Ship>>;

    async fn list_systems_page(&self, pagination_input: PaginationInput) -> Result<PaginatedResponse<SystemListingEntry>>;

    async fn list_waypoints_of_system_page(
        &self,
        system_symbol: &SystemSymbol,
        pagination_input: PaginationInput,
    ) -> Result<PaginatedResponse<Waypoint>>;

    async fn get_marketplace(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetMarketResponse>;

    async fn get_shipyard(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetShipyardResponse>;

    async fn get_construction_site(&self, waypoint_symbol: &WaypointSymbol) -> Result<GetConstructionResponse>;

    async fn dock_ship(&self, ship_symbol: &ShipSymbol) -> Result<DockShipResponse>;

    async fn orbit_ship(&self, ship_symbol: &ShipSymbol) -> Result<OrbitShipResponse>;

    async fn set_flight_mode(&self, ship_symbol: &ShipSymbol, mode: &FlightMode) -> Result<PatchShipNavResponse>;

    async fn navigate(&self, ship_symbol: &ShipSymbol, to: &WaypointSymbol) -> Result<NavigateShipResponse>;

    async fn refuel(&self, ship_symbol: &ShipSymbol, units: u32) -> Result<RefuelShipResponse>;

    async fn purchase_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<PurchaseCargoResponse>;

    async fn sell_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<SellCargoResponse>;

    async fn jettison_cargo(&self, ship_symbol: &ShipSymbol, good: &TradeGoodSymbol, units: u32) -> Result<JettisonCargoResponse>;

    async fn extract_resources(&self, ship_symbol: &ShipSymbol) -> Result<ExtractResourcesResponse>;

    async fn extract_resources_with_survey(&self, ship_symbol: &ShipSymbol, survey: &Survey) -> Result<ExtractResourcesResponse>;

    async fn siphon_resources(&self, ship_symbol: &ShipSymbol) -> Result<SiphonResourcesResponse>;

    async fn create_survey(&self, ship_symbol: &ShipSymbol) -> Result<CreateSurveyResponse>;

    async fn supply_construction(
        &self,
        waypoint_symbol: &WaypointSymbol,
        ship_symbol: &ShipSymbol,
        good: &TradeGoodSymbol,
        units: u32,
    ) -> Result<SupplyConstructionResponse>;

    async fn purchase_ship(&self, ship_type: ShipType, waypoint_symbol: &WaypointSymbol) -> Result<PurchaseShipResponse>;
}

#[cfg(test)]
mod test {
    use super::*;
    use ft_domain::{Data, MarketData, NavStatus, TradeGoodSymbol};

    #[test]
    fn test_decode_registration_response() {
        let registration_json = r#"{"data":{"token":"eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.payload.signature","agent":{"accountId":"clzsskbz7ih38s60ci1xwiau1","symbol":"FLWI_TEST","headquarters":"X1-GY87-A1","credits":175000,"startingFaction":"ASTRO","shipCount":0}}}"#;

        let Data { data: registration }: RegistrationResponse = serde_json::from_str(registration_json).unwrap();

        assert!(registration.token.starts_with("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert_eq!(registration.agent.credits, 175_000);
        assert_eq!(registration.agent.headquarters.0, "X1-GY87-A1");
    }

    #[test]
    fn test_decode_get_market_response() {
        let market_json = r#"{"data":{"symbol":"X1-BM40-A2","imports":[{"symbol":"SHIP_PLATING","name":"Ship Plating","description":"High-quality metal plating used in the construction of ship hulls and other structural components."},{"symbol":"SHIP_PARTS","name":"Ship Parts","description":"Various components and hardware required for spacecraft maintenance, upgrades, and construction."}],"exports":[],"exchange":[{"symbol":"FUEL","name":"Fuel","description":"High-energy fuel used in spacecraft propulsion systems to enable long-distance space travel."}]}}"#;

        let Data { data: market_data }: Data<MarketData> = serde_json::from_str(market_json).unwrap();

        assert_eq!(
            market_data
                .exchange
                .iter()
                .map(|tg| tg.symbol.clone())
                .collect::<Vec<TradeGoodSymbol>>(),
            vec![TradeGoodSymbol("FUEL".to_string())]
        );
        assert!(market_data.exports.is_empty());
        assert!(!market_data.has_detailed_price_information());
    }

    #[test]
    fn test_decode_ship() {
        let ship_json = r#"{"symbol":"FLWI_TEST-1","nav":{"systemSymbol":"X1-GY87","waypointSymbol":"X1-GY87-A1","route":{"origin":{"symbol":"X1-GY87-A1","type":"PLANET","systemSymbol":"X1-GY87","x":-6,"y":25},"destination":{"symbol":"X1-GY87-A1","type":"PLANET","systemSymbol":"X1-GY87","x":-6,"y":25},"arrival":"2024-08-13T19:04:18.732Z","departureTime":"2024-08-13T19:04:18.732Z"},"status":"DOCKED","flightMode":"CRUISE"},"fuel":{"current":400,"capacity":400,"consumed":{"amount":0,"timestamp":"2024-08-13T19:04:18.732Z"}},"cooldown":{"shipSymbol":"FLWI_TEST-1","totalSeconds":0,"remainingSeconds":0},"frame":{"symbol":"FRAME_FRIGATE","name":"Frigate","condition":1,"integrity":1},"engine":{"symbol":"ENGINE_ION_DRIVE_II","name":"Ion Drive II","condition":1,"integrity":1,"speed":30},"mounts":[{"symbol":"MOUNT_SENSOR_ARRAY_II","name":"Sensor Array II"},{"symbol":"MOUNT_GAS_SIPHON_II","name":"Gas Siphon II"},{"symbol":"MOUNT_MINING_LASER_II","name":"Mining Laser II"},{"symbol":"MOUNT_SURVEYOR_II","name":"Surveyor II"}],"registration":{"name":"FLWI_TEST-1","factionSymbol":"ASTRO","role":"COMMAND"},"cargo":{"capacity":40,"units":0,"inventory":[]}}"#;

        let ship: Ship = serde_json::from_str(ship_json).unwrap();

        assert_eq!(ship.nav.status, NavStatus::Docked);
        assert_eq!(ship.engine.speed, 30);
        assert_eq!(ship.cargo.capacity, 40);
        assert_eq!(ship.mounts.len(), 4);
    }

    #[test]
    fn test_decode_api_error_body() {
        let error_json = r#"{"error":{"code":4224,"message":"Ship survey failed. Target signature is no longer in range or valid."}}"#;
        let envelope: ApiErrorEnvelope = serde_json::from_str(error_json).unwrap();
        assert_eq!(envelope.error.code, ERROR_SURVEY_EXPIRED);
    }
}
