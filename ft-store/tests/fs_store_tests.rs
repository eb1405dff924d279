use std::collections::BTreeMap;

use ft_domain::{
    ActivityLevel, AgentInfo, AgentSymbol, Construction, ConstructionMaterial, FlowKey, MarketData, Mission,
    RegistrationBody, ShipSymbol, SupplyLevel, SystemLedger, SystemSymbol, TradeGoodSymbol, TradeMission,
    TradeMissionStatus, TradeStop, WaypointSymbol,
};
use ft_store::{Bmc, Ctx, FsBmc, FsModelManager};

fn fs_bmc(dir: &tempfile::TempDir) -> FsBmc {
    FsBmc::new(FsModelManager::new(dir.path()))
}

#[tokio::test]
async fn missing_documents_read_as_none_or_empty() {
    let dir = tempfile::tempdir().unwrap();
    let bmc = fs_bmc(&dir);
    let ctx = Ctx::for_agent(AgentSymbol("FLWI-TEST".to_string()));

    assert!(bmc.agent_bmc().load_registration(&ctx).await.unwrap().is_none());
    assert!(bmc
        .world_cache_bmc()
        .load_local_market(&WaypointSymbol("X1-GY87-A1".to_string()))
        .await
        .unwrap()
        .is_none());
    assert!(bmc.job_bmc().load_job_statuses(&ctx).await.unwrap().is_empty());

    let ledger = bmc
        .ledger_bmc()
        .load_system_ledger(&SystemSymbol("X1-GY87".to_string()))
        .await
        .unwrap();
    assert!(ledger.flows.is_empty());
}

#[tokio::test]
async fn registration_round_trips_per_agent() {
    let dir = tempfile::tempdir().unwrap();
    let bmc = fs_bmc(&dir);
    let ctx = Ctx::for_agent(AgentSymbol("FLWI-TEST".to_string()));

    let registration = RegistrationBody {
        token: "secret-token".to_string(),
        agent: AgentInfo {
            symbol: AgentSymbol("FLWI-TEST".to_string()),
            headquarters: WaypointSymbol("X1-GY87-A1".to_string()),
            credits: 175_000,
            starting_faction: "COSMIC".to_string(),
            ship_count: Some(2),
        },
    };
    bmc.agent_bmc().save_registration(&ctx, &registration).await.unwrap();

    let loaded = bmc.agent_bmc().load_registration(&ctx).await.unwrap().unwrap();
    assert_eq!(loaded.token, "secret-token");
    assert_eq!(loaded.agent.credits, 175_000);

    // a different agent doesn't see it
    let other = Ctx::for_agent(AgentSymbol("FLWI-OTHER".to_string()));
    assert!(bmc.agent_bmc().load_registration(&other).await.unwrap().is_none());
}

#[tokio::test]
async fn local_and_remote_market_documents_are_separate() {
    let dir = tempfile::tempdir().unwrap();
    let bmc = fs_bmc(&dir);
    let waypoint = WaypointSymbol("X1-GY87-A1".to_string());

    let remote = MarketData {
        symbol: waypoint.clone(),
        exports: vec![],
        imports: vec![],
        exchange: vec![],
        trade_goods: None,
        retrieved_at: None,
    };
    bmc.world_cache_bmc().save_remote_market(&remote).await.unwrap();

    assert!(bmc
        .world_cache_bmc()
        .load_local_market(&waypoint)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        bmc.world_cache_bmc().load_remote_market(&waypoint).await.unwrap(),
        Some(remote)
    );
}

#[tokio::test]
async fn ledger_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let system = SystemSymbol("X1-GY87".to_string());

    let mut ledger = SystemLedger::default();
    ledger.reserve(
        &ShipSymbol("FLWI-TEST-3".to_string()),
        BTreeMap::from([(
            FlowKey {
                waypoint: WaypointSymbol("X1-GY87-A1".to_string()),
                good: TradeGoodSymbol("FAB_MATS".to_string()),
            },
            -40,
        )]),
    );

    {
        let bmc = fs_bmc(&dir);
        bmc.ledger_bmc().save_system_ledger(&system, &ledger).await.unwrap();
    }

    // fresh handle over the same directory
    let bmc = fs_bmc(&dir);
    let loaded = bmc.ledger_bmc().load_system_ledger(&system).await.unwrap();
    assert_eq!(loaded, ledger);
}

#[tokio::test]
async fn mission_documents_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let bmc = fs_bmc(&dir);
    let ship = ShipSymbol("FLWI-TEST-3".to_string());

    let mission = Mission::Trade(TradeMission {
        good: TradeGoodSymbol("FAB_MATS".to_string()),
        units: 80,
        buy: TradeStop {
            waypoint: WaypointSymbol("X1-GY87-A1".to_string()),
            trade_volume: 40,
            price: 2500,
            supply: SupplyLevel::High,
            activity: Some(ActivityLevel::Strong),
        },
        sell: TradeStop {
            waypoint: WaypointSymbol("X1-GY87-B3".to_string()),
            trade_volume: 40,
            price: 3100,
            supply: SupplyLevel::Scarce,
            activity: None,
        },
        status: TradeMissionStatus::Buy,
    });

    bmc.mission_bmc().save_mission(&ship, &mission).await.unwrap();
    assert_eq!(bmc.mission_bmc().load_mission(&ship).await.unwrap(), Some(mission));
}

#[tokio::test]
async fn construction_site_overwrites_keep_the_latest_state() {
    let dir = tempfile::tempdir().unwrap();
    let bmc = fs_bmc(&dir);
    let site = WaypointSymbol("X1-GY87-I55".to_string());

    let mut construction = Construction {
        symbol: site.clone(),
        materials: vec![ConstructionMaterial {
            trade_symbol: TradeGoodSymbol("FAB_MATS".to_string()),
            required: 4000,
            fulfilled: 1200,
        }],
        is_complete: false,
    };
    bmc.world_cache_bmc().save_remote_construction(&construction).await.unwrap();

    construction.materials[0].fulfilled = 1280;
    bmc.world_cache_bmc().save_remote_construction(&construction).await.unwrap();

    let loaded = bmc
        .world_cache_bmc()
        .load_remote_construction(&site)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.materials[0].fulfilled, 1280);
}
