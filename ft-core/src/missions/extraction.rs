use anyhow::{bail, Result};
use ft_domain::{ExtractionMission, ExtractionMissionStatus, Mission, ShipMountSymbol, Survey, TradeGoodSymbol, WaypointSymbol};
use tracing::{debug, info};

use crate::missions::MissionContext;
use crate::ship::{ShipOperations, SurveyExtractionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Mine,
    Siphon,
}

fn has_surveyor(ship: &ShipOperations) -> bool {
    ship.mounts
        .iter()
        .any(|m| matches!(m.symbol, ShipMountSymbol::MOUNT_SURVEYOR_I | ShipMountSymbol::MOUNT_SURVEYOR_II))
}

/// Prefer the survey with the most deposits on the keep list; any survey
/// beats none.
pub(crate) fn pick_survey(surveys: Vec<Survey>, keep: &[TradeGoodSymbol]) -> Option<Survey> {
    surveys
        .into_iter()
        .max_by_key(|s| s.deposits.iter().filter(|d| keep.contains(&d.symbol)).count())
}

async fn execute_extract(
    ctx: &MissionContext,
    ship: &mut ShipOperations,
    mission: &mut ExtractionMission,
    keep: &[TradeGoodSymbol],
    method: ExtractionMethod,
) -> Result<()> {
    ship.goto(&ctx.universe, &mission.extraction_waypoint).await?;
    ship.orbit().await?;

    let use_surveys = method == ExtractionMethod::Mine && has_surveyor(ship);
    let mut survey: Option<Survey> = None;

    while ship.cargo.space_left() > 0 {
        match method {
            ExtractionMethod::Siphon => {
                ship.siphon().await?;
            }
            ExtractionMethod::Mine if use_surveys => {
                if survey.is_none() {
                    let body = ship.survey().await?;
                    survey = pick_survey(body.surveys, keep);
                }
                match &survey {
                    Some(s) => {
                        if let SurveyExtractionOutcome::SurveyExpired = ship.extract_with_survey(s).await? {
                            survey = None;
                            continue;
                        }
                    }
                    None => {
                        ship.extract().await?;
                    }
                }
            }
            ExtractionMethod::Mine => {
                ship.extract().await?;
            }
        }
        // an empty keep list keeps everything
        if !keep.is_empty() {
            ship.jettison_all_except(keep).await?;
        }
    }

    info!(ship = %ship.symbol, "hold full at {}, heading to {}", mission.extraction_waypoint, mission.sell_waypoint);
    mission.status = ExtractionMissionStatus::Sell;
    ctx.missions
        .save_mission(&ship.symbol, &Mission::Extraction(mission.clone()))
        .await
}

/// Sell what the market takes, jettison the rest.
async fn execute_sell(ctx: &MissionContext, ship: &mut ShipOperations, mission: &mut ExtractionMission) -> Result<()> {
    ship.goto(&ctx.universe, &mission.sell_waypoint).await?;
    let market = ship.refresh_market().await?;
    ctx.universe.save_local_market(market.clone()).await?;

    let inventory: Vec<_> = ship.cargo.inventory.iter().map(|i| (i.symbol.clone(), i.units)).collect();
    for (good, units) in inventory {
        if !market.trades(&good) {
            debug!(ship = %ship.symbol, "{} does not trade {}", mission.sell_waypoint, good);
            ship.jettison(&good, units).await?;
            continue;
        }
        let trade_volume = market.trade_good(&good).map(|g| g.trade_volume.max(1) as u32).unwrap_or(units);
        while ship.cargo.units_of(&good) > 0 {
            let chunk = ship.cargo.units_of(&good).min(trade_volume);
            ship.sell_good(&good, chunk).await?;
        }
    }

    let refreshed = ship.refresh_market().await?;
    ctx.universe.save_local_market(refreshed).await?;

    mission.status = ExtractionMissionStatus::Extract;
    ctx.missions
        .save_mission(&ship.symbol, &Mission::Extraction(mission.clone()))
        .await
}

/// Mine-or-siphon loop for one drone: fill the hold, sell, repeat.
pub async fn run_extraction(
    ctx: &MissionContext,
    ship: &mut ShipOperations,
    extraction_waypoint: &WaypointSymbol,
    sell_waypoint: &WaypointSymbol,
    keep: &[TradeGoodSymbol],
    method: ExtractionMethod,
) -> Result<()> {
    let mut mission = match ctx.missions.load_mission(&ship.symbol).await? {
        Some(Mission::Extraction(mission)) => mission,
        Some(other) => bail!("ship {} carries a non-extraction mission: {:?}", ship.symbol, other),
        None => {
            let mission = ExtractionMission {
                extraction_waypoint: extraction_waypoint.clone(),
                sell_waypoint: sell_waypoint.clone(),
                status: ExtractionMissionStatus::Extract,
            };
            ctx.missions
                .save_mission(&ship.symbol, &Mission::Extraction(mission.clone()))
                .await?;
            mission
        }
    };

    loop {
        match mission.status {
            ExtractionMissionStatus::Extract => execute_extract(ctx, ship, &mut mission, keep, method).await?,
            ExtractionMissionStatus::Sell => execute_sell(ctx, ship, &mut mission).await?,
        }
    }
}
