use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use ft_domain::{classify_ship, JobSpec, JobStatus, ShipClass, ShipSymbol, WaypointSymbol};
use ft_store::{Ctx, JobBmcTrait};
use itertools::Itertools;
use tracing::{error, info, span, warn, Instrument, Level};

use crate::agent::Agent;
use crate::missions::{run_job, MissionContext};
use crate::ship::ShipOperations;

/// What to do when a job needs a ship the fleet doesn't have and the
/// purchase can't be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PurchaseFailurePolicy {
    /// Leave the job unassigned and log it; try again next run.
    SkipAndLog,
    /// Abort the whole agent run.
    Fatal,
}

/// Outcome of one matching pass, before any purchase is attempted.
#[derive(Debug, PartialEq, Eq)]
pub struct SchedulePass {
    /// The statuses to persist, stale entries already dropped.
    pub statuses: Vec<JobStatus>,
    /// Jobs left without a ship, with the class a purchase would need.
    pub unfilled: Vec<(JobSpec, ShipClass)>,
}

/// Match jobs to ships, keeping prior assignments. Deterministic: jobs are
/// walked by descending priority then id, free ships by symbol, so re-runs
/// with unchanged inputs produce identical assignments.
pub fn plan_assignments(specs: &[JobSpec], previous: &[JobStatus], classes: &BTreeMap<ShipSymbol, ShipClass>) -> SchedulePass {
    // a prior assignment survives only while its spec is still configured
    // unchanged
    let kept: BTreeMap<&ft_domain::JobId, &JobStatus> = previous
        .iter()
        .filter(|status| specs.contains(&status.spec))
        .map(|status| (&status.spec.id, status))
        .collect();

    let ordered: Vec<&JobSpec> = specs
        .iter()
        .sorted_by_key(|spec| (std::cmp::Reverse(spec.priority), spec.id.clone()))
        .collect();

    // two persisted statuses can name the same ship; the higher-priority
    // job keeps it, the other is replanned from scratch
    let mut assigned: BTreeSet<ShipSymbol> = BTreeSet::new();
    let mut prior: BTreeMap<&ft_domain::JobId, ShipSymbol> = BTreeMap::new();
    for spec in &ordered {
        if let Some(ship) = kept.get(&spec.id).and_then(|status| status.ship.clone()) {
            if assigned.insert(ship.clone()) {
                prior.insert(&spec.id, ship);
            }
        }
    }

    let mut statuses = Vec::new();
    let mut unfilled = Vec::new();
    for spec in ordered {
        let ship = match prior.get(&spec.id).cloned() {
            Some(ship) => Some(ship),
            None => {
                let class = spec.kind.required_class();
                let free = classes
                    .iter()
                    .find(|(symbol, ship_class)| **ship_class == class && !assigned.contains(symbol))
                    .map(|(symbol, _)| symbol.clone());
                match free {
                    Some(symbol) => {
                        assigned.insert(symbol.clone());
                        Some(symbol)
                    }
                    None => {
                        unfilled.push((spec.clone(), class));
                        None
                    }
                }
            }
        };
        statuses.push(JobStatus { spec: spec.clone(), ship });
    }

    SchedulePass { statuses, unfilled }
}

/// The cheapest cached shipyard selling `class`, restricted to shipyards
/// where one of our ships is parked. Buying requires a ship on site.
async fn purchase_site(ctx: &MissionContext, agent: &Agent, specs: &[JobSpec], class: ShipClass) -> Result<Option<(WaypointSymbol, i64)>> {
    let ship_type = class.ship_type();
    let systems: BTreeSet<_> = specs.iter().map(|spec| spec.kind.system()).collect();

    let mut candidates: Vec<(WaypointSymbol, i64)> = Vec::new();
    for system_symbol in systems {
        let system = ctx.universe.get_system(&system_symbol).await?;
        for waypoint in system.waypoints.iter().filter(|w| w.is_shipyard()) {
            let Some(shipyard) = ctx.universe.get_local_shipyard(&waypoint.symbol).await? else {
                continue;
            };
            if !shipyard.sells(&ship_type) {
                continue;
            }
            let Some(price) = shipyard.listed_price(&ship_type) else {
                continue;
            };
            candidates.push((waypoint.symbol.clone(), price));
        }
    }
    candidates.sort_by_key(|(waypoint, price)| (*price, waypoint.clone()));

    Ok(candidates
        .into_iter()
        .find(|(waypoint, _)| agent.ships.iter().any(|ship| &ship.nav.waypoint_symbol == waypoint)))
}

/// Drives one agent: match jobs to ships, buy missing hulls, spawn one
/// mission task per assignment and supervise them.
#[derive(Debug)]
pub struct Scheduler {
    pub ctx: Ctx,
    pub specs: Vec<JobSpec>,
    pub job_store: Arc<dyn JobBmcTrait>,
    pub mission_ctx: MissionContext,
    pub purchase_failure_policy: PurchaseFailurePolicy,
}

impl Scheduler {
    async fn fill_by_purchase(&self, agent: &mut Agent, pass: &mut SchedulePass) -> Result<()> {
        for (spec, class) in std::mem::take(&mut pass.unfilled) {
            let site = purchase_site(&self.mission_ctx, agent, &self.specs, class).await?;
            let bought = match site {
                None => {
                    warn!(agent = %self.ctx.agent_symbol, "no reachable shipyard sells a {} for job {}", class, spec.id);
                    None
                }
                Some((waypoint, price)) => {
                    if agent.info.lock().await.credits < price {
                        warn!(agent = %self.ctx.agent_symbol, "cannot afford a {} at {} ({})", class, waypoint, price);
                        None
                    } else {
                        match agent.purchase_ship(class.ship_type(), &waypoint).await {
                            Ok(ship) => Some(ship),
                            Err(e) => {
                                warn!(agent = %self.ctx.agent_symbol, "purchase of {} at {} failed: {:#}", class, waypoint, e);
                                None
                            }
                        }
                    }
                }
            };

            match bought {
                Some(ship) => {
                    let status = pass
                        .statuses
                        .iter_mut()
                        .find(|status| status.spec.id == spec.id)
                        .filter(|status| status.ship.is_none());
                    if let Some(status) = status {
                        info!(agent = %self.ctx.agent_symbol, "assigning fresh {} to job {}", ship.symbol, spec.id);
                        status.ship = Some(ship.symbol.clone());
                    }
                }
                None if self.purchase_failure_policy == PurchaseFailurePolicy::Fatal => {
                    bail!("could not staff job {} with a {}", spec.id, class)
                }
                None => {}
            }
        }
        Ok(())
    }

    /// One full scheduling run: plan, purchase, persist, launch, supervise.
    /// Returns when every mission task has ended.
    pub async fn run(&self, agent: &mut Agent) -> Result<()> {
        let mut classes: BTreeMap<ShipSymbol, ShipClass> = BTreeMap::new();
        for ship in &agent.ships {
            classes.insert(ship.symbol.clone(), classify_ship(ship)?);
        }

        let previous = self.job_store.load_job_statuses(&self.ctx).await?;
        let mut pass = plan_assignments(&self.specs, &previous, &classes);
        self.fill_by_purchase(agent, &mut pass).await?;
        self.job_store.save_job_statuses(&self.ctx, &pass.statuses).await?;

        let assigned = pass.statuses.iter().filter(|s| s.ship.is_some()).count();
        info!(
            agent = %self.ctx.agent_symbol,
            "launching {} of {} jobs ({} ships)", assigned, pass.statuses.len(), agent.ships.len()
        );

        let mut tasks = Vec::new();
        for status in &pass.statuses {
            let Some(ship_symbol) = &status.ship else {
                warn!(agent = %self.ctx.agent_symbol, "job {} stays unstaffed this run", status.spec.id);
                continue;
            };
            let Some(ship) = agent.ships.iter().find(|s| &s.symbol == ship_symbol).cloned() else {
                bail!("job {} is assigned to unknown ship {}", status.spec.id, ship_symbol);
            };

            let ops = ShipOperations::new(Arc::clone(&agent.api), Arc::clone(&agent.info), ship);
            let mission_span = span!(Level::INFO, "mission", ship = %ship_symbol, job = %status.spec.id);
            let handle = tokio::spawn(run_job(self.mission_ctx.clone(), ops, status.spec.kind.clone()).instrument(mission_span));
            tasks.push((ship_symbol.clone(), handle));
        }

        // one ship's failure never stops its siblings
        for (ship_symbol, handle) in tasks {
            match handle.await {
                Ok(Ok(())) => info!(ship = %ship_symbol, "mission task finished"),
                Ok(Err(e)) => error!(ship = %ship_symbol, "mission task failed: {:#}", e),
                Err(e) => error!(ship = %ship_symbol, "mission task panicked: {}", e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_domain::{JobId, JobKind, SystemSymbol};

    fn spec(id: &str, priority: u32, kind: JobKind) -> JobSpec {
        JobSpec {
            id: JobId(id.to_string()),
            kind,
            priority,
        }
    }

    fn probe_job(id: &str, priority: u32, waypoint: &str) -> JobSpec {
        spec(
            id,
            priority,
            JobKind::IdleProbe {
                waypoint: WaypointSymbol(waypoint.to_string()),
            },
        )
    }

    fn trade_job(id: &str, priority: u32) -> JobSpec {
        spec(
            id,
            priority,
            JobKind::Trade {
                system: SystemSymbol("X1-GY87".to_string()),
            },
        )
    }

    fn classes(entries: &[(&str, ShipClass)]) -> BTreeMap<ShipSymbol, ShipClass> {
        entries
            .iter()
            .map(|(symbol, class)| (ShipSymbol(symbol.to_string()), *class))
            .collect()
    }

    #[test]
    fn high_priority_jobs_get_ships_first() {
        let specs = vec![
            probe_job("probe-a1", 0, "X1-GY87-A1"),
            probe_job("probe-h52", 100, "X1-GY87-H52"),
        ];
        let fleet = classes(&[("FLWI-2", ShipClass::Probe)]);

        let pass = plan_assignments(&specs, &[], &fleet);

        let staffed: Vec<_> = pass.statuses.iter().filter(|s| s.ship.is_some()).collect();
        assert_eq!(staffed.len(), 1);
        assert_eq!(staffed[0].spec.id, JobId("probe-h52".to_string()));
        assert_eq!(pass.unfilled.len(), 1);
        assert_eq!(pass.unfilled[0].0.id, JobId("probe-a1".to_string()));
    }

    #[test]
    fn prior_assignments_are_kept() {
        let specs = vec![trade_job("trade-1", 10)];
        let fleet = classes(&[("FLWI-1", ShipClass::LightHauler), ("FLWI-9", ShipClass::LightHauler)]);
        let previous = vec![JobStatus {
            spec: specs[0].clone(),
            ship: Some(ShipSymbol("FLWI-9".to_string())),
        }];

        let pass = plan_assignments(&specs, &previous, &fleet);
        assert_eq!(pass.statuses[0].ship, Some(ShipSymbol("FLWI-9".to_string())));
    }

    #[test]
    fn stale_statuses_are_dropped() {
        let specs = vec![trade_job("trade-1", 10)];
        let fleet = classes(&[("FLWI-1", ShipClass::LightHauler)]);
        let previous = vec![JobStatus {
            spec: trade_job("trade-removed", 10),
            ship: Some(ShipSymbol("FLWI-1".to_string())),
        }];

        let pass = plan_assignments(&specs, &previous, &fleet);

        assert_eq!(pass.statuses.len(), 1);
        assert_eq!(pass.statuses[0].spec.id, JobId("trade-1".to_string()));
        // the ship freed by the stale status is reusable immediately
        assert_eq!(pass.statuses[0].ship, Some(ShipSymbol("FLWI-1".to_string())));
    }

    #[test]
    fn a_changed_spec_invalidates_its_assignment() {
        let old = probe_job("probe-1", 0, "X1-GY87-A1");
        let new = probe_job("probe-1", 0, "X1-GY87-B3");
        let fleet = classes(&[("FLWI-2", ShipClass::Probe)]);
        let previous = vec![JobStatus {
            spec: old,
            ship: Some(ShipSymbol("FLWI-2".to_string())),
        }];

        let pass = plan_assignments(&[new.clone()], &previous, &fleet);
        // reassigned from scratch against the new spec
        assert_eq!(pass.statuses[0].spec, new);
        assert_eq!(pass.statuses[0].ship, Some(ShipSymbol("FLWI-2".to_string())));
    }

    #[test]
    fn a_double_booked_ship_stays_with_the_higher_priority_job() {
        let specs = vec![
            probe_job("probe-a1", 0, "X1-GY87-A1"),
            probe_job("probe-h52", 100, "X1-GY87-H52"),
        ];
        let fleet = classes(&[("FLWI-2", ShipClass::Probe), ("FLWI-3", ShipClass::Probe)]);
        // both persisted statuses name FLWI-2
        let previous = vec![
            JobStatus {
                spec: specs[0].clone(),
                ship: Some(ShipSymbol("FLWI-2".to_string())),
            },
            JobStatus {
                spec: specs[1].clone(),
                ship: Some(ShipSymbol("FLWI-2".to_string())),
            },
        ];

        let pass = plan_assignments(&specs, &previous, &fleet);

        let ship_of = |id: &str| {
            pass.statuses
                .iter()
                .find(|status| status.spec.id == JobId(id.to_string()))
                .and_then(|status| status.ship.clone())
        };
        assert_eq!(ship_of("probe-h52"), Some(ShipSymbol("FLWI-2".to_string())));
        assert_eq!(ship_of("probe-a1"), Some(ShipSymbol("FLWI-3".to_string())));
    }

    #[test]
    fn replanning_is_deterministic() {
        let specs = vec![
            probe_job("probe-a1", 0, "X1-GY87-A1"),
            probe_job("probe-b3", 0, "X1-GY87-B3"),
            trade_job("trade-1", 10),
        ];
        let fleet = classes(&[
            ("FLWI-1", ShipClass::LightHauler),
            ("FLWI-2", ShipClass::Probe),
            ("FLWI-3", ShipClass::Probe),
        ]);

        let first = plan_assignments(&specs, &[], &fleet);
        let second = plan_assignments(&specs, &first.statuses, &fleet);
        assert_eq!(first, second);
    }

    #[test]
    fn class_mismatches_are_never_assigned() {
        let specs = vec![trade_job("trade-1", 10)];
        let fleet = classes(&[("FLWI-2", ShipClass::Probe)]);

        let pass = plan_assignments(&specs, &[], &fleet);
        assert_eq!(pass.statuses[0].ship, None);
        assert_eq!(pass.unfilled, vec![(specs[0].clone(), ShipClass::LightHauler)]);
    }
}
