use std::path::PathBuf;

use clap::Parser;

use crate::fleet::FleetPlan;
use crate::scheduler::PurchaseFailurePolicy;

#[derive(Parser, Debug, Clone)]
#[command(name = "ft-agent", version, about = "Autonomous fleet trading agent")]
pub struct Config {
    /// Callsigns to run, one scheduler per agent.
    #[arg(long = "callsign", env = "FT_CALLSIGNS", value_delimiter = ',', required = true)]
    pub callsigns: Vec<String>,

    /// Faction to register new agents with.
    #[arg(long, env = "FT_FACTION", default_value = "COSMIC")]
    pub faction: String,

    #[arg(long, env = "FT_BASE_URL", default_value = "https://api.spacetraders.io/v2")]
    pub base_url: String,

    /// Root directory of the document store.
    #[arg(long, env = "FT_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Global budget for outbound api calls.
    #[arg(long, env = "FT_REQUESTS_PER_SECOND", default_value_t = 2)]
    pub requests_per_second: u32,

    #[arg(long, env = "FT_PURCHASE_FAILURE_POLICY", value_enum, default_value_t = PurchaseFailurePolicy::SkipAndLog)]
    pub purchase_failure_policy: PurchaseFailurePolicy,

    /// Haulers running arbitrage trades in the home system.
    #[arg(long, env = "FT_HAULERS", default_value_t = 2)]
    pub haulers: u32,

    /// Haulers supplying the jump gate construction.
    #[arg(long, env = "FT_CONSTRUCTION_HAULERS", default_value_t = 0)]
    pub construction_haulers: u32,

    #[arg(long, env = "FT_MINING_DRONES", default_value_t = 0)]
    pub mining_drones: u32,

    #[arg(long, env = "FT_SIPHON_DRONES", default_value_t = 0)]
    pub siphon_drones: u32,
}

impl Config {
    pub fn fleet_plan(&self) -> FleetPlan {
        FleetPlan {
            haulers: self.haulers,
            construction_haulers: self.construction_haulers,
            mining_drones: self.mining_drones,
            siphon_drones: self.siphon_drones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_callsigns_is_a_usage_error() {
        assert!(Config::try_parse_from(["ft-agent"]).is_err());
    }

    #[test]
    fn callsigns_split_on_commas() {
        let config = Config::try_parse_from(["ft-agent", "--callsign", "FLWI,FLWI-TEST"]).unwrap();
        assert_eq!(config.callsigns, vec!["FLWI".to_string(), "FLWI-TEST".to_string()]);
        assert_eq!(config.haulers, 2);
        assert_eq!(config.purchase_failure_policy, PurchaseFailurePolicy::SkipAndLog);
    }

    #[test]
    fn the_purchase_failure_policy_is_selectable() {
        let config = Config::try_parse_from(["ft-agent", "--callsign", "FLWI", "--purchase-failure-policy", "fatal"]).unwrap();
        assert_eq!(config.purchase_failure_policy, PurchaseFailurePolicy::Fatal);
    }
}
