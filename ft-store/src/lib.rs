pub mod agent_bmc;
pub mod bmc;
pub mod ctx;
pub mod fs_model_manager;
pub mod job_bmc;
pub mod ledger_bmc;
pub mod mission_bmc;
pub mod world_cache_bmc;

pub use agent_bmc::*;
pub use bmc::*;
pub use ctx::*;
pub use fs_model_manager::*;
pub use job_bmc::*;
pub use ledger_bmc::*;
pub use mission_bmc::*;
pub use world_cache_bmc::*;
