pub mod agent;
pub mod api_client;
pub mod configuration;
pub mod fleet;
pub mod ledger;
pub mod missions;
pub mod pagination;
pub mod pathfinder;
pub mod reqwest_helpers;
pub mod scheduler;
pub mod ship;
pub mod universe;
