pub mod jobs;
pub mod ledger;
pub mod mission;
pub mod model;

pub use jobs::*;
pub use ledger::*;
pub use mission::*;
pub use model::*;
