pub mod error;
pub mod generator;
pub mod model;
pub mod probe;
pub mod report;
pub mod stop;
pub mod worker;

pub use error::{Error, Result};
pub use generator::LoadGenerator;
pub use model::{Failure, Outcome, RunConfig, RunResult, Target};
pub use stop::StopSignal;
