//! Arena battle engine: commander-led armies in eight-slot formations fight turn by turn, and a
//! Monte Carlo runner repeats the fight to estimate win rates.

pub mod cli;
pub mod combat;
pub mod data;
pub mod parallel;
pub mod server;
pub mod simulation;
pub mod telemetry;
