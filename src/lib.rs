pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod labor;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod population;
pub mod production;
pub mod province;
pub mod types;
pub mod world;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod metrics_test;
