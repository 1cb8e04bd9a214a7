//! Common functionality for compiling and optimising building energy systems.
#![warn(missing_docs)]
pub mod building;
pub mod carrier;
pub mod cli;
pub mod cluster;
pub mod component;
pub mod finance;
pub mod graph;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod problem;
pub mod profile;
pub mod settings;
pub mod solver;
pub mod subsidy;
pub mod time_index;
pub mod units;

#[cfg(test)]
mod fixture;
