//! Integration tests for the SignalAir mesh core
//!
//! This test suite validates:
//! - Wire codec and validator working against the defense layer end to end
//! - Replay, dedup and admission behavior for realistic peer traffic
//! - Flood handling: fail-safe paths, overload signalling and recovery
//! - Periodic sweeps pruning state on a running node

pub mod test_utils;

#[cfg(test)]
mod mesh_scenarios;

#[cfg(test)]
mod flood_tests;
