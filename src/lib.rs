//! PrefNet - preference dynamics on agent networks.
//!
//! Agents hold preorders over a fixed set of alternatives and revise them
//! each round by combining their own view with their neighbors' views via
//! lattice meet and join.
//!
//! - [`relation`]: closed preference relations and their algebra
//! - [`agent`]: r-median aggregation and update policies
//! - [`network`]: topologies and synchronous update rounds
//! - [`greedy`]: greedy utility-maximizing preference construction
//! - [`experiment`]: seeded multi-trial runs and result files

pub mod agent;
pub mod error;
pub mod experiment;
pub mod greedy;
pub mod network;
pub mod relation;

pub use agent::{Agent, PreferenceSource, UpdatePolicy};
pub use error::{PreferenceError, Result};
pub use greedy::GreedyBuilder;
pub use network::{DistanceMatrix, Network, NodeId, Topology};
pub use relation::{CleanView, Relation};
