//! channelnet campaign harness
//!
//! Generates a random payment-channel network, provisions it on an external
//! ledger, and drives a randomized payment campaign while aggregating
//! windowed statistics.
//!
//! # Modules
//!
//! - [`topology`]: connected weighted graph generation
//! - [`provision`]: participant registration and channel opening
//! - [`policy`]: pluggable (sender, receiver) selection strategies
//! - [`runner`]: the campaign driver and its statistics
//! - [`config`]: configuration types

pub mod config;
pub mod policy;
pub mod provision;
pub mod runner;
pub mod topology;

pub use config::{CampaignConfig, CapacitySplit, ConfigError, TopologyConfig};
pub use policy::{PairPolicy, PartitionedPairs, UniformPairs};
pub use provision::{ProvisionReport, Provisioner};
pub use runner::{Campaign, CampaignError, CampaignReport, CampaignStats};
pub use topology::{ChannelEdge, Topology};
