//! Provisioning phase: register participants and open channels.
//!
//! Each provisioning step is independent. A reverted registration or
//! channel open is collected into the returned outcome map and reported
//! after the phase completes; only transport errors abort the phase.

use crate::config::CapacitySplit;
use crate::topology::Topology;
use channelnet_ledger::{Ledger, LedgerError, Operation, Outcome, ParticipantId};
use tracing::{info, warn};

/// Runs the provisioning phase against an injected ledger.
pub struct Provisioner<'a> {
    ledger: &'a dyn Ledger,
    split: CapacitySplit,
}

impl<'a> Provisioner<'a> {
    pub fn new(ledger: &'a dyn Ledger, split: CapacitySplit) -> Self {
        Self { ledger, split }
    }

    /// Register every participant of the topology under a deterministic
    /// display name.
    pub async fn register_all(
        &self,
        topology: &Topology,
    ) -> Result<Vec<(ParticipantId, Outcome)>, LedgerError> {
        let mut outcomes = Vec::with_capacity(topology.participants() as usize);

        for id in (0..topology.participants()).map(ParticipantId) {
            let op = Operation::Register {
                id,
                name: format!("User_{id}"),
            };
            let outcome = self.ledger.execute(&op).await?;

            match &outcome {
                Outcome::Success => info!(user = %id, "Registered participant"),
                Outcome::Failure { reason } => {
                    warn!(user = %id, reason = %reason, "Registration reverted")
                }
            }
            outcomes.push((id, outcome));
        }

        Ok(outcomes)
    }

    /// Open one channel per topology edge, crediting each side according to
    /// the configured capacity split.
    pub async fn open_channels(
        &self,
        topology: &Topology,
    ) -> Result<Vec<((ParticipantId, ParticipantId), Outcome)>, LedgerError> {
        let mut outcomes = Vec::with_capacity(topology.edge_count());

        for edge in topology.edges() {
            let op = Operation::OpenChannel {
                a: edge.a,
                b: edge.b,
                capacity: self.split.per_side(edge.capacity),
            };
            let outcome = self.ledger.execute(&op).await?;

            match &outcome {
                Outcome::Success => info!(
                    a = %edge.a,
                    b = %edge.b,
                    combined = edge.capacity,
                    "Opened channel"
                ),
                Outcome::Failure { reason } => {
                    warn!(a = %edge.a, b = %edge.b, reason = %reason, "Channel open reverted")
                }
            }
            outcomes.push(((edge.a, edge.b), outcome));
        }

        Ok(outcomes)
    }

    /// Run both provisioning steps and summarize the results.
    pub async fn provision(&self, topology: &Topology) -> Result<ProvisionReport, LedgerError> {
        let registrations = self.register_all(topology).await?;
        let channels = self.open_channels(topology).await?;

        Ok(ProvisionReport {
            registered: count_successes(registrations.iter().map(|(_, o)| o)),
            registration_failures: registrations.len() as u64
                - count_successes(registrations.iter().map(|(_, o)| o)),
            channels_opened: count_successes(channels.iter().map(|(_, o)| o)),
            channel_failures: channels.len() as u64
                - count_successes(channels.iter().map(|(_, o)| o)),
        })
    }
}

fn count_successes<'a>(outcomes: impl Iterator<Item = &'a Outcome>) -> u64 {
    outcomes.filter(|o| o.is_success()).count() as u64
}

/// Summary of a completed provisioning phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisionReport {
    pub registered: u64,
    pub registration_failures: u64,
    pub channels_opened: u64,
    pub channel_failures: u64,
}

impl ProvisionReport {
    /// Print the summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Provisioning ===");
        println!(
            "Registered: {} (failed: {})",
            self.registered, self.registration_failures
        );
        println!(
            "Channels opened: {} (failed: {})",
            self.channels_opened, self.channel_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use channelnet_ledger::InMemoryLedger;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_topology() -> Topology {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let config = TopologyConfig::new(6)
            .with_attachment_factor(2)
            .with_mean_capacity(8.0);
        Topology::generate(&config, &mut rng).unwrap()
    }

    #[tokio::test]
    async fn test_provision_registers_all_and_opens_all() {
        let ledger = InMemoryLedger::new();
        let topology = small_topology();
        let provisioner = Provisioner::new(&ledger, CapacitySplit::HalfPerSide);

        let report = provisioner.provision(&topology).await.unwrap();
        assert_eq!(report.registered, 6);
        assert_eq!(report.registration_failures, 0);
        assert_eq!(report.channels_opened, topology.edge_count() as u64);
        assert_eq!(report.channel_failures, 0);

        for id in 0..6 {
            assert!(ledger.is_registered(ParticipantId(id)).await);
        }
    }

    #[tokio::test]
    async fn test_repeated_provisioning_collects_failures_without_aborting() {
        let ledger = InMemoryLedger::new();
        let topology = small_topology();
        let provisioner = Provisioner::new(&ledger, CapacitySplit::HalfPerSide);

        provisioner.provision(&topology).await.unwrap();
        // Second pass: every step reverts, none is fatal.
        let report = provisioner.provision(&topology).await.unwrap();
        assert_eq!(report.registered, 0);
        assert_eq!(report.registration_failures, 6);
        assert_eq!(report.channels_opened, 0);
        assert_eq!(report.channel_failures, topology.edge_count() as u64);
    }

    #[tokio::test]
    async fn test_capacity_split_applied_per_side() {
        let ledger = InMemoryLedger::new();
        let topology = small_topology();

        let provisioner = Provisioner::new(&ledger, CapacitySplit::WholeWeight);
        provisioner.provision(&topology).await.unwrap();

        let edge = topology.edges()[0];
        let (low, high) = ledger.channel_balance(edge.a, edge.b).await.unwrap();
        assert_eq!(low, edge.capacity);
        assert_eq!(high, edge.capacity);
    }
}
