//! Payment campaign driver.
//!
//! Generates a randomized payment workload over the provisioned topology,
//! classifies each outcome through the ledger's submit -> fetch -> classify
//! cycle, and aggregates windowed statistics. Reverted payments are
//! terminal, expected outcomes; the driver only stops for transport
//! failures.

use crate::config::{CampaignConfig, ConfigError};
use crate::policy::PairPolicy;
use crate::topology::Topology;
use channelnet_ledger::{Ledger, LedgerError, Operation, Outcome};
use rand::RngCore;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Errors that terminate a campaign run or its reporting.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("No complete windows; the per-window average is undefined")]
    NoCompleteWindows,
}

/// Aggregated statistics of a completed campaign.
///
/// Invariants: `total_successes + total_failures == total_submitted`, and
/// the windowed series sums to the successes counted in complete windows.
/// A trailing partial window is dropped from the series but its successes
/// still count toward the grand total, so the windowed sum may be smaller
/// than `total_successes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignStats {
    windows: Vec<u64>,
    total_successes: u64,
    total_failures: u64,
    total_submitted: u64,
}

impl CampaignStats {
    /// Success counts per complete window, in submission order.
    pub fn windows(&self) -> &[u64] {
        &self.windows
    }

    pub fn total_successes(&self) -> u64 {
        self.total_successes
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    pub fn total_submitted(&self) -> u64 {
        self.total_submitted
    }

    /// Sum of the windowed series (complete windows only).
    pub fn windowed_total(&self) -> u64 {
        self.windows.iter().sum()
    }

    /// Average successes per complete window.
    ///
    /// Undefined when no window completed; callers must guard.
    pub fn average_per_window(&self) -> Result<f64, CampaignError> {
        if self.windows.is_empty() {
            return Err(CampaignError::NoCompleteWindows);
        }
        Ok(self.windowed_total() as f64 / self.windows.len() as f64)
    }
}

/// Final report of a campaign run.
#[derive(Clone, Debug)]
pub struct CampaignReport {
    pub stats: CampaignStats,
    /// Revert reasons with their observed frequencies.
    pub failure_reasons: BTreeMap<String, u64>,
    /// Size of one reporting window.
    pub window_size: u64,
    /// Name of the pair-selection policy that drove the run.
    pub policy: &'static str,
}

impl CampaignReport {
    /// Print the report to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Campaign Report ===");
        println!("Policy: {}", self.policy);
        println!("Submitted: {}", self.stats.total_submitted());
        println!("Successful: {}", self.stats.total_successes());
        println!("Failed: {}", self.stats.total_failures());
        println!(
            "Successes per window of {}: {:?}",
            self.window_size,
            self.stats.windows()
        );

        match self.stats.average_per_window() {
            Ok(average) => println!("Average successes per window: {average:.2}"),
            Err(_) => println!(
                "Average successes per window: n/a (no complete window of {})",
                self.window_size
            ),
        }

        if !self.failure_reasons.is_empty() {
            println!("Failure reasons:");
            for (reason, count) in &self.failure_reasons {
                println!("  {count:>6}  {reason}");
            }
        }
    }
}

/// Drives a randomized payment campaign against an injected ledger.
pub struct Campaign<'a> {
    ledger: &'a dyn Ledger,
    config: CampaignConfig,
}

impl<'a> Campaign<'a> {
    pub fn new(ledger: &'a dyn Ledger, config: CampaignConfig) -> Self {
        Self { ledger, config }
    }

    /// Run the campaign to completion.
    ///
    /// Each request's submit -> fetch -> classify cycle fully completes
    /// before the next begins; the ledger serializes state-changing calls
    /// on the driver identity's nonce, so there is nothing to overlap.
    pub async fn run(
        &self,
        topology: &Topology,
        policy: &mut dyn PairPolicy,
        rng: &mut dyn RngCore,
    ) -> Result<CampaignReport, CampaignError> {
        self.config.validate()?;

        let participants = topology.participants();
        let window_size = self.config.window_size;

        let mut windows = Vec::new();
        let mut window_successes = 0u64;
        let mut total_successes = 0u64;
        let mut failure_reasons: BTreeMap<String, u64> = BTreeMap::new();

        info!(
            requests = self.config.request_count,
            amount = self.config.amount,
            window_size,
            policy = policy.name(),
            "Starting payment campaign"
        );

        for i in 0..self.config.request_count {
            let (from, to) = policy.pick(participants, rng);
            let op = Operation::Pay {
                from,
                to,
                amount: self.config.amount,
            };

            match self.ledger.execute(&op).await? {
                Outcome::Success => {
                    debug!(%from, %to, amount = self.config.amount, "Payment applied");
                    window_successes += 1;
                    total_successes += 1;
                }
                Outcome::Failure { reason } => {
                    debug!(%from, %to, reason = %reason, "Payment reverted");
                    *failure_reasons.entry(reason).or_insert(0) += 1;
                }
            }

            if (i + 1) % window_size == 0 {
                info!(
                    window = windows.len(),
                    successes = window_successes,
                    "Window complete"
                );
                windows.push(window_successes);
                window_successes = 0;
            }
        }

        // A trailing partial window is dropped from the windowed series;
        // its successes stay in the grand total.

        let stats = CampaignStats {
            windows,
            total_successes,
            total_failures: self.config.request_count - total_successes,
            total_submitted: self.config.request_count,
        };

        Ok(CampaignReport {
            stats,
            failure_reasons,
            window_size,
            policy: policy.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::policy::UniformPairs;
    use async_trait::async_trait;
    use channelnet_ledger::{Receipt, TransactionRecord};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Ledger double with scripted classification behavior.
    struct ScriptedLedger {
        mode: Mode,
        calls: AtomicU64,
    }

    enum Mode {
        AlwaysSuccess,
        AlwaysRevert(&'static str),
        /// Every `n`-th submission reverts.
        RevertEvery(u64),
        /// Transport failure on the `n`-th submission.
        TransportFailureAt(u64),
    }

    impl ScriptedLedger {
        fn new(mode: Mode) -> Self {
            Self {
                mode,
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl Ledger for ScriptedLedger {
        async fn submit(&self, _op: &Operation) -> Result<Receipt, LedgerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Mode::TransportFailureAt(n) = self.mode {
                if call == n {
                    return Err(LedgerError::MalformedResponse("connection reset".into()));
                }
            }
            Ok(Receipt {
                hash: format!("0x{call:x}"),
            })
        }

        async fn fetch(&self, receipt: &Receipt) -> Result<TransactionRecord, LedgerError> {
            Ok(TransactionRecord {
                hash: receipt.hash.clone(),
                from: "0x0".into(),
                to: "scripted".into(),
                input: "0x".into(),
                value: 0,
                block_number: self.calls.load(Ordering::SeqCst),
            })
        }

        async fn classify(&self, _record: &TransactionRecord) -> Result<Outcome, LedgerError> {
            let call = self.calls.load(Ordering::SeqCst);
            let outcome = match &self.mode {
                Mode::AlwaysSuccess | Mode::TransportFailureAt(_) => Outcome::Success,
                Mode::AlwaysRevert(reason) => Outcome::Failure {
                    reason: reason.to_string(),
                },
                Mode::RevertEvery(n) => {
                    if call % n == 0 {
                        Outcome::Failure {
                            reason: "insufficient balance in channel".to_string(),
                        }
                    } else {
                        Outcome::Success
                    }
                }
            };
            Ok(outcome)
        }
    }

    fn topology(participants: u64) -> Topology {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        Topology::generate(&TopologyConfig::new(participants), &mut rng).unwrap()
    }

    async fn run_scripted(mode: Mode, requests: u64, window: u64) -> CampaignReport {
        let ledger = ScriptedLedger::new(mode);
        let config = CampaignConfig::new(requests)
            .with_window_size(window)
            .with_seed(42);
        let campaign = Campaign::new(&ledger, config);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        campaign
            .run(&topology(10), &mut UniformPairs, &mut rng)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_all_success_fills_every_window() {
        let report = run_scripted(Mode::AlwaysSuccess, 20, 5).await;

        assert_eq!(report.stats.windows(), &[5, 5, 5, 5]);
        assert_eq!(report.stats.average_per_window().unwrap(), 5.0);
        assert_eq!(report.stats.total_successes(), 20);
        assert_eq!(report.stats.total_failures(), 0);
        assert_eq!(report.stats.total_submitted(), 20);
    }

    #[tokio::test]
    async fn test_trailing_partial_window_is_dropped_from_series() {
        let report = run_scripted(Mode::AlwaysSuccess, 7, 5).await;

        // Two trailing successes are missing from the series but counted
        // in the grand total.
        assert_eq!(report.stats.windows(), &[5]);
        assert_eq!(report.stats.total_successes(), 7);
        assert_eq!(report.stats.windowed_total(), 5);
    }

    #[tokio::test]
    async fn test_windowed_sum_equals_total_only_on_exact_multiple() {
        let exact = run_scripted(Mode::AlwaysSuccess, 20, 5).await;
        assert_eq!(exact.stats.windowed_total(), exact.stats.total_successes());

        let partial = run_scripted(Mode::AlwaysSuccess, 23, 5).await;
        assert!(partial.stats.windowed_total() < partial.stats.total_successes());
    }

    #[tokio::test]
    async fn test_always_revert_reports_exact_reason() {
        let report = run_scripted(Mode::AlwaysRevert("insufficient capacity"), 12, 4).await;

        assert_eq!(report.stats.total_successes(), 0);
        assert_eq!(report.stats.total_failures(), 12);
        assert_eq!(report.stats.windows(), &[0, 0, 0]);
        assert_eq!(
            report.failure_reasons.get("insufficient capacity"),
            Some(&12)
        );
        assert_eq!(report.failure_reasons.len(), 1);
    }

    #[tokio::test]
    async fn test_mixed_outcomes_preserve_counting_invariant() {
        let report = run_scripted(Mode::RevertEvery(3), 100, 10).await;

        let stats = &report.stats;
        assert_eq!(
            stats.total_successes() + stats.total_failures(),
            stats.total_submitted()
        );
        assert_eq!(stats.windows().len(), 10);
        assert_eq!(stats.windowed_total(), stats.total_successes());
    }

    #[tokio::test]
    async fn test_no_complete_window_makes_average_undefined() {
        let report = run_scripted(Mode::AlwaysSuccess, 3, 5).await;

        assert!(report.stats.windows().is_empty());
        assert_eq!(report.stats.total_successes(), 3);
        assert!(matches!(
            report.stats.average_per_window(),
            Err(CampaignError::NoCompleteWindows)
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_run() {
        let ledger = ScriptedLedger::new(Mode::TransportFailureAt(4));
        let config = CampaignConfig::new(10).with_window_size(5);
        let campaign = Campaign::new(&ledger, config);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let result = campaign
            .run(&topology(10), &mut UniformPairs, &mut rng)
            .await;
        assert!(matches!(result, Err(CampaignError::Ledger(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_submitting() {
        let ledger = ScriptedLedger::new(Mode::AlwaysSuccess);
        let config = CampaignConfig::new(10).with_window_size(0);
        let campaign = Campaign::new(&ledger, config);

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let result = campaign
            .run(&topology(10), &mut UniformPairs, &mut rng)
            .await;
        assert!(matches!(result, Err(CampaignError::Config(_))));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }
}
