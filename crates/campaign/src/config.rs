//! Configuration types for topology generation and campaign runs.

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Topology needs at least 2 participants, got {0}")]
    TooFewParticipants(u64),

    #[error("Attachment factor must be in 1..participants, got {factor} with {participants} participants")]
    BadAttachmentFactor { factor: u64, participants: u64 },

    #[error("Triad probability must be within [0, 1], got {0}")]
    BadTriadProbability(f64),

    #[error("Mean channel capacity must be positive, got {0}")]
    BadMeanCapacity(f64),

    #[error("Request count must be positive")]
    ZeroRequests,

    #[error("Payment amount must be positive")]
    ZeroAmount,

    #[error("Window size must be positive")]
    ZeroWindow,
}

/// How an edge weight maps to the capacity submitted per channel side.
///
/// The two observed provisioning variants split the weight differently, so
/// the choice is an explicit configuration rather than a silent default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapacitySplit {
    /// Each side is credited half the edge weight (integer division, so a
    /// weight of 1 yields empty sides — matches the reference deployment).
    #[default]
    HalfPerSide,
    /// Each side is credited the whole edge weight.
    WholeWeight,
}

impl CapacitySplit {
    /// Capacity submitted with the channel-open operation for one side.
    pub fn per_side(&self, weight: u64) -> u64 {
        match self {
            CapacitySplit::HalfPerSide => weight / 2,
            CapacitySplit::WholeWeight => weight,
        }
    }
}

/// Parameters for the generated network topology.
#[derive(Clone, Debug)]
pub struct TopologyConfig {
    /// Number of participants (graph nodes).
    pub participants: u64,

    /// Edges attached from each new node to existing nodes.
    pub attachment_factor: u64,

    /// Probability of closing a triangle after each attachment.
    pub triad_probability: f64,

    /// Mean of the exponential draw for edge weights.
    pub mean_capacity: f64,
}

impl TopologyConfig {
    pub fn new(participants: u64) -> Self {
        Self {
            participants,
            attachment_factor: 1,
            triad_probability: 0.5,
            mean_capacity: 10.0,
        }
    }

    pub fn with_attachment_factor(mut self, factor: u64) -> Self {
        self.attachment_factor = factor;
        self
    }

    pub fn with_triad_probability(mut self, probability: f64) -> Self {
        self.triad_probability = probability;
        self
    }

    pub fn with_mean_capacity(mut self, mean: f64) -> Self {
        self.mean_capacity = mean;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.participants < 2 {
            return Err(ConfigError::TooFewParticipants(self.participants));
        }
        if self.attachment_factor == 0 || self.attachment_factor >= self.participants {
            return Err(ConfigError::BadAttachmentFactor {
                factor: self.attachment_factor,
                participants: self.participants,
            });
        }
        if !(0.0..=1.0).contains(&self.triad_probability) {
            return Err(ConfigError::BadTriadProbability(self.triad_probability));
        }
        if self.mean_capacity <= 0.0 {
            return Err(ConfigError::BadMeanCapacity(self.mean_capacity));
        }
        Ok(())
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Parameters for a payment campaign run.
#[derive(Clone, Debug)]
pub struct CampaignConfig {
    /// Number of payment requests to submit.
    pub request_count: u64,

    /// Amount carried by every payment.
    pub amount: u64,

    /// Requests per reporting window.
    pub window_size: u64,

    /// Seed for the campaign RNG; generated from wall clock when omitted.
    pub seed: Option<u64>,
}

impl CampaignConfig {
    pub fn new(request_count: u64) -> Self {
        Self {
            request_count,
            amount: 1,
            window_size: 100,
            seed: None,
        }
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_count == 0 {
            return Err(ConfigError::ZeroRequests);
        }
        if self.amount == 0 {
            return Err(ConfigError::ZeroAmount);
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }

    /// The configured seed, or one derived from the wall clock.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system clock before unix epoch")
                .as_nanos() as u64
        })
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}
