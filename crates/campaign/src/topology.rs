//! Random network topology generation.
//!
//! Builds a powerlaw cluster graph (preferential attachment with triangle
//! closure) over the participants and draws per-edge channel capacities from
//! an exponential distribution. A disconnected graph would make some
//! payments structurally unroutable regardless of ledger state, so
//! generation retries until a single component spans all participants.

use crate::config::{ConfigError, TopologyConfig};
use channelnet_ledger::ParticipantId;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// An undirected edge carrying the combined channel capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelEdge {
    pub a: ParticipantId,
    pub b: ParticipantId,
    /// Combined capacity drawn for this channel, always at least 1.
    pub capacity: u64,
}

/// A connected weighted participant network.
#[derive(Clone, Debug)]
pub struct Topology {
    participants: u64,
    edges: Vec<ChannelEdge>,
}

impl Topology {
    /// Generate a connected topology for the given configuration.
    pub fn generate(config: &TopologyConfig, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut attempts = 0usize;
        let raw_edges = loop {
            let candidate = powerlaw_cluster_edges(
                config.participants,
                config.attachment_factor as usize,
                config.triad_probability,
                rng,
            );
            attempts += 1;
            if is_connected(config.participants, &candidate) {
                break candidate;
            }
            debug!(attempts, "Generated graph was disconnected, retrying");
        };

        // Validation guarantees mean_capacity > 0, so the rate is finite
        // and positive.
        let weight_dist = Exp::new(1.0 / config.mean_capacity)
            .map_err(|_| ConfigError::BadMeanCapacity(config.mean_capacity))?;

        let edges = raw_edges
            .into_iter()
            .map(|(a, b)| ChannelEdge {
                a: ParticipantId(a),
                b: ParticipantId(b),
                capacity: (weight_dist.sample(rng).floor() as u64).max(1),
            })
            .collect();

        Ok(Self {
            participants: config.participants,
            edges,
        })
    }

    /// Number of participants in the network.
    pub fn participants(&self) -> u64 {
        self.participants
    }

    /// All channel edges with their capacities.
    pub fn edges(&self) -> &[ChannelEdge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Build the edge set of a powerlaw cluster graph over nodes `0..n`.
///
/// Each new node attaches `m` edges: targets are drawn preferentially by
/// degree, and after each attachment a triangle is closed with probability
/// `p` by linking to a neighbor of the previous target instead.
fn powerlaw_cluster_edges(n: u64, m: usize, p: f64, rng: &mut impl Rng) -> Vec<(u64, u64)> {
    let mut edges: HashSet<(u64, u64)> = HashSet::new();
    let mut adjacency: HashMap<u64, Vec<u64>> = HashMap::new();
    // Node ids repeated once per incident edge; sampling from this vector
    // is sampling proportionally to degree.
    let mut repeated: Vec<u64> = Vec::new();

    for source in (m as u64)..n {
        let mut attached: Vec<u64> = Vec::new();

        while attached.len() < m {
            let candidate = match attached.last() {
                Some(&previous) if rng.gen_bool(p) => {
                    triad_candidate(&adjacency, &edges, previous, source, rng)
                        .unwrap_or_else(|| preferential_candidate(&repeated, source, rng))
                }
                _ => preferential_candidate(&repeated, source, rng),
            };

            let key = ordered(source, candidate);
            if candidate != source && !edges.contains(&key) {
                edges.insert(key);
                adjacency.entry(source).or_default().push(candidate);
                adjacency.entry(candidate).or_default().push(source);
                attached.push(candidate);
            }
        }

        for &target in &attached {
            repeated.push(target);
            repeated.push(source);
        }
    }

    edges.into_iter().collect()
}

/// Pick a target proportionally to degree, or uniformly among the seed
/// nodes while no edges exist yet.
fn preferential_candidate(repeated: &[u64], source: u64, rng: &mut impl Rng) -> u64 {
    if repeated.is_empty() {
        rng.gen_range(0..source)
    } else {
        repeated[rng.gen_range(0..repeated.len())]
    }
}

/// Pick a neighbor of `previous` that would close a triangle with `source`.
fn triad_candidate(
    adjacency: &HashMap<u64, Vec<u64>>,
    edges: &HashSet<(u64, u64)>,
    previous: u64,
    source: u64,
    rng: &mut impl Rng,
) -> Option<u64> {
    let candidates: Vec<u64> = adjacency
        .get(&previous)?
        .iter()
        .copied()
        .filter(|&node| node != source && !edges.contains(&ordered(source, node)))
        .collect();

    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

fn ordered(a: u64, b: u64) -> (u64, u64) {
    (a.min(b), a.max(b))
}

/// Whether a single component spans all `n` nodes.
fn is_connected(n: u64, edges: &[(u64, u64)]) -> bool {
    if n == 0 {
        return true;
    }

    let mut adjacency: HashMap<u64, Vec<u64>> = HashMap::new();
    for &(a, b) in edges {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }

    let mut visited: HashSet<u64> = HashSet::new();
    let mut queue = VecDeque::from([0u64]);
    visited.insert(0);

    while let Some(node) = queue.pop_front() {
        if let Some(neighbors) = adjacency.get(&node) {
            for &next in neighbors {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    visited.len() as u64 == n
}
