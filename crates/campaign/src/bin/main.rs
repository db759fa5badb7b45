//! channelnet CLI
//!
//! Generates a random payment-channel topology, provisions it on a ledger,
//! and fires a randomized payment campaign.
//!
//! # Example
//!
//! ```bash
//! # Offline run against the in-memory ledger
//! channelnet -n 100 -t 1000 --seed 42
//!
//! # Run against a deployed contract
//! channelnet --endpoint http://127.0.0.1:8545 \
//!     --contract 0xe8502b69Fd7f7dF0eC01CE3ba35415B6E04Be6fe \
//!     --descriptor contract.json -n 100 -t 1000
//! ```

use channelnet_campaign::{
    Campaign, CampaignConfig, CampaignError, CapacitySplit, PairPolicy, PartitionedPairs,
    Provisioner, Topology, TopologyConfig, UniformPairs,
};
use channelnet_ledger::{InMemoryLedger, InterfaceDescriptor, JsonRpcLedger, Ledger};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// channelnet payment campaign harness
#[derive(Parser, Debug)]
#[command(name = "channelnet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of participants in the network
    #[arg(short = 'n', long, default_value = "100")]
    participants: u64,

    /// Number of payment requests to submit
    #[arg(short = 't', long, default_value = "1000")]
    requests: u64,

    /// Mean of the combined channel capacity draw
    #[arg(short = 'v', long, default_value = "10")]
    mean_capacity: f64,

    /// Edges attached from each new node to existing nodes
    #[arg(short = 'm', long, default_value = "1")]
    attachment: u64,

    /// Amount sent in each payment
    #[arg(short = 'a', long, default_value = "1")]
    amount: u64,

    /// Probability of closing a triangle after each attachment
    #[arg(long, default_value = "0.5")]
    triad_probability: f64,

    /// Requests per reporting window
    #[arg(long, default_value = "100")]
    window: u64,

    /// Pair selection policy
    #[arg(long, value_enum, default_value_t = PolicyKind::Uniform)]
    policy: PolicyKind,

    /// Per-side capacity credited when opening a channel
    #[arg(long, value_enum, default_value_t = SplitKind::Half)]
    split: SplitKind,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JSON-RPC endpoint; omitted runs against the in-memory ledger
    #[arg(long, requires = "contract")]
    endpoint: Option<String>,

    /// Deployed contract address
    #[arg(long)]
    contract: Option<String>,

    /// Path to the contract interface descriptor JSON
    #[arg(long)]
    descriptor: Option<PathBuf>,

    /// Print the generated topology's edge list
    #[arg(long)]
    dump_topology: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    /// Both endpoints uniform over all participants
    Uniform,
    /// Sender from the lower half of the id range, receiver from the upper
    Partitioned,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SplitKind {
    /// Half the edge weight per side
    Half,
    /// The whole edge weight per side
    Whole,
}

impl From<SplitKind> for CapacitySplit {
    fn from(kind: SplitKind) -> Self {
        match kind {
            SplitKind::Half => CapacitySplit::HalfPerSide,
            SplitKind::Whole => CapacitySplit::WholeWeight,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,channelnet_campaign=info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("channelnet: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CampaignError> {
    let topology_config = TopologyConfig::new(args.participants)
        .with_attachment_factor(args.attachment)
        .with_triad_probability(args.triad_probability)
        .with_mean_capacity(args.mean_capacity);

    let campaign_config = {
        let mut config = CampaignConfig::new(args.requests)
            .with_amount(args.amount)
            .with_window_size(args.window);
        if let Some(seed) = args.seed {
            config = config.with_seed(seed);
        }
        config
    };
    topology_config.validate()?;
    campaign_config.validate()?;

    let seed = campaign_config.effective_seed();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let ledger = build_ledger(&args).await?;

    let topology = Topology::generate(&topology_config, &mut rng)?;
    info!(
        participants = topology.participants(),
        channels = topology.edge_count(),
        seed,
        "Generated topology"
    );

    if args.dump_topology {
        println!("=== Topology ===");
        for edge in topology.edges() {
            println!("{} -- {}  capacity {}", edge.a, edge.b, edge.capacity);
        }
    }

    let provisioner = Provisioner::new(ledger.as_ref(), args.split.into());
    let provision_report = provisioner.provision(&topology).await?;
    provision_report.print_summary();

    let mut policy: Box<dyn PairPolicy> = match args.policy {
        PolicyKind::Uniform => Box::new(UniformPairs),
        PolicyKind::Partitioned => Box::new(PartitionedPairs),
    };

    let campaign = Campaign::new(ledger.as_ref(), campaign_config);
    let report = campaign.run(&topology, policy.as_mut(), &mut rng).await?;
    report.print_summary();

    Ok(())
}

async fn build_ledger(args: &Args) -> Result<Box<dyn Ledger>, CampaignError> {
    match (&args.endpoint, &args.contract) {
        (Some(endpoint), Some(contract)) => {
            let descriptor = match &args.descriptor {
                Some(path) => {
                    InterfaceDescriptor::from_file(path).map_err(channelnet_ledger::LedgerError::from)?
                }
                None => InterfaceDescriptor::default(),
            };

            info!(endpoint = %endpoint, contract = %contract, "Connecting to ledger endpoint");
            let ledger =
                JsonRpcLedger::connect(endpoint.as_str(), contract.as_str(), descriptor).await?;
            Ok(Box::new(ledger))
        }
        _ => {
            info!("No endpoint configured, using the in-memory ledger");
            Ok(Box::new(InMemoryLedger::new()))
        }
    }
}
