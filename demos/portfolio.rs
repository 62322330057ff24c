//! Races three explicit-state analyses of a counter `x := (x + step) mod n`.
//!
//! The analyses differ in their step and speed; one gives up early but
//! publishes what it has learned, another one listens for it.
//!
//! Run with:
//! ```bash
//! cargo run --example portfolio -- 1000 --poll 0.5
//! ```

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{debug, info};
use parking_lot::Mutex;

use reach_rs::algorithm::{Algorithm, AlgorithmStatus, AnalysisError};
use reach_rs::config::Configuration;
use reach_rs::invariants::{Conjunction, Formula, InvariantSupplier, InvariantsConsumer, Location};
use reach_rs::limits::WALL_TIME_OPTION;
use reach_rs::portfolio::{
    AnalysisComponents, AnalysisFactory, ParallelAlgorithm, CONFIG_FILES_OPTION, POLL_INTERVAL_OPTION,
};
use reach_rs::reached::{DefaultReachedSet, ReachedSet};
use reach_rs::shutdown::{ShutdownManager, ShutdownNotifier};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Counter modulus.
    #[arg(value_name = "INT", default_value = "1000")]
    n: u32,

    /// Seconds between checks of the running analyses.
    #[clap(long, value_name = "SECONDS", default_value = "1")]
    poll: f64,

    /// Wall time limit of every analysis, in seconds.
    #[clap(long, value_name = "SECONDS")]
    timeout: Option<f64>,
}

type Reached = DefaultReachedSet<u32, ()>;
type Invariant = Conjunction<String>;

#[derive(Default)]
struct Listener {
    supplier: Mutex<Option<Arc<dyn InvariantSupplier<Invariant>>>>,
}

impl InvariantsConsumer<Invariant> for Listener {
    fn set_invariant_supplier(&self, supplier: Arc<dyn InvariantSupplier<Invariant>>) {
        *self.supplier.lock() = Some(supplier);
    }
}

struct CounterAnalysis {
    modulus: u32,
    step: u32,
    delay: Duration,
    max_states: usize,
    listener: Option<Arc<Listener>>,
    shutdown: ShutdownNotifier,
}

impl Algorithm<Reached> for CounterAnalysis {
    fn run(&mut self, reached: &mut Reached) -> Result<AlgorithmStatus, AnalysisError> {
        let mut known = Invariant::tautology();
        while let Some(x) = reached.pop_from_waitlist() {
            self.shutdown.shutdown_if_necessary()?;

            if reached.len() > self.max_states {
                info!("Giving up after {} states", reached.len());
                return Ok(AlgorithmStatus::UNSOUND_AND_PRECISE);
            }
            if let Some(supplier) = self.listener.as_ref().and_then(|l| l.supplier.lock().clone()) {
                let invariant = supplier.invariant_for(Location(0), &known);
                if invariant != known {
                    info!("Received invariant {}", invariant);
                    known = invariant;
                }
            }

            thread::sleep(self.delay);
            reached.add((x + self.step) % self.modulus, ());
        }
        Ok(AlgorithmStatus::SOUND_AND_PRECISE)
    }
}

struct CounterFactory;

impl AnalysisFactory for CounterFactory {
    type Reached = Reached;
    type Formula = Invariant;

    fn create(
        &self,
        config: &Configuration,
        entry: Location,
        shutdown: &ShutdownNotifier,
    ) -> Result<AnalysisComponents<Reached, Invariant>, AnalysisError> {
        let modulus: u32 = config.get_parsed("counter.modulus")?.unwrap_or(1000);
        if modulus == 0 {
            return Err(AnalysisError::Construction("counter.modulus must be positive".to_string()));
        }
        let listener = config
            .get_parsed::<bool>("counter.consumeInvariants")?
            .unwrap_or(false)
            .then(|| Arc::new(Listener::default()));

        let analysis = CounterAnalysis {
            modulus,
            step: config.get_parsed("counter.step")?.unwrap_or(1),
            delay: Duration::from_millis(config.get_parsed("counter.delay")?.unwrap_or(0)),
            max_states: config.get_parsed("counter.maxStates")?.unwrap_or(usize::MAX),
            listener: listener.clone(),
            shutdown: shutdown.clone(),
        };
        debug!("Counter analysis with step {}", analysis.step);

        Ok(AnalysisComponents {
            algorithm: Box::new(analysis),
            initial_state: entry.0 % modulus,
            initial_precision: (),
            invariants_consumer: listener.map(|l| l as Arc<dyn InvariantsConsumer<Invariant>>),
        })
    }

    fn derive_invariants(&self, reached: &Reached) -> Arc<dyn InvariantSupplier<Invariant>> {
        let mut atoms = Vec::new();
        if reached.states().all(|x| x % 2 == 0) {
            atoms.push("x % 2 == 0".to_string());
        }
        if let Some(max) = reached.states().max() {
            atoms.push(format!("x <= {}", max));
        }
        let invariant: Invariant = atoms.into_iter().collect();
        Arc::new(move |_: Location, _: &Invariant| invariant.clone())
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let dir = tempfile::tempdir()?;
    let analyses = [
        ("slow-and-steady.properties", "counter.step = 1\ncounter.delay = 1\n", ""),
        (
            "even-quitter.properties",
            "counter.step = 2\ncounter.maxStates = 100\n",
            "::reached-inv-sup",
        ),
        (
            "listener.properties",
            "counter.step = 3\ncounter.delay = 2\ncounter.consumeInvariants = true\n",
            "",
        ),
    ];
    let mut references = Vec::new();
    for (file, text, tag) in analyses {
        let path = dir.path().join(file);
        fs::write(&path, text)?;
        references.push(format!("{}{}", path.display(), tag));
    }

    let mut builder = Configuration::builder();
    builder
        .set_option(CONFIG_FILES_OPTION, references.join(","))
        .set_option(POLL_INTERVAL_OPTION, args.poll.to_string())
        .set_option("counter.modulus", args.n.to_string());
    if let Some(timeout) = args.timeout {
        builder.set_option(WALL_TIME_OPTION, timeout.to_string());
    }

    let shutdown = ShutdownManager::new();
    let portfolio = ParallelAlgorithm::new(builder.build(), Arc::new(CounterFactory), &shutdown.notifier())?;
    let outcome = portfolio.run(Location(0))?;

    println!("status = {}", outcome.status);
    match outcome.winner {
        Some(winner) => println!("{} won with {} reached states", winner.name, winner.reached.len()),
        None => println!("No analysis finished with a sound result"),
    }
    println!(
        "shared invariant = {}",
        portfolio.aggregator().invariant_for(Location(0), &Invariant::tautology())
    );

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
