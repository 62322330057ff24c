//! Parallel portfolio of independently configured analyses.
//!
//! [`ParallelAlgorithm`] runs one analysis per configuration reference listed
//! in [`CONFIG_FILES_OPTION`], each on its own thread with its own reached
//! set and its own cancellation scope. The first analysis that finishes with
//! a sound and precise result wins; all others are then asked to stop.
//!
//! Instances tagged `::reached-inv-sup` publish invariants derived from their
//! reached set into a shared [`InvariantsAggregator`], which every instance
//! whose analysis consumes invariants reads from while it runs.

mod options;
mod winner;

pub use options::{
    ConfigReference, InvariantRole, PortfolioOptions, CONFIG_FILES_OPTION, POLL_INTERVAL_OPTION, SPECIFICATION_OPTION,
    USE_PARALLEL_ANALYSES_OPTION,
};
pub use winner::{Winner, WinnerSlot};

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use thiserror::Error;

use crate::algorithm::{Algorithm, AlgorithmStatus, AnalysisError};
use crate::config::{ConfigError, Configuration};
use crate::invariants::{
    Formula, InvariantDerivation, InvariantSupplier, InvariantsAggregator, InvariantsConsumer, Location,
    ReachedSetInvariantGeneration, TrivialInvariantSupplier,
};
use crate::limits::ResourceLimitChecker;
use crate::reached::ReachedSet;
use crate::shutdown::{ShutdownManager, ShutdownNotifier};

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("invalid portfolio configuration: {0}")]
    Configuration(#[from] ConfigError),
}

/// Everything an instance needs to start, as built by an [`AnalysisFactory`].
pub struct AnalysisComponents<R: ReachedSet, F> {
    pub algorithm: Box<dyn Algorithm<R>>,
    pub initial_state: R::State,
    pub initial_precision: R::Precision,
    /// Set if the analysis can make use of invariants found by other instances.
    pub invariants_consumer: Option<Arc<dyn InvariantsConsumer<F>>>,
}

/// Builds analyses from configurations.
pub trait AnalysisFactory: Send + Sync + 'static {
    type Reached: ReachedSet + Default + Send + 'static;
    type Formula: Formula;

    /// Build the analysis described by `config`, starting at `entry`.
    ///
    /// The analysis must poll `shutdown` and stop with
    /// [`AnalysisError::Interrupted`] once it is requested.
    fn create(
        &self,
        config: &Configuration,
        entry: Location,
        shutdown: &ShutdownNotifier,
    ) -> Result<AnalysisComponents<Self::Reached, Self::Formula>, AnalysisError>;

    /// Invariants implied by a finished reached set.
    fn derive_invariants(&self, _reached: &Self::Reached) -> Arc<dyn InvariantSupplier<Self::Formula>> {
        Arc::new(TrivialInvariantSupplier)
    }
}

/// Result of a portfolio run.
#[derive(Debug)]
pub struct PortfolioOutcome<R> {
    /// Sound and precise if some instance won, unsound otherwise.
    pub status: AlgorithmStatus,
    pub winner: Option<Winner<R>>,
}

/// One configured analysis, ready to run on its own thread.
struct Instance<R: ReachedSet> {
    number: usize,
    name: String,
    algorithm: Box<dyn Algorithm<R>>,
    reached: R,
    limits: Option<ResourceLimitChecker>,
}

impl<R: ReachedSet> Instance<R> {
    fn run(self, portfolio: &ShutdownManager, slot: &WinnerSlot<R>) {
        let Instance {
            number,
            name,
            mut algorithm,
            mut reached,
            mut limits,
        } = self;

        info!("{}: starting analysis", name);
        let result = algorithm.run(&mut reached);
        if let Some(limits) = limits.as_mut() {
            limits.stop();
        }

        match result {
            Ok(status) if status.is_sound() && status.is_precise() => {
                let winner = Winner {
                    instance: number,
                    name: name.clone(),
                    reached,
                };
                if slot.try_commit(winner) {
                    info!("{}: finished successfully", name);
                    portfolio.request_shutdown(format!("{} finished successfully.", name));
                } else {
                    info!("{}: finished successfully, but another analysis was faster", name);
                }
            }
            Ok(status) => {
                info!("{}: finished {}, discarding its result", name, status);
            }
            Err(AnalysisError::Interrupted(e)) => {
                info!("{}: analysis terminated ({})", name, e.reason);
            }
            Err(e) => {
                warn!("{}: analysis failed: {}", name, e);
            }
        }
    }
}

/// Reports the end of a worker thread, even if the analysis panicked.
struct Completion {
    number: usize,
    done: Sender<usize>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let _ = self.done.send(self.number);
    }
}

/// Runs a portfolio of analyses in parallel; see the [module docs][self].
pub struct ParallelAlgorithm<A: AnalysisFactory> {
    config: Configuration,
    options: PortfolioOptions,
    factory: Arc<A>,
    shutdown: ShutdownNotifier,
    aggregator: Arc<InvariantsAggregator<A::Formula>>,
}

impl<A: AnalysisFactory> ParallelAlgorithm<A> {
    /// `shutdown` is the scope of the caller; cancelling it cancels every instance.
    pub fn new(config: Configuration, factory: Arc<A>, shutdown: &ShutdownNotifier) -> Result<Self, PortfolioError> {
        let options = PortfolioOptions::from_configuration(&config)?;
        Ok(Self {
            config,
            options,
            factory,
            shutdown: shutdown.clone(),
            aggregator: Arc::new(InvariantsAggregator::new()),
        })
    }

    pub fn options(&self) -> &PortfolioOptions {
        &self.options
    }

    /// Invariants shared between the instances.
    pub fn aggregator(&self) -> &Arc<InvariantsAggregator<A::Formula>> {
        &self.aggregator
    }

    pub fn run(&self, entry: Location) -> Result<PortfolioOutcome<A::Reached>, PortfolioError> {
        let portfolio = Arc::new(ShutdownManager::with_parent(&self.shutdown));
        let slot = Arc::new(WinnerSlot::new());
        let (done_tx, done_rx) = mpsc::channel();

        let mut scopes = Vec::with_capacity(self.options.references.len());
        let mut running = 0;

        for (i, reference) in self.options.references.iter().enumerate() {
            let number = i + 1;
            let name = format!("Parallel analysis {}", number);
            let scope = Arc::new(ShutdownManager::with_parent(&portfolio.notifier()));
            scopes.push(Arc::clone(&scope));

            let instance = match self.create_instance(reference, number, &name, entry, &scope) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!("{}: skipping analysis, it could not be set up: {}", name, e);
                    continue;
                }
            };

            let portfolio = Arc::clone(&portfolio);
            let slot = Arc::clone(&slot);
            let completion = Completion {
                number,
                done: done_tx.clone(),
            };
            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _completion = completion;
                instance.run(&portfolio, &slot);
            });
            match spawned {
                Ok(_) => running += 1,
                Err(e) => warn!("{}: could not start worker thread: {}", name, e),
            }
        }
        drop(done_tx);

        self.await_instances(&done_rx, running, &portfolio, &scopes);

        let winner = slot.take();
        let status = if winner.is_some() {
            AlgorithmStatus::SOUND_AND_PRECISE
        } else {
            AlgorithmStatus::UNSOUND_AND_PRECISE
        };
        match &winner {
            Some(w) => info!("{} won the portfolio", w.name),
            None => info!("No analysis of the portfolio finished with a sound result"),
        }
        Ok(PortfolioOutcome { status, winner })
    }

    /// Wait for all workers, forcing them to stop one poll after a shutdown
    /// request was first seen.
    fn await_instances(
        &self,
        done: &mpsc::Receiver<usize>,
        mut running: usize,
        portfolio: &ShutdownManager,
        scopes: &[Arc<ShutdownManager>],
    ) {
        let shutdown = portfolio.notifier();
        let mut shutdown_requested = shutdown.should_shutdown();

        while running > 0 {
            match done.recv_timeout(self.options.poll_interval) {
                Ok(number) => {
                    running -= 1;
                    debug!("Parallel analysis {} ended, {} still running", number, running);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if shutdown_requested {
                        warn!(
                            "Shutdown requested, but {} analyses did not stop in time; cancelling them",
                            running
                        );
                        for scope in scopes {
                            scope.request_shutdown("The parallel portfolio was forced to shut down.");
                        }
                        return;
                    }
                    shutdown_requested = shutdown.should_shutdown();
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn instance_configuration(&self, reference: &ConfigReference) -> Result<Configuration, ConfigError> {
        let mut builder = Configuration::builder();
        builder
            .copy_from(&self.config)
            .clear_option(CONFIG_FILES_OPTION)
            .clear_option(USE_PARALLEL_ANALYSES_OPTION)
            .load_from_file(&reference.path)?
            .copy_option_from(&self.config, SPECIFICATION_OPTION);
        Ok(builder.build())
    }

    fn create_instance(
        &self,
        reference: &str,
        number: usize,
        name: &str,
        entry: Location,
        scope: &Arc<ShutdownManager>,
    ) -> Result<Instance<A::Reached>, AnalysisError> {
        let reference: ConfigReference = reference.parse()?;
        let config = self.instance_configuration(&reference)?;
        debug!("{}: using configuration {}", name, reference);

        let mut limits = ResourceLimitChecker::from_configuration(&config, name, scope)?;
        if let Some(limits) = limits.as_mut() {
            limits.start();
        }

        let components = self.factory.create(&config, entry, &scope.notifier())?;

        if let Some(consumer) = components.invariants_consumer {
            debug!("{}: reading invariants of the other analyses", name);
            let supplier: Arc<dyn InvariantSupplier<A::Formula>> = self.aggregator.clone();
            consumer.set_invariant_supplier(supplier);
        }

        let algorithm: Box<dyn Algorithm<A::Reached>> = match reference.role {
            InvariantRole::None | InvariantRole::CpaSupplier => components.algorithm,
            InvariantRole::ReachedSetSupplier => {
                let factory = Arc::clone(&self.factory);
                let derive: InvariantDerivation<A::Reached, A::Formula> =
                    Arc::new(move |reached: &A::Reached| factory.derive_invariants(reached));
                let generation = ReachedSetInvariantGeneration::new(components.algorithm, derive);
                self.aggregator.register(generation.published());
                debug!("{}: publishing invariants of its reached set", name);
                Box::new(generation)
            }
        };

        let mut reached = A::Reached::default();
        reached.add(components.initial_state, components.initial_precision);

        Ok(Instance {
            number,
            name: name.to_string(),
            algorithm,
            reached,
            limits,
        })
    }
}
