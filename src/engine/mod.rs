//! Neural processing engine
//!
//! Owns the network, the associative memory, the capability vector and the
//! activity gauge, and runs the lifecycle state machine around them.
//!
//! All mutable state sits behind one async mutex, so concurrent
//! `process_request` calls run one full cycle at a time:
//! encode → propagate → associate → synthesize → retain → reinforce.

mod state;

pub use state::{ArchitectureSummary, InitSummary, ModuleState, ProcessingResult, StatusSnapshot};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::encoding::{InputEncoder, RequestShape};
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEventKind, EventEmitter};
use crate::memory::{AssociativeMemory, MemoryRecord};
use crate::metrics::{MetricsProvider, NoopMetrics};
use crate::neurons::{
    build_architecture, connect, neuron_count, propagate, seeded_rng, ConnectionId, ConnectionSet,
    EngineConfig, Layer, NeuralRng, PropagationResult,
};
use crate::reinforcement::{ActivityGauge, CapabilityVector, ReinforcementAdapter};
use crate::synthesis::synthesize;

/// Mutable engine state, guarded by [`NeuralEngine`]'s mutex.
struct EngineState {
    state: ModuleState,
    layers: Vec<Layer>,
    connections: ConnectionSet,
    memory: AssociativeMemory,
    capabilities: CapabilityVector,
    gauge: ActivityGauge,
    rng: NeuralRng,
    processed: u64,
    failed: u64,
}

impl EngineState {
    fn architecture(&self) -> ArchitectureSummary {
        ArchitectureSummary {
            layer_count: self.layers.len(),
            neuron_count: neuron_count(&self.layers),
            connection_count: self.connections.len(),
        }
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            initialized: self.state.is_initialized(),
            neural_activity: self.gauge.value(),
            capabilities: self.capabilities,
            architecture: self.architecture(),
            memory: self.memory.stats(),
            processed_requests: self.processed,
            failed_requests: self.failed,
        }
    }
}

/// The layered neural processing engine.
pub struct NeuralEngine {
    config: EngineConfig,
    inner: Mutex<EngineState>,
    /// Set while an `initialize()` call is running. `Initializing` without
    /// this flag means the call was cancelled.
    init_in_flight: AtomicBool,
    encoder: InputEncoder,
    adapter: ReinforcementAdapter,
    metrics: Arc<dyn MetricsProvider>,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl NeuralEngine {
    /// Create an uninitialized engine. Nothing is built until [`initialize`](Self::initialize).
    pub fn new(config: EngineConfig) -> Self {
        let metrics: Arc<dyn MetricsProvider> = Arc::new(NoopMetrics);
        let inner = EngineState {
            state: ModuleState::Uninitialized,
            layers: Vec::new(),
            connections: ConnectionSet::default(),
            memory: AssociativeMemory::new(config.memory.clone()),
            capabilities: CapabilityVector::default(),
            gauge: ActivityGauge::default(),
            rng: seeded_rng(config.seed),
            processed: 0,
            failed: 0,
        };
        Self {
            encoder: InputEncoder::new(metrics.clone()),
            adapter: ReinforcementAdapter::new(
                metrics.clone(),
                config.memory.promotion_novelty_threshold,
            ),
            config,
            inner: Mutex::new(inner),
            init_in_flight: AtomicBool::new(false),
            metrics,
            event_emitter: None,
        }
    }

    /// Publish lifecycle and processing events onto `emitter`.
    pub fn with_event_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.event_emitter = Some(emitter);
        self
    }

    /// Report gauges and counters to `metrics` instead of discarding them.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsProvider>) -> Self {
        self.encoder = InputEncoder::new(metrics.clone());
        self.adapter = ReinforcementAdapter::new(
            metrics.clone(),
            self.config.memory.promotion_novelty_threshold,
        );
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lock the engine state, rolling back an abandoned initialization.
    async fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        let mut inner = self.inner.lock().await;
        if inner.state == ModuleState::Initializing && !self.init_in_flight.load(Ordering::Acquire)
        {
            warn!("Initialization was cancelled, reverting to uninitialized");
            inner.state = ModuleState::Uninitialized;
        }
        inner
    }

    /// Emit an event (no-op if no emitter is configured)
    fn emit(&self, kind: EngineEventKind, payload: serde_json::Value) {
        if let Some(emitter) = &self.event_emitter {
            emitter.emit_kind(kind, payload);
        }
    }

    /// Build the architecture, connect adjacent layers and seed bootstrap
    /// patterns.
    ///
    /// Only accepted from `Uninitialized`. On failure the engine returns to
    /// `Uninitialized` with no partial state retained.
    pub async fn initialize(&self) -> EngineResult<InitSummary> {
        let mut attempt = {
            let mut inner = self.lock_state().await;
            if inner.state != ModuleState::Uninitialized {
                return Err(EngineError::InvalidState {
                    state: inner.state,
                    operation: "initialize",
                });
            }
            inner.state = ModuleState::Initializing;
            InitAttempt::start(self)
        };
        info!(
            layers = self.config.network.layers.len(),
            "Initializing neural engine"
        );

        if self.config.bootstrap.setup_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.bootstrap.setup_delay_ms)).await;
        }

        let mut guard = self.lock_state().await;
        let inner = &mut *guard;
        if inner.state != ModuleState::Initializing {
            // Shut down while the setup delay was running.
            return Err(EngineError::InvalidState {
                state: inner.state,
                operation: "initialize",
            });
        }

        let built = build_architecture(&self.config.network.layers, &mut inner.rng);
        let mut layers = match built {
            Ok(layers) => layers,
            Err(e) => {
                inner.state = ModuleState::Uninitialized;
                warn!(error = %e, "Neural engine initialization failed");
                return Err(e);
            }
        };
        let connections = connect(&mut layers, &mut inner.rng);

        let mut memory = AssociativeMemory::new(self.config.memory.clone());
        let bootstrap_patterns = memory.bootstrap(
            &layers,
            self.config.bootstrap.min_patterns,
            self.config.bootstrap.max_patterns,
            &mut inner.rng,
        );

        inner.layers = layers;
        inner.connections = connections;
        inner.memory = memory;
        inner.state = ModuleState::Active;
        attempt.finished = true;

        let summary = InitSummary {
            architecture: inner.architecture(),
            layer_names: inner.layers.iter().map(|l| l.id.clone()).collect(),
            bootstrap_patterns,
            initialized_at: Utc::now(),
        };
        drop(guard);

        info!(
            layers = summary.architecture.layer_count,
            neurons = summary.architecture.neuron_count,
            connections = summary.architecture.connection_count,
            bootstrap_patterns,
            "Neural engine ready"
        );
        self.emit(
            EngineEventKind::ModuleReady,
            serde_json::to_value(&summary).unwrap_or_default(),
        );

        Ok(summary)
    }

    /// Run one full processing cycle for `request`.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the engine is `Active`
    /// - `InvalidInput` if the request has neither a type nor content
    /// - `Processing` if propagation fails
    ///
    /// Failures other than `InvalidState` record an error trace and leave the
    /// engine `Active`.
    pub async fn process_request(&self, request: RequestShape) -> EngineResult<ProcessingResult> {
        self.process(Ok(request)).await
    }

    /// Like [`process_request`](Self::process_request), for a raw JSON value.
    /// `null`, non-objects and unparsable objects are `InvalidInput`.
    pub async fn process_value(&self, value: serde_json::Value) -> EngineResult<ProcessingResult> {
        self.process(RequestShape::from_value(value)).await
    }

    async fn process(&self, request: EngineResult<RequestShape>) -> EngineResult<ProcessingResult> {
        let mut guard = self.lock_state().await;
        let inner = &mut *guard;
        if inner.state != ModuleState::Active {
            return Err(EngineError::InvalidState {
                state: inner.state,
                operation: "process requests",
            });
        }

        let request = match request {
            Ok(request) => request,
            Err(e) => return Err(self.record_failure(inner, None, e)),
        };

        inner.state = ModuleState::Processing;
        let outcome = self.run_cycle(inner, &request);
        inner.state = ModuleState::Active;

        match outcome {
            Ok(result) => {
                inner.processed += 1;
                self.metrics.increment_counter("requests.processed");
                self.emit(
                    EngineEventKind::RequestProcessed,
                    serde_json::json!({
                        "input_id": result.neural_input.id,
                        "propagation_id": result.propagation.id,
                        "association_id": result.association.id,
                        "novelty": result.association.novelty,
                        "strength": result.association.strength,
                        "memories": result.association.memories.len(),
                        "neural_activity": result.neural_activity,
                    }),
                );
                Ok(result)
            }
            Err(e) => Err(self.record_failure(inner, Some(&request), e)),
        }
    }

    fn run_cycle(
        &self,
        inner: &mut EngineState,
        request: &RequestShape,
    ) -> EngineResult<ProcessingResult> {
        let neural_input = self.encoder.encode(request, &inner.layers, &mut inner.rng)?;

        let propagation = propagate(&neural_input, &mut inner.layers, &mut inner.rng)
            .map_err(|e| EngineError::processing("propagation", e))?;

        let fired = fired_connections(&inner.layers, &propagation);
        inner.connections.mark_active(&fired, propagation.completed_at);

        let association =
            inner
                .memory
                .associate(&propagation, inner.gauge.value(), &mut inner.rng);
        let output = synthesize(&association);

        let record = MemoryRecord::analysis(
            request,
            &propagation,
            &association,
            output.memory_trace.clone(),
        );
        let retention = inner.memory.retain(record, association.novelty);
        let new_patterns = inner.memory.observe(&association.patterns);

        inner.capabilities = self.adapter.reinforce(&association, inner.capabilities);
        inner.gauge = self.adapter.update_activity(inner.gauge, &association);

        debug!(
            total_activity = propagation.total_activity,
            novelty = association.novelty,
            strength = association.strength,
            memories = association.memories.len(),
            promoted = retention.promoted,
            new_patterns,
            activity = inner.gauge.value(),
            "Processed request"
        );

        Ok(ProcessingResult {
            neural_input,
            propagation,
            association,
            output,
            neural_activity: inner.gauge.value(),
            timestamp: Utc::now(),
        })
    }

    /// Adaptation side effect of a failed cycle. Returns the error unchanged.
    fn record_failure(
        &self,
        inner: &mut EngineState,
        request: Option<&RequestShape>,
        error: EngineError,
    ) -> EngineError {
        warn!(kind = error.kind(), error = %error, "Request processing failed");

        inner
            .memory
            .record_error(MemoryRecord::error_trace(request, &error));
        inner.capabilities = self.adapter.adapt_to_error(inner.capabilities);
        inner.failed += 1;
        self.metrics.increment_counter("requests.failed");

        self.emit(
            EngineEventKind::RequestFailed,
            serde_json::json!({
                "error_kind": error.kind(),
                "message": error.to_string(),
            }),
        );
        error
    }

    /// Current state, activity, capabilities, architecture and store sizes.
    pub async fn get_status(&self) -> StatusSnapshot {
        self.lock_state().await.status()
    }

    /// Stop accepting requests and emit the final status.
    ///
    /// Calling this on a stopped engine is a no-op that returns the final
    /// status again.
    pub async fn shutdown(&self) -> StatusSnapshot {
        let mut inner = self.lock_state().await;
        if inner.state == ModuleState::Stopped {
            return inner.status();
        }

        info!(from = %inner.state, "Shutting down neural engine");
        inner.state = ModuleState::ShuttingDown;
        inner.state = ModuleState::Stopped;
        let status = inner.status();
        drop(inner);

        self.emit(
            EngineEventKind::ModuleShutdown,
            serde_json::to_value(&status).unwrap_or_default(),
        );
        info!(
            processed = status.processed_requests,
            failed = status.failed_requests,
            "Neural engine stopped"
        );
        status
    }

    /// Run `f` against the associative memory, e.g. to inspect stored records.
    pub async fn with_memory<T>(&self, f: impl FnOnce(&AssociativeMemory) -> T) -> T {
        let inner = self.lock_state().await;
        f(&inner.memory)
    }

    /// Run `f` against the built layers and their connections.
    pub async fn with_network<T>(&self, f: impl FnOnce(&[Layer], &ConnectionSet) -> T) -> T {
        let inner = self.lock_state().await;
        f(&inner.layers, &inner.connections)
    }
}

/// Tracks one running `initialize()` call. Dropping it before `finished` is
/// set (error return or cancelled future) leaves no `Initializing` state
/// behind.
struct InitAttempt<'a> {
    engine: &'a NeuralEngine,
    finished: bool,
}

impl<'a> InitAttempt<'a> {
    fn start(engine: &'a NeuralEngine) -> Self {
        engine.init_in_flight.store(true, Ordering::Release);
        Self {
            engine,
            finished: false,
        }
    }
}

impl Drop for InitAttempt<'_> {
    fn drop(&mut self) {
        self.engine.init_in_flight.store(false, Ordering::Release);
        if self.finished {
            return;
        }
        // Best effort; if the lock is busy, the next `lock_state` rolls back.
        if let Ok(mut inner) = self.engine.inner.try_lock() {
            if inner.state == ModuleState::Initializing {
                inner.state = ModuleState::Uninitialized;
            }
        }
    }
}

/// Outgoing connections of every neuron that fired during `propagation`.
fn fired_connections(layers: &[Layer], propagation: &PropagationResult) -> Vec<ConnectionId> {
    layers
        .iter()
        .zip(&propagation.layer_outputs)
        .flat_map(|(layer, output)| layer.neurons.iter().zip(&output.activations))
        .filter(|(_, activation)| activation.fired)
        .flat_map(|(neuron, _)| neuron.outgoing_connection_ids.iter().copied())
        .collect()
}
