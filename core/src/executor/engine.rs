use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use uuid::Uuid;

use crate::context::FieldSet;
use crate::error::ExecutorError;

use super::graph::PhaseGraph;
use super::output::log_event;
use super::progress::ProgressMonitor;
use super::scheduler::execute_wave;
use super::traits::{OutputRendererPlugin, PhaseHandler, RenderEvent};
use super::types::{ExecutorConfig, PhaseId, PhaseResult, RunReport};

/// Executes a phase graph wave by wave.
///
/// The registry and dependency table are fixed at construction; one
/// executor can be run any number of times, each run starting from fresh
/// state.
pub struct PhaseGraphExecutor<P: PhaseId> {
    graph: PhaseGraph<P>,
    registry: HashMap<P, Arc<dyn PhaseHandler>>,
    config: ExecutorConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

pub struct PhaseGraphExecutorBuilder<P: PhaseId> {
    entries: Vec<(P, Vec<P>, Arc<dyn PhaseHandler>)>,
    config: ExecutorConfig,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

/// Per-run bookkeeping
struct RunState<P: PhaseId> {
    /// Phases not yet attempted, in graph order
    pending: Vec<P>,
    completed: HashSet<P>,
    results: HashMap<P, PhaseResult<P>>,
    waves: Vec<Vec<P>>,
}

impl<P: PhaseId> RunState<P> {
    fn new(phases: &[P]) -> Self {
        Self {
            pending: phases.to_vec(),
            completed: HashSet::new(),
            results: HashMap::new(),
            waves: Vec::new(),
        }
    }

    /// Record a finished wave; returns the number of failed phases.
    fn record_wave(&mut self, wave: Vec<P>, results: Vec<PhaseResult<P>>) -> usize {
        let mut failed = 0;
        for result in results {
            if result.success {
                self.completed.insert(result.phase);
            } else {
                failed += 1;
            }
            self.results.insert(result.phase, result);
        }
        self.pending.retain(|p| !wave.contains(p));
        self.waves.push(wave);
        failed
    }
}

impl<P: PhaseId> PhaseGraphExecutor<P> {
    pub fn builder() -> PhaseGraphExecutorBuilder<P> {
        PhaseGraphExecutorBuilder::new()
    }

    pub fn graph(&self) -> &PhaseGraph<P> {
        &self.graph
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// True iff every dependency of `phase` is in `completed`.
    ///
    /// # Panics
    ///
    /// If `phase` is not part of the graph.
    pub fn can_execute(&self, phase: P, completed: &HashSet<P>) -> bool {
        self.graph.can_execute(phase, completed)
    }

    /// Run one phase's handler and capture the outcome.
    ///
    /// This is the only error boundary: a handler error or panic becomes a
    /// failed result and is never propagated. No retries happen here.
    ///
    /// # Panics
    ///
    /// If `phase` has no registered handler.
    pub async fn execute_phase(&self, phase: P) -> PhaseResult<P> {
        let Some(handler) = self.registry.get(&phase) else {
            panic!("execute_phase called for unregistered phase {phase}");
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(handler.run()).catch_unwind().await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(data)) => PhaseResult::succeeded(phase, data, elapsed),
            Ok(Err(err)) => PhaseResult::failed(phase, err.to_string(), elapsed),
            Err(panic) => PhaseResult::failed(
                phase,
                format!("handler panicked: {}", panic_message(panic.as_ref())),
                elapsed,
            ),
        }
    }

    /// Execute the whole graph.
    ///
    /// Each iteration launches every pending phase whose dependencies have
    /// completed and waits for all of them. The run stops after the first
    /// wave containing a failure, or when phases remain but none can start.
    pub async fn run(&self) -> RunReport<P> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let total_phases = self.graph.len();
        let mut state = RunState::new(self.graph.phases());

        let predicted = self.graph.predicted_waves();
        let progress = Mutex::new(
            ProgressMonitor::new(total_phases, self.config.progress_enabled())
                .with_expected_waves(predicted.len()),
        );

        self.emit(RenderEvent::RunStart {
            run_id: run_id.clone(),
            total_phases,
        });
        self.emit(RenderEvent::Plan {
            run_id: run_id.clone(),
            waves: names_by_wave(&predicted),
        });

        while !state.pending.is_empty() {
            let ready = self.graph.ready_set(&state.pending, &state.completed);
            if ready.is_empty() {
                self.emit(RenderEvent::Stall {
                    run_id: run_id.clone(),
                    pending: names(&state.pending),
                });
                break;
            }

            let wave_id = state.waves.len();
            self.emit(RenderEvent::WaveStart {
                run_id: run_id.clone(),
                wave_id,
                phases: names(&ready),
            });
            if let Ok(monitor) = progress.lock() {
                monitor.update_wave(wave_id);
            }

            let results = execute_wave(&ready, self.config.max_parallel, |phase| {
                self.execute_tracked(&run_id, wave_id, phase, &progress)
            })
            .await;

            let failed = state.record_wave(ready, results);
            self.emit(RenderEvent::WaveEnd {
                run_id: run_id.clone(),
                wave_id,
                failed,
            });

            // Stop on first failure (fail-fast); the wave itself was allowed to finish
            if failed > 0 {
                break;
            }
        }

        let success =
            state.pending.is_empty() && state.results.values().all(|r| r.success);
        if let Ok(monitor) = progress.lock() {
            monitor.finish(success);
        }

        let report = RunReport {
            run_id: run_id.clone(),
            started_at,
            success,
            total_phases,
            results: state.results,
            waves: state.waves,
            stalled: state.pending,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        self.emit(RenderEvent::RunEnd {
            run_id,
            success,
            completed: report.completed(),
            failed: report.failed(),
            total_phases,
            duration_ms: report.duration_ms,
        });

        report
    }

    async fn execute_tracked(
        &self,
        run_id: &str,
        wave_id: usize,
        phase: P,
        progress: &Mutex<ProgressMonitor>,
    ) -> PhaseResult<P> {
        let name = phase.to_string();
        self.emit(RenderEvent::PhaseStart {
            run_id: run_id.to_string(),
            wave_id,
            phase: name.clone(),
        });
        if let Ok(mut monitor) = progress.lock() {
            monitor.start_phase(&name);
        }

        let result = self.execute_phase(phase).await;

        if let Ok(mut monitor) = progress.lock() {
            monitor.complete_phase(&name, result.success, result.duration_ms);
        }
        self.emit(RenderEvent::PhaseComplete {
            run_id: run_id.to_string(),
            phase: name,
            success: result.success,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
        });

        result
    }

    fn emit(&self, event: RenderEvent) {
        match &self.renderer {
            Some(renderer) => renderer.render(&event),
            None => log_event(&event),
        }
    }
}

impl<P: PhaseId> PhaseGraphExecutorBuilder<P> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            config: ExecutorConfig::default(),
            renderer: None,
        }
    }

    /// Register `phase` with its prerequisites and handler.
    pub fn phase<D, H>(self, phase: P, deps: D, handler: H) -> Self
    where
        D: IntoIterator<Item = P>,
        H: PhaseHandler + 'static,
    {
        self.phase_arc(phase, deps, Arc::new(handler))
    }

    pub fn phase_arc<D>(mut self, phase: P, deps: D, handler: Arc<dyn PhaseHandler>) -> Self
    where
        D: IntoIterator<Item = P>,
    {
        self.entries
            .push((phase, deps.into_iter().collect(), handler));
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Build the executor, validating the table unless
    /// `ExecutorConfig::validate_graph` is off.
    pub fn build(self) -> Result<PhaseGraphExecutor<P>, ExecutorError> {
        let mut registry: HashMap<P, Arc<dyn PhaseHandler>> = HashMap::new();
        let mut table = Vec::with_capacity(self.entries.len());

        for (phase, deps, handler) in self.entries {
            if registry.insert(phase, handler).is_some() {
                return Err(ExecutorError::DuplicatePhase(phase.to_string()));
            }
            table.push((phase, deps));
        }

        let graph = PhaseGraph::from_table(table)?;

        if self.config.validate_graph {
            graph.validate()?;
            check_write_conflicts(&graph, &registry)?;
        } else {
            tracing::warn!("phase graph validation disabled; relying on runtime stall detection");
        }

        tracing::debug!(phases = graph.len(), "phase graph executor built");

        Ok(PhaseGraphExecutor {
            graph,
            registry,
            config: self.config,
            renderer: self.renderer,
        })
    }
}

impl<P: PhaseId> Default for PhaseGraphExecutorBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject overlapping write sets between phases that may share a wave.
fn check_write_conflicts<P: PhaseId>(
    graph: &PhaseGraph<P>,
    registry: &HashMap<P, Arc<dyn PhaseHandler>>,
) -> Result<(), ExecutorError> {
    let writes: Vec<(P, FieldSet)> = graph
        .phases()
        .iter()
        .filter_map(|p| registry.get(p).map(|h| (*p, h.writes())))
        .filter(|(_, w)| !w.is_empty())
        .collect();

    for (i, (first, first_writes)) in writes.iter().enumerate() {
        for (second, second_writes) in &writes[i + 1..] {
            let Some(field) = first_writes.overlap(second_writes) else {
                continue;
            };
            if graph.may_run_concurrently(*first, *second) {
                return Err(ExecutorError::WriteConflict {
                    first: first.to_string(),
                    second: second.to_string(),
                    field: field.to_string(),
                });
            }
        }
    }

    Ok(())
}

fn names<P: PhaseId>(phases: &[P]) -> Vec<String> {
    phases.iter().map(|p| p.to_string()).collect()
}

fn names_by_wave<P: PhaseId>(waves: &[Vec<P>]) -> Vec<Vec<String>> {
    waves.iter().map(|w| names(w)).collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
