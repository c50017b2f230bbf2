//! Iterative convergence loop.
//!
//! Drives one document through review/score/refine iterations until the
//! stopping policy fires, checkpointing at every phase boundary. The loop
//! is resumable: given a resumable checkpoint it continues at the phase
//! after the one recorded, without re-running completed work.
//!
//! Phase bookkeeping uses the last COMPLETED phase. A checkpoint taken at
//! `phase=score` for iteration 2 therefore resumes directly into the
//! stop-or-refine step of iteration 2.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::pipeline::AnalysisPipeline;
use crate::domain::errors::{EngineError, EngineResult, PersistenceError};
use crate::domain::models::{
    Checkpoint, CheckpointPhase, Classification, ConvergenceState, Document, IterationRecord,
    LoopSnapshot, RoundResult, RunOptions, StopReason, NO_IMPROVEMENT_MARKER,
};
use crate::domain::ports::{CheckpointStore, RefinementService};
use crate::services::round::RoundContext;

/// Final (or paused) state of one iterative run.
#[derive(Debug, Clone)]
pub struct IterativeOutcome {
    /// Identifier shared by every checkpoint and iteration row of this run
    pub run_id: Uuid,
    /// Append-only iteration history, ordered by iteration index
    pub history: Vec<IterationRecord>,
    /// Best-so-far tracking plus the stop reason
    pub state: ConvergenceState,
    /// True when the run paused on a cancellation request instead of
    /// reaching a stop condition
    pub paused: bool,
    /// Checkpoint to resume from, present only on paused runs
    pub last_checkpoint: Option<Uuid>,
}

impl IterativeOutcome {
    /// Why the run stopped, `NoneYet` when paused.
    pub fn stop_reason(&self) -> StopReason {
        self.state.stop_reason
    }
}

/// Runs the convergence state machine for single documents.
pub struct ConvergenceLoop {
    pipeline: Arc<AnalysisPipeline>,
    refiner: Arc<dyn RefinementService>,
    store: Arc<dyn CheckpointStore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConvergenceLoop {
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        refiner: Arc<dyn RefinementService>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            pipeline,
            refiner,
            store,
            shutdown_tx,
        }
    }

    /// Handle for requesting cooperative cancellation.
    ///
    /// Sending on it pauses in-flight runs at their next phase boundary;
    /// worker calls already in flight run to completion first.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run a document to convergence from scratch.
    pub async fn run_iterative(
        &self,
        document: Document,
        options: &RunOptions,
    ) -> EngineResult<IterativeOutcome> {
        validate(options)?;
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            document_id = %document.id,
            target_score = options.target_score,
            max_iterations = options.max_iterations,
            epsilon = options.epsilon,
            "Starting iterative run"
        );
        self.drive(run_id, LoopSnapshot::initial(document), options, None)
            .await
    }

    /// Continue a paused run from a resumable checkpoint.
    pub async fn resume(
        &self,
        checkpoint_id: Uuid,
        options: &RunOptions,
    ) -> EngineResult<IterativeOutcome> {
        validate(options)?;
        let checkpoint = self
            .store
            .load(checkpoint_id)
            .await?
            .ok_or(PersistenceError::CheckpointUnavailable(checkpoint_id))?;
        if !checkpoint.resumable {
            return Err(PersistenceError::CheckpointUnavailable(checkpoint_id).into());
        }
        let snapshot = LoopSnapshot::from_json(&checkpoint.state).map_err(PersistenceError::from)?;

        info!(
            run_id = %checkpoint.run_id,
            checkpoint_id = %checkpoint.id,
            iteration = checkpoint.iteration_index,
            phase = checkpoint.phase.as_str(),
            "Resuming iterative run from checkpoint"
        );
        self.drive(checkpoint.run_id, snapshot, options, Some(checkpoint.id))
            .await
    }

    /// Advance the state machine until it stops or is cancelled.
    async fn drive(
        &self,
        run_id: Uuid,
        mut snap: LoopSnapshot,
        options: &RunOptions,
        mut last_checkpoint: Option<Uuid>,
    ) -> EngineResult<IterativeOutcome> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if shutdown_rx.try_recv().is_ok() {
                warn!(
                    run_id = %run_id,
                    iteration = snap.iteration_index,
                    "Cancellation requested, pausing at phase boundary"
                );
                return Ok(IterativeOutcome {
                    run_id,
                    history: snap.history,
                    state: snap.convergence,
                    paused: true,
                    last_checkpoint,
                });
            }

            match snap.phase {
                // Start of the next iteration: classify the current version.
                None | Some(CheckpointPhase::Refine) => {
                    snap.iteration_index += 1;
                    debug!(run_id = %run_id, iteration = snap.iteration_index, "Entering review");
                    let classification = self.pipeline.classify(&snap.document).await;
                    snap.classification = Some(classification);
                    snap.phase = Some(CheckpointPhase::Classify);
                    self.save_checkpoint(run_id, &snap, &mut last_checkpoint).await;
                }

                // Cohort selection and the concurrent review round.
                Some(CheckpointPhase::Classify) => {
                    let classification = snap
                        .classification
                        .clone()
                        .unwrap_or_else(Classification::fallback);
                    let cohort = self.pipeline.build_cohort(&classification, options.deep_mode);
                    let ctx = RoundContext::new(
                        Arc::new(snap.document.clone()),
                        classification,
                        snap.iteration_index,
                    );
                    let round = self.pipeline.run_review(&cohort, &ctx, options).await;
                    snap.round = Some(round);
                    snap.phase = Some(CheckpointPhase::Review);
                    self.save_checkpoint(run_id, &snap, &mut last_checkpoint).await;
                }

                // Score the round and append the iteration record.
                Some(CheckpointPhase::Review) => {
                    let round = snap
                        .round
                        .clone()
                        .unwrap_or_else(|| RoundResult::new(Vec::new()));
                    let quality = self.pipeline.score(&round, snap.iteration_index).await;
                    let record = IterationRecord::new(
                        snap.iteration_index,
                        snap.document.version,
                        round,
                        quality.clone(),
                        std::mem::take(&mut snap.pending_improvements),
                    );
                    snap.history.push(record.clone());
                    snap.convergence.observe(&record);
                    if let Err(e) = self.store.append_iteration(run_id, &record).await {
                        warn!(run_id = %run_id, error = %e, "Failed to persist iteration record, continuing");
                    }

                    info!(
                        run_id = %run_id,
                        iteration = snap.iteration_index,
                        overall_score = quality.overall_score,
                        critical_issues = quality.critical_issues,
                        "Iteration scored"
                    );
                    snap.quality = Some(quality);
                    snap.phase = Some(CheckpointPhase::Score);
                    self.save_checkpoint(run_id, &snap, &mut last_checkpoint).await;
                }

                // Stop if a condition matches, refine otherwise.
                Some(CheckpointPhase::Score) => {
                    if let Some(reason) = stop_decision(&snap, options) {
                        snap.convergence.stop_reason = reason;
                        info!(
                            run_id = %run_id,
                            stop_reason = reason.as_str(),
                            iterations = snap.history.len(),
                            best_iteration = ?snap.convergence.best_iteration_index,
                            "Run converged"
                        );
                        if let Some(id) = last_checkpoint.take() {
                            if let Err(e) = self.store.invalidate(id).await {
                                warn!(run_id = %run_id, error = %e, "Failed to invalidate final checkpoint");
                            }
                        }
                        return Ok(IterativeOutcome {
                            run_id,
                            history: snap.history,
                            state: snap.convergence,
                            paused: false,
                            last_checkpoint: None,
                        });
                    }

                    self.refine(run_id, &mut snap, options).await;
                    snap.classification = None;
                    snap.round = None;
                    snap.quality = None;
                    snap.phase = Some(CheckpointPhase::Refine);
                    self.save_checkpoint(run_id, &snap, &mut last_checkpoint).await;
                }
            }
        }
    }

    /// Apply one refinement, or record a no-op when it fails.
    ///
    /// The new version always keeps the document id and bumps the version by
    /// one; only the text is taken from the collaborator's result.
    async fn refine(&self, run_id: Uuid, snap: &mut LoopSnapshot, options: &RunOptions) {
        let feedback = snap
            .round
            .as_ref()
            .map(|round| self.pipeline.synthesize(round))
            .unwrap_or_default();

        match self
            .refiner
            .refine(&snap.document, &feedback, options.supplementary_info.as_deref())
            .await
        {
            Ok(refined) => {
                snap.document = snap.document.refined(refined.document.text);
                snap.pending_improvements = refined.improvements;
                debug!(
                    run_id = %run_id,
                    document_version = snap.document.version,
                    improvements = snap.pending_improvements.len(),
                    "Refinement applied"
                );
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    iteration = snap.iteration_index,
                    error = %e,
                    "Refinement failed, carrying document forward unchanged"
                );
                snap.pending_improvements = vec![NO_IMPROVEMENT_MARKER.to_string()];
            }
        }
    }

    /// Insert a checkpoint for the snapshot and invalidate its predecessor.
    ///
    /// Persistence failures are logged and swallowed; the loop never aborts
    /// because durability is degraded.
    async fn save_checkpoint(
        &self,
        run_id: Uuid,
        snap: &LoopSnapshot,
        last_checkpoint: &mut Option<Uuid>,
    ) {
        let Some(phase) = snap.phase else {
            return;
        };
        let state = match snap.to_json() {
            Ok(state) => state,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Failed to serialize loop state, skipping checkpoint");
                return;
            }
        };

        let checkpoint = Checkpoint::new(
            run_id,
            snap.document.fingerprint(),
            snap.iteration_index,
            phase,
            state,
        );
        match self.store.save(&checkpoint).await {
            Ok(()) => {
                debug!(
                    run_id = %run_id,
                    checkpoint_id = %checkpoint.id,
                    iteration = snap.iteration_index,
                    phase = phase.as_str(),
                    "Checkpoint saved"
                );
                if let Some(previous) = last_checkpoint.replace(checkpoint.id) {
                    if let Err(e) = self.store.invalidate(previous).await {
                        warn!(run_id = %run_id, error = %e, "Failed to invalidate superseded checkpoint");
                    }
                }
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Failed to save checkpoint, continuing");
            }
        }
    }
}

/// Reject option sets that cannot drive the loop. The only fatal error
/// class: everything downstream degrades instead of failing.
fn validate(options: &RunOptions) -> EngineResult<()> {
    if options.max_iterations == 0 {
        return Err(EngineError::Configuration(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&options.target_score) {
        return Err(EngineError::Configuration(format!(
            "target_score must be within [0, 100], got {}",
            options.target_score
        )));
    }
    if options.epsilon < 0.0 {
        return Err(EngineError::Configuration(format!(
            "epsilon must be non-negative, got {}",
            options.epsilon
        )));
    }
    Ok(())
}

/// Stopping policy, first match wins: target reached, iteration budget
/// exhausted, then plateau.
fn stop_decision(snap: &LoopSnapshot, options: &RunOptions) -> Option<StopReason> {
    let current = snap.history.last()?;

    if current.quality.meets_target(options.target_score) {
        return Some(StopReason::TargetReached);
    }
    // `>=` so a resumed run with a shrunken budget still terminates
    if snap.iteration_index >= options.max_iterations {
        return Some(StopReason::MaxIterations);
    }
    if snap.history.len() > 1 {
        let previous = &snap.history[snap.history.len() - 2];
        if current.quality.overall_score - previous.quality.overall_score < options.epsilon {
            return Some(StopReason::Plateau);
        }
    }
    None
}
