//! Peer feedback rounds.
//!
//! After a first review round, each worker can be shown what every other
//! worker found and asked to revise. The revised round replaces the first
//! one for downstream synthesis; there is no merging and no convergence
//! criterion at this level.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::models::{Cohort, RoundResult};
use crate::services::round::{RoundContext, RoundExecutor};

/// How many comments and suggestions each peer contributes to a digest.
const PEER_TOP_N: usize = 5;

/// Build the per-worker peer digests for one round.
///
/// Workers are paired with reports by cohort index. A worker's digest holds
/// every other worker's raw score, top comments, and top suggestions;
/// failed peers are skipped. Workers with nothing to read get no digest.
fn peer_digests(cohort: &Cohort, round: &RoundResult) -> HashMap<String, String> {
    let mut digests = HashMap::new();

    for (index, spec) in cohort.iter().enumerate() {
        let mut digest = String::new();
        for (peer_index, peer) in round.iter().enumerate() {
            if peer_index == index || peer.is_failed() {
                continue;
            }
            digest.push_str(&format!("### {} (score {})\n", peer.name, peer.score));
            for comment in peer.comments.iter().take(PEER_TOP_N) {
                digest.push_str(&format!("- {comment}\n"));
            }
            if !peer.suggestions.is_empty() {
                digest.push_str("Suggestions:\n");
                for suggestion in peer.suggestions.iter().take(PEER_TOP_N) {
                    digest.push_str(&format!("- {suggestion}\n"));
                }
            }
        }
        if !digest.is_empty() {
            digests.insert(spec.capability.clone(), digest);
        }
    }

    digests
}

/// Runs feedback passes over a completed round.
#[derive(Clone)]
pub struct FeedbackRound {
    executor: RoundExecutor,
}

impl FeedbackRound {
    pub fn new(executor: RoundExecutor) -> Self {
        Self { executor }
    }

    /// Run up to `max_rounds` feedback passes and return the final round.
    ///
    /// Each pass digests the current round into per-worker peer summaries
    /// and re-runs the same cohort with those folded into the prompts. When
    /// no worker has a peer to read (single-worker cohort, or every peer
    /// failed) the pass is skipped and the incoming round stands.
    pub async fn run_feedback_round(
        &self,
        cohort: &Cohort,
        ctx: &RoundContext,
        first_round: RoundResult,
        max_rounds: u32,
    ) -> RoundResult {
        let mut current = first_round;

        for pass in 1..=max_rounds {
            let augmentations = peer_digests(cohort, &current);
            if augmentations.is_empty() {
                debug!(pass, "No peer feedback available, skipping feedback pass");
                break;
            }

            info!(
                pass,
                max_rounds,
                cohort_size = cohort.len(),
                "Running peer feedback pass"
            );
            let augmented = ctx.clone().with_augmentations(augmentations);
            current = self.executor.run_round(cohort, &augmented).await;
        }

        current
    }
}
