//! The acquisition engine: orchestrates target computation, prompt
//! construction, concurrent dispatch, parsing, and validation under a
//! retry-until-quorum loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use glint_types::{
    Candidate, ConfigTable, Direction, GenerationResult, GlintError, GlintResult, ObservationSet,
    TaskContext,
};

use crate::dispatch::dispatch_all;
use crate::parse::parse_candidate;
use crate::prompt::PromptBuilder;
use crate::target::compute_target;
use crate::transport::Transport;
use crate::validate::filter_candidates;
use crate::warp::WarpingTransformer;

/// Minimum number of validated candidates required to accept an attempt.
const QUORUM: usize = 5;
/// Hard ceiling on generation attempts.
const MAX_ATTEMPTS: usize = 10;
/// Rounding precision for the no-repeat filter inside the attempt loop.
const PRE_FILTER_PRECISION: u32 = 6;

/// Per-call options for [`AcquisitionEngine::generate_candidates`].
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    /// Exploration parameter; non-positive values fall back to `1e-3`.
    pub alpha: f64,
    /// Render real hyperparameter names in prompts.
    pub use_feature_semantics: bool,
    /// Permute prompt column order under a fixed seed.
    pub shuffle_features: bool,
    /// Index of the trial this call is generating candidates for.
    pub current_trial: usize,
    /// How many of the observed configurations came from uniform random
    /// sampling (drives the anti-randomness prompt warning).
    pub n_initial_samples: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            use_feature_semantics: true,
            shuffle_features: false,
            current_trial: 0,
            n_initial_samples: 0,
        }
    }
}

/// Outcome of one generation attempt. Makes the fallback and failure
/// transitions of the retry loop explicit.
enum AttemptOutcome {
    /// Quorum of validated candidates reached.
    Accepted(Vec<Candidate>),
    /// Below quorum, budget remains.
    Retry,
    /// Budget exhausted but enough raw parses exist to return unfiltered.
    Exhausted(Vec<Candidate>),
}

/// Candidate-generation engine using a text-generation backend as an
/// implicit acquisition function.
pub struct AcquisitionEngine {
    ctx: TaskContext,
    direction: Direction,
    transport: Arc<dyn Transport>,
    n_prompt_variants: usize,
    jitter: bool,
    warper: Option<Box<dyn WarpingTransformer>>,
}

impl AcquisitionEngine {
    pub fn new(ctx: TaskContext, direction: Direction, transport: Arc<dyn Transport>) -> Self {
        Self {
            ctx,
            direction,
            transport,
            n_prompt_variants: 10,
            jitter: false,
            warper: None,
        }
    }

    /// Number of concurrent prompt variants per attempt (minimum 1).
    pub fn with_prompt_variants(mut self, n: usize) -> Self {
        self.n_prompt_variants = n.max(1);
        self
    }

    /// Randomize each variant's target between the desired value and the
    /// best observation.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Warp configurations into transform space for prompting and
    /// validation; results are unwarped before being returned.
    pub fn with_warping(mut self, warper: Box<dyn WarpingTransformer>) -> Self {
        self.warper = Some(warper);
        self
    }

    /// Generate a batch of validated candidate configurations.
    ///
    /// Runs format → build → dispatch → parse → validate cycles until at
    /// least [`QUORUM`] validated candidates survive, retrying with fresh
    /// jittered targets and prompt variants up to [`MAX_ATTEMPTS`] times.
    /// If the ceiling is reached with at least [`QUORUM`] raw parses on
    /// the final attempt, those are returned unfiltered with
    /// `fallback = true`; with fewer, the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`GlintError::EmptyObservations`] when the snapshot has no
    /// rows, [`GlintError::Config`] when the task context is empty, and
    /// [`GlintError::GenerationExhausted`] when the retry budget runs out
    /// below the raw-candidate quorum or no fallback candidate names every
    /// hyperparameter.
    pub async fn generate_candidates(
        &self,
        observations: &ObservationSet,
        opts: GenerateOptions,
    ) -> GlintResult<GenerationResult> {
        if self.ctx.is_empty() {
            return Err(GlintError::Config(
                "task context has no hyperparameters".to_string(),
            ));
        }
        if observations.is_empty() {
            return Err(GlintError::EmptyObservations);
        }

        let started = Instant::now();
        let target = compute_target(observations.fvals(), opts.alpha, self.direction);

        let warped = self.warper.is_some();
        let configs = match &self.warper {
            Some(warper) => warper.warp(observations.configs()),
            None => observations.configs().clone(),
        };
        let observed_maps = configs.to_maps();

        let builder = PromptBuilder {
            ctx: &self.ctx,
            direction: self.direction,
            jitter: self.jitter,
            use_feature_semantics: opts.use_feature_semantics,
            shuffle_features: opts.shuffle_features,
            warped,
            n_initial_samples: opts.n_initial_samples,
        };

        info!(
            backend = self.transport.name(),
            trial = opts.current_trial,
            n_observations = observations.len(),
            desired = target.desired,
            alpha = target.alpha,
            "starting candidate generation"
        );

        let mut total_cost = 0.0;
        let mut fallback = false;
        let mut attempts = 0;

        let accepted: Vec<Candidate> = loop {
            attempts += 1;
            let variants = builder.build_variants(
                &configs,
                observations.fvals(),
                &target,
                self.n_prompt_variants,
            );
            if attempts == 1 {
                debug!(prompt = %variants[0].text, "example acquisition prompt");
            }

            let prompts: Vec<String> = variants.iter().map(|v| v.text.clone()).collect();
            let replies = dispatch_all(Arc::clone(&self.transport), &prompts).await;

            let mut raw: Vec<Candidate> = Vec::new();
            for reply in replies.into_iter().flatten() {
                total_cost += reply.cost;
                match parse_candidate(&reply.text) {
                    Ok(candidate) => raw.push(candidate),
                    Err(error) => warn!(%error, "dropping unparseable response"),
                }
            }

            let validated = filter_candidates(
                &self.ctx,
                &observed_maps,
                raw.clone(),
                PRE_FILTER_PRECISION,
                warped,
            );
            info!(
                attempt = attempts,
                proposed = raw.len(),
                accepted = validated.len(),
                "acquisition attempt finished"
            );

            let outcome = if validated.len() >= QUORUM {
                AttemptOutcome::Accepted(validated)
            } else if attempts >= MAX_ATTEMPTS {
                if raw.len() >= QUORUM {
                    AttemptOutcome::Exhausted(raw)
                } else {
                    return Err(GlintError::GenerationExhausted {
                        attempts,
                        raw_candidates: raw.len(),
                    });
                }
            } else {
                AttemptOutcome::Retry
            };

            match outcome {
                AttemptOutcome::Accepted(candidates) => break candidates,
                AttemptOutcome::Exhausted(candidates) => {
                    warn!(
                        attempts,
                        "retry budget exhausted; accepting raw candidates unfiltered"
                    );
                    fallback = true;
                    break candidates;
                }
                AttemptOutcome::Retry => {}
            }
        };

        let mut table = ConfigTable::new(configs.columns().to_vec());
        for candidate in &accepted {
            // Incomplete maps can only reach this point on the fallback
            // path, where validation was bypassed.
            if table.accepts_map(candidate) {
                table.push_map(candidate)?;
            } else {
                warn!("skipping fallback candidate with missing hyperparameters");
            }
        }
        if table.is_empty() {
            // Every fallback candidate was missing hyperparameters.
            return Err(GlintError::GenerationExhausted {
                attempts,
                raw_candidates: 0,
            });
        }
        let table = match &self.warper {
            Some(warper) => warper.unwarp(&table),
            None => table,
        };

        Ok(GenerationResult {
            candidates: table,
            total_cost,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            generated_at: Utc::now(),
            attempts,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LlmReply;
    use crate::warp::LogWarper;
    use async_trait::async_trait;
    use glint_types::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport backed by a closure over the call index.
    struct CountingTransport<F> {
        calls: AtomicUsize,
        reply: F,
    }

    impl<F> CountingTransport<F>
    where
        F: Fn(usize) -> Result<LlmReply, TransportError> + Send + Sync,
    {
        fn new(reply: F) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait]
    impl<F> Transport for CountingTransport<F>
    where
        F: Fn(usize) -> Result<LlmReply, TransportError> + Send + Sync,
    {
        async fn send(&self, _prompt: &str) -> Result<LlmReply, TransportError> {
            (self.reply)(self.calls.fetch_add(1, Ordering::SeqCst))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn forest_ctx() -> TaskContext {
        TaskContext::new()
            .add_int("n_estimators", 50, 300)
            .add_float("ccp_alpha", 0.0, 0.01)
    }

    fn forest_observations() -> ObservationSet {
        let configs = ConfigTable::from_rows(
            vec!["n_estimators".into(), "ccp_alpha".into()],
            vec![
                vec![100.0, 0.002],
                vec![150.0, 0.004],
                vec![200.0, 0.006],
                vec![250.0, 0.008],
                vec![300.0, 0.010],
            ],
        )
        .unwrap();
        ObservationSet::new(configs, vec![0.32, 0.30, 0.35, 0.40, 0.38]).unwrap()
    }

    fn reply(text: impl Into<String>) -> Result<LlmReply, TransportError> {
        Ok(LlmReply {
            text: text.into(),
            cost: 0.001,
        })
    }

    #[tokio::test]
    async fn end_to_end_minimization_scenario() {
        let transport = Arc::new(CountingTransport::new(|i| {
            reply(format!(
                "## n_estimators: {}, ccp_alpha: 0.00{}1 ##",
                60 + i,
                1 + i
            ))
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(5);

        let result = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(result.candidates.n_rows(), 5);
        assert_eq!(result.attempts, 1);
        assert!(!result.fallback);
        assert!(result.total_cost > 0.0);
        assert!(result.elapsed_seconds > 0.0);

        // No candidate repeats an observed configuration.
        let observed = forest_observations();
        for row in result.candidates.rows() {
            for obs_row in observed.configs().rows() {
                assert_ne!(row, obs_row);
            }
        }
    }

    #[tokio::test]
    async fn observed_duplicates_trigger_fallback_after_budget() {
        // Every reply repeats an observed configuration: validation always
        // rejects it, but 5 raw parses per attempt arm the fallback.
        let transport = Arc::new(CountingTransport::new(|_| {
            reply("## n_estimators: 100, ccp_alpha: 0.002 ##")
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(5);

        let result = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap();

        assert!(result.fallback);
        assert_eq!(result.attempts, 10);
        assert_eq!(result.candidates.n_rows(), 5);
    }

    #[tokio::test]
    async fn fallback_with_only_incomplete_candidates_fails() {
        // Replies parse but never name every hyperparameter, so validation
        // rejects them all and the fallback table ends up with no usable
        // rows; the call must fail rather than return an empty batch.
        let transport = Arc::new(CountingTransport::new(|i| {
            reply(format!("## n_estimators: {} ##", 60 + i))
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(5);

        let err = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap_err();

        match err {
            GlintError::GenerationExhausted {
                attempts,
                raw_candidates,
            } => {
                assert_eq!(attempts, 10);
                assert_eq!(raw_candidates, 0);
            }
            other => panic!("expected GenerationExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_keeps_complete_candidates_and_skips_partial_ones() {
        // Even calls repeat an observed configuration (complete but always
        // rejected by validation); odd calls are missing a hyperparameter.
        // The fallback keeps only the complete half.
        let transport = Arc::new(CountingTransport::new(|i| {
            if i % 2 == 0 {
                reply("## n_estimators: 100, ccp_alpha: 0.002 ##")
            } else {
                reply(format!("## n_estimators: {} ##", 60 + i))
            }
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(10);

        let result = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap();

        assert!(result.fallback);
        assert_eq!(result.attempts, 10);
        assert_eq!(result.candidates.n_rows(), 5);
        for row in result.candidates.rows() {
            assert_eq!(row, &[100.0, 0.002]);
        }
    }

    #[tokio::test]
    async fn persistent_transport_failure_exhausts_generation() {
        let transport = Arc::new(CountingTransport::new(|_| {
            Err(TransportError::ConnectionFailed {
                message: "down".into(),
            })
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(3);

        let err = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap_err();

        match err {
            GlintError::GenerationExhausted {
                attempts,
                raw_candidates,
            } => {
                assert_eq!(attempts, 10);
                assert_eq!(raw_candidates, 0);
            }
            other => panic!("expected GenerationExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_replies_are_dropped_not_fatal() {
        // Odd-numbered calls return prose without brackets; the even half
        // is valid and distinct, enough for the quorum in one attempt.
        let transport = Arc::new(CountingTransport::new(|i| {
            if i % 2 == 1 {
                reply("no configuration here")
            } else {
                reply(format!("## n_estimators: {}, ccp_alpha: 0.003 ##", 60 + i))
            }
        }));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport)
            .with_prompt_variants(10);

        let result = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(result.candidates.n_rows(), 5);
        assert_eq!(result.attempts, 1);
        assert!(!result.fallback);
    }

    #[tokio::test]
    async fn empty_observations_are_rejected() {
        let transport = Arc::new(CountingTransport::new(|_| reply("## x: 1 ##")));
        let engine = AcquisitionEngine::new(forest_ctx(), Direction::Minimize, transport);
        let empty = ObservationSet::new(
            ConfigTable::new(vec!["n_estimators".into(), "ccp_alpha".into()]),
            vec![],
        )
        .unwrap();

        let err = engine
            .generate_candidates(&empty, GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlintError::EmptyObservations));
    }

    #[tokio::test]
    async fn warped_candidates_return_in_natural_units() {
        let ctx = TaskContext::new().add_log_float("lr", 1e-4, 1e-1);
        // Replies are in log10 space, inside [-4, -1].
        let transport = Arc::new(CountingTransport::new(|i| {
            reply(format!("## lr: -{}.{} ##", 2, 1 + i))
        }));
        let engine = AcquisitionEngine::new(ctx.clone(), Direction::Minimize, transport)
            .with_prompt_variants(5)
            .with_warping(Box::new(LogWarper::from_context(&ctx)));

        let configs = ConfigTable::from_rows(
            vec!["lr".into()],
            vec![vec![0.01], vec![0.003], vec![0.001], vec![0.03], vec![0.0005]],
        )
        .unwrap();
        let observations =
            ObservationSet::new(configs, vec![0.5, 0.4, 0.45, 0.6, 0.42]).unwrap();

        let result = engine
            .generate_candidates(&observations, GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(result.candidates.n_rows(), 5);
        for row in result.candidates.rows() {
            assert!(
                row[0] >= 1e-4 && row[0] <= 1e-1,
                "candidate left natural-unit bounds: {}",
                row[0]
            );
        }
    }

    #[tokio::test]
    async fn empty_task_context_is_a_config_error() {
        let transport = Arc::new(CountingTransport::new(|_| reply("## x: 1 ##")));
        let engine = AcquisitionEngine::new(TaskContext::new(), Direction::Minimize, transport);

        let err = engine
            .generate_candidates(&forest_observations(), GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GlintError::Config(_)));
    }

    #[test]
    fn generate_options_defaults() {
        let opts = GenerateOptions::default();
        assert_eq!(opts.alpha, 0.1);
        assert!(opts.use_feature_semantics);
        assert!(!opts.shuffle_features);
        assert_eq!(opts.n_initial_samples, 0);
    }
}
