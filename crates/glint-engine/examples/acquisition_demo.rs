use async_trait::async_trait;
use glint_engine::{
    AcquisitionEngine, GenerateOptions, LlmReply, RateLimitedTransport, Transport,
};
use glint_types::{ConfigTable, Direction, ObservationSet, TaskContext, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stands in for a real model backend: proposes configurations spread
/// across the search space, one per request.
struct ScriptedBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for ScriptedBackend {
    async fn send(&self, _prompt: &str) -> Result<LlmReply, TransportError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmReply {
            text: format!(
                "## n_estimators: {}, ccp_alpha: 0.00{}3 ##",
                75 + 7 * i,
                1 + i % 8
            ),
            cost: 0.0004,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("Glint acquisition demo");

    let ctx = TaskContext::new()
        .with_description("Tune a random forest classifier on tabular data.")
        .add_int("n_estimators", 50, 300)
        .add_float("ccp_alpha", 0.0, 0.01);

    let configs = ConfigTable::from_rows(
        vec!["n_estimators".into(), "ccp_alpha".into()],
        vec![
            vec![100.0, 0.002],
            vec![150.0, 0.004],
            vec![200.0, 0.006],
            vec![250.0, 0.008],
            vec![300.0, 0.010],
        ],
    )?;
    let observations = ObservationSet::new(configs, vec![0.32, 0.30, 0.35, 0.40, 0.38])?;
    println!("Loaded {} prior observations", observations.len());

    let backend = ScriptedBackend {
        calls: AtomicUsize::new(0),
    };
    let transport = Arc::new(RateLimitedTransport::new(backend, 100));

    let engine = AcquisitionEngine::new(ctx, Direction::Minimize, transport)
        .with_prompt_variants(8)
        .with_jitter(true);

    let result = engine
        .generate_candidates(
            &observations,
            GenerateOptions {
                n_initial_samples: 5,
                ..GenerateOptions::default()
            },
        )
        .await?;

    println!(
        "Generated {} candidates in {:.3}s for ${:.4} ({} attempt(s))",
        result.candidates.n_rows(),
        result.elapsed_seconds,
        result.total_cost,
        result.attempts
    );
    for (i, row) in result.candidates.rows().enumerate() {
        let named: Vec<String> = result
            .candidates
            .columns()
            .iter()
            .zip(row.iter())
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("  candidate {i}: {}", named.join(", "));
    }

    Ok(())
}
