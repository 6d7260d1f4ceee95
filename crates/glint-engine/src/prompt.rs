//! Acquisition prompt assembly.
//!
//! Each prompt variant restates the task, the allowed ranges, the
//! anti-repetition contract over every distinct observed value, the
//! bracketed-output demand, and (when part of the history came from
//! uniform random sampling) a warning against imitating that pattern.

use glint_types::{ConfigTable, Direction, ParamDomain, ParamKind, TaskContext};
use tracing::warn;

use crate::format::{count_decimals, format_examples, FormatOptions};
use crate::target::TargetContext;

/// A fully rendered prompt plus the jittered target it asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptVariant {
    pub text: String,
    pub target: f64,
}

/// Builds `n` independent few-shot prompt variants around one observation
/// snapshot and target context.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    pub ctx: &'a TaskContext,
    pub direction: Direction,
    pub jitter: bool,
    pub use_feature_semantics: bool,
    pub shuffle_features: bool,
    pub warped: bool,
    pub n_initial_samples: usize,
}

impl PromptBuilder<'_> {
    pub fn build_variants(
        &self,
        configs: &ConfigTable,
        fvals: &[f64],
        target: &TargetContext,
        n_variants: usize,
    ) -> Vec<PromptVariant> {
        let range_block = self.range_block();
        let observed_block = self.observed_values_block(configs);
        let integer_line = self.integer_constraint_line();
        let (warning, suffix_ending) = self.random_sampling_suffix(configs.n_rows());

        (0..n_variants)
            .map(|variant| {
                let examples = format_examples(
                    self.ctx,
                    configs,
                    Some(fvals),
                    &FormatOptions {
                        direction: self.direction,
                        seed: Some(variant as u64),
                        use_feature_semantics: self.use_feature_semantics,
                        shuffle_features: self.shuffle_features,
                        warped: self.warped,
                    },
                );
                let jittered = target.jittered(self.jitter);

                let mut text = String::from("There is a black-box optimization task. ");
                if let Some(description) = self.ctx.description() {
                    text.push_str("Below is a description of the task:\n");
                    text.push_str(description);
                    text.push('\n');
                }
                text.push_str("The allowable ranges for the hyperparameters are:\n");
                text.push_str(&range_block);
                text.push_str(&format!(
                    "Recommend a configuration that can achieve the target performance of \
                     {jittered:.6}. Do not recommend values at the minimum or maximum of \
                     allowable range, do not recommend rounded values. Recommend values with \
                     the highest possible precision, as requested by the allowed ranges. \
                     **Do not recommend values that have already been observed.**\n\
                     The following values have already been observed and **must not be \
                     recommended again**:\n{observed_block}\n"
                ));
                if let Some(line) = &integer_line {
                    text.push_str(line);
                    text.push('\n');
                }
                text.push_str(
                    "Your response must only contain the predicted configuration, in the \
                     format ## configuration ##.\n",
                );
                for example in &examples {
                    if let Some(answer) = &example.answer {
                        text.push_str(&format!(
                            "\nPerformance: {answer}\nHyperparameter configuration: {}",
                            example.query
                        ));
                    }
                }
                text.push_str(&format!(
                    "\n{warning}\nPerformance: {jittered:.6}\n{suffix_ending}"
                ));

                PromptVariant {
                    text,
                    target: jittered,
                }
            })
            .collect()
    }

    /// One line per constraint describing its allowed range. Degenerate
    /// domains are skipped with a warning rather than aborting the prompt.
    fn range_block(&self) -> String {
        let mut block = String::new();
        for (name, constraint) in self.ctx.iter() {
            if constraint.domain.is_degenerate() {
                warn!(param = name, "skipping degenerate constraint domain in prompt");
                continue;
            }
            match (&constraint.kind, &constraint.domain) {
                (ParamKind::Int, ParamDomain::Bounds { low, high }) => {
                    block.push_str(&format!("- {name}: [{}, {}] (int)\n", *low as i64, *high as i64));
                }
                (ParamKind::Float, ParamDomain::Bounds { low, high }) => {
                    let dp = count_decimals(*low).max(count_decimals(*high)).max(1);
                    block.push_str(&format!(
                        "- {name}: [{low:.dp$}, {high:.dp$}] (float, precise to {dp} decimals)\n"
                    ));
                }
                (ParamKind::Ordinal, ParamDomain::Values(values)) => {
                    let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                    block.push_str(&format!(
                        "- {name}: (ordinal, must take value in [{}])\n",
                        rendered.join(", ")
                    ));
                }
                _ => {
                    warn!(param = name, "constraint kind and domain disagree; skipping");
                }
            }
        }
        block
    }

    /// Every distinct observed value, per hyperparameter, sorted. These
    /// exact values are forbidden to the model (anti-repetition contract).
    fn observed_values_block(&self, configs: &ConfigTable) -> String {
        let mut block = String::new();
        for (col_idx, name) in configs.columns().iter().enumerate() {
            let Some(constraint) = self.ctx.constraint(name) else {
                continue;
            };
            let mut values: Vec<f64> = configs.rows().map(|row| row[col_idx]).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();

            let rendered: Vec<String> = values
                .iter()
                .map(|&v| match constraint.kind {
                    ParamKind::Int => format!("{}", v.round() as i64),
                    ParamKind::Float => {
                        let dp = count_decimals(v).max(1);
                        format!("{v:.dp$}")
                    }
                    ParamKind::Ordinal => v.to_string(),
                })
                .collect();
            block.push_str(&format!("- {name}: {}\n", rendered.join(", ")));
        }
        block
    }

    /// Integers-only instruction: blanket when every hyperparameter is an
    /// int, scoped to the int names when types are mixed, absent otherwise.
    fn integer_constraint_line(&self) -> Option<String> {
        let int_params: Vec<&str> = self
            .ctx
            .iter()
            .filter(|(_, c)| c.kind == ParamKind::Int)
            .map(|(n, _)| n)
            .collect();
        if int_params.is_empty() {
            return None;
        }
        if int_params.len() == self.ctx.len() {
            return Some(
                "Do not recommend float values, you can only recommend integer values."
                    .to_string(),
            );
        }
        let noun = if int_params.len() == 1 {
            "hyperparameter"
        } else {
            "hyperparameters"
        };
        Some(format!(
            "For the {noun} {}, do not recommend float values, you can only recommend \
             integer values.",
            int_params.join(", ")
        ))
    }

    /// Warning text scaled to the fraction of the history that came from
    /// uniform random sampling, plus the query suffix line.
    fn random_sampling_suffix(&self, n_observations: usize) -> (String, String) {
        let default_ending = "Hyperparameter configuration:".to_string();
        if self.n_initial_samples == 0 || n_observations == 0 {
            return (String::new(), default_ending);
        }

        let fraction = self.n_initial_samples as f64 / n_observations as f64;
        let warning = if fraction >= 1.0 {
            "Note: All configurations above are based on uniform random sampling. Avoid \
             following this uniformly random pattern."
                .to_string()
        } else if fraction >= 0.5 {
            format!(
                "Note: Approximately {}% of the configurations above are based on uniform \
                 random sampling. Avoid following this uniformly random pattern.",
                (fraction * 100.0) as u32
            )
        } else {
            String::new()
        };
        let ending = "Hyperparameter configuration (with careful reasoning based on the \
                      description of the task instead of following the uniformly random \
                      sampling pattern):"
            .to_string();
        (warning, ending)
    }
}
