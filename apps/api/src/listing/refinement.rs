//! Refinement Loop: generate, assemble, evaluate, translate, refine.
//!
//! # Flow
//! 1. All sections are drafted concurrently. A failed draft leaves the section
//!    empty so the assembler falls back to its default text.
//! 2. Every round assembles the page and scores it.
//! 3. The loop stops when the page passes, when `max_iterations` refine rounds
//!    have run, or when the translator has nothing actionable.
//! 4. Otherwise only the sections with a fix instruction are refined,
//!    concurrently. A failed refine keeps the previous text.
//!
//! Each phase takes an immutable `SectionContent` snapshot and returns a new
//! one; nothing is shared mutably across the fan-out.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::listing::assembler::assemble;
use crate::listing::evaluation::{EvaluationReport, EvaluatorAggregator};
use crate::listing::options::RunSettings;
use crate::listing::oracle::ContentOracle;
use crate::listing::property::PropertyRecord;
use crate::listing::sections::{SectionContent, SectionKind};
use crate::listing::translator::{FixInstructions, IssueToInstructionTranslator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every scorer passed.
    Converged,
    /// `max_iterations` refine rounds were spent.
    IterationLimit,
    /// The translator returned no actionable instruction.
    NoInstructions,
}

/// Final state of one run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub html: String,
    /// Evaluation passes performed (always `refine_batches + 1`).
    pub iterations: u32,
    /// Refine fan-outs performed. Never exceeds `max_iterations`.
    pub refine_batches: u32,
    pub stop_reason: StopReason,
    /// Report for `html`.
    pub evaluation: EvaluationReport,
    pub sections: SectionContent,
}

#[derive(Clone)]
pub struct RefinementLoop {
    oracle: ContentOracle,
    aggregator: EvaluatorAggregator,
    translator: IssueToInstructionTranslator,
}

impl RefinementLoop {
    pub fn new(
        oracle: ContentOracle,
        aggregator: EvaluatorAggregator,
        translator: IssueToInstructionTranslator,
    ) -> Self {
        Self {
            oracle,
            aggregator,
            translator,
        }
    }

    /// Runs one generation to completion. Always yields a complete page.
    pub async fn run(&self, property: &PropertyRecord, settings: &RunSettings) -> GenerationOutcome {
        let mut content = self.generate_all(property, settings).await;
        info!(
            generated = content.len(),
            total = SectionKind::ALL.len(),
            "initial sections drafted"
        );

        let mut refine_batches = 0u32;
        let mut iterations = 0u32;

        loop {
            let html = assemble(&content, settings.language);
            let report = self.aggregator.evaluate(&html, property, settings).await;
            iterations += 1;

            info!(
                iteration = iterations,
                overall_score = report.overall_score,
                needs_improvement = report.needs_improvement,
                "page evaluated"
            );

            let stop = if !report.needs_improvement {
                Some(StopReason::Converged)
            } else if refine_batches >= settings.max_iterations {
                Some(StopReason::IterationLimit)
            } else {
                None
            };
            if let Some(stop_reason) = stop {
                return finish(html, iterations, refine_batches, stop_reason, report, content);
            }

            let instructions = self
                .translator
                .translate(&content, &report, property, settings)
                .await;
            if !instructions.is_actionable() {
                info!(iteration = iterations, "no actionable instructions; stopping");
                return finish(
                    html,
                    iterations,
                    refine_batches,
                    StopReason::NoInstructions,
                    report,
                    content,
                );
            }

            content = self
                .refine_all(&content, &instructions, property, settings)
                .await;
            refine_batches += 1;
        }
    }

    /// Drafts every section concurrently. Failed sections are left out.
    async fn generate_all(&self, property: &PropertyRecord, settings: &RunSettings) -> SectionContent {
        let drafts = SectionKind::ALL.iter().map(|&kind| async move {
            match self.oracle.generate_initial(kind, property, settings).await {
                Ok(text) => Some((kind, text)),
                Err(e) => {
                    warn!(section = %kind, error = %e, "initial draft failed; using default text");
                    None
                }
            }
        });

        join_all(drafts).await.into_iter().flatten().collect()
    }

    /// Refines the sections named in `instructions` concurrently and returns
    /// the next snapshot. Failed refines keep the previous text.
    async fn refine_all(
        &self,
        content: &SectionContent,
        instructions: &FixInstructions,
        property: &PropertyRecord,
        settings: &RunSettings,
    ) -> SectionContent {
        let refines = instructions.actionable().map(|(kind, fix)| async move {
            let current = content.text_or_default(kind);
            match self
                .oracle
                .refine(kind, property, current, fix, settings)
                .await
            {
                Ok(text) => Some((kind, text)),
                Err(e) => {
                    warn!(section = %kind, error = %e, "refine failed; keeping previous text");
                    None
                }
            }
        });

        let updates: Vec<(SectionKind, String)> = join_all(refines).await.into_iter().flatten().collect();
        info!(
            requested = instructions.actionable().count(),
            refined = updates.len(),
            "refine round finished"
        );
        content.with_updates(updates)
    }
}

fn finish(
    html: String,
    iterations: u32,
    refine_batches: u32,
    stop_reason: StopReason,
    evaluation: EvaluationReport,
    sections: SectionContent,
) -> GenerationOutcome {
    info!(
        iterations,
        refine_batches,
        stop_reason = ?stop_reason,
        overall_score = evaluation.overall_score,
        "generation finished"
    );
    GenerationOutcome {
        html,
        iterations,
        refine_batches,
        stop_reason,
        evaluation,
        sections,
    }
}
