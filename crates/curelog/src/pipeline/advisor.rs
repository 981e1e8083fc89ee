//! Advisor stage: curated clinical history → ranked action plan.
//!
//! The advisor reads the accumulated curated history (ideally the formatter's
//! output, audited clean) and produces a prioritized plan across five fixed
//! categories. The model's Markdown is parsed back into a typed
//! [`ActionPlan`] so callers can inspect categories and evidence tiers
//! without re-parsing text.

use super::{PipelineConfig, chat_with_retry, stage_request};
use crate::api::usage::UsageTotals;
use crate::prompt::PromptBuilder;
use crate::prompts::ADVISOR_PROMPT;
use crate::OpenRouterClient;

/// The five fixed plan categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanCategory {
    Diagnostics,
    Lifestyle,
    SelfExperiments,
    Supplements,
    Therapies,
}

impl PlanCategory {
    pub const ALL: [PlanCategory; 5] = [
        PlanCategory::Diagnostics,
        PlanCategory::Lifestyle,
        PlanCategory::SelfExperiments,
        PlanCategory::Supplements,
        PlanCategory::Therapies,
    ];

    /// The Markdown heading text for this category.
    pub fn heading(&self) -> &'static str {
        match self {
            PlanCategory::Diagnostics => "Diagnostics",
            PlanCategory::Lifestyle => "Lifestyle",
            PlanCategory::SelfExperiments => "Self-Experiments",
            PlanCategory::Supplements => "Supplements",
            PlanCategory::Therapies => "Therapies",
        }
    }

    fn from_heading(heading: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.heading().eq_ignore_ascii_case(heading))
    }
}

impl std::fmt::Display for PlanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.heading())
    }
}

/// Evidence tier tag attached to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceTier {
    Robust,
    Promising,
    Speculative,
}

impl EvidenceTier {
    /// Find a `[robust]` / `[promising]` / `[speculative]` tag in a line.
    fn find_in(line: &str) -> Option<Self> {
        let lower = line.to_lowercase();
        if lower.contains("[robust]") {
            Some(EvidenceTier::Robust)
        } else if lower.contains("[promising]") {
            Some(EvidenceTier::Promising)
        } else if lower.contains("[speculative]") {
            Some(EvidenceTier::Speculative)
        } else {
            None
        }
    }
}

/// One recommendation, in rank order within its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// The bullet text as written by the model (tags included).
    pub text: String,
    /// Parsed evidence tier, when the model tagged one.
    pub tier: Option<EvidenceTier>,
}

/// A parsed action plan.
#[derive(Debug, Clone)]
pub struct ActionPlan {
    /// The advisor's full Markdown output.
    pub text: String,
    sections: Vec<(PlanCategory, Vec<Recommendation>)>,
}

impl ActionPlan {
    /// Recommendations for a category, in rank order. Empty when the model
    /// had nothing grounded in the data for that category.
    pub fn recommendations(&self, category: PlanCategory) -> &[Recommendation] {
        self.sections
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, recs)| recs.as_slice())
            .unwrap_or(&[])
    }

    /// Total recommendations across all categories.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|(_, recs)| recs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ask the advisor for an action plan over the curated history.
pub async fn advise(
    client: &OpenRouterClient,
    config: &PipelineConfig,
    history: &str,
    goals: Option<&str>,
    totals: &mut UsageTotals,
) -> Result<ActionPlan, String> {
    let user = PromptBuilder::new("Produce a prioritized action plan for the history below.")
        .section("Clinical history", history)
        .section_opt("Goals", goals)
        .build();

    let request = stage_request(config, ADVISOR_PROMPT, user);
    let completion = chat_with_retry(client, &request, &config.retry, totals).await?;
    let text = completion
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err("advisor returned an empty response".to_string());
    }
    Ok(parse_action_plan(&text))
}

/// Parse the advisor's Markdown into categories and ranked recommendations.
///
/// Headings at any level (`## Diagnostics`, `### Lifestyle`, ...) open a
/// category; bullets under it become recommendations in order. Unknown
/// headings close the current category; categories the model skipped come
/// back empty.
pub fn parse_action_plan(text: &str) -> ActionPlan {
    let mut sections: Vec<(PlanCategory, Vec<Recommendation>)> = PlanCategory::ALL
        .into_iter()
        .map(|c| (c, Vec::new()))
        .collect();
    let mut current: Option<PlanCategory> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            current = PlanCategory::from_heading(heading);
            continue;
        }
        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "));
        if let (Some(category), Some(content)) = (current, bullet) {
            let rec = Recommendation {
                text: content.trim().to_string(),
                tier: EvidenceTier::find_in(content),
            };
            if let Some((_, recs)) = sections.iter_mut().find(|(c, _)| *c == category) {
                recs.push(rec);
            }
        }
    }

    ActionPlan {
        text: text.to_string(),
        sections,
    }
}
