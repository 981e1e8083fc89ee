//! Auditor stage: original entry vs. curated version → difference report.
//!
//! The auditor is the pipeline's regression oracle: it checks that the
//! formatter dropped or altered nothing. Its output channel is a strict
//! micro-protocol — exactly `$OK$` when clean, otherwise a quoted discrepancy
//! list terminated by `$FAILED$`. Anything else is a protocol violation and
//! surfaces as an error rather than being accepted as a clean audit.

use super::{PipelineConfig, chat_with_retry, stage_request};
use crate::api::usage::UsageTotals;
use crate::prompt::PromptBuilder;
use crate::prompts::{AUDITOR_PROMPT, FAILED_SENTINEL, OK_SENTINEL};
use crate::OpenRouterClient;

/// One omission or alteration found by the auditor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    /// Exact text quoted from the original entry.
    pub quote: String,
    /// What is missing or wrong in the curated version.
    pub explanation: String,
}

/// Outcome of an audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The curated version preserves every clinical fact.
    Clean,
    /// At least one fact was dropped or altered. Ordered as reported.
    Discrepancies(Vec<Discrepancy>),
}

impl AuditOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, AuditOutcome::Clean)
    }
}

/// Audit a curated version against its original entry.
pub async fn audit(
    client: &OpenRouterClient,
    config: &PipelineConfig,
    original: &str,
    curated: &str,
    totals: &mut UsageTotals,
) -> Result<AuditOutcome, String> {
    let user = PromptBuilder::new(
        "Audit the curated version below against the original entry. \
         Follow your output rules exactly.",
    )
    .section("Original entry", original)
    .section("Curated version", curated)
    .build();

    let request = stage_request(config, AUDITOR_PROMPT, user);
    let completion = chat_with_retry(client, &request, &config.retry, totals).await?;
    let output = completion
        .content
        .ok_or_else(|| "auditor returned an empty response".to_string())?;
    parse_audit_output(&output)
}

/// Parse the auditor's sentinel-terminated output.
///
/// - Exactly `$OK$` (after trimming whitespace) → [`AuditOutcome::Clean`].
/// - A non-empty list of items followed by `$FAILED$` on the last line →
///   [`AuditOutcome::Discrepancies`].
/// - `$OK$` with surrounding text, `$FAILED$` with no items, or output with
///   neither sentinel → `Err`. The protocol is exact-match by design: a
///   chatty model response must never pass as a clean audit.
pub fn parse_audit_output(output: &str) -> Result<AuditOutcome, String> {
    let trimmed = output.trim();

    if trimmed == OK_SENTINEL {
        return Ok(AuditOutcome::Clean);
    }

    if let Some(list) = trimmed.strip_suffix(FAILED_SENTINEL) {
        let items: Vec<Discrepancy> = list
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(parse_discrepancy_line)
            .collect();
        if items.is_empty() {
            return Err(format!(
                "auditor output ends with {FAILED_SENTINEL} but lists no discrepancies"
            ));
        }
        return Ok(AuditOutcome::Discrepancies(items));
    }

    if trimmed.contains(OK_SENTINEL) {
        return Err(format!(
            "auditor output contains {OK_SENTINEL} alongside other text; \
             a clean audit must be exactly {OK_SENTINEL}"
        ));
    }

    Err(format!(
        "auditor output carries neither {OK_SENTINEL} nor {FAILED_SENTINEL}: {trimmed:?}"
    ))
}

/// Parse one `- "quote" — explanation` list item.
///
/// Lines without a quoted fragment keep the whole line as the explanation so
/// a slightly off-format item is still reported rather than dropped.
fn parse_discrepancy_line(line: &str) -> Discrepancy {
    let item = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);

    if let Some((_, after_open)) = item.split_once('"') {
        if let Some((quote, rest)) = after_open.split_once('"') {
            let explanation = rest
                .trim_start_matches([' ', '—', '-', ':', '–'])
                .trim()
                .to_string();
            return Discrepancy {
                quote: quote.to_string(),
                explanation,
            };
        }
    }

    Discrepancy {
        quote: String::new(),
        explanation: item.trim().to_string(),
    }
}

/// Render an outcome as a human-readable report (used by the CLI).
pub fn render_report(outcome: &AuditOutcome) -> String {
    match outcome {
        AuditOutcome::Clean => OK_SENTINEL.to_string(),
        AuditOutcome::Discrepancies(items) => {
            let mut out = String::new();
            for d in items {
                if d.quote.is_empty() {
                    out.push_str(&format!("- {}\n", d.explanation));
                } else {
                    out.push_str(&format!("- \"{}\" — {}\n", d.quote, d.explanation));
                }
            }
            out.push_str(FAILED_SENTINEL);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_ok_is_clean() {
        assert_eq!(parse_audit_output("$OK$").unwrap(), AuditOutcome::Clean);
        assert_eq!(parse_audit_output("  $OK$\n").unwrap(), AuditOutcome::Clean);
    }

    #[test]
    fn ok_with_surrounding_text_rejected() {
        assert!(parse_audit_output("Everything looks good! $OK$").is_err());
        assert!(parse_audit_output("$OK$ — no discrepancies found").is_err());
    }

    #[test]
    fn failed_list_parsed() {
        let output = "- \"Vitamin C 500mg daily x3mo\" — the supplement was dropped from the curated version\n$FAILED$";
        match parse_audit_output(output).unwrap() {
            AuditOutcome::Discrepancies(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].quote, "Vitamin C 500mg daily x3mo");
                assert!(items[0].explanation.contains("dropped"));
            }
            AuditOutcome::Clean => panic!("expected discrepancies"),
        }
    }

    #[test]
    fn multiple_items_keep_order() {
        let output = "- \"Ferritin 8 ng/mL\" — value altered to 80\n- \"next visit 2023-06-01\" — appointment omitted\n$FAILED$";
        match parse_audit_output(output).unwrap() {
            AuditOutcome::Discrepancies(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].quote, "Ferritin 8 ng/mL");
                assert_eq!(items[1].quote, "next visit 2023-06-01");
            }
            AuditOutcome::Clean => panic!("expected discrepancies"),
        }
    }

    #[test]
    fn failed_without_items_rejected() {
        assert!(parse_audit_output("$FAILED$").is_err());
        assert!(parse_audit_output("\n\n$FAILED$").is_err());
    }

    #[test]
    fn missing_sentinels_rejected() {
        assert!(parse_audit_output("The curated version looks complete.").is_err());
        assert!(parse_audit_output("").is_err());
    }

    #[test]
    fn unquoted_item_kept_as_explanation() {
        let output = "- the ferritin result is missing entirely\n$FAILED$";
        match parse_audit_output(output).unwrap() {
            AuditOutcome::Discrepancies(items) => {
                assert_eq!(items[0].quote, "");
                assert!(items[0].explanation.contains("ferritin"));
            }
            AuditOutcome::Clean => panic!("expected discrepancies"),
        }
    }

    #[test]
    fn render_clean_is_bare_sentinel() {
        assert_eq!(render_report(&AuditOutcome::Clean), "$OK$");
    }

    #[test]
    fn render_report_round_trips() {
        let outcome = AuditOutcome::Discrepancies(vec![Discrepancy {
            quote: "Vitamin C 500mg daily x3mo".into(),
            explanation: "supplement omitted".into(),
        }]);
        let rendered = render_report(&outcome);
        assert!(rendered.ends_with("$FAILED$"));
        assert_eq!(parse_audit_output(&rendered).unwrap(), outcome);
    }

    #[test]
    fn is_clean_helper() {
        assert!(AuditOutcome::Clean.is_clean());
        assert!(!AuditOutcome::Discrepancies(vec![]).is_clean());
    }
}
