//! Convenience re-exports for common `curelog` types.
//!
//! Meant to be glob-imported when embedding the pipeline:
//!
//! ```ignore
//! use curelog::prelude::*;
//! ```
//!
//! This pulls in the types needed for the vast majority of callers: the
//! [`OpenRouterClient`], the stage entry points, their outcome types, and the
//! pipeline config. Specialized pieces (retry tuning, the section cache, the
//! raw prompt constants) are intentionally excluded — import those from their
//! modules directly when needed.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatRequest, Message, OpenRouterClient};

// ── Pipeline stages ─────────────────────────────────────────────────
pub use crate::pipeline::{
    ActionPlan, AuditOutcome, CuratedJournal, Discrepancy, EvidenceTier, PipelineConfig,
    PlanCategory, Recommendation, advise, audit, curate_journal, format_section,
};

// ── Journal model ───────────────────────────────────────────────────
pub use crate::journal::{Section, merge_curated, split_sections};

// ── Accounting ──────────────────────────────────────────────────────
pub use crate::api::usage::UsageTotals;

// ── Prompt assembly ─────────────────────────────────────────────────
pub use crate::prompt::PromptBuilder;
