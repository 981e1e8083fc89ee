//! Cumulative token accounting for a pipeline run.
//!
//! Every stage call reports its [`UsageInfo`](crate::UsageInfo); the totals
//! are logged once at the end of the run so long curation batches can be
//! sanity-checked for runaway spend.

use crate::UsageInfo;

/// Cumulative token totals across all calls in a pipeline run.
#[derive(Debug, Default, Clone)]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Number of chat calls recorded.
    pub calls: u64,
}

impl UsageTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage from one completed call. Calls whose usage the API
    /// omitted still count toward `calls`.
    pub fn record(&mut self, usage: Option<&UsageInfo>) {
        self.calls += 1;
        if let Some(u) = usage {
            self.prompt_tokens += u.prompt_tokens.unwrap_or(0) as u64;
            self.completion_tokens += u.completion_tokens.unwrap_or(0) as u64;
        }
    }

    /// Fold another totals value into this one (used when concurrent section
    /// tasks each track their own).
    pub fn merge(&mut self, other: &UsageTotals) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.calls += other.calls;
    }

    /// Total tokens consumed.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Format as a short summary string.
    pub fn summary(&self) -> String {
        format!(
            "{} call(s), tokens: {} prompt + {} completion = {} total",
            self.calls,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> UsageInfo {
        UsageInfo {
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
            total_tokens: Some(prompt + completion),
        }
    }

    #[test]
    fn totals_accumulate() {
        let mut totals = UsageTotals::new();
        totals.record(Some(&usage(1000, 500)));
        totals.record(Some(&usage(2000, 1000)));
        assert_eq!(totals.prompt_tokens, 3000);
        assert_eq!(totals.completion_tokens, 1500);
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.total_tokens(), 4500);
    }

    #[test]
    fn missing_usage_still_counts_call() {
        let mut totals = UsageTotals::new();
        totals.record(None);
        assert_eq!(totals.calls, 1);
        assert_eq!(totals.total_tokens(), 0);
    }

    #[test]
    fn merge_folds_both_sides() {
        let mut a = UsageTotals::new();
        a.record(Some(&usage(100, 50)));
        let mut b = UsageTotals::new();
        b.record(Some(&usage(200, 25)));
        a.merge(&b);
        assert_eq!(a.prompt_tokens, 300);
        assert_eq!(a.completion_tokens, 75);
        assert_eq!(a.calls, 2);
    }

    #[test]
    fn summary_format() {
        let mut totals = UsageTotals::new();
        totals.record(Some(&usage(1000, 500)));
        let summary = totals.summary();
        assert!(summary.contains("tokens:"));
        assert!(summary.contains("1500 total"));
    }
}
