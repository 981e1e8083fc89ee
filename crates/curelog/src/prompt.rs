//! Structured user-message builder.
//!
//! [`PromptBuilder`] provides a builder-pattern API for assembling the
//! multi-section user messages the auditor and advisor stages send (original
//! vs. curated text, history plus optional goals). This replaces manual
//! string concatenation with a structured, composable approach.

/// Builder for multi-section Markdown messages.
///
/// Sections are joined with double newlines. Empty sections (from `section_if`
/// with a false condition, or `section_opt` with `None`) are silently skipped.
///
/// # Example
///
/// ```
/// use curelog::prompt::PromptBuilder;
///
/// let msg = PromptBuilder::new("Review the following.")
///     .section("Original", "Ferritin 8 ng/mL")
///     .section_opt("Goals", Some("more energy"))
///     .section_opt("Missing", None::<String>)
///     .build();
///
/// assert!(msg.contains("## Original"));
/// assert!(msg.contains("## Goals"));
/// assert!(!msg.contains("## Missing"));
/// ```
pub struct PromptBuilder {
    sections: Vec<String>,
    heading_prefix: String,
}

impl PromptBuilder {
    /// Create a new builder with an initial preamble section.
    ///
    /// The preamble is included as-is (no heading prefix). Subsequent
    /// sections added via `section()` get `## ` prefixed headings by default.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
            heading_prefix: "##".to_string(),
        }
    }

    /// Set the heading level for subsequent `section()` calls.
    ///
    /// Level 2 produces `## Heading`, level 3 produces `### Heading`, etc.
    /// The default is 2.
    pub fn heading_level(mut self, level: u8) -> Self {
        self.heading_prefix = "#".repeat(level as usize);
        self
    }

    /// Append a named section with a markdown heading.
    ///
    /// Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections
                .push(format!("{} {heading}\n\n{content}", self.heading_prefix));
        }
        self
    }

    /// Conditionally append a section.
    ///
    /// The `content_fn` is only called when `condition` is true.
    pub fn section_if(
        self,
        condition: bool,
        heading: &str,
        content_fn: impl FnOnce() -> String,
    ) -> Self {
        if condition {
            self.section(heading, content_fn())
        } else {
            self
        }
    }

    /// Append a section only if the content is `Some`.
    pub fn section_opt(self, heading: &str, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(heading, c),
            None => self,
        }
    }

    /// Append raw text without a heading.
    ///
    /// Skipped if `content` is empty.
    pub fn raw(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(content);
        }
        self
    }

    /// Build the final message by joining all sections with double newlines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}
