//! Prompt sent to the vision model for every page.
//!
//! Kept in one place so the instruction can be tuned without touching the
//! retry or sanitisation code. Callers override it through
//! [`crate::config::BatchConfig::system_prompt`].

/// Default instruction for redrawing a page image as SVG.
///
/// The model is told not to fence its answer, but the sanitizer still strips
/// fences and commentary because models do not always comply.
pub const VECTORIZE_PROMPT: &str = r#"Convert this image into SVG. The result must look identical to the image.

Rules:
- Output ONLY the SVG code, starting with <svg and ending with </svg>
- No explanations, no commentary
- Do NOT wrap the output in markdown fences such as ```xml or ```svg
- Render every piece of text with <text> elements, using the generic sans-serif font family
- Preserve positions, colours, line weights and proportions of every shape
- Set a viewBox matching the image aspect ratio"#;
