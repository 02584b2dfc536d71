//! Template rendering collaborator for the system prompt.

use crate::error::TemplateError;

pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str) -> Result<String, TemplateError>;
}

/// Returns the template verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTemplate;

impl TemplateEngine for PassthroughTemplate {
    fn render(&self, template: &str) -> Result<String, TemplateError> {
        Ok(template.to_string())
    }
}
