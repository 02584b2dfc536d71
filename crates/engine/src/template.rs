//! Handlebars rendering for system prompts.

use handlebars::Handlebars;
use parlance_core::error::TemplateError;
use parlance_core::template::TemplateEngine;
use serde_json::Value;
use std::collections::HashMap;

/// Renders prompt templates with a fixed set of variables.
///
/// Escaping is disabled: prompts are plain text, not HTML.
pub struct HandlebarsTemplate {
    registry: Handlebars<'static>,
    data: Value,
}

impl HandlebarsTemplate {
    pub fn new(variables: HashMap<String, Value>) -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        Self {
            registry,
            data: Value::Object(variables.into_iter().collect()),
        }
    }

    /// Fail rendering when the template references an unknown variable.
    pub fn strict(mut self) -> Self {
        self.registry.set_strict_mode(true);
        self
    }
}

impl TemplateEngine for HandlebarsTemplate {
    fn render(&self, template: &str) -> Result<String, TemplateError> {
        handlebars::Template::compile(template)
            .map_err(|e| TemplateError::Invalid(e.to_string()))?;

        self.registry
            .render_template(template, &self.data)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }
}
