//! Template compilation and rendering for turbine.
//! The filename and content templates are compiled once, when the
//! configuration is resolved, and rendered for every output context.
use crate::error::Result;
use crate::filename::sanitize;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;

/// Name under which the filename template is registered.
pub const FILENAME_TEMPLATE: &str = "output-filename-template";

/// Name under which the content template is registered.
pub const CONTENT_TEMPLATE: &str = "output-template";

/// The two compiled output templates.
///
/// Output is never escaped: the templates are supplied by the operator and
/// rendered verbatim.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Compiles the filename and content templates.
    ///
    /// # Arguments
    /// * `filename_template` - Template for each output path
    /// * `content_template` - Template for each file body
    ///
    /// # Returns
    /// * `Result<Templates>` - Both templates, ready to render
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if either template has a syntax error
    pub fn compile(filename_template: &str, content_template: &str) -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.add_filter("sanitize", |value: String| sanitize(&value));

        env.add_template_owned(FILENAME_TEMPLATE, filename_template.to_string())?;
        env.add_template_owned(CONTENT_TEMPLATE, content_template.to_string())?;

        Ok(Self { env })
    }

    fn render<S: Serialize>(&self, name: &str, context: &S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }

    /// Renders the output filename for `context`.
    pub fn render_filename<S: Serialize>(&self, context: &S) -> Result<String> {
        self.render(FILENAME_TEMPLATE, context)
    }

    /// Renders the file content for `context`.
    pub fn render_content<S: Serialize>(&self, context: &S) -> Result<String> {
        self.render(CONTENT_TEMPLATE, context)
    }

    /// Renders both templates, filename first.
    pub fn render_pair<S: Serialize>(&self, context: &S) -> Result<(String, String)> {
        Ok((self.render_filename(context)?, self.render_content(context)?))
    }
}
