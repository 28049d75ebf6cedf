//! View resolution for handlers using the named-view response strategy.
//!
//! A handler returns a logical view name (and optionally a model); a
//! [`ViewResolver`] turns the pair into an HTML document. [`TemplateViews`] is
//! the bundled resolver: minijinja templates registered in memory under their
//! logical names, HTML-escaped on output.

use minijinja::{AutoEscape, Environment, ErrorKind};
use thiserror::Error;
use tracing::debug;

use crate::handler::Model;

/// Errors produced while rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no view resolver configured for view '{view}'")]
    Unconfigured { view: String },

    #[error("unknown view '{view}'")]
    NotFound { view: String },

    #[error("invalid template for view '{view}': {source}")]
    Template {
        view: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to render view '{view}': {source}")]
    Render {
        view: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Turns a logical view name plus model into a response body.
pub trait ViewResolver: Send + Sync + 'static {
    /// Render `view` with `model`.
    ///
    /// # Errors
    ///
    /// A [`ViewError`] if the view is unknown or fails to render.
    fn render(&self, view: &str, model: &Model) -> Result<String, ViewError>;
}

/// In-memory minijinja templates keyed by logical view name.
///
/// # Examples
///
/// ```
/// use reqbind::handler::ModelAndView;
/// use reqbind::view::{TemplateViews, ViewResolver};
///
/// let mut views = TemplateViews::new();
/// views.add("/response/hello", "<p>{{ data }}</p>").unwrap();
///
/// let mav = ModelAndView::new("/response/hello").with("data", "hello!");
/// let html = views.render(mav.view(), mav.model()).unwrap();
/// assert_eq!(html, "<p>hello!</p>");
/// ```
pub struct TemplateViews {
    env: Environment<'static>,
}

impl TemplateViews {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        Self { env }
    }

    /// Register `source` under the logical name `view`, replacing any earlier
    /// template of the same name.
    ///
    /// # Errors
    ///
    /// [`ViewError::Template`] if the source does not compile.
    pub fn add(
        &mut self,
        view: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), ViewError> {
        let view = view.into();
        self.env
            .add_template_owned(view.clone(), source.into())
            .map_err(|source| ViewError::Template { view, source })
    }

    /// Builder form of [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// [`ViewError::Template`] if the source does not compile.
    pub fn with(
        mut self,
        view: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, ViewError> {
        self.add(view, source)?;
        Ok(self)
    }

    pub fn contains(&self, view: &str) -> bool {
        self.env.get_template(view).is_ok()
    }
}

impl Default for TemplateViews {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewResolver for TemplateViews {
    fn render(&self, view: &str, model: &Model) -> Result<String, ViewError> {
        let template = self.env.get_template(view).map_err(|source| {
            if source.kind() == ErrorKind::TemplateNotFound {
                ViewError::NotFound {
                    view: view.to_owned(),
                }
            } else {
                ViewError::Template {
                    view: view.to_owned(),
                    source,
                }
            }
        })?;

        debug!(view, attributes = model.len(), "rendering view");
        template.render(model).map_err(|source| ViewError::Render {
            view: view.to_owned(),
            source,
        })
    }
}
