//! Handler declarations and what handlers return.
//!
//! A [`HandlerDescriptor`] is the registration-time description of a handler:
//! its name, its ordered [`ParameterSpec`]s and its [`ResponseStrategy`]. The
//! executable part is an async closure receiving a [`Context`] and returning a
//! [`Reply`]; see [`IntoHandler`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::binding::ParameterSpec;
use crate::context::Context;
use crate::http::Response;

/// How a handler's return value becomes a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStrategy {
    /// A returned string is written verbatim as the response body.
    RawBody,
    /// A returned string is the logical name of a view, rendered with the
    /// handler's model by the view resolver.
    NamedView,
}

/// Registration-time description of a handler.
///
/// # Examples
///
/// ```
/// use reqbind::binding::{ParamType, ParameterSpec};
/// use reqbind::handler::{HandlerDescriptor, ResponseStrategy};
///
/// let handler = HandlerDescriptor::raw_body("requestParamV2")
///     .param(ParameterSpec::query("username", ParamType::String))
///     .param(ParameterSpec::query("age", ParamType::int()));
///
/// assert_eq!(handler.strategy(), ResponseStrategy::RawBody);
/// assert_eq!(handler.params().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDescriptor {
    name: String,
    params: Vec<ParameterSpec>,
    strategy: ResponseStrategy,
}

impl HandlerDescriptor {
    pub fn new(name: impl Into<String>, strategy: ResponseStrategy) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            strategy,
        }
    }

    /// A handler whose returned text is the response body.
    pub fn raw_body(name: impl Into<String>) -> Self {
        Self::new(name, ResponseStrategy::RawBody)
    }

    /// A handler whose returned text names a view.
    pub fn named_view(name: impl Into<String>) -> Self {
        Self::new(name, ResponseStrategy::NamedView)
    }

    /// Appends a parameter; binding follows declaration order.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn strategy(&self) -> ResponseStrategy {
        self.strategy
    }
}

/// Attributes handed to a view template.
pub type Model = BTreeMap<String, serde_json::Value>;

/// A logical view name plus the model it is rendered with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAndView {
    view: String,
    model: Model,
}

impl ModelAndView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            model: Model::new(),
        }
    }

    /// Adds a model attribute. Values that fail to serialize are stored as `null`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.model.insert(name.into(), value);
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Fills in attributes from `model` that this view does not set itself.
    pub(crate) fn with_fallback(mut self, model: Model) -> Self {
        for (name, value) in model {
            self.model.entry(name).or_insert(value);
        }
        self
    }
}

/// What a handler hands back.
///
/// `Text` is interpreted through the handler's [`ResponseStrategy`]: a body
/// for `RawBody`, a view name rendered with the context's model for
/// `NamedView`. `View` is always rendered. `Response` is written as is, for
/// handlers that need a status other than 200.
#[derive(Debug)]
pub enum Reply {
    Text(String),
    View(ModelAndView),
    Response(Response),
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<ModelAndView> for Reply {
    fn from(mav: ModelAndView) -> Self {
        Self::View(mav)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Type-erased, heap-allocated async handler that processes a [`Context`] and
/// returns a [`Reply`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be shared across
/// tasks without copying the underlying closure. Register handlers through
/// [`Dispatcher::route`](crate::dispatch::Dispatcher::route) rather than
/// building this type directly.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Reply> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = impl Into<Reply>> + Send` that is
/// also `Send + Sync + 'static` implements this trait through the blanket impl
/// below, so a handler can return `&'static str`, `String`, `ModelAndView` or
/// `Reply`.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Reply> + Send>>;
}

impl<T, F, R> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = R> + Send + 'static,
    R: Into<Reply> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Reply> + Send>> {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into() })
    }
}

/// Erase the concrete handler type.
pub(crate) fn erase(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx| handler.call(ctx))
}
