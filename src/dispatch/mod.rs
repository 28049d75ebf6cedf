//! Request dispatch: the glue between the route table, the binder, handlers
//! and views.
//!
//! [`Dispatcher::dispatch`] runs one request through the whole pipeline:
//!
//! 1. snapshot the request as a [`RequestView`];
//! 2. [`RouteTable::resolve`] it to a single route;
//! 3. attach the captured path variables and [`bind`](binding::bind) the
//!    handler's arguments;
//! 4. invoke the handler with a [`Context`];
//! 5. turn the [`Reply`] into a response according to the handler's
//!    [`ResponseStrategy`].
//!
//! Failures never escape as errors; each one maps to a status code:
//!
//! | Failure                                   | Status |
//! |-------------------------------------------|--------|
//! | [`RouteError::NoMatch`]                   | 404    |
//! | [`RouteError::Ambiguous`]                 | 500    |
//! | [`BindingError::MissingRequired`], [`BindingError::TypeMismatch`] | 400 |
//! | [`BindingError::MissingPathVariable`]     | 500    |
//! | [`ViewError`]                             | 500    |

use std::sync::{Arc, PoisonError};

use tracing::{debug, error, info, warn};

use crate::binding::{self, BindingError};
use crate::context::Context;
use crate::handler::{
    self, Handler, HandlerDescriptor, IntoHandler, Model, ModelAndView, Reply, ResponseStrategy,
};
use crate::http::response::TEXT_PLAIN_UTF8;
use crate::http::{Request, RequestView, Response, StatusCode};
use crate::router::{RouteDescriptor, RouteError, RouteMatch, RouteTable};
use crate::view::{ViewError, ViewResolver};

/// Routes requests to registered handlers.
///
/// Built once at startup and then shared read-only (typically behind an
/// [`Arc`]) by every connection task.
///
/// # Examples
///
/// ```
/// use reqbind::binding::{ParamType, ParameterSpec};
/// use reqbind::dispatch::Dispatcher;
/// use reqbind::handler::HandlerDescriptor;
/// use reqbind::router::RouteDescriptor;
/// use reqbind::context::Context;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .route(
///         RouteDescriptor::get("/mapping/{userid}"),
///         HandlerDescriptor::raw_body("mappingPath")
///             .param(ParameterSpec::path("userid", ParamType::String)),
///         |ctx: Context| async move {
///             format!("ok {}", ctx.args().get_str("userid").unwrap_or_default())
///         },
///     )
///     .unwrap();
/// assert_eq!(dispatcher.routes().len(), 1);
/// ```
#[derive(Default)]
pub struct Dispatcher {
    table: RouteTable,
    handlers: Vec<Handler>,
    views: Option<Arc<dyn ViewResolver>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `views` to render handlers with the named-view strategy.
    #[must_use]
    pub fn with_views(mut self, views: impl ViewResolver) -> Self {
        self.views = Some(Arc::new(views));
        self
    }

    /// Register `handler` under `route`.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`] returned by [`RouteTable::register`]; nothing is
    /// registered in that case.
    pub fn route(
        &mut self,
        route: RouteDescriptor,
        descriptor: HandlerDescriptor,
        handler: impl IntoHandler,
    ) -> Result<&mut Self, RouteError> {
        let id = self.table.register(route, descriptor)?;
        debug_assert_eq!(id.index(), self.handlers.len());
        self.handlers.push(handler::erase(handler));
        Ok(self)
    }

    /// The underlying route table.
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Run `request` through resolution, binding, the handler and rendering.
    pub async fn dispatch(&self, request: Request) -> Response {
        let view = RequestView::from_request(&request);

        let RouteMatch {
            id,
            handler: descriptor,
            path_variables,
            content_type,
            ..
        } = match self.table.resolve(&view) {
            Ok(found) => found,
            Err(e) => return route_failure(&e),
        };

        let view = view.with_path_variables(path_variables);
        let args = match binding::bind(descriptor, &view) {
            Ok(args) => args,
            Err(e) => return binding_failure(descriptor, &e),
        };

        let Some(handler) = self.handlers.get(id.index()) else {
            error!(handler = descriptor.name(), "route has no registered handler");
            return Response::text(StatusCode::InternalServerError, "Internal Server Error");
        };

        info!(
            method = %view.method(),
            path = view.path(),
            handler = descriptor.name(),
            "dispatching"
        );
        let ctx = Context::new(request, view, args);
        let model = ctx.model_handle();
        let reply = handler(ctx).await;
        let model = std::mem::take(&mut *model.lock().unwrap_or_else(PoisonError::into_inner));

        match self.render(descriptor, reply, content_type, model) {
            Ok(response) => response,
            Err(e) => {
                error!(handler = descriptor.name(), error = %e, "view rendering failed");
                Response::text(StatusCode::InternalServerError, "Internal Server Error")
            }
        }
    }

    fn render(
        &self,
        descriptor: &HandlerDescriptor,
        reply: Reply,
        content_type: Option<String>,
        model: Model,
    ) -> Result<Response, ViewError> {
        let mav = match (descriptor.strategy(), reply) {
            (_, Reply::Response(response)) => return Ok(response),
            (_, Reply::View(mav)) => mav.with_fallback(model),
            (ResponseStrategy::NamedView, Reply::Text(view)) => {
                ModelAndView::new(view).with_fallback(model)
            }
            (ResponseStrategy::RawBody, Reply::Text(body)) => {
                let content_type = content_type.unwrap_or_else(|| TEXT_PLAIN_UTF8.to_owned());
                return Ok(Response::new(StatusCode::Ok)
                    .header("Content-Type", content_type)
                    .body(body));
            }
        };

        let views = self.views.as_deref().ok_or_else(|| ViewError::Unconfigured {
            view: mav.view().to_owned(),
        })?;
        let html = views.render(mav.view(), mav.model())?;
        Ok(Response::html(StatusCode::Ok, html))
    }
}

fn route_failure(err: &RouteError) -> Response {
    match err {
        RouteError::NoMatch { .. } => {
            warn!(error = %err, "request not routed");
            Response::text(StatusCode::NotFound, "Not Found")
        }
        _ => {
            error!(error = %err, "route resolution failed");
            Response::text(StatusCode::InternalServerError, "Internal Server Error")
        }
    }
}

fn binding_failure(descriptor: &HandlerDescriptor, err: &BindingError) -> Response {
    if err.is_client_error() {
        debug!(handler = descriptor.name(), error = %err, "argument binding rejected request");
        Response::text(StatusCode::BadRequest, format!("Bad Request: {err}"))
    } else {
        error!(handler = descriptor.name(), error = %err, "argument binding failed");
        Response::text(StatusCode::InternalServerError, "Internal Server Error")
    }
}
