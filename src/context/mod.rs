//! Per-request context handed to handlers.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::binding::Arguments;
use crate::handler::Model;
use crate::http::view::PathVariables;
use crate::http::{Request, RequestView};

/// Everything a handler gets for one request: the parsed request, the view it
/// was routed and bound from, the bound arguments and the view model.
///
/// A context is owned by the task serving the request and moved into the
/// handler; nothing in it is shared with other requests. The model is the
/// one piece the dispatcher reads back after the handler returns: a handler
/// with the named-view strategy may fill it and return just a view name.
#[derive(Debug)]
pub struct Context {
    request: Request,
    view: RequestView,
    args: Arguments,
    model: Arc<Mutex<Model>>,
}

impl Context {
    pub fn new(request: Request, view: RequestView, args: Arguments) -> Self {
        Self {
            request,
            view,
            args,
            model: Arc::default(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn view(&self) -> &RequestView {
        &self.view
    }

    pub fn path_variables(&self) -> &PathVariables {
        self.view.path_variables()
    }

    /// Arguments bound from the handler's parameter declarations.
    pub fn args(&self) -> &Arguments {
        &self.args
    }

    /// Adds a view model attribute, replacing any earlier value of the same
    /// name. Values that fail to serialize are stored as `null`.
    pub fn add_attribute(&self, name: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.lock_model().insert(name.into(), value);
    }

    /// A copy of the view model as filled so far.
    pub fn model(&self) -> Model {
        self.lock_model().clone()
    }

    pub(crate) fn model_handle(&self) -> Arc<Mutex<Model>> {
        Arc::clone(&self.model)
    }

    fn lock_model(&self) -> std::sync::MutexGuard<'_, Model> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deserialize the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}
