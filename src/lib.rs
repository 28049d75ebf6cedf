//! # reqbind
//!
//! Declarative request mapping and parameter binding on an async HTTP/1.1
//! server.
//!
//! Handlers are registered with a [`RouteDescriptor`](router::RouteDescriptor)
//! (path pattern, methods, parameter/header conditions, consumable and
//! producible media types) and a [`HandlerDescriptor`](handler::HandlerDescriptor)
//! (typed parameter declarations plus a response strategy). Each request is
//! resolved to exactly one handler, its arguments are bound from the path, the
//! query string and the form body, and the handler's reply is written either
//! verbatim or through a named view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reqbind::binding::{ParamType, ParameterSpec};
//! use reqbind::context::Context;
//! use reqbind::dispatch::Dispatcher;
//! use reqbind::handler::HandlerDescriptor;
//! use reqbind::router::RouteDescriptor;
//! use reqbind::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dispatcher = Dispatcher::new();
//!     dispatcher.route(
//!         RouteDescriptor::new("/request-param-default"),
//!         HandlerDescriptor::raw_body("requestParamDefault")
//!             .param(ParameterSpec::query("username", ParamType::String).default_value("guest")),
//!         |ctx: Context| async move {
//!             format!("hello {}", ctx.args().get_str("username").unwrap_or_default())
//!         },
//!     )?;
//!
//!     Server::bind("127.0.0.1:8080").await?.serve(dispatcher).await?;
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod handler;
pub mod http;
pub mod router;
pub mod server;
pub mod view;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use dispatch::Dispatcher;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
