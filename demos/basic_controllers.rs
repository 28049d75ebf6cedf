//! The classic request-mapping controllers, served on `127.0.0.1:8080`.
//!
//! ```text
//! cargo run --example basic_controllers
//! curl 'http://127.0.0.1:8080/request-param-v2?username=kim&age=20'
//! curl -H 'mode: debug' http://127.0.0.1:8080/mapping-header
//! ```
//!
//! Set `REQBIND_CONFIG` to a JSON file to override the listener settings and
//! `RUST_LOG` to change verbosity.

use reqbind::binding::{ParamType, ParameterSpec, RecordSpec};
use reqbind::config::ServerConfig;
use reqbind::context::Context;
use reqbind::dispatch::Dispatcher;
use reqbind::handler::{HandlerDescriptor, ModelAndView, Reply};
use reqbind::router::{RouteDescriptor, RouteError};
use reqbind::server::Server;
use reqbind::view::TemplateViews;
use reqbind::{Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct HelloData {
    username: Option<String>,
    age: i32,
}

fn mapping_routes(d: &mut Dispatcher) -> Result<(), RouteError> {
    d.route(
        RouteDescriptor::new("/hello-basic"),
        HandlerDescriptor::raw_body("helloBasic"),
        |_ctx: Context| async {
            info!("basic");
            "OK >_< "
        },
    )?
    .route(
        RouteDescriptor::get("/mapping-get-v1"),
        HandlerDescriptor::raw_body("mappingGetV1"),
        |_ctx: Context| async {
            info!("mappingGetV1");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::get("/mapping-get-v2"),
        HandlerDescriptor::raw_body("mappingGetV2"),
        |_ctx: Context| async {
            info!("mapping-get-v2");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::get("/mapping/{userid}"),
        HandlerDescriptor::raw_body("mappingPath")
            .param(ParameterSpec::path("userid", ParamType::String)),
        |ctx: Context| async move {
            info!(userid = ctx.args().get_str("userid"), "mappingPath");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::get("/mapping/users/{userId}/orders/{orderId}"),
        HandlerDescriptor::raw_body("mappingPathMulti")
            .param(ParameterSpec::path("userId", ParamType::String))
            .param(ParameterSpec::path("orderId", ParamType::long())),
        |ctx: Context| async move {
            let args = ctx.args();
            info!(
                user_id = args.get_str("userId"),
                order_id = args.get_i64("orderId"),
                "mappingPath"
            );
            "ok"
        },
    )?
    .route(
        RouteDescriptor::get("/mapping-param").param("mode=debug"),
        HandlerDescriptor::raw_body("mappingParam"),
        |_ctx: Context| async {
            info!("mappingParam");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::get("/mapping-header").header("mode=debug"),
        HandlerDescriptor::raw_body("mappingHeader"),
        |_ctx: Context| async {
            info!("mappingHeader");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::post("/mapping-consume").consumes("application/json"),
        HandlerDescriptor::raw_body("mappingConsumes"),
        |_ctx: Context| async {
            info!("mappingConsumes");
            "ok"
        },
    )?
    .route(
        RouteDescriptor::post("/mapping-produce").produces("text/html"),
        HandlerDescriptor::raw_body("mappingProduces"),
        |_ctx: Context| async {
            info!("mappingProduces");
            "ok"
        },
    )?;
    Ok(())
}

fn request_param_routes(d: &mut Dispatcher) -> Result<(), RouteError> {
    // Reads the raw request instead of declaring parameters.
    d.route(
        RouteDescriptor::new("/request-param-v1"),
        HandlerDescriptor::raw_body("requestParamV1"),
        |ctx: Context| async move {
            let params = ctx.request().parameters();
            let username = params.first("username").unwrap_or_default();
            match params.first("age").map(str::parse::<i32>) {
                Some(Ok(age)) => {
                    info!(username, age, "requestParamV1");
                    Reply::from("OK!")
                }
                _ => {
                    warn!(username, age = params.first("age"), "requestParamV1: age is not an integer");
                    Response::text(StatusCode::BadRequest, "age must be an integer").into()
                }
            }
        },
    )?;

    for (path, name) in [
        ("/request-param-v2", "requestParamV2"),
        ("/request-param-v3", "requestParamV3"),
        ("/request-param-v4", "requestParamV4"),
    ] {
        d.route(
            RouteDescriptor::new(path),
            HandlerDescriptor::raw_body(name)
                .param(ParameterSpec::query("username", ParamType::String))
                .param(ParameterSpec::query("age", ParamType::int())),
            |ctx: Context| async move {
                let args = ctx.args();
                info!(username = args.get_str("username"), age = args.get_i32("age"), "requestParam");
                "OK!"
            },
        )?;
    }

    d.route(
        RouteDescriptor::new("/request-param-required"),
        HandlerDescriptor::raw_body("requestParamRequired")
            .param(ParameterSpec::query("username", ParamType::String))
            .param(ParameterSpec::query("age", ParamType::nullable_int()).optional()),
        |ctx: Context| async move {
            let args = ctx.args();
            info!(username = args.get_str("username"), age = args.get_i32("age"), "requestParamRequired");
            "OK!"
        },
    )?
    .route(
        RouteDescriptor::new("/request-param-default"),
        HandlerDescriptor::raw_body("requestParamDefault")
            .param(ParameterSpec::query("username", ParamType::String).default_value("guest"))
            .param(
                ParameterSpec::query("age", ParamType::int())
                    .optional()
                    .default_value("-1"),
            ),
        |ctx: Context| async move {
            let args = ctx.args();
            info!(username = args.get_str("username"), age = args.get_i32("age"), "requestParamDefault");
            "OK!"
        },
    )?
    .route(
        RouteDescriptor::new("/request-param-map"),
        HandlerDescriptor::raw_body("requestParamMap").param(ParameterSpec::map("paramMap")),
        |ctx: Context| async move {
            if let Some(map) = ctx.args().get_map("paramMap") {
                info!(
                    username = map.get("username").map(|v| v.first()),
                    age = map.get("age").map(|v| v.first()),
                    "requestParamMap"
                );
            }
            "OK!"
        },
    )?
    .route(
        RouteDescriptor::new("/model-attribute-v1"),
        HandlerDescriptor::raw_body("modelAttributeV1").param(ParameterSpec::record(
            "helloData",
            RecordSpec::new("HelloData")
                .field(ParameterSpec::query("username", ParamType::String).optional())
                .field(ParameterSpec::query("age", ParamType::int()).default_value("0")),
        )),
        |ctx: Context| async move {
            if let Some(bound) = ctx.args().get("helloData") {
                info!("helloData={bound}");
            }
            match ctx.args().get_record::<HelloData>("helloData") {
                Ok(data) => {
                    info!(username = data.username.as_deref(), age = data.age, "modelAttributeV1");
                    "OK!"
                }
                Err(e) => {
                    warn!(error = %e, "modelAttributeV1");
                    "invalid helloData"
                }
            }
        },
    )?;
    Ok(())
}

fn view_routes(d: &mut Dispatcher) -> Result<(), RouteError> {
    d.route(
        RouteDescriptor::new("/response-view-v1"),
        HandlerDescriptor::named_view("responseViewV1"),
        |_ctx: Context| async { ModelAndView::new("/response/hello").with("data", "hello!") },
    )?
    .route(
        RouteDescriptor::new("/response-view-v2"),
        HandlerDescriptor::named_view("responseViewV2"),
        |ctx: Context| async move {
            ctx.add_attribute("data", "hello!");
            "/response/hello"
        },
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("REQBIND_CONFIG") {
        Ok(path) => ServerConfig::load(path)?,
        Err(_) => ServerConfig::default(),
    };

    let views = TemplateViews::new().with(
        "/response/hello",
        "<!DOCTYPE html>\n<html>\n<body>\n<p>{{ data }}</p>\n</body>\n</html>\n",
    )?;

    let mut dispatcher = Dispatcher::new().with_views(views);
    mapping_routes(&mut dispatcher)?;
    request_param_routes(&mut dispatcher)?;
    view_routes(&mut dispatcher)?;

    let server = Server::with_config(config).await?;
    info!(address = %server.local_addr(), "basic controllers ready");
    server.serve(dispatcher).await?;
    Ok(())
}
