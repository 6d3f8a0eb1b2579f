use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use serde_json::json;
use switchboard::dispatcher::{Action, Controller, ControllerRegistry, Request, Response};
use switchboard::error::DispatchError;
use switchboard::middleware::{
    from_fn, AuthMiddleware, CorsConfigError, CorsMiddleware, MetricsMiddleware, Middleware,
    TracingMiddleware, PRINCIPAL_ATTRIBUTE,
};
use switchboard::router::Router;

mod common;
use common::{echo_order, labelled, short_circuit, Recorder, TestTracing};

fn layered_router(recorder: &Recorder) -> Router {
    let mut router = Router::new();
    router.set_global_middlewares(vec![labelled("global", recorder)]);
    router.add_middleware_group("api", vec![labelled("group", recorder)]);
    router
        .get("/orders/{id}", Action::handler(echo_order))
        .unwrap()
        .group("api")
        .middleware(labelled("route", recorder));
    router
}

#[test]
fn test_layers_run_global_group_route() {
    let _tracing = TestTracing::init();
    let recorder = Recorder::new();
    let router = layered_router(&recorder);

    let mut req = Request::new(Method::GET, "/orders/9");
    let res = router.resolve(&mut req).unwrap();

    assert_eq!(res.status, 200);
    assert_eq!(res.body["order"], json!(["global", "group", "route"]));
    assert_eq!(
        recorder.events(),
        vec![
            "global:before",
            "group:before",
            "route:before",
            "route:after",
            "group:after",
            "global:after",
        ]
    );
}

#[test]
fn test_response_post_processing_runs_inside_out() {
    let recorder = Recorder::new();
    let router = layered_router(&recorder);

    let mut req = Request::new(Method::GET, "/orders/9");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.get_header("x-trail"), Some("route,group,global"));
}

#[test]
fn test_groups_follow_route_declaration_order() {
    let recorder = Recorder::new();
    let mut router = Router::new();
    router.add_middleware_group("first", vec![labelled("first", &recorder)]);
    router.add_middleware_group("second", vec![labelled("second", &recorder)]);
    router
        .get("/x", Action::handler(echo_order))
        .unwrap()
        .group("second")
        .group("first");

    let mut req = Request::new(Method::GET, "/x");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.body["order"], json!(["second", "first"]));
}

#[test]
fn test_empty_chain_calls_action_directly() {
    let mut router = Router::new();
    router
        .get("/plain", Action::handler(|_req| Ok(Response::text(201, "made"))))
        .unwrap();

    let mut req = Request::new(Method::GET, "/plain");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res, Response::text(201, "made"));
}

#[test]
fn test_early_termination_skips_inner_layers_and_action() {
    let recorder = Recorder::new();
    let action_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&action_calls);

    let mut router = Router::new();
    router.set_global_middlewares(vec![
        labelled("outer", &recorder),
        short_circuit("gate", 403, &recorder),
    ]);
    router.add_middleware_group("api", vec![labelled("group", &recorder)]);
    router
        .get(
            "/secret",
            Action::handler(move |_req| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Response::new(200))
            }),
        )
        .unwrap()
        .group("api")
        .middleware(labelled("route", &recorder));

    let mut req = Request::new(Method::GET, "/secret");
    let res = router.resolve(&mut req).unwrap();

    assert_eq!(res.status, 403);
    assert_eq!(res.body, json!("gate"));
    assert_eq!(action_calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.count("group:before"), 0);
    assert_eq!(recorder.count("route:before"), 0);
    assert_eq!(
        recorder.events(),
        vec!["outer:before", "gate:stopped", "outer:after"]
    );
    // Outer layers still post-process a short-circuited response
    assert_eq!(res.get_header("x-trail"), Some("outer"));
}

#[test]
fn test_middleware_can_rewrite_request_for_inner_layers() {
    let mut router = Router::new();
    router.set_global_middlewares(vec![from_fn("locale", |req, next| {
        req.set_header("accept-language", "fr".to_string());
        req.set_attribute("locale", "fr");
        next.run(req)
    })]);
    router
        .get(
            "/greet",
            Action::handler(|req| {
                Ok(Response::json(
                    200,
                    json!({
                        "header": req.get_header("accept-language"),
                        "locale": req.attribute("locale"),
                    }),
                ))
            }),
        )
        .unwrap();

    let mut req = Request::new(Method::GET, "/greet");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.body, json!({ "header": "fr", "locale": "fr" }));
}

#[test]
fn test_errors_propagate_through_outer_layers() {
    let recorder = Recorder::new();
    let mut router = Router::new();
    router.set_global_middlewares(vec![labelled("outer", &recorder)]);
    router
        .get(
            "/boom",
            Action::handler(|_req| Err(anyhow::anyhow!("database unavailable"))),
        )
        .unwrap();

    let mut req = Request::new(Method::GET, "/boom");
    let err = router.resolve(&mut req).unwrap_err();
    assert_eq!(err.to_string(), "database unavailable");
    assert_eq!(recorder.events(), vec!["outer:before"]);
}

#[test]
fn test_unknown_group_reports_name() {
    let mut router = Router::new();
    router
        .get("/x", Action::handler(echo_order))
        .unwrap()
        .group("admin");

    let mut req = Request::new(Method::GET, "/x");
    let err = router.resolve(&mut req).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DispatchError>(),
        Some(&DispatchError::UnknownMiddlewareGroup("admin".to_string()))
    );
}

struct OrderController {
    prefix: String,
}

impl Controller for OrderController {
    fn call(&self, method: &str, req: &mut Request) -> anyhow::Result<Response> {
        match method {
            "show" => Ok(Response::text(
                200,
                format!("{}{}", self.prefix, req.path_param("id").unwrap_or_default()),
            )),
            other => Err(DispatchError::UnknownControllerMethod {
                controller: "OrderController".to_string(),
                method: other.to_string(),
            }
            .into()),
        }
    }
}

fn controller_router(recorder: &Recorder) -> Router {
    let mut registry = ControllerRegistry::new();
    registry.register("OrderController", || OrderController {
        prefix: "order-".to_string(),
    });

    let mut router = Router::new();
    router.set_controller_resolver(Arc::new(registry));
    router.set_global_middlewares(vec![labelled("global", recorder)]);
    router
        .get("/orders/{id}", Action::controller("OrderController", "show"))
        .unwrap();
    router
        .get("/orders/{id}/edit", Action::controller("OrderController", "edit"))
        .unwrap();
    router
        .get("/invoices/{id}", Action::controller("InvoiceController", "show"))
        .unwrap();
    router
}

#[test]
fn test_controller_action_runs_inside_chain() {
    let recorder = Recorder::new();
    let router = controller_router(&recorder);

    let mut req = Request::new(Method::GET, "/orders/31");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.body, json!("order-31"));
    assert_eq!(res.get_header("x-trail"), Some("global"));
}

#[test]
fn test_controller_unknown_method_is_an_error() {
    let recorder = Recorder::new();
    let router = controller_router(&recorder);

    let mut req = Request::new(Method::GET, "/orders/31/edit");
    let err = router.resolve(&mut req).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DispatchError>(),
        Some(&DispatchError::UnknownControllerMethod {
            controller: "OrderController".to_string(),
            method: "edit".to_string(),
        })
    );
}

#[test]
fn test_unregistered_controller_fails_before_chain() {
    let recorder = Recorder::new();
    let router = controller_router(&recorder);

    let mut req = Request::new(Method::GET, "/invoices/2");
    let err = router.resolve(&mut req).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DispatchError>(),
        Some(&DispatchError::ControllerNotFound(
            "InvoiceController".to_string()
        ))
    );
    assert!(recorder.events().is_empty());
}

#[test]
fn test_metrics_middleware_counts() {
    let _tracing = TestTracing::init();
    let metrics = Arc::new(MetricsMiddleware::new());

    let mut router = Router::new();
    let layers: Vec<Arc<dyn Middleware>> = vec![metrics.clone(), Arc::new(TracingMiddleware)];
    router.set_global_middlewares(layers);
    router
        .get("/pets/{id}", Action::handler(|_req| Ok(Response::new(200))))
        .unwrap();
    router
        .get("/broken", Action::handler(|_req| Err(anyhow::anyhow!("broken"))))
        .unwrap();

    for _ in 0..2 {
        let mut req = Request::new(Method::GET, "/pets/12345");
        assert_eq!(router.resolve(&mut req).unwrap().status, 200);
    }
    let mut req = Request::new(Method::GET, "/broken");
    assert!(router.resolve(&mut req).is_err());

    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.status_count(200), 2);
    assert_eq!(metrics.status_count(500), 0);
    assert_eq!(metrics.error_count(), 1);
}

fn auth_router() -> Router {
    let mut router = Router::new();
    router.add_middleware_group(
        "auth",
        vec![Arc::new(AuthMiddleware::static_token(
            "secret",
            json!({ "user": "ada" }),
        ))],
    );
    router
        .get(
            "/me",
            Action::handler(|req| {
                let principal = req.attribute(PRINCIPAL_ATTRIBUTE).cloned();
                Ok(Response::json(200, json!({ "principal": principal })))
            }),
        )
        .unwrap()
        .group("auth");
    router
}

#[test]
fn test_auth_middleware_rejects_missing_token() {
    let router = auth_router();
    let mut req = Request::new(Method::GET, "/me");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 401);
    assert_eq!(res.get_header("www-authenticate"), Some("Bearer"));
}

#[test]
fn test_auth_middleware_rejects_wrong_token() {
    let router = auth_router();
    let mut req = Request::new(Method::GET, "/me").with_header("Authorization", "Bearer nope");
    assert_eq!(router.resolve(&mut req).unwrap().status, 401);
}

#[test]
fn test_auth_middleware_stores_principal() {
    let router = auth_router();
    let mut req = Request::new(Method::GET, "/me").with_header("Authorization", "bearer secret");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["principal"], json!({ "user": "ada" }));
}

fn cors_router(cors: CorsMiddleware) -> Router {
    let mut router = Router::new();
    router.set_global_middlewares(vec![Arc::new(cors)]);
    router
        .get("/items", Action::handler(|_req| Ok(Response::json(200, json!([])))))
        .unwrap();
    router
        .options("/items", Action::handler(|_req| Ok(Response::new(200))))
        .unwrap();
    router
}

fn example_cors() -> CorsMiddleware {
    CorsMiddleware::builder()
        .allowed_origins(&["https://example.com"])
        .allowed_methods(&[Method::GET, Method::POST])
        .allowed_headers(&["Content-Type"])
        .expose_headers(&["X-Total"])
        .max_age(600)
        .build()
        .unwrap()
}

#[test]
fn test_cors_ignores_same_origin_requests() {
    let router = cors_router(example_cors());
    let mut req = Request::new(Method::GET, "/items");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 200);
    assert!(res.get_header("access-control-allow-origin").is_none());
}

#[test]
fn test_cors_decorates_allowed_origin() {
    let router = cors_router(example_cors());
    let mut req = Request::new(Method::GET, "/items").with_header("Origin", "https://example.com");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(
        res.get_header("access-control-allow-origin"),
        Some("https://example.com")
    );
    assert_eq!(res.get_header("vary"), Some("Origin"));
    assert_eq!(res.get_header("access-control-expose-headers"), Some("X-Total"));
}

#[test]
fn test_cors_rejects_unknown_origin() {
    let router = cors_router(example_cors());
    let mut req = Request::new(Method::GET, "/items").with_header("Origin", "https://evil.test");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 403);
    assert_eq!(res.body["error"], "Origin not allowed");
}

#[test]
fn test_cors_preflight_short_circuits() {
    let router = cors_router(example_cors());
    let mut req = Request::new(Method::OPTIONS, "/items")
        .with_header("Origin", "https://example.com")
        .with_header("Access-Control-Request-Method", "POST");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.status, 204);
    assert_eq!(res.get_header("access-control-allow-methods"), Some("GET, POST"));
    assert_eq!(res.get_header("access-control-allow-headers"), Some("Content-Type"));
    assert_eq!(res.get_header("access-control-max-age"), Some("600"));
}

#[test]
fn test_cors_preflight_needs_an_options_route() {
    let mut router = Router::new();
    router.set_global_middlewares(vec![Arc::new(example_cors())]);
    router
        .get("/items", Action::handler(|_req| Ok(Response::new(200))))
        .unwrap();

    let mut req = Request::new(Method::OPTIONS, "/items")
        .with_header("Origin", "https://example.com")
        .with_header("Access-Control-Request-Method", "POST");
    let err = router.resolve(&mut req).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DispatchError>(),
        Some(&DispatchError::RouteNotFound {
            method: Method::OPTIONS,
            path: "/items".to_string(),
        })
    );
}

#[test]
fn test_cors_preflight_rejects_disallowed_method() {
    let router = cors_router(example_cors());
    let mut req = Request::new(Method::OPTIONS, "/items")
        .with_header("Origin", "https://example.com")
        .with_header("Access-Control-Request-Method", "DELETE");
    assert_eq!(router.resolve(&mut req).unwrap().status, 403);
}

#[test]
fn test_cors_wildcard_echoes_star() {
    let cors = CorsMiddleware::builder()
        .allowed_origins(&["*"])
        .build()
        .unwrap();
    let router = cors_router(cors);
    let mut req = Request::new(Method::GET, "/items").with_header("Origin", "https://any.test");
    let res = router.resolve(&mut req).unwrap();
    assert_eq!(res.get_header("access-control-allow-origin"), Some("*"));
}

#[test]
fn test_cors_builder_rejects_wildcard_with_credentials() {
    let err = CorsMiddleware::builder()
        .allowed_origins(&["*"])
        .allow_credentials(true)
        .build()
        .unwrap_err();
    assert_eq!(err, CorsConfigError::WildcardWithCredentials);
}
