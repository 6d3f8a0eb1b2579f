use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use switchboard::dispatcher::{Action, Request, Response};
use switchboard::middleware::{from_fn, Middleware};
use switchboard::router::Router;

fn ok() -> Action {
    Action::handler(|_req| Ok(Response::new(200)))
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    let routes = [
        (Method::GET, "/"),
        (Method::GET, "/zoo/animals"),
        (Method::POST, "/zoo/animals"),
        (Method::GET, "/zoo/animals/{id}"),
        (Method::PUT, "/zoo/animals/{id}"),
        (Method::PATCH, "/zoo/animals/{id}"),
        (Method::DELETE, "/zoo/animals/{id}"),
        (Method::GET, "/zoo/animals/{id}/toys/{toy_id}"),
        (
            Method::GET,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
        ),
        (
            Method::POST,
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
        ),
        (Method::GET, "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}"),
        (Method::HEAD, "/zoo/health"),
        (Method::OPTIONS, "/zoo/health"),
    ];
    for (method, pattern) in routes {
        router
            .register(method, pattern, ok())
            .expect("benchmark routes compile");
    }
    router
}

const TEST_PATHS: [(Method, &str); 5] = [
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/456"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
];

fn bench_route_throughput(c: &mut Criterion) {
    let router = zoo_router();
    let requests: Vec<Request> = TEST_PATHS
        .iter()
        .map(|(method, path)| Request::new(method.clone(), path))
        .collect();

    c.bench_function("route_match", |b| {
        b.iter(|| {
            for req in &requests {
                let res = router.resolve_route(req);
                black_box(&res);
            }
        })
    });
}

fn bench_dispatch_through_chain(c: &mut Criterion) {
    let passthrough = |name: &'static str| -> Arc<dyn Middleware> {
        from_fn(name, |req, next| next.run(req))
    };

    let mut router = zoo_router();
    router.set_global_middlewares(vec![passthrough("global")]);
    router.add_middleware_group("api", vec![passthrough("group")]);
    router
        .get("/bench/{id}", ok())
        .expect("benchmark route compiles")
        .group("api")
        .middleware(passthrough("route"));

    c.bench_function("dispatch_three_layers", |b| {
        b.iter(|| {
            let mut req = Request::new(Method::GET, "/bench/42");
            let res = router.resolve(&mut req);
            black_box(&res);
        })
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch_through_chain);
criterion_main!(benches);
