//! The exporter's own inbound surface: `GET /metrics` and `GET /`
//! (spec.md §6), built with `warp` the way the teacher's `http_metrics`
//! crate builds its own `/metrics` route.

use std::net::SocketAddr;
use task_executor::TaskExecutor;
use warp::Filter;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

pub fn spawn(executor: &TaskExecutor, port: u16) {
    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .map(|| warp::reply::with_header(metrics::gather_text(), "content-type", "text/plain; version=0.0.4"));

    let dashboard_route = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(DASHBOARD_HTML));

    let routes = metrics_route.or(dashboard_route);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    executor.spawn(
        async move {
            warp::serve(routes).run(addr).await;
        },
        "http-server",
    );
}
