//! Docker container state, a thin translator from the Engine API's
//! `GET /containers/{name}/json` onto one gauge per configured container.
//! Collection-level detail (labels, per-label filtering) is left to
//! whatever scrapes this exporter — this job only answers "is it running".

use crate::metrics::DOCKER_CONTAINER_UP;
use metrics::set_gauge_vec;
use serde::Deserialize;
use slog::{debug, Logger};
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

pub struct DockerJobContext {
    pub client: reqwest::Client,
    pub endpoint: reqwest::Url,
    pub containers: Vec<String>,
    pub node_name: String,
    pub interval: Duration,
    pub log: Logger,
}

#[derive(Deserialize)]
struct ContainerState {
    #[serde(rename = "Running")]
    running: bool,
}

#[derive(Deserialize)]
struct InspectResponse {
    #[serde(rename = "State")]
    state: ContainerState,
}

pub async fn run_docker_job(ctx: Arc<DockerJobContext>, executor: TaskExecutor) {
    let mut interval = tokio::time::interval(ctx.interval);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx).await,
        }
    }
}

async fn tick(ctx: &DockerJobContext) {
    for container in &ctx.containers {
        let up = inspect(ctx, container).await.unwrap_or(false);
        set_gauge_vec(
            &DOCKER_CONTAINER_UP,
            &[ctx.node_name.as_str(), container.as_str()],
            up as i64,
        );
    }
}

async fn inspect(ctx: &DockerJobContext, container: &str) -> Option<bool> {
    let url = ctx
        .endpoint
        .join(&format!("containers/{}/json", container))
        .ok()?;
    match ctx.client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<InspectResponse>().await {
                Ok(body) => Some(body.state.running),
                Err(e) => {
                    debug!(ctx.log, "Could not decode container inspect response"; "container" => container, "error" => %e);
                    None
                }
            }
        }
        Ok(response) => {
            debug!(ctx.log, "Container inspect returned non-success status";
                "container" => container, "status" => response.status().as_u16());
            None
        }
        Err(e) => {
            debug!(ctx.log, "Container inspect request failed"; "container" => container, "error" => %e);
            None
        }
    }
}
