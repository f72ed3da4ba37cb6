use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Later calls reuse the first handle.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = PROM_HANDLE.get_or_try_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))
    })?;
    Ok(handle.clone())
}

/// Current counter values in the Prometheus text format.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Routes exposing the rendered metrics at `path`, ready to merge into another router.
pub fn routes(path: &str, handle: PrometheusHandle) -> Router {
    Router::new().route(path, get(move || std::future::ready(render(&handle))))
}
