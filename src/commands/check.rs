use anyhow::bail;
use tracing::info;

use crate::storage::PasteStore;
use crate::App;

/// Probe the configured store once. Fails when it cannot serve requests.
pub async fn run(app: App) -> anyhow::Result<()> {
    let kind = app.store.kind();

    if !app.store.is_ready().await {
        bail!("{kind:?} storage is not ready");
    }

    info!("{kind:?} storage is ready");
    Ok(())
}
