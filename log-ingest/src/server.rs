use std::future::Future;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::router::{self, Settings};
use crate::storage::Storage;
use crate::time::SystemTime;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.database.uses_default_password() {
        tracing::warn!("DB_PASSWORD is not set, connecting with the built-in default password");
    }

    let storage = Storage::connect(&config.database).await;

    let app = router::router(
        SystemTime {},
        storage,
        Settings::from_config(&config),
        config.export_prometheus,
    );

    tracing::info!("listening on {:?}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
