use crate::{config::Settings, error, info, server::start_api_server};

pub async fn serve(settings: Settings) {
    info!(
        "Starting dashboard on http://{} ({} mode)",
        settings.server_addr, settings.mode
    );
    if let Err(e) = start_api_server(settings).await {
        error!("Server stopped. Err: {}", e);
    }
}
