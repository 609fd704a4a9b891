use log::{error, info};

use focus_hub::connectivity;
use focus_hub::integration::{self, Config};
use focus_hub::state::AppState;

#[tokio::main]
async fn main() {
    integration::init_logger().expect("Failed to initialize logger");

    let config = Config::env().expect("Failed to load configuration");
    let state = AppState::init(&config)
        .await
        .expect("Failed to initialize app state");

    info!("running connectivity checks ({:?})", config.env);
    let checks = connectivity::run(&state).await;

    if connectivity::all_passed(&checks) {
        info!("all {} checks passed", checks.len());
    } else {
        error!("connectivity checks failed");
        std::process::exit(1);
    }
}
