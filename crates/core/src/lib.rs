pub mod config;
pub mod path_utils;

use tracing::info;

pub fn init() {
    info!("🛡️ Edgent Core Initialized (v{})", env!("CARGO_PKG_VERSION"));
}
