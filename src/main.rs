use std::path::PathBuf;

use deskpeek_lib::{app, logging, DeskPeekConfig};

#[tokio::main]
async fn main() {
    let log_dir = dirs::data_local_dir().map(|dir| dir.join("deskpeek").join("logs"));
    if let Err(e) = logging::init_logging(log_dir.as_deref()) {
        eprintln!("deskpeek: {}", e);
    }

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match DeskPeekConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[APP] Ignoring {}: {}", path.display(), e);
                DeskPeekConfig::default()
            }
        },
        None => DeskPeekConfig::default(),
    };

    if let Err(e) = app::run(config).await {
        log::error!("[APP] {}", e);
        std::process::exit(1);
    }
}
