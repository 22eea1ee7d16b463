fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match mimirlink_lib::SyncConfig::load() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = mimirlink_lib::run(config) {
        log::error!("Synchronization stopped: {}", e);
        std::process::exit(1);
    }
}
