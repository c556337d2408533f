use std::io::{Error, ErrorKind};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use liftsim::registry::Registry;
use liftsim::{config, dispatch, monitor, tcp};

fn main() -> std::io::Result<()> {
    env_logger::init();

    // READ CONFIGURATION
    let options = config::parse_env_args();
    if options.generate_config {
        return config::generate_defaults(Path::new(&options.config_dir))
            .map_err(|e| Error::new(ErrorKind::Other, e));
    }
    let configs = config::load_dir(Path::new(&options.config_dir));

    // INITIALIZE CAR REGISTRY
    let registry = Arc::new(Registry::new(configs));
    log::info!("simulator started with {} lift(s)", registry.lifts().len());

    // INITIALIZE DISPATCH LOOP
    let dispatch_shutdown_tx = dispatch::init(registry.clone());

    // INITIALIZE TCP COMMAND SERVERS
    let mut servers = Vec::new();
    for lift in registry.lifts() {
        let listener = tcp::bind(&lift.config.host, lift.config.port)?;
        let lift_id = lift.config.id.clone();
        let registry = registry.clone();
        servers.push(thread::spawn(move || tcp::serve(listener, lift_id, registry)));
    }

    // INITIALIZE STATUS MONITOR
    if options.monitor {
        monitor::main(registry)?;
    }

    for server in servers {
        let _ = server.join();
    }
    drop(dispatch_shutdown_tx);
    Ok(())
}
