use habit_host::app::{run, HostConfig};

fn main() {
    tracing_subscriber::fmt::init();
    let config = HostConfig::from_env().unwrap_or_default();
    if let Err(err) = run(config) {
        eprintln!("Failed to start habit host: {err:#}");
        std::process::exit(1);
    }
}
