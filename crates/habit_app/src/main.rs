use habit_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt::init();
    let config = AppConfig::from_env();
    if let Err(err) = run(config) {
        eprintln!("Failed to generate scheduled instances: {err:#}");
        std::process::exit(1);
    }
}
