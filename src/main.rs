use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = tailf::get_cli().and_then(|cli| tailf::run(&cli)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
