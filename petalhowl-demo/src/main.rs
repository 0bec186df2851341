mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // `--spatial` runs the listener/panner walk-through instead of the transport script
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--spatial" {
        cli::run_spatial_session()
    } else {
        cli::run_transport_session()
    }
}
