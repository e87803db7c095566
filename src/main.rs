use province_economy::cli::{self, CliArgs, Command};
use province_economy::config::GameConfig;
use province_economy::error::Result;
use province_economy::events::EventLogger;
use province_economy::metrics::MetricsCalculator;
use province_economy::world::World;

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help();
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    let result = match &args.command {
        Command::Help => {
            cli::print_help();
            Ok(())
        }
        Command::Run => run(&args),
        Command::Analyze { file } => analyze(file),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<()> {
    let config = match &args.config_file {
        Some(path) => GameConfig::load_from_file(path)?,
        None => GameConfig::standard(),
    };
    if !args.quiet {
        println!("{}", config);
    }

    let mut world = World::new(config)?;
    let initial: Vec<(String, u64)> = world
        .provinces()
        .iter()
        .map(|p| (p.id.clone(), p.population.total()))
        .collect();

    for (province, template) in &args.builds {
        if let Err(e) = world.construct_building(province, template) {
            log::warn!("Skipping build {}:{}: {}", province, template, e);
        }
    }

    world.run(args.days);

    let metrics = MetricsCalculator::calculate_run_metrics(
        world.logger().get_events(),
        &initial,
        world.current_day(),
    );
    println!("{}", metrics);

    world.logger().save_to_file(&args.output_file)?;
    log::info!(
        "Saved {} events to {}",
        world.logger().len(),
        args.output_file.display()
    );

    if let Some(path) = &args.snapshot_file {
        let json = serde_json::to_string_pretty(&world.snapshot())?;
        std::fs::write(path, json)?;
        log::info!("Saved snapshot to {}", path.display());
    }

    Ok(())
}

fn analyze(file: &std::path::Path) -> Result<()> {
    let logger = EventLogger::load_from_file(file)?;
    log::info!("Loaded {} events from {}", logger.len(), file.display());
    let metrics = MetricsCalculator::calculate_from_log(logger.get_events());
    println!("{}", metrics);
    Ok(())
}
