use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "timetable", version, about = "Weekly timetable CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Kid management
    Kid {
        #[command(subcommand)]
        action: commands::kid::KidAction,
    },
    /// Matter management
    Matter {
        #[command(subcommand)]
        action: commands::matter::MatterAction,
    },
    /// Create, resize, move and delete time blocks
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// Single day view
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Week view
    Week {
        #[command(subcommand)]
        action: commands::day::WeekAction,
    },
    /// Current and next block for a kid
    Now(commands::now::NowArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Kid { action } => commands::kid::run(action),
        Commands::Matter { action } => commands::matter::run(action),
        Commands::Block { action } => commands::block::run(action),
        Commands::Day { action } => commands::day::run_day(action),
        Commands::Week { action } => commands::day::run_week(action),
        Commands::Now(args) => commands::now::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
