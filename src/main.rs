use repofuse::cli::commands::{CliArgs, Commands};
use repofuse::cli::handlers::{handle_run, handle_serve};
use repofuse::util::logging::{init_logging, parse_level, LoggingConfig};
use repofuse::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("repofuse v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Run(run_args) => handle_run(run_args, args.quiet).await,
    };

    std::process::exit(exit_code);
}

/// Flags win over `REPOFUSE_LOG_LEVEL`; `REPOFUSE_LOG_JSON` picks the format
fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level) = &args.log_level {
        config.level = parse_level(level);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
