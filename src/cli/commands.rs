use clap::{Parser, Subcommand, ValueEnum};

/// Multi-repository integration pipeline
#[derive(Parser, Debug)]
#[command(
    name = "repofuse",
    about = "Analyze, match, generate and publish glue code across repositories",
    version,
    author,
    long_about = "repofuse inspects several repositories, matches the frontend's outbound \
                  calls against the backend's routes, generates API clients, CORS snippets \
                  and deployment files, validates the result and can open pull requests \
                  with the generated artifacts."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the HTTP server",
        long_about = "Serves the repository registration, pipeline and job endpoints.\n\n\
                      Examples:\n  \
                      repofuse serve\n  \
                      repofuse serve --bind 127.0.0.1:8080"
    )]
    Serve(ServeArgs),

    #[command(
        about = "Run the pipeline once over the given repositories",
        long_about = "Analyzes the repositories, matches interfaces, generates and validates \
                      artifacts, printing progress to stderr and the result to stdout.\n\n\
                      Examples:\n  \
                      repofuse run https://github.com/acme/web https://github.com/acme/api\n  \
                      repofuse run --format json --publish https://github.com/acme/web"
    )]
    Run(RunArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        short = 'b',
        long,
        value_name = "ADDR",
        help = "Listen address (overrides REPOFUSE_BIND)"
    )]
    pub bind: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "URL", required = true, help = "Repository URLs")]
    pub urls: Vec<String>,

    #[arg(long, help = "Open pull requests with the generated artifacts")]
    pub publish: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
