use crate::demo::{run_dashboard, run_demo, DashboardArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use driver_onboarding::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Driver Onboarding Orchestrator",
    about = "Run the driver onboarding service and operator tooling from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Project the operator dashboard from an intake export
    Dashboard(DashboardArgs),
    /// Run an end-to-end CLI demo covering the onboarding flow
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Optional applicant intake CSV to seed the stores at boot
    #[arg(long)]
    pub(crate) intake: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Dashboard(args) => run_dashboard(args),
        Command::Demo(args) => run_demo(args),
    }
}
