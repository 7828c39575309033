use crate::demo::{run_cpf_check, run_demo, run_report, CpfArgs, DemoArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fleet_roster::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Fleet Roster Console",
    about = "Run and demonstrate the fleet driver roster console from the command line",
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
    /// Check a CPF and print it in 000.000.000-00 form
    Cpf(CpfArgs),
    /// Export the monthly performance report of the sample roster as CSV
    Report(ReportArgs),
    /// Walk through registration, evaluations, ratings and settings on a sample roster
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
    /// Start with the sample drivers, items, evaluations and ratings loaded
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Cpf(args) => {
            run_cpf_check(args);
            Ok(())
        }
        Command::Report(args) => run_report(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
