//! poe-code-matrix CLI
//!
//! Runs the poe-code install/configure/test matrix inside the container runner

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use poe_code_matrix::orchestration::{drive, preview_steps, report_failure};
use poe_code_matrix::{
    ConfigLoadOptions, ConfigLoader, ExecutionEnvironment, MatrixConfig, MatrixOrchestrator,
    ProcessGroupRunner, locate_runner, logging, repo_root,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

/// Run coding-assistant install/configure/test flows in an isolated runner
#[derive(Parser)]
#[command(name = "poe-code-matrix")]
#[command(version)]
#[command(about = "Run poe-code install/configure/test flows for each coding assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: MatrixArgs,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run every command group (default)
    Run,

    /// Print the command groups without running them
    List,
}

/// Accepted before or after the subcommand
#[derive(Args, Debug, Default, PartialEq, Eq)]
struct MatrixArgs {
    /// Matrix file overriding the built-in groups
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Runner executable (default: scripts/colima-runner.sh)
    #[arg(long, value_name = "PATH", global = true)]
    runner: Option<PathBuf>,

    /// Skip credential lookup and the reset/login steps
    #[arg(long, global = true)]
    no_bootstrap: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\nUnexpected error: {}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    // Captured once; everything downstream reads this snapshot
    let env = ExecutionEnvironment::capture();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_command(cli.args, env).await,
        Commands::List => list_command(cli.args, env).await,
    }
}

async fn load_config(args: MatrixArgs, env: &ExecutionEnvironment) -> poe_code_matrix::Result<MatrixConfig> {
    ConfigLoader::load(ConfigLoadOptions {
        config_path: args.config,
        runner: args.runner,
        no_bootstrap: args.no_bootstrap,
        env: env.clone(),
    })
    .await
}

async fn run_command(args: MatrixArgs, env: ExecutionEnvironment) -> Result<i32> {
    let mut stderr = io::stderr();

    let config = match load_config(args, &env).await {
        Ok(config) => config,
        Err(e) => return Ok(report_failure(&e, &mut stderr)),
    };

    let runner_path = match repo_root(&config.runner)
        .and_then(|root| locate_runner(&config.runner, &root))
    {
        Ok(path) => path,
        Err(e) => return Ok(report_failure(&e, &mut stderr)),
    };

    let mut orchestrator =
        MatrixOrchestrator::new(ProcessGroupRunner::new(), runner_path, config, env);

    Ok(drive(&mut orchestrator, None, &mut stderr).await)
}

async fn list_command(args: MatrixArgs, env: ExecutionEnvironment) -> Result<i32> {
    let config = match load_config(args, &env).await {
        Ok(config) => config,
        Err(e) => return Ok(report_failure(&e, &mut io::stderr())),
    };

    write_listing(&mut io::stdout().lock(), &config)
}

fn write_listing<W: Write>(out: &mut W, config: &MatrixConfig) -> Result<i32> {
    match print_listing(out, config) {
        Ok(()) => Ok(0),
        // Reader went away (`| head`); nothing left to report
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn print_listing<W: Write>(out: &mut W, config: &MatrixConfig) -> io::Result<()> {
    writeln!(out, "Runner: {}", config.runner.display())?;
    for (i, group) in config.groups.iter().enumerate() {
        writeln!(out, "\n=== Command group {} ===", i + 1)?;
        for step in preview_steps(group, config.options) {
            writeln!(out, "  {}", step)?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_apply_before_and_after_subcommand() {
        for argv in [
            ["poe-code-matrix", "--no-bootstrap", "run"],
            ["poe-code-matrix", "run", "--no-bootstrap"],
        ] {
            let cli = Cli::try_parse_from(argv).unwrap();
            assert_eq!(cli.command, Some(Commands::Run));
            assert!(cli.args.no_bootstrap, "{:?}", argv);
        }

        let cli = Cli::try_parse_from(["poe-code-matrix", "list", "-c", "matrix.yaml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::List));
        assert_eq!(cli.args.config, Some(PathBuf::from("matrix.yaml")));

        let cli = Cli::try_parse_from(["poe-code-matrix", "--runner", "r.sh", "-v"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.args.runner, Some(PathBuf::from("r.sh")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_listing_shows_every_group() {
        let mut out = Vec::new();

        print_listing(&mut out, &MatrixConfig::default()).unwrap();

        let listing = String::from_utf8(out).unwrap();
        assert!(listing.starts_with("Runner: scripts/colima-runner.sh\n"));
        assert_eq!(listing.matches("=== Command group").count(), 6);
        assert!(listing.contains("  poe-code login --api-key ***\n"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_listing_into_closed_pipe_exits_zero() {
        let result = print_listing(&mut ClosedPipe, &MatrixConfig::default());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);

        assert_eq!(write_listing(&mut ClosedPipe, &MatrixConfig::default()).unwrap(), 0);
    }
}
