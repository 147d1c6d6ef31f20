//! Entry-point for the `gentup` binary.
//!
//! Parses the invocation flags, resolves the run configuration, and hands
//! control to the pipeline controller in `gentup-core`. The one piece of
//! control flow that lives here is the restart driver: when the pipeline
//! reports that the self-update stage installed a new version, this process
//! replaces itself with the new binary using the original argument vector.

use std::os::unix::process::CommandExt;

use clap::ArgAction;
use clap::CommandFactory;
use clap::Parser;
use clap_complete::Shell;
use clap_complete::generate;
use gentup_core::Config;
use gentup_core::ConfigOverrides;
use gentup_core::ExecutionContext;
use gentup_core::Pipeline;
use gentup_core::PipelineOutcome;
use gentup_core::StageKind;
use gentup_core::Tools;
use gentup_core::UpdaterErr;
use gentup_core::config::find_config_path;
use gentup_core::pipeline::run_single_stage;
use owo_colors::OwoColorize;
use supports_color::Stream;

/// Bring this host's installed software to a consistent, up-to-date state.
///
/// Runs the full maintenance pipeline: tree sync, overlay sync, distfile
/// clean, portage and self update, world upgrade, dependency clean, rebuilds,
/// optional kernel build and reboot. Concurrent invocations are unsupported.
#[derive(Debug, Parser)]
#[clap(author, version, bin_name = "gentup", disable_version_flag = true)]
struct Cli {
    /// Skip the initial portage tree sync.
    #[arg(short = 's', long = "skip-sync")]
    skip_sync: bool,

    /// Sync the tree with emerge-webrsync instead of rsync.
    #[arg(short = 'r', long = "webrsync")]
    webrsync: bool,

    /// Skip syncing layman-managed overlays.
    #[arg(short = 'l', long = "skip-layman-sync")]
    skip_layman_sync: bool,

    /// Skip upgrading portage itself before the world upgrade.
    #[arg(short = 'p', long = "skip-portage")]
    skip_portage: bool,

    /// Rebuild external kernel modules and exit.
    #[arg(short = 'm', long = "module-rebuild")]
    module_rebuild: bool,

    /// Build and install a new kernel even when the config does not ask for
    /// one.
    #[arg(short = 'k', long = "kernel-rebuild")]
    kernel_rebuild: bool,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    #[clap(subcommand)]
    subcommand: Option<Subcommand>,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Generate shell completion scripts.
    Completion(CompletionCommand),
}

#[derive(Debug, Parser)]
struct CompletionCommand {
    /// Shell to generate completions for.
    #[clap(value_enum, default_value_t = Shell::Bash)]
    shell: Shell,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap exits 2 on usage errors by default; every fatal condition
            // here exits 1. --help and --version land in this branch too and
            // stay successful.
            let fatal = err.use_stderr();
            let _ = err.print();
            std::process::exit(if fatal { 1 } else { 0 });
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", error_prefix());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Subcommand::Completion(completion)) = cli.subcommand {
        print_completion(completion);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Capture before anything else; the restart after a self-update must
    // reproduce this exact invocation.
    let ctx = ExecutionContext::capture()?;

    ensure_root()?;

    let overrides = ConfigOverrides {
        skip_sync: cli.skip_sync.then_some(true),
        webrsync_only: cli.webrsync.then_some(true),
        skip_overlay_sync: cli.skip_layman_sync.then_some(true),
        skip_portage_update: cli.skip_portage.then_some(true),
        build_kernel: cli.kernel_rebuild.then_some(true),
    };
    let config = Config::load(&find_config_path(), overrides)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        if cli.module_rebuild {
            run_single_stage(StageKind::ModuleRebuild, &config, &Tools::default()).await?;
            return Ok(());
        }

        let mut pipeline = Pipeline::new(
            &config,
            Tools::default(),
            ctx.clone(),
            std::io::stdin().lock(),
        );
        match pipeline.run().await? {
            PipelineOutcome::Completed => Ok(()),
            PipelineOutcome::Restart => {
                tracing::info!("re-executing {}", ctx.exe.display());
                // exec replaces this process and only returns on failure.
                let err = std::process::Command::new(&ctx.exe).args(&ctx.args).exec();
                Err(err.into())
            }
        }
    })
}

fn ensure_root() -> Result<(), UpdaterErr> {
    // Safety: geteuid has no failure modes and touches no memory.
    if unsafe { libc::geteuid() } != 0 {
        return Err(UpdaterErr::NotRoot);
    }
    Ok(())
}

fn error_prefix() -> String {
    if supports_color::on(Stream::Stderr).is_some() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

fn print_completion(cmd: CompletionCommand) {
    let mut app = Cli::command();
    generate(cmd.shell, &mut app, "gentup", &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_overrides() {
        let cli = Cli::try_parse_from(["gentup", "-s", "-r", "-l", "-p", "-k"]).unwrap();
        assert!(cli.skip_sync);
        assert!(cli.webrsync);
        assert!(cli.skip_layman_sync);
        assert!(cli.skip_portage);
        assert!(cli.kernel_rebuild);
        assert!(!cli.module_rebuild);
    }

    #[test]
    fn long_forms_parse() {
        let cli = Cli::try_parse_from([
            "gentup",
            "--skip-sync",
            "--webrsync",
            "--skip-layman-sync",
            "--skip-portage",
            "--module-rebuild",
            "--kernel-rebuild",
        ])
        .unwrap();
        assert!(cli.skip_sync && cli.webrsync && cli.skip_layman_sync);
        assert!(cli.skip_portage && cli.module_rebuild && cli.kernel_rebuild);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["gentup", "--frobnicate"]).is_err());
    }
}
