use std::io::BufRead;
use std::process::ExitStatus;
use std::time::Instant;

use gentup_common::format_elapsed;

use crate::config::Config;
use crate::error::Result;
use crate::error::UpdaterErr;
use crate::exec;
use crate::intervention;
use crate::prompt;
use crate::self_update;
use crate::self_update::ExecutionContext;
use crate::stage;
use crate::stage::StageKind;
use crate::stage::StageResult;
use crate::stage::Tools;

/// What the top-level driver should do once the pipeline returns. The
/// self-update re-exec is modeled as an explicit outcome instead of an
/// in-place jump; the driver turns `Restart` into a fresh process launch with
/// the original argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Restart,
}

/// Owns the fixed stage order and the only mutable state of a run. Stages
/// execute strictly sequentially; the world-upgrade stage is the one place
/// that can repeat, and it always repeats from its own start.
pub struct Pipeline<'a, R> {
    config: &'a Config,
    tools: Tools,
    ctx: ExecutionContext,
    input: R,
}

impl<'a, R: BufRead> Pipeline<'a, R> {
    pub fn new(config: &'a Config, tools: Tools, ctx: ExecutionContext, input: R) -> Self {
        Self {
            config,
            tools,
            ctx,
            input,
        }
    }

    pub async fn run(&mut self) -> Result<PipelineOutcome> {
        for stage in StageKind::ORDER {
            if !stage.enabled(self.config) {
                // Skips are reported, never silent.
                println!(">>> {}: skipped", stage.name());
                tracing::info!("stage {} skipped", stage.name());
                finish(stage, StageResult::Skipped)?;
                continue;
            }

            let result = match stage {
                StageKind::WorldUpgrade => self.run_world_upgrade().await?,
                StageKind::SelfUpdate => {
                    finish(stage, execute_stage(stage, self.config, &self.tools).await?)?;
                    if self_update::self_version_changed(&self.ctx).await? {
                        println!(">>> gentup was updated; restarting with the original arguments");
                        return Ok(PipelineOutcome::Restart);
                    }
                    continue;
                }
                StageKind::RebootPrompt => {
                    if prompt::confirm("Reboot now?", &mut self.input)? {
                        execute_stage(stage, self.config, &self.tools).await?
                    } else {
                        println!(">>> not rebooting");
                        continue;
                    }
                }
                _ => execute_stage(stage, self.config, &self.tools).await?,
            };
            finish(stage, result)?;
        }
        Ok(PipelineOutcome::Completed)
    }

    /// The world-upgrade retry loop.
    ///
    /// Each round runs the pre-check and then the real upgrade. When the
    /// pre-check flagged required policy changes the operator is asked to
    /// apply them out-of-band and acknowledge, after which the whole stage
    /// repeats from the pre-check; a partial convergence may have changed
    /// what remains blocked. The loop is unbounded, matching the behavior
    /// this tool replaces; each round is logged so a stuck loop is visible.
    async fn run_world_upgrade(&mut self) -> Result<StageResult> {
        println!(">>> {}", StageKind::WorldUpgrade.name());
        let started = Instant::now();
        let mut round: u32 = 1;
        loop {
            match self.world_upgrade_round().await? {
                StageResult::RequiresIntervention => {
                    println!();
                    println!(
                        "Portage needs keyword, mask, USE or license changes before it can \
                         proceed unattended."
                    );
                    println!(
                        "Apply them in another terminal, then press Enter to run the upgrade \
                         again from the start."
                    );
                    tracing::warn!(round, "world upgrade requires operator action");
                    prompt::wait_for_acknowledgement(&mut self.input)?;
                    round += 1;
                }
                result => {
                    if result == StageResult::Completed {
                        println!(
                            ">>> {} finished in {}",
                            StageKind::WorldUpgrade.name(),
                            format_elapsed(started)
                        );
                    }
                    return Ok(result);
                }
            }
        }
    }

    async fn world_upgrade_round(&self) -> Result<StageResult> {
        let precheck = stage::world_upgrade_precheck(&self.tools);
        let pre = exec::run_streamed(&precheck, true).await?;
        let flagged = intervention::requires_operator_action(&pre.output);

        // The pre-check exits non-zero when pending policy changes block
        // resolution; that case is the intervention branch, not a failure.
        if !flagged {
            if let result @ StageResult::Fatal(_) = classify(StageKind::WorldUpgrade, pre.status)? {
                return Ok(result);
            }
        }

        // The real upgrade runs even when intervention was flagged: portage
        // converges as far as it can, and a partial merge may change what
        // remains blocked in the next round. While flagged, a non-zero exit
        // is expected (blocked packages) and must not abort the loop.
        let command = stage::world_upgrade_command(&self.tools);
        let real = exec::run_streamed(&command, false).await?;
        if flagged {
            if !real.status.success() {
                tracing::warn!("world upgrade exited with {} while blocked", real.status);
            }
            return Ok(StageResult::RequiresIntervention);
        }
        if let result @ StageResult::Fatal(_) = classify(StageKind::WorldUpgrade, real.status)? {
            return Ok(result);
        }
        Ok(StageResult::Completed)
    }
}

/// Runs one stage's external command, streaming its output. Also the
/// implementation of the module-rebuild-only early action.
pub async fn execute_stage(
    stage: StageKind,
    config: &Config,
    tools: &Tools,
) -> Result<StageResult> {
    println!(">>> {}", stage.name());
    let command = stage.command(config, tools);
    let outcome = exec::run_streamed(&command, false).await?;
    classify(stage, outcome.status)
}

/// Runs exactly one stage and maps its result to success or failure, without
/// touching any other stage. Used by the early actions.
pub async fn run_single_stage(stage: StageKind, config: &Config, tools: &Tools) -> Result<()> {
    let result = execute_stage(stage, config, tools).await?;
    finish(stage, result)
}

fn classify(stage: StageKind, status: ExitStatus) -> Result<StageResult> {
    match status.code() {
        Some(0) => Ok(StageResult::Completed),
        Some(code) => Ok(StageResult::Fatal(code)),
        None => Err(UpdaterErr::ToolSignaled {
            stage: stage.name(),
        }),
    }
}

fn finish(stage: StageKind, result: StageResult) -> Result<()> {
    match result {
        StageResult::Fatal(code) => Err(UpdaterErr::ToolFailed {
            stage: stage.name(),
            code,
        }),
        StageResult::Completed | StageResult::Skipped | StageResult::RequiresIntervention => Ok(()),
    }
}
