use crate::config::Config;

/// Package atom holding the orchestrator itself; upgraded by the self-update
/// stage before the world upgrade so the rest of the run happens under the
/// newest version.
pub const SELF_PACKAGE: &str = "app-admin/gentup";

/// Resolved collaborator programs. The defaults go through `$PATH`; tests
/// point the fields at stub scripts instead.
#[derive(Debug, Clone)]
pub struct Tools {
    pub emerge: String,
    pub emerge_webrsync: String,
    pub layman: String,
    pub eclean_dist: String,
    pub perl_cleaner: String,
    pub eselect: String,
    pub genkernel: String,
    pub env_update: String,
    pub reboot: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            emerge: "emerge".to_string(),
            emerge_webrsync: "emerge-webrsync".to_string(),
            layman: "layman".to_string(),
            eclean_dist: "eclean-dist".to_string(),
            perl_cleaner: "perl-cleaner".to_string(),
            eselect: "eselect".to_string(),
            genkernel: "genkernel".to_string(),
            env_update: "env-update".to_string(),
            reboot: "reboot".to_string(),
        }
    }
}

/// Outcome of running one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageResult {
    Completed,
    Skipped,
    /// Only the world-upgrade stage produces this; it drives the retry loop
    /// and is not an error.
    RequiresIntervention,
    Fatal(i32),
}

/// One unit of the upgrade pipeline. The variants are listed in execution
/// order; `ORDER` is the single source of truth the controller iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    TreeSync,
    OverlaySync,
    DistfileClean,
    PortageUpdate,
    SelfUpdate,
    WorldUpgrade,
    DepClean,
    PerlRebuild,
    PythonCleanup,
    KernelBuild,
    ModuleRebuild,
    EnvRefresh,
    RebootPrompt,
}

impl StageKind {
    /// Fixed pipeline order. Reordering changes observable behavior, so this
    /// list is an invariant of the system.
    pub const ORDER: [StageKind; 13] = [
        StageKind::TreeSync,
        StageKind::OverlaySync,
        StageKind::DistfileClean,
        StageKind::PortageUpdate,
        StageKind::SelfUpdate,
        StageKind::WorldUpgrade,
        StageKind::DepClean,
        StageKind::PerlRebuild,
        StageKind::PythonCleanup,
        StageKind::KernelBuild,
        StageKind::ModuleRebuild,
        StageKind::EnvRefresh,
        StageKind::RebootPrompt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::TreeSync => "tree sync",
            StageKind::OverlaySync => "overlay sync",
            StageKind::DistfileClean => "distfile clean",
            StageKind::PortageUpdate => "portage update",
            StageKind::SelfUpdate => "self-update",
            StageKind::WorldUpgrade => "world upgrade",
            StageKind::DepClean => "dependency clean",
            StageKind::PerlRebuild => "perl rebuild",
            StageKind::PythonCleanup => "python cleanup",
            StageKind::KernelBuild => "kernel build",
            StageKind::ModuleRebuild => "module rebuild",
            StageKind::EnvRefresh => "environment refresh",
            StageKind::RebootPrompt => "reboot",
        }
    }

    /// Whether the run configuration enables this stage.
    pub fn enabled(self, config: &Config) -> bool {
        match self {
            StageKind::TreeSync => !config.skip_sync,
            StageKind::OverlaySync => !config.skip_overlay_sync,
            StageKind::DistfileClean => !config.skip_distfile_clean,
            StageKind::PortageUpdate => !config.skip_portage_update,
            StageKind::PerlRebuild => !config.skip_perl_rebuild,
            StageKind::KernelBuild => config.build_kernel,
            StageKind::RebootPrompt => config.reboot_after,
            StageKind::SelfUpdate
            | StageKind::WorldUpgrade
            | StageKind::DepClean
            | StageKind::PythonCleanup
            | StageKind::ModuleRebuild
            | StageKind::EnvRefresh => true,
        }
    }

    /// External command for this stage. `RebootPrompt` is special-cased by
    /// the controller: its command only runs after an affirmative answer.
    pub fn command(self, config: &Config, tools: &Tools) -> Vec<String> {
        match self {
            StageKind::TreeSync => {
                if config.webrsync_only {
                    vec![tools.emerge_webrsync.clone()]
                } else {
                    vec![tools.emerge.clone(), "--sync".to_string()]
                }
            }
            StageKind::OverlaySync => vec![tools.layman.clone(), "-S".to_string()],
            StageKind::DistfileClean => {
                vec![tools.eclean_dist.clone(), "--deep".to_string()]
            }
            StageKind::PortageUpdate => vec![
                tools.emerge.clone(),
                "--oneshot".to_string(),
                "--update".to_string(),
                "sys-apps/portage".to_string(),
            ],
            StageKind::SelfUpdate => vec![
                tools.emerge.clone(),
                "--oneshot".to_string(),
                "--update".to_string(),
                SELF_PACKAGE.to_string(),
            ],
            StageKind::WorldUpgrade => world_upgrade_command(tools),
            StageKind::DepClean => vec![tools.emerge.clone(), "--depclean".to_string()],
            StageKind::PerlRebuild => {
                vec![tools.perl_cleaner.clone(), "--all".to_string()]
            }
            StageKind::PythonCleanup => vec![
                tools.eselect.clone(),
                "python".to_string(),
                "cleanup".to_string(),
            ],
            StageKind::KernelBuild => {
                let mut command = vec![tools.genkernel.clone()];
                if config.use_running_kernel_config {
                    command.push("--kernel-config=/proc/config.gz".to_string());
                }
                command.push("all".to_string());
                command
            }
            StageKind::ModuleRebuild => {
                vec![tools.emerge.clone(), "@module-rebuild".to_string()]
            }
            StageKind::EnvRefresh => vec![tools.env_update.clone()],
            StageKind::RebootPrompt => vec![tools.reboot.clone()],
        }
    }
}

/// The real world-upgrade invocation.
pub fn world_upgrade_command(tools: &Tools) -> Vec<String> {
    vec![
        tools.emerge.clone(),
        "--update".to_string(),
        "--deep".to_string(),
        "--newuse".to_string(),
        "@world".to_string(),
    ]
}

/// Dry-run variant of the world upgrade whose output is scanned for
/// intervention phrases before the real upgrade runs.
pub fn world_upgrade_precheck(tools: &Tools) -> Vec<String> {
    vec![
        tools.emerge.clone(),
        "--pretend".to_string(),
        "--update".to_string(),
        "--deep".to_string(),
        "--newuse".to_string(),
        "@world".to_string(),
    ]
}
