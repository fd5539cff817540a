use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "hs-cli")]
#[command(about = "Run hyperscript behaviours against markup fixtures")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Load a markup file, install its behaviours and dispatch events at it.
    Exec(ExecArgs),
    /// Run hs-tool JSON cases from a file or directory.
    Case(CaseArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ExecArgs {
    pub(crate) markup: String,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    /// `<selector>:<event>`, repeatable, dispatched in order.
    #[arg(long = "trigger")]
    pub(crate) triggers: Vec<String>,
    /// JSON detail attached to every triggered event.
    #[arg(long = "detail")]
    pub(crate) detail: Option<String>,
    /// Commands to run once after the triggers.
    #[arg(long = "run")]
    pub(crate) run: Option<String>,
    /// Selector for `me` when running `--run`.
    #[arg(long = "on", requires = "run")]
    pub(crate) on: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct CaseArgs {
    pub(crate) path: String,
}
