use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ns-cli")]
#[command(about = "Narrative script player")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Agent(AgentArgs),
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Start(StartArgs),
    Choose(ChooseArgs),
}

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    /// Script directory or a single script file.
    #[arg(long = "scripts")]
    pub(crate) scripts: String,
    #[arg(long = "scene")]
    pub(crate) scene: Option<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct ChooseArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "choice")]
    pub(crate) choice: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "scripts")]
    pub(crate) scripts: String,
    #[arg(long = "scene")]
    pub(crate) scene: Option<String>,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
}
