//! Chat commands and their dispatch.
//!
//! A message such as `!deploy myapp web repo:v2` becomes an [`Invocation`],
//! is looked up in the [`Registry`] by alias and produces a [`Reply`].

mod deploy;
mod registry;
mod reset;

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;

pub use deploy::{DeployCommand, DeployRequest, RolloutOutcome, DUMMY_IMAGE};
pub use registry::{Registration, Registry};
pub use reset::ResetCommand;

/// A parsed chat command: name plus whitespace-split arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Parse `text` if it starts with `prefix`. The command name is
    /// lowercased; arguments are kept as typed.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix(prefix)?;
        let mut tokens = rest.split_whitespace();
        let command = tokens.next()?.to_lowercase();
        Some(Self {
            command,
            args: tokens.map(String::from).collect(),
        })
    }
}

/// What a command sends back to the channel.
#[derive(Debug)]
pub enum Reply {
    /// Nothing to say (e.g. addressed to another cluster's bot).
    Silent,
    Text(String),
    /// Zero or more messages; the stream ends when the command is done.
    Stream(mpsc::Receiver<String>),
}

/// Every command the bot understands.
pub enum Command {
    Deploy(Arc<DeployCommand>),
    Reset(Arc<ResetCommand>),
    Help,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Deploy(_) => "deploy",
            Command::Reset(_) => "reset",
            Command::Help => "help",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Command::Deploy(_) => "Kubectl deployment abstraction",
            Command::Reset(_) => {
                "Kubectl reset abstraction to allow removing pvc for stateful sets by app label and recreating them"
            }
            Command::Help => "List available commands",
        }
    }

    /// Example arguments shown in help.
    pub fn usage(&self) -> &'static str {
        match self {
            Command::Deploy(_) => "your_app your_container your/docker:image",
            Command::Reset(_) => "your_app",
            Command::Help => "",
        }
    }

    /// Whether replies arrive over time rather than all at once.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Command::Deploy(_))
    }

    /// Run with the arguments after any cluster name.
    ///
    /// Help lists the registered aliases, so [`Registry::dispatch`] must
    /// answer it; executing it here is an error.
    pub async fn execute(&self, args: &[String]) -> Result<Reply> {
        match self {
            Command::Deploy(deploy) => Ok(Reply::Stream(deploy.start(args.to_vec()))),
            Command::Reset(reset) => Ok(Reply::Text(reset.execute(args).await?)),
            Command::Help => bail!("help is answered by the command registry"),
        }
    }
}
