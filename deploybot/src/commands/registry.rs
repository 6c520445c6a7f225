//! Alias table mapping chat command names to commands.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;

use super::{Command, Invocation, Reply};
use crate::gate::{ClusterGate, GateDecision};

/// One alias under which a command can be invoked.
pub struct Registration {
    pub alias: String,
    pub summary: &'static str,
    /// Example arguments, including the cluster name for gated aliases.
    pub usage: String,
    pub command: Arc<Command>,
    /// Whether the first argument must name this bot's cluster.
    pub gated: bool,
}

pub struct Registry {
    prefix: String,
    gate: Option<ClusterGate>,
    entries: BTreeMap<String, Registration>,
}

impl Registry {
    pub fn new(prefix: &str, gate: Option<ClusterGate>) -> Self {
        let mut registry = Self {
            prefix: prefix.to_string(),
            gate,
            entries: BTreeMap::new(),
        };
        registry.register(Command::Help);
        registry
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register `command` under its name.
    ///
    /// With a cluster gate, the plain name requires the cluster as first
    /// argument and `<name>-<cluster>` is added as an ungated alias.
    pub fn register(&mut self, command: Command) {
        let command = Arc::new(command);
        let name = command.name();

        let gate = match (&self.gate, &*command) {
            (_, Command::Help) | (None, _) => None,
            (Some(gate), _) => Some(gate.cluster().to_string()),
        };

        match gate {
            None => self.insert(Registration {
                alias: name.to_string(),
                summary: command.summary(),
                usage: command.usage().to_string(),
                command,
                gated: false,
            }),
            Some(cluster) => {
                self.insert(Registration {
                    alias: name.to_string(),
                    summary: command.summary(),
                    usage: format!("{cluster} {}", command.usage()),
                    command: command.clone(),
                    gated: true,
                });
                self.insert(Registration {
                    alias: format!("{name}-{cluster}"),
                    summary: command.summary(),
                    usage: command.usage().to_string(),
                    command,
                    gated: false,
                });
            }
        }
    }

    fn insert(&mut self, registration: Registration) {
        tracing::debug!(alias = %registration.alias, gated = registration.gated, "Registered command");
        self.entries.insert(registration.alias.clone(), registration);
    }

    pub fn lookup(&self, alias: &str) -> Option<&Registration> {
        self.entries.get(alias)
    }

    /// Registrations in alias order.
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.entries.values()
    }

    /// Route an invocation to its command. Unknown commands are ignored.
    pub async fn dispatch(&self, invocation: &Invocation) -> Result<Reply> {
        let Some(registration) = self.lookup(&invocation.command) else {
            tracing::debug!(command = %invocation.command, "Ignoring unknown command");
            return Ok(Reply::Silent);
        };

        if matches!(*registration.command, Command::Help) {
            return Ok(Reply::Text(self.help_text()));
        }

        let args = match (&self.gate, registration.gated) {
            (Some(gate), true) => match gate.check(&registration.alias, &invocation.args) {
                GateDecision::Proceed(rest) => rest,
                GateDecision::Ignore => return Ok(Reply::Silent),
                GateDecision::Notice(text) => return Ok(Reply::Text(text)),
            },
            _ => &invocation.args[..],
        };

        registration.command.execute(args).await
    }

    pub fn help_text(&self) -> String {
        let mut text = String::from("Available commands:\n```\n");
        for r in self.registrations() {
            let usage = if r.usage.is_empty() {
                format!("{}{}", self.prefix, r.alias)
            } else {
                format!("{}{} {}", self.prefix, r.alias, r.usage)
            };
            text.push_str(&format!("{usage}\n    {}\n", r.summary));
        }
        text.push_str("```");
        text
    }
}
