//! Test doubles for the executor and image registry.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::executor::Executor;
use crate::registry_check::ImageRegistry;

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Records every command line and answers from a closure.
///
/// Each call yields to the scheduler once so unsynchronized callers would
/// interleave.
pub struct ScriptedExecutor {
    calls: Mutex<Vec<String>>,
    respond: Responder,
}

impl ScriptedExecutor {
    pub fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Answers every command with `output`.
    pub fn always(output: &str) -> Self {
        let output = output.to_string();
        Self::new(move |_| output.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn execute<'a>(&'a self, command_line: &'a str) -> BoxFuture<'a, String> {
        async move {
            self.calls.lock().push(command_line.to_string());
            tokio::task::yield_now().await;
            (self.respond)(command_line)
        }
        .boxed()
    }
}

/// Registry that answers every lookup the same way and remembers the queries.
pub struct FixedRegistry {
    exists: bool,
    queries: Mutex<Vec<(String, String)>>,
}

impl FixedRegistry {
    pub fn new(exists: bool) -> Self {
        Self {
            exists,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }
}

impl ImageRegistry for FixedRegistry {
    fn tag_exists<'a>(&'a self, repo: &'a str, tag: &'a str) -> BoxFuture<'a, bool> {
        self.queries.lock().push((repo.to_string(), tag.to_string()));
        let exists = self.exists;
        async move { exists }.boxed()
    }
}

/// Splits a whitespace-separated argument string.
pub fn args(s: &str) -> Vec<String> {
    s.split_whitespace().map(String::from).collect()
}
