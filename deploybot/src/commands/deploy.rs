//! `!deploy app container image`: point a workload at a new image.
//!
//! kubectl does not restart pods when the image string is unchanged, so every
//! deploy first sets a throwaway `dummy` image and then the real one. The
//! dummy update is not rolled back if the real one fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::executor::{is_not_found, Executor};
use crate::kubectl::{pods_ready, Kubectl, WorkloadKind};
use crate::output;
use crate::registry_check::ImageRegistry;

/// Image set before the real one to force a rollout.
pub const DUMMY_IMAGE: &str = "dummy";

/// Messages a deploy can queue before the receiver drains them.
const MESSAGE_BUFFER: usize = 4;

pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_STATUS_POLL: Duration = Duration::from_secs(5);

/// Validated deploy arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub app: String,
    pub container: String,
    pub image: String,
}

impl DeployRequest {
    /// Parse `app container image`. The error is the reply for the user.
    ///
    /// With `require_tag`, the image must be exactly `repo:tag`.
    pub fn parse(args: &[String], require_tag: bool) -> Result<Self, String> {
        let [app, container, image] = args else {
            return Err(output::invalid_deploy_syntax(args));
        };
        if require_tag && image.split(':').count() != 2 {
            return Err(output::invalid_image_format(image));
        }
        Ok(Self {
            app: app.clone(),
            container: container.clone(),
            image: image.clone(),
        })
    }

    /// `(repo, tag)` when the image is in `repo:tag` form.
    pub fn repo_and_tag(&self) -> Option<(&str, &str)> {
        self.image.split_once(':')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutOutcome {
    Updated { kind: WorkloadKind, output: String },
    AppNotFound,
}

pub struct DeployCommand {
    executor: Arc<dyn Executor>,
    registry: Option<Arc<dyn ImageRegistry>>,
    kubectl: Kubectl,
    status_timeout: Duration,
    status_poll: Duration,
}

impl DeployCommand {
    pub fn new(executor: Arc<dyn Executor>, kubectl: Kubectl) -> Self {
        Self {
            executor,
            registry: None,
            kubectl,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            status_poll: DEFAULT_STATUS_POLL,
        }
    }

    /// Check images against `registry` before touching the cluster.
    pub fn with_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_status_wait(mut self, timeout: Duration, poll: Duration) -> Self {
        self.status_timeout = timeout;
        self.status_poll = poll;
        self
    }

    /// Start a deploy in the background.
    ///
    /// Replies arrive on the returned channel; it closes when the deploy is
    /// done.
    pub fn start(self: &Arc<Self>, args: Vec<String>) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(&args, &tx).await });
        rx
    }

    async fn run(&self, args: &[String], tx: &mpsc::Sender<String>) {
        let request = match self.check(args).await {
            Ok(request) => request,
            Err(reply) => {
                let _ = tx.send(reply).await;
                return;
            }
        };

        tracing::info!(app = %request.app, container = %request.container, image = %request.image, "Deploying");

        match self.rollout(&request).await {
            RolloutOutcome::AppNotFound => {
                tracing::info!(app = %request.app, "App not found as deployment or statefulset");
                let _ = tx.send(output::app_not_found(&request.app)).await;
            }
            RolloutOutcome::Updated { kind, output } => {
                tracing::info!(app = %request.app, %kind, "Image updated");
                if tx.send(output::cmd_response(&output)).await.is_err() {
                    return;
                }
                let status = self.wait_for_pods(&request.app).await;
                let _ = tx.send(output::cmd_response(&status)).await;
            }
        }
    }

    /// Validate arguments and, when configured, the image tag.
    async fn check(&self, args: &[String]) -> Result<DeployRequest, String> {
        let request = DeployRequest::parse(args, self.registry.is_some())?;
        if let (Some(registry), Some((repo, tag))) = (&self.registry, request.repo_and_tag()) {
            if !registry.tag_exists(repo, tag).await {
                return Err(output::invalid_image(repo, tag));
            }
        }
        Ok(request)
    }

    /// Set the image on the first workload kind that exists for the app.
    pub async fn rollout(&self, request: &DeployRequest) -> RolloutOutcome {
        for kind in WorkloadKind::PROBE_ORDER {
            let dummy = self
                .kubectl
                .set_image(kind, &request.app, &request.container, DUMMY_IMAGE);
            self.executor.execute(&dummy).await;

            let real = self
                .kubectl
                .set_image(kind, &request.app, &request.container, &request.image);
            let output = self.executor.execute(&real).await;
            if !is_not_found(&output) {
                return RolloutOutcome::Updated { kind, output };
            }
        }
        RolloutOutcome::AppNotFound
    }

    /// Poll pod status until every pod is ready or the timeout passes.
    /// Returns the last status seen.
    pub async fn wait_for_pods(&self, app: &str) -> String {
        let deadline = Instant::now() + self.status_timeout;
        let command = self.kubectl.get_pods(app);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.status_poll.min(remaining)).await;

            let status = self.executor.execute(&command).await;
            if pods_ready(&status) {
                return status;
            }
            if Instant::now() >= deadline {
                tracing::info!(%app, "Pods not ready before status timeout");
                return status;
            }
        }
    }
}
