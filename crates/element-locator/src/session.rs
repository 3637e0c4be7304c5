//! Single coordinating worker owning one live hierarchy.
//!
//! Every hierarchy access of a session happens on the worker thread; the
//! handle only ships commands and awaits replies. Dropping the last handle
//! stops the worker.

use std::thread;

use async_trait::async_trait;
use axbridge_core_types::{AppId, ElementKey, SessionId};
use hierarchy_snapshot::{CanonicalValue, LiveHierarchy};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::LocatorError;
use crate::locator::{DescribeOutcome, ElementLocator, LocateOutcome, SearchScope, SourceOptions};
use crate::metrics::MetricsSnapshot;
use crate::policy::LocateOptions;
use crate::strategy::Selector;

type Reply<T> = oneshot::Sender<Result<T, LocatorError>>;

enum Command {
    Locate {
        scope: SearchScope,
        selector: Selector,
        options: LocateOptions,
        reply: Reply<LocateOutcome>,
    },
    Describe {
        scope: SearchScope,
        options: SourceOptions,
        reply: Reply<DescribeOutcome>,
    },
    AttributeValue {
        key: ElementKey,
        name: String,
        reply: Reply<CanonicalValue>,
    },
    Contains {
        key: ElementKey,
        reply: Reply<bool>,
    },
    Activate {
        app: AppId,
        reply: Reply<bool>,
    },
    Reset(Reply<()>),
    Metrics(Reply<MetricsSnapshot>),
    Shutdown,
}

/// Request-layer seam over element location.
#[async_trait]
pub trait ElementFinder: Send + Sync {
    async fn locate(
        &self,
        scope: SearchScope,
        selector: Selector,
        options: LocateOptions,
    ) -> Result<LocateOutcome, LocatorError>;

    async fn describe(
        &self,
        scope: SearchScope,
        options: SourceOptions,
    ) -> Result<DescribeOutcome, LocatorError>;

    async fn attribute_value(
        &self,
        key: ElementKey,
        name: String,
    ) -> Result<CanonicalValue, LocatorError>;
}

#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::UnboundedSender<Command>,
}

/// Starts the worker thread for `hierarchy`.
pub fn spawn_session<L>(locator: ElementLocator<L>) -> Result<SessionHandle, LocatorError>
where
    L: LiveHierarchy + 'static,
{
    let id = SessionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = Worker {
        session: id.clone(),
        locator,
        active_app: None,
    };
    thread::Builder::new()
        .name("hierarchy-worker".into())
        .spawn(move || worker.run(rx))
        .map_err(|err| LocatorError::WorkerUnavailable(err.to_string()))?;
    info!(target: "session-worker", session = %id.0, "session started");
    Ok(SessionHandle { id, tx })
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether the worker is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, LocatorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| LocatorError::WorkerUnavailable("session worker has stopped".into()))?;
        rx.await.map_err(|_| {
            LocatorError::WorkerUnavailable("session worker dropped the request".into())
        })?
    }

    pub async fn contains(&self, key: ElementKey) -> Result<bool, LocatorError> {
        self.request(|reply| Command::Contains { key, reply }).await
    }

    /// Switches the application under test. Returns whether the element
    /// cache was reset, which happens exactly when the application changes.
    pub async fn activate_application(&self, app: AppId) -> Result<bool, LocatorError> {
        self.request(|reply| Command::Activate { app, reply }).await
    }

    pub async fn reset(&self) -> Result<(), LocatorError> {
        self.request(Command::Reset).await
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot, LocatorError> {
        self.request(Command::Metrics).await
    }

    /// Stops the worker after the commands already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

#[async_trait]
impl ElementFinder for SessionHandle {
    async fn locate(
        &self,
        scope: SearchScope,
        selector: Selector,
        options: LocateOptions,
    ) -> Result<LocateOutcome, LocatorError> {
        self.request(|reply| Command::Locate {
            scope,
            selector,
            options,
            reply,
        })
        .await
    }

    async fn describe(
        &self,
        scope: SearchScope,
        options: SourceOptions,
    ) -> Result<DescribeOutcome, LocatorError> {
        self.request(|reply| Command::Describe {
            scope,
            options,
            reply,
        })
        .await
    }

    async fn attribute_value(
        &self,
        key: ElementKey,
        name: String,
    ) -> Result<CanonicalValue, LocatorError> {
        self.request(|reply| Command::AttributeValue { key, name, reply })
            .await
    }
}

struct Worker<L: LiveHierarchy> {
    session: SessionId,
    locator: ElementLocator<L>,
    active_app: Option<AppId>,
}

impl<L: LiveHierarchy> Worker<L> {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Locate {
                    scope,
                    selector,
                    options,
                    reply,
                } => {
                    let _ = reply.send(self.locator.locate(&scope, &selector, options));
                }
                Command::Describe {
                    scope,
                    options,
                    reply,
                } => {
                    let _ = reply.send(self.locator.describe(&scope, options));
                }
                Command::AttributeValue { key, name, reply } => {
                    let _ = reply.send(self.locator.attribute_value(&key, &name));
                }
                Command::Contains { key, reply } => {
                    let _ = reply.send(Ok(self.locator.contains(&key)));
                }
                Command::Activate { app, reply } => {
                    let _ = reply.send(Ok(self.activate(app)));
                }
                Command::Reset(reply) => {
                    self.locator.reset();
                    let _ = reply.send(Ok(()));
                }
                Command::Metrics(reply) => {
                    let _ = reply.send(Ok(self.locator.metrics()));
                }
                Command::Shutdown => break,
            }
        }
        info!(target: "session-worker", session = %self.session.0, "session worker stopped");
    }

    fn activate(&mut self, app: AppId) -> bool {
        if self.active_app.as_ref() == Some(&app) {
            debug!(target: "session-worker", app = %app, "application already active");
            return false;
        }
        info!(
            target: "session-worker",
            session = %self.session.0,
            previous = ?self.active_app.as_ref().map(|app| app.0.as_str()),
            app = %app,
            "application under test changed"
        );
        self.locator.reset();
        self.active_app = Some(app);
        true
    }
}
