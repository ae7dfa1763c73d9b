//! Lifecycle for the loopback UI server: a handle owning the listener, its
//! serve task, and the published status.

use crate::error::StartError;
use crate::http;
use crate::port;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

/// Default first port for the probe scan.
pub const DEFAULT_PREFERRED_PORT: u16 = 8080;
/// Default number of ports probed before giving up.
pub const DEFAULT_MAX_PORT_ATTEMPTS: u32 = 10;

/// Immutable server settings, shared with request handlers behind `Arc`.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory whose files are served; the containment root.
    pub root_dir: PathBuf,
    /// First port tried by the probe scan.
    pub preferred_port: u16,
    /// Total ports probed before `start()` gives up.
    pub max_port_attempts: u32,
    /// Where to announce the bound port for the host-side shim. `None`
    /// disables the announce file.
    pub port_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Config with the default port policy and no announce file.
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            preferred_port: DEFAULT_PREFERRED_PORT,
            max_port_attempts: DEFAULT_MAX_PORT_ATTEMPTS,
            port_file: None,
        }
    }

    /// Default content root: `dist/` next to the executable, which is where
    /// the plugin package places the bundled frontend.
    pub fn default_root() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("dist")))
            .unwrap_or_else(|| PathBuf::from("dist"))
    }
}

/// Published lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running { port: u16, url: String },
    Stopping,
    /// The serve task died on its own. Treated like `Stopped` by `start()`
    /// and `stop()`; kept distinct so watchers can see the fault.
    Faulted { message: String },
}

impl ServerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ServerStatus::Running { .. })
    }
}

#[derive(Default)]
struct Inner {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Owns one loopback server. `start` and `stop` are serialized by an
/// internal lock, so concurrent callers cannot interleave transitions.
pub struct ServerHandle {
    config: Arc<ServerConfig>,
    status: Arc<watch::Sender<ServerStatus>>,
    inner: Mutex<Inner>,
}

impl ServerHandle {
    pub fn new(config: ServerConfig) -> Self {
        let (status, _) = watch::channel(ServerStatus::Stopped);
        Self {
            config: Arc::new(config),
            status: Arc::new(status),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ServerStatus {
        self.status.borrow().clone()
    }

    /// Watch lifecycle transitions, including faults.
    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.status.subscribe()
    }

    /// Bound URL while running.
    pub fn bound_url(&self) -> Option<String> {
        match &*self.status.borrow() {
            ServerStatus::Running { url, .. } => Some(url.clone()),
            _ => None,
        }
    }

    /// Find a free port, bind it, and spawn the serve task. Returns the
    /// reachable URL. Calling this while already running is a no-op that
    /// returns the existing URL.
    pub async fn start(&self) -> Result<String, StartError> {
        let mut inner = self.inner.lock().await;

        if let ServerStatus::Running { url, .. } = self.status() {
            tracing::debug!(%url, "start called while running");
            return Ok(url);
        }

        // A faulted serve task leaves a finished handle behind; reap it so
        // the restart begins clean.
        inner.shutdown = None;
        if let Some(task) = inner.task.take() {
            let _ = task.await;
        }

        self.status.send_replace(ServerStatus::Starting);
        match self.start_locked(&mut inner).await {
            Ok(url) => Ok(url),
            Err(err) => {
                // Failed starts land back in Stopped, never half-started.
                self.status.send_replace(ServerStatus::Stopped);
                Err(err)
            }
        }
    }

    async fn start_locked(&self, inner: &mut Inner) -> Result<String, StartError> {
        let port = port::find_available_port(
            self.config.preferred_port,
            self.config.max_port_attempts,
        )
        .await?;

        // Rebind for real; losing the probe race surfaces here as Bind.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(StartError::Bind)?;
        let addr = listener.local_addr().map_err(StartError::Bind)?;
        let url = format!("http://{addr}");

        let app = http::build_router(Arc::clone(&self.config));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let status = Arc::clone(&self.status);
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(err) = result {
                tracing::error!(error = %err, "ui server task failed");
                status.send_replace(ServerStatus::Faulted { message: err.to_string() });
            }
        });

        if let Some(path) = &self.config.port_file {
            write_port_file(path, addr.port());
        }

        inner.shutdown = Some(shutdown_tx);
        inner.task = Some(task);
        self.status.send_replace(ServerStatus::Running {
            port: addr.port(),
            url: url.clone(),
        });
        tracing::info!(%url, root = %self.config.root_dir.display(), "ui server listening");
        Ok(url)
    }

    /// Shut the server down and wait for the serve task to finish. Calling
    /// this while already stopped is a no-op.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let shutdown = inner.shutdown.take();
        let task = inner.task.take();
        if shutdown.is_none() && task.is_none() {
            tracing::debug!("stop called while already stopped");
            return;
        }

        self.status.send_replace(ServerStatus::Stopping);
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        if let Some(task) = task
            && let Err(err) = task.await
        {
            tracing::warn!(error = %err, "ui server task join failed");
        }
        if let Some(path) = &self.config.port_file {
            remove_port_file(path);
        }
        self.status.send_replace(ServerStatus::Stopped);
        tracing::info!("ui server stopped");
    }
}

// ---------------------------------------------------------------------------
// Port announce file
// ---------------------------------------------------------------------------

/// Write the bound port so the host-side shim can find the server. Failures
/// are logged, never fatal: the server is still reachable on its URL.
fn write_port_file(path: &Path, port: u16) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(err) = std::fs::write(path, port.to_string()) {
        tracing::warn!(path = %path.display(), error = %err, "failed to write port file");
    }
}

fn remove_port_file(path: &Path) {
    if path.exists()
        && let Err(err) = std::fs::remove_file(path)
    {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove port file");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
