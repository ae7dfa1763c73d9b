//! Seam between the hosting application's plugin lifecycle and the server.
//!
//! Eagle drives the plugin through create/show/hide/destroy callbacks. A
//! standalone run maps process launch and termination signals onto the same
//! events, so the server code never knows which host it is under.

use crate::server::ServerHandle;
use std::future::Future;

/// Lifecycle events emitted by the hosting application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// The plugin surface was created.
    Created,
    /// The plugin surface became visible.
    Shown,
    /// The plugin surface was hidden. The server keeps running.
    Hidden,
    /// The plugin surface is going away.
    Destroyed,
}

/// A hosting environment, reduced to the lifecycle events it emits.
pub trait HostEnvironment {
    /// Wait for the next lifecycle event. `None` ends the event loop.
    fn next_event(&mut self) -> impl Future<Output = Option<HostEvent>>;
}

/// Drive the server from host lifecycle events until the stream ends.
///
/// Create and show both start the server (starting a running server is a
/// no-op), hide leaves it running so reopening the surface is instant, and
/// destroy stops it. Start failures are logged and leave the loop alive;
/// the host can retry by showing the surface again. The server is always
/// stopped before this returns.
pub async fn run_plugin<H: HostEnvironment>(host: &mut H, server: &ServerHandle) {
    while let Some(event) = host.next_event().await {
        tracing::info!(?event, "host event");
        match event {
            HostEvent::Created | HostEvent::Shown => {
                if let Err(err) = server.start().await {
                    tracing::error!(error = %err, "failed to start ui server");
                }
            }
            HostEvent::Hidden => {}
            HostEvent::Destroyed => server.stop().await,
        }
    }
    // The host may end the stream without an explicit destroy; release the
    // socket either way.
    server.stop().await;
}

/// Host environment for running outside Eagle: the plugin surface is
/// "created" at launch and "destroyed" by a termination signal.
#[derive(Default)]
pub struct StandaloneHost {
    launched: bool,
    finished: bool,
}

impl StandaloneHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostEnvironment for StandaloneHost {
    async fn next_event(&mut self) -> Option<HostEvent> {
        if !self.launched {
            self.launched = true;
            return Some(HostEvent::Created);
        }
        if self.finished {
            return None;
        }
        self.finished = true;
        shutdown_signal().await;
        Some(HostEvent::Destroyed)
    }
}

/// Resolve when the process is asked to terminate: Ctrl-C everywhere, and
/// SIGTERM on Unix. A handler that fails to register is logged and the
/// remaining source still works.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "SIGTERM handler failed");
            ctrl_c.await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerConfig, ServerStatus};
    use std::collections::VecDeque;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::sync::watch;

    /// Feeds a fixed event script and records the server status it observes
    /// before handing out each event (and once more when the script ends).
    struct ScriptedHost {
        events: VecDeque<HostEvent>,
        seen: Vec<ServerStatus>,
        status: watch::Receiver<ServerStatus>,
    }

    impl ScriptedHost {
        fn new(events: &[HostEvent], status: watch::Receiver<ServerStatus>) -> Self {
            Self {
                events: events.iter().copied().collect(),
                seen: Vec::new(),
                status,
            }
        }
    }

    impl HostEnvironment for ScriptedHost {
        async fn next_event(&mut self) -> Option<HostEvent> {
            self.seen.push(self.status.borrow().clone());
            self.events.pop_front()
        }
    }

    fn test_handle() -> (TempDir, ServerHandle) {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("index.html"), "<html></html>").unwrap();
        let handle = ServerHandle::new(ServerConfig {
            root_dir: root.path().to_path_buf(),
            preferred_port: 0,
            max_port_attempts: 1,
            port_file: None,
        });
        (root, handle)
    }

    #[tokio::test]
    async fn lifecycle_event_mapping() {
        let (_root, handle) = test_handle();
        let mut host = ScriptedHost::new(
            &[HostEvent::Created, HostEvent::Hidden, HostEvent::Destroyed],
            handle.subscribe(),
        );
        run_plugin(&mut host, &handle).await;

        // Status observed before each event, plus once at stream end.
        assert_eq!(host.seen.len(), 4);
        assert_eq!(host.seen[0], ServerStatus::Stopped);
        assert!(host.seen[1].is_running(), "created must start the server");
        assert!(host.seen[2].is_running(), "hide must not stop the server");
        assert_eq!(host.seen[3], ServerStatus::Stopped);
        assert_eq!(handle.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn shown_restarts_a_stopped_server() {
        let (_root, handle) = test_handle();
        let mut host = ScriptedHost::new(
            &[HostEvent::Created, HostEvent::Destroyed, HostEvent::Shown],
            handle.subscribe(),
        );
        run_plugin(&mut host, &handle).await;

        assert!(
            host.seen[3].is_running(),
            "show after destroy must start a fresh server"
        );
        assert_eq!(handle.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn stream_end_stops_the_server() {
        let (_root, handle) = test_handle();
        let mut host = ScriptedHost::new(&[HostEvent::Created], handle.subscribe());
        run_plugin(&mut host, &handle).await;
        assert_eq!(handle.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn start_failure_keeps_the_loop_alive() {
        use std::net::Ipv4Addr;

        let guard = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let busy = guard.local_addr().unwrap().port();

        let root = TempDir::new().unwrap();
        let handle = ServerHandle::new(ServerConfig {
            root_dir: root.path().to_path_buf(),
            preferred_port: busy,
            max_port_attempts: 1,
            port_file: None,
        });

        let mut host = ScriptedHost::new(
            &[HostEvent::Created, HostEvent::Shown, HostEvent::Hidden],
            handle.subscribe(),
        );
        run_plugin(&mut host, &handle).await;

        // Both starts failed, the loop still consumed every event.
        assert_eq!(host.seen.len(), 4);
        assert_eq!(handle.status(), ServerStatus::Stopped);
        drop(guard);
    }

    #[tokio::test]
    async fn standalone_host_emits_created_first() {
        let mut host = StandaloneHost::new();
        assert_eq!(host.next_event().await, Some(HostEvent::Created));
        // The next call would wait on a real termination signal, so the
        // script stops here.
    }
}
