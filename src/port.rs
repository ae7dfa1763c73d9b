use crate::error::StartError;
use std::io;
use std::net::Ipv4Addr;
use tokio::net::TcpListener;

/// Scan for a free loopback port starting at `preferred`.
///
/// Each candidate is checked by binding a listener and releasing it right
/// away; the caller binds the real listener afterwards. Another process can
/// grab the port in that window. For a localhost-only server the race is
/// accepted; the follow-up bind failing surfaces as `StartError::Bind`.
///
/// Only "address in use" advances the scan. Any other bind failure (no
/// permission, no address) would hit every candidate too, so it aborts the
/// scan immediately.
pub async fn find_available_port(preferred: u16, max_attempts: u32) -> Result<u16, StartError> {
    let mut port = preferred;
    for attempt in 0..max_attempts {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(probe) => {
                // For port 0 the OS picks; report what was actually bound.
                let bound = probe.local_addr().map_err(StartError::Bind)?.port();
                drop(probe);
                return Ok(bound);
            }
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port, attempt, "port in use, trying next");
                port = match port.checked_add(1) {
                    Some(next) => next,
                    // Candidates ran past 65535 before the budget did.
                    None => break,
                };
            }
            Err(err) => return Err(StartError::Bind(err)),
        }
    }
    Err(StartError::PortExhausted { start: preferred, attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Reserve a run of consecutive loopback ports, returning the base and
    /// the guards keeping them bound. Retries with a different base when the
    /// run cannot be reserved, since other tests and processes bind ports
    /// too.
    async fn occupy_run(len: u16) -> (u16, Vec<TcpListener>) {
        'outer: for _ in 0..50 {
            // Ask the OS for a free port to anchor the run.
            let anchor = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
            let base = anchor.local_addr().unwrap().port();
            drop(anchor);
            if base > u16::MAX - len {
                continue;
            }
            let mut guards = Vec::new();
            for offset in 0..len {
                match TcpListener::bind((Ipv4Addr::LOCALHOST, base + offset)).await {
                    Ok(listener) => guards.push(listener),
                    Err(_) => continue 'outer,
                }
            }
            return (base, guards);
        }
        panic!("could not reserve a run of {len} consecutive ports");
    }

    #[tokio::test]
    async fn returns_preferred_when_free() {
        let anchor = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = anchor.local_addr().unwrap().port();
        drop(anchor);
        let found = find_available_port(port, 1).await.unwrap();
        assert_eq!(found, port);
    }

    #[tokio::test]
    #[serial]
    async fn skips_busy_ports_within_budget() {
        let (base, mut guards) = occupy_run(3).await;
        // Free the last port of the run; the first two stay busy.
        let freed = guards.pop().unwrap();
        let free_port = freed.local_addr().unwrap().port();
        drop(freed);

        let found = find_available_port(base, 3).await.unwrap();
        assert_eq!(found, free_port);
        drop(guards);
    }

    #[tokio::test]
    #[serial]
    async fn exhausts_after_budget() {
        let (base, guards) = occupy_run(10).await;
        let err = find_available_port(base, 10).await.unwrap_err();
        match err {
            StartError::PortExhausted { start, attempts } => {
                assert_eq!(start, base);
                assert_eq!(attempts, 10);
            }
            other => panic!("expected PortExhausted, got {other:?}"),
        }
        drop(guards);
    }

    #[tokio::test]
    async fn zero_attempts_is_immediate_exhaustion() {
        let err = find_available_port(8080, 0).await.unwrap_err();
        assert!(matches!(err, StartError::PortExhausted { attempts: 0, .. }));
    }

    #[tokio::test]
    #[serial]
    async fn candidate_overflow_reports_exhaustion() {
        // Keep 65535 occupied so the scan has to step past the top of the
        // range. If the port is already busy the guard fails but the probe
        // below still sees it in use.
        let guard = TcpListener::bind((Ipv4Addr::LOCALHOST, 65535)).await;
        let err = find_available_port(65535, 10).await;
        assert!(matches!(err, Err(StartError::PortExhausted { .. })));
        drop(guard);
    }
}
