use std::time::Duration;

use log::{info, warn};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

/// Wait until something accepts TCP connections on `host:port`.
///
/// Probes with a real connect-and-close rather than inferring readiness
/// from bind failures: a successful connect is the same signal the webview
/// needs, and connection-refused cleanly means "not yet". Returns false if
/// the deadline passes first.
pub async fn wait_until_ready(host: &str, port: u16, timeout_after: Duration) -> bool {
    let addr = format!("{host}:{port}");
    let deadline = Instant::now() + timeout_after;

    loop {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                info!("server is accepting connections on {addr}");
                return true;
            }
            // Refused, unreachable, or the connect itself timed out.
            Ok(Err(_)) | Err(_) => {}
        }

        if Instant::now() >= deadline {
            warn!(
                "server did not become ready on {addr} within {:?}",
                timeout_after
            );
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn ready_as_soon_as_a_listener_exists() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let started = std::time::Instant::now();
        assert!(wait_until_ready("127.0.0.1", port, Duration::from_secs(5)).await);
        // First probe should succeed; no full interval needed.
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(listener);
    }

    #[tokio::test]
    async fn times_out_when_nothing_listens() {
        // Bind-and-drop so the port is known dead at probe time.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };

        let started = std::time::Instant::now();
        assert!(!wait_until_ready("127.0.0.1", port, Duration::from_secs(1)).await);
        // 1s timeout at a 0.5s interval: at most three probes, so well
        // under two seconds even with the connect timeout added.
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn becomes_ready_after_a_delayed_bind() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };

        let binder = tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            TcpListener::bind(("127.0.0.1", port)).unwrap()
        });

        assert!(wait_until_ready("127.0.0.1", port, Duration::from_secs(5)).await);
        binder.await.unwrap();
    }
}
