//! Directory feed download.
//!
//! The feed is fetched whole and handed to the same decode path as a local
//! file. The async client runs on a runtime owned by the calling thread.

use std::time::Duration;

use tracing::{debug, info};

use crate::transfer::types::{TransferError, TransferResult};

/// The full RadioID dump is tens of megabytes.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

fn network(err: &reqwest::Error) -> TransferError {
    TransferError::Network(err.to_string())
}

/// Fetch `url` and return the body.
///
/// # Errors
///
/// Returns `TransferError::Network` for connection failures and non-2xx
/// responses, and `TransferError::Io` if the runtime cannot start.
pub fn fetch(url: &str) -> TransferResult<Vec<u8>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(fetch_async(url))
}

async fn fetch_async(url: &str) -> TransferResult<Vec<u8>> {
    debug!(url, "Downloading directory feed");
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| network(&e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| network(&e))?
        .error_for_status()
        .map_err(|e| network(&e))?;

    let bytes = response.bytes().await.map_err(|e| network(&e))?;
    info!(url, bytes = bytes.len(), "Downloaded directory feed");
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response on a local port.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/user.csv")
    }

    #[test]
    fn test_fetch_returns_body() {
        let url = serve_once("200 OK", "RADIO_ID,CALLSIGN\n666,K6AB\n");
        let bytes = fetch(&url).unwrap();
        assert_eq!(bytes, b"RADIO_ID,CALLSIGN\n666,K6AB\n");
    }

    #[test]
    fn test_fetch_error_status_is_network_error() {
        let url = serve_once("404 Not Found", "");
        assert!(matches!(fetch(&url), Err(TransferError::Network(_))));
    }
}
