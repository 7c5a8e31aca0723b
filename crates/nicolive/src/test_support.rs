//! Minimal HTTP/1.1 server for exercising the fetch paths in tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub(crate) struct Route {
    path: &'static str,
    status: u16,
    body: Vec<u8>,
    /// `Content-Length` to announce when it differs from the body length.
    declared_len: Option<usize>,
}

impl Route {
    pub(crate) fn ok(path: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            status: 200,
            body: body.into(),
            declared_len: None,
        }
    }

    pub(crate) fn status(path: &'static str, status: u16) -> Self {
        Self {
            path,
            status,
            body: Vec::new(),
            declared_len: None,
        }
    }

    /// Announces `declared_len` bytes but closes the connection after `body`.
    pub(crate) fn truncated(path: &'static str, body: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        Self {
            declared_len: Some(declared_len),
            ..Self::ok(path, body)
        }
    }
}

/// Serve `routes` on an ephemeral local port and return its base url.
/// Unknown paths answer 404.
pub(crate) async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(respond(socket, routes.clone()));
        }
    });

    format!("http://{addr}")
}

async fn respond(mut socket: TcpStream, routes: Vec<Route>) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/");
    let route = routes
        .iter()
        .find(|r| r.path == path)
        .cloned()
        .unwrap_or_else(|| Route::status("", 404));

    let reason = match route.status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error",
    };
    let length = route.declared_len.unwrap_or(route.body.len());
    let head = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n",
        route.status
    );

    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&route.body).await;
    let _ = socket.shutdown().await;
}
