//! Shared fixtures for the pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaydrop_destination::{
    CommitInfo, DestinationStore, SessionCursor, SpaceUsage, UploadError,
};
use relaydrop_transfer::{BoxFuture, ChatRef, MessageRef, NotificationSink, NotifyError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ---------------------------------------------------------------------------
// HTTP origin
// ---------------------------------------------------------------------------

/// Canned body for one path. A `cut_at` shorter than the body drops the
/// connection after that many bytes.
#[derive(Clone)]
pub struct Route {
    pub body: Vec<u8>,
    pub cut_at: Option<usize>,
}

impl Route {
    pub fn full(body: Vec<u8>) -> Self {
        Self { body, cut_at: None }
    }

    pub fn cut(body: Vec<u8>, cut_at: usize) -> Self {
        Self {
            body,
            cut_at: Some(cut_at),
        }
    }
}

/// Minimal HTTP/1.1 origin on localhost. Returns the base URL.
pub async fn serve(routes: HashMap<&'static str, Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    if sock.read(&mut byte).await.unwrap_or(0) == 0 {
                        return;
                    }
                    head.push(byte[0]);
                }
                let head = String::from_utf8_lossy(&head);
                let mut parts = head.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                let mut out = Vec::new();
                match routes.get(path.as_str()) {
                    Some(route) => {
                        out.extend_from_slice(
                            format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\
                                 Content-Type: application/octet-stream\r\n\
                                 Connection: close\r\n\r\n",
                                route.body.len()
                            )
                            .as_bytes(),
                        );
                        if method != "HEAD" {
                            let n = route.cut_at.unwrap_or(route.body.len());
                            out.extend_from_slice(&route.body[..n]);
                        }
                    }
                    None => out.extend_from_slice(
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    ),
                }
                let _ = sock.write_all(&out).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

pub fn test_client() -> reqwest::Client {
    relaydrop_fetch::http_client_builder(Duration::from_secs(10))
        .no_proxy()
        .build()
        .unwrap()
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

// ---------------------------------------------------------------------------
// Notification sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(ChatRef, String)>>,
    pub edits: Mutex<Vec<(MessageRef, String)>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn send_message(
        &self,
        chat: &ChatRef,
        text: &str,
    ) -> BoxFuture<'_, Result<MessageRef, NotifyError>> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat.clone(), text.to_string()));
        let id = MessageRef(format!("msg-{}", sent.len()));
        Box::pin(async move { Ok(id) })
    }

    fn edit_message(
        &self,
        _chat: &ChatRef,
        message: &MessageRef,
        text: &str,
    ) -> BoxFuture<'_, Result<(), NotifyError>> {
        self.edits
            .lock()
            .unwrap()
            .push((message.clone(), text.to_string()));
        Box::pin(async { Ok(()) })
    }
}

// ---------------------------------------------------------------------------
// Destination store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Whole(usize),
    Start(usize),
    Append(usize),
    Finish(usize),
}

/// In-memory store that records every call.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<StoreCall>>,
    pub sessions: Mutex<HashMap<String, Vec<u8>>>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    /// Makes every `append_session` fail with `Rejected`.
    pub reject_appends: AtomicBool,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

impl DestinationStore for RecordingStore {
    fn upload_whole<'a>(
        &'a self,
        commit: &'a CommitInfo,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        self.calls.lock().unwrap().push(StoreCall::Whole(data.len()));
        self.objects
            .lock()
            .unwrap()
            .insert(commit.path.clone(), data);
        Box::pin(async { Ok(()) })
    }

    fn start_session(&self, data: Vec<u8>) -> BoxFuture<'_, Result<String, UploadError>> {
        self.calls.lock().unwrap().push(StoreCall::Start(data.len()));
        let mut sessions = self.sessions.lock().unwrap();
        let id = format!("s{}", sessions.len());
        sessions.insert(id.clone(), data);
        Box::pin(async move { Ok(id) })
    }

    fn append_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        self.calls.lock().unwrap().push(StoreCall::Append(data.len()));
        let result = if self.reject_appends.load(Ordering::SeqCst) {
            Err(UploadError::Rejected("append refused".into()))
        } else {
            append(&self.sessions, cursor, &data)
        };
        Box::pin(async move { result })
    }

    fn finish_session<'a>(
        &'a self,
        cursor: &'a SessionCursor,
        data: Vec<u8>,
        commit: &'a CommitInfo,
    ) -> BoxFuture<'a, Result<(), UploadError>> {
        self.calls.lock().unwrap().push(StoreCall::Finish(data.len()));
        let result = append(&self.sessions, cursor, &data).map(|()| {
            let bytes = self
                .sessions
                .lock()
                .unwrap()
                .remove(&cursor.session_id)
                .unwrap_or_default();
            self.objects
                .lock()
                .unwrap()
                .insert(commit.path.clone(), bytes);
        });
        Box::pin(async move { result })
    }

    fn space_usage(&self) -> BoxFuture<'_, Result<SpaceUsage, UploadError>> {
        let used = self
            .objects
            .lock()
            .unwrap()
            .values()
            .map(|v| v.len() as u64)
            .sum();
        Box::pin(async move {
            Ok(SpaceUsage {
                used,
                allocated: 0,
            })
        })
    }
}

fn append(
    sessions: &Mutex<HashMap<String, Vec<u8>>>,
    cursor: &SessionCursor,
    data: &[u8],
) -> Result<(), UploadError> {
    let mut sessions = sessions.lock().unwrap();
    let held = sessions
        .get_mut(&cursor.session_id)
        .ok_or_else(|| UploadError::UnknownSession(cursor.session_id.clone()))?;
    if held.len() as u64 != cursor.offset {
        return Err(UploadError::OffsetMismatch {
            expected: held.len() as u64,
            actual: cursor.offset,
        });
    }
    held.extend_from_slice(data);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Polls `cond` every 10 ms for up to 10 s.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..1000 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
