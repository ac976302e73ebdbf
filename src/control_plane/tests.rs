//! Tests for the REST control-plane client against a loopback listener.

use std::time::Duration;

use rstest::rstest;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::*;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct CapturedRequest {
    head: String,
    body: String,
}

impl CapturedRequest {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

/// Serves one scripted response per accepted connection and returns what was
/// received.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            captured.push(read_request(&mut socket).await);
            let reason = if status == 200 { "OK" } else { "Error" };
            let reply = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
        }
        captured
    });
    (format!("http://{addr}/"), handle)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = socket.read(&mut chunk).await.expect("read");
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
        let text = String::from_utf8_lossy(&buffer).into_owned();
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let length = content_length(head);
            if body.len() >= length || read == 0 {
                return CapturedRequest {
                    head: head.to_owned(),
                    body: body.to_owned(),
                };
            }
        }
        assert!(read != 0, "connection closed before request completed");
    }
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn backup_request() -> BackupRequest {
    BackupRequest {
        volume_id: String::from("pvc-1"),
        backup_base_name: String::from("daily"),
        snapshot_name: String::from("daily-01"),
        destination: String::from("10.0.0.5:9000"),
        namespace: String::from("apps"),
    }
}

#[tokio::test]
async fn create_backup_posts_series_and_snapshot_names() {
    let (base, server) = serve(vec![(200, "{}")]).await;
    let client = HttpControlPlane::new(base, TIMEOUT).expect("client");

    let job = client
        .create_backup(&backup_request())
        .await
        .expect("backup accepted");
    let captured = server.await.expect("server task");
    let request = captured.first().expect("one request");

    assert!(
        request.request_line().starts_with("POST /latest/backups/ "),
        "unexpected request line: {}",
        request.request_line()
    );
    let body = request.json();
    assert_eq!(body["metadata"]["namespace"], "apps");
    assert_eq!(body["spec"]["backupName"], "daily");
    assert_eq!(body["spec"]["snapName"], "daily-01");
    assert_eq!(body["spec"]["volumeName"], "pvc-1");
    assert_eq!(body["spec"]["backupDest"], "10.0.0.5:9000");
    assert_eq!(job.kind, JobKind::Backup);
    assert_eq!(job.name, "daily-01");
}

#[tokio::test]
async fn create_restore_surfaces_rejection_status() {
    let (base, server) = serve(vec![(500, "pool offline")]).await;
    let client = HttpControlPlane::new(base, TIMEOUT).expect("client");
    let request = RestoreRequest {
        volume_id: String::from("pvc-restored"),
        restore_name: String::from("full-01"),
        source: String::from("10.0.0.5:9000"),
        namespace: String::from("apps"),
    };

    let err = client
        .create_restore(&request)
        .await
        .expect_err("restore rejected");
    let captured = server.await.expect("server task");
    let sent = captured.first().expect("one request");

    assert!(sent.request_line().starts_with("POST /latest/restore/ "));
    assert_eq!(sent.json()["spec"]["restoreSrc"], "10.0.0.5:9000");
    assert_eq!(
        err,
        ControlPlaneError::Rejected {
            status: 500,
            body: String::from("pool offline"),
        }
    );
}

#[rstest]
#[case(200, false)]
#[case(404, true)]
#[tokio::test]
async fn delete_backup_sends_volume_query(#[case] status: u16, #[case] not_found: bool) {
    let (base, server) = serve(vec![(status, "")]).await;
    let client = HttpControlPlane::new(base, TIMEOUT).expect("client");

    let result = client.delete_backup("pvc-1", "full-01", "apps").await;
    let captured = server.await.expect("server task");
    let sent = captured.first().expect("one request");

    assert!(
        sent.request_line()
            .starts_with("DELETE /latest/backups/full-01?volume=pvc-1&namespace=apps&casType=cstor "),
        "unexpected request line: {}",
        sent.request_line()
    );
    match result {
        Ok(()) => assert!(!not_found),
        Err(err) => assert_eq!(err.is_not_found(), not_found, "unexpected error: {err}"),
    }
}

#[rstest]
#[case(JobKind::Backup, "GET /latest/backups/full-01?volume=pvc-1&namespace=apps ")]
#[case(JobKind::Restore, "GET /latest/restore/full-01?volume=pvc-1&namespace=apps ")]
#[tokio::test]
async fn job_status_reads_status_field(#[case] kind: JobKind, #[case] expected_line: &str) {
    let (base, server) = serve(vec![(200, r#"{"status":"InProgress","spec":{}}"#)]).await;
    let client = HttpControlPlane::new(base, TIMEOUT).expect("client");
    let job = JobHandle {
        kind,
        name: String::from("full-01"),
        volume_id: String::from("pvc-1"),
        namespace: String::from("apps"),
    };

    let status = client.job_status(&job).await.expect("status");
    let captured = server.await.expect("server task");

    assert_eq!(status, JobStatus::InProgress);
    assert!(
        captured
            .first()
            .expect("one request")
            .request_line()
            .starts_with(expected_line)
    );
}

#[tokio::test]
async fn job_status_rejects_non_json_body() {
    let (base, server) = serve(vec![(200, "not json")]).await;
    let client = HttpControlPlane::new(base, TIMEOUT).expect("client");
    let job = JobHandle::for_backup(&backup_request());

    let err = client.job_status(&job).await.expect_err("decode failure");
    server.await.expect("server task");

    assert!(matches!(err, ControlPlaneError::Decode { .. }), "got {err}");
}

#[tokio::test]
async fn closed_port_is_reported_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = HttpControlPlane::new(format!("http://{addr}"), TIMEOUT).expect("client");

    let err = client
        .create_backup(&backup_request())
        .await
        .expect_err("nothing listening");

    assert!(
        matches!(err, ControlPlaneError::Unreachable { .. }),
        "got {err}"
    );
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let client = HttpControlPlane::new("http://maya:5656/", TIMEOUT).expect("client");
    assert_eq!(client.base_url(), "http://maya:5656");
}
