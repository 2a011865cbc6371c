#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use barbershop_api::config::ServerConfig;
use barbershop_api::router::build_app_router;
use barbershop_api::state::AppState;
use barbershop_pipeline::{JobDispatcher, JobRegistry, JobRunner};

/// Resize target used in tests. The real tool needs 1024x1024; the fake
/// one does not care, and small images keep the tests fast.
pub const TEST_TARGET_SIZE: (u32, u32) = (16, 16);

/// Fake tool body that copies `resized_1.png` to the conventional result name.
pub const COPY_FIRST_INPUT: &str =
    r#"cp "$IN/resized_1.png" "$OUT/resized_1_resized_2_resized_3_$SIGN.png""#;

const BOUNDARY: &str = "barbershop-test-boundary";

/// A running application: router, scratch data root and dispatcher.
///
/// Dropping it cancels the dispatcher and removes the data root.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<JobRegistry>,
    pub config: Arc<ServerConfig>,
    pub dir: TempDir,
    cancel: CancellationToken,
}

impl TestApp {
    pub fn data_root(&self) -> &Path {
        &self.config.data_root
    }

    /// A fresh clone of the router for a single `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build a test `ServerConfig` whose synthesis tool is a `sh` script
/// running `tool_body`.
///
/// The script parses `--input_dir`, `--output_dir` and `--sign` into `$IN`,
/// `$OUT` and `$SIGN` before running `tool_body`.
pub fn test_config(dir: &Path, tool_body: &str) -> ServerConfig {
    let script = dir.join("fake_tool.sh");
    let contents = format!(
        r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --input_dir) IN="$2"; shift 2 ;;
    --output_dir) OUT="$2"; shift 2 ;;
    --sign) SIGN="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{tool_body}
"#
    );
    std::fs::write(&script, contents).expect("write fake tool");

    let data_root = dir.join("data");
    std::fs::create_dir_all(&data_root).expect("create data root");

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 16 * 1024 * 1024,
        data_root,
        max_concurrent_jobs: 2,
        queue_capacity: 16,
        job_retention_secs: 3600,
        synth_program: "sh".to_string(),
        synth_args: vec![script.to_string_lossy().into_owned()],
        synth_workdir: dir.to_path_buf(),
        synth_timeout_secs: 30,
        synth_sign: "realistic".to_string(),
        synth_smooth: 5,
    }
}

/// Build the full application with a running dispatcher.
pub fn build_test_app(tool_body: &str) -> TestApp {
    build_test_app_with(tool_body, |_| {})
}

/// Like [`build_test_app`], with a hook to adjust the configuration.
pub fn build_test_app_with(tool_body: &str, adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(dir.path(), tool_body);
    adjust(&mut config);
    let config = Arc::new(config);

    let registry = Arc::new(JobRegistry::new());
    let runner =
        Arc::new(JobRunner::new(config.synthesis_tool()).with_target_size(TEST_TARGET_SIZE));
    let (dispatcher, submitter) =
        JobDispatcher::new(runner, Arc::clone(&registry), config.dispatcher_config());

    let cancel = CancellationToken::new();
    tokio::spawn(dispatcher.run(cancel.clone()));

    let state = AppState::new(Arc::clone(&config), Arc::clone(&registry), submitter);
    let router = build_app_router(state, &config);

    TestApp {
        router,
        registry,
        config,
        dir,
        cancel,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One multipart part: a text field or a file.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode `parts` as a `multipart/form-data` body.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub async fn send_multipart(
    app: Router,
    method: Method,
    uri: &str,
    parts: &[Part<'_>],
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", multipart_content_type())
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// `POST /process` with the three files and both directories.
pub async fn submit(
    app: Router,
    files: [&[u8]; 3],
    input_dir: &str,
    output_dir: &str,
) -> Response<Body> {
    send_multipart(
        app,
        Method::POST,
        "/process",
        &[
            Part::File("file1", "a.png", files[0]),
            Part::File("file2", "b.png", files[1]),
            Part::File("file3", "c.png", files[2]),
            Part::Text("input_dir", input_dir),
            Part::Text("output_dir", output_dir),
        ],
    )
    .await
}

/// `GET /results/{job_id}` with `output_dir` in the query string.
pub async fn fetch_result(app: Router, job_id: &str, output_dir: &str) -> Response<Body> {
    get(app, &format!("/results/{job_id}?output_dir={output_dir}")).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Encode a solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Poll the job record until it reaches a terminal state.
pub async fn wait_for_job(app: &TestApp, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.app(), &format!("/jobs/{job_id}")).await;
        let json = body_json(response).await;
        let status = json["data"]["status"].as_str().unwrap_or("");
        if status == "succeeded" || status == "failed" {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not finish in time");
}

pub fn result_file(data_root: &Path, output_dir: &str, job_id: &str) -> PathBuf {
    data_root
        .join(output_dir)
        .join(job_id)
        .join("resized_1_resized_2_resized_3_realistic.png")
}
