//! Merge lifecycle integration tests.
//!
//! These drive the full merge path through [`MergeService`] with the real
//! [`FfmpegConcatenator`] pointed at small shell scripts standing in for
//! ffmpeg:
//! - the manifest lists the inputs in request order
//! - a non-zero exit becomes a processing error
//! - a hanging encoder is killed at the deadline or on shutdown
//! - stderr that is not valid UTF-8 does not change the outcome
//! - the workspace is removed on every path
//!
//! One test uses the real ffmpeg and ffprobe when they are installed.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use reelsplice_core::{
    concat::MANIFEST_FILE_NAME,
    input::{InputDescriptor, RemoteFetcher, UploadedInput},
    testing::StaticHttpServer,
    FfmpegConcatenator, MergeConfig, MergeError, MergeService, RemoteInput,
};

/// Appends every file listed in the manifest to the output.
const CONCAT_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version test"
  exit 0
fi
manifest=""
prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then manifest="$arg"; fi
  prev="$arg"
  out="$arg"
done
: > "$out"
sed -e "s/^file '//" -e "s/'\$//" "$manifest" | while IFS= read -r f; do
  cat "$f" >> "$out"
done
"#;

const FAILING_SCRIPT: &str = r#"#!/bin/sh
echo "concat.txt: Invalid data found when processing input" >&2
exit 3
"#;

const HANGING_SCRIPT: &str = r#"#!/bin/sh
exec sleep 30
"#;

/// Fails after echoing raw Latin-1 bytes, as ffmpeg does with some titles.
const FAILING_NON_UTF8_SCRIPT: &str = r#"#!/bin/sh
printf 'bad title \377\376\n' >&2
exit 1
"#;

/// `script` with a line of raw non-UTF-8 bytes written to stderr first.
fn with_binary_stderr(script: &str) -> String {
    script.replacen(
        "#!/bin/sh\n",
        "#!/bin/sh\nprintf 'title: caf\\351\\n' >&2\n",
        1,
    )
}

struct TestHarness {
    service: MergeService,
    temp_root: PathBuf,
    shutdown: CancellationToken,
    _dir: TempDir,
}

impl TestHarness {
    fn new(script: &str) -> Self {
        Self::with_config(script, |config| config)
    }

    fn with_config(script: &str, adjust: impl FnOnce(MergeConfig) -> MergeConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let ffmpeg = write_script(dir.path(), script);
        let temp_root = dir.path().join("work");

        let config = adjust(
            MergeConfig::default()
                .with_ffmpeg_path(ffmpeg)
                .with_temp_root(&temp_root),
        );
        let concatenator = Arc::new(FfmpegConcatenator::new(config.clone()));
        let fetcher = Arc::new(RemoteFetcher::with_defaults().expect("Failed to build fetcher"));
        let shutdown = CancellationToken::new();

        Self {
            service: MergeService::new(config, concatenator, fetcher)
                .with_cancellation(shutdown.clone()),
            temp_root,
            shutdown,
            _dir: dir,
        }
    }

    /// Number of workspaces left behind under the temp root.
    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.temp_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, body).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path
}

fn upload(name: &str, data: &'static [u8]) -> InputDescriptor {
    UploadedInput::new(Some(name.to_string()), data).into()
}

fn abc() -> Vec<InputDescriptor> {
    vec![
        upload("a.mp4", b"first-"),
        upload("b.mp4", b"second-"),
        upload("c.mp4", b"third"),
    ]
}

#[tokio::test]
async fn test_merge_concatenates_in_request_order() {
    let harness = TestHarness::new(CONCAT_SCRIPT);

    let (bytes, manifest) = harness
        .service
        .merge_with(abc(), |output| async move {
            let bytes = tokio::fs::read(&output.output_path).await.unwrap();
            let workspace = output.output_path.parent().unwrap().to_path_buf();
            let manifest = tokio::fs::read_to_string(workspace.join(MANIFEST_FILE_NAME))
                .await
                .unwrap();
            Ok((bytes, manifest))
        })
        .await
        .unwrap();

    assert_eq!(bytes, b"first-second-third");

    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 3);
    for (line, name) in lines.iter().zip(["a.mp4", "b.mp4", "c.mp4"]) {
        assert!(line.starts_with("file '/"), "not absolute: {}", line);
        assert!(line.ends_with(&format!("/{}'", name)), "wrong order: {}", line);
    }

    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_encoder_failure_is_processing_error() {
    let harness = TestHarness::new(FAILING_SCRIPT);

    let err = harness.service.merge(abc()).await.unwrap_err();

    match err {
        MergeError::Processing { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr.unwrap().contains("Invalid data"));
        }
        other => panic!("expected processing error, got {:?}", other),
    }
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_hanging_encoder_times_out() {
    let harness = TestHarness::with_config(HANGING_SCRIPT, |config| config.with_timeout(1));

    let started = Instant::now();
    let err = harness.service.merge(abc()).await.unwrap_err();

    assert!(matches!(err, MergeError::Timeout { timeout_secs: 1 }));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_shutdown_kills_running_encoder() {
    let harness = TestHarness::new(HANGING_SCRIPT);
    let shutdown = harness.shutdown.clone();

    let started = Instant::now();
    let (result, ()) = tokio::join!(harness.service.merge(abc()), async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
    });

    let err = result.unwrap_err();
    assert!(matches!(err, MergeError::Cancelled), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_non_utf8_stderr_on_success_is_ignored() {
    let harness = TestHarness::new(&with_binary_stderr(CONCAT_SCRIPT));

    let output = harness.service.merge(abc()).await.unwrap();

    assert_eq!(output.output_size_bytes, b"first-second-third".len() as u64);
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_non_utf8_stderr_on_failure_is_processing_error() {
    let harness = TestHarness::new(FAILING_NON_UTF8_SCRIPT);

    let err = harness.service.merge(abc()).await.unwrap_err();

    match err {
        MergeError::Processing { exit_code, stderr } => {
            assert_eq!(exit_code, Some(1));
            let stderr = stderr.unwrap();
            assert!(stderr.contains("bad title"), "{}", stderr);
            assert!(stderr.contains('\u{fffd}'), "{}", stderr);
        }
        other => panic!("expected processing error, got {:?}", other),
    }
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_wrong_input_count_touches_nothing() {
    let harness = TestHarness::new(CONCAT_SCRIPT);

    let err = harness
        .service
        .merge(vec![upload("a.mp4", b"a"), upload("b.mp4", b"b")])
        .await
        .unwrap_err();

    assert!(matches!(err, MergeError::Validation { .. }));
    assert!(err.to_string().contains("got 2"));
    assert!(!harness.temp_root.exists());
}

#[tokio::test]
async fn test_concurrent_merges_are_independent() {
    let harness = TestHarness::new(CONCAT_SCRIPT);

    let first = vec![
        upload("a.mp4", b"1"),
        upload("b.mp4", b"2"),
        upload("c.mp4", b"3"),
    ];
    let second = vec![
        upload("a.mp4", b"x"),
        upload("b.mp4", b"y"),
        upload("c.mp4", b"z"),
    ];

    let read = |output: reelsplice_core::MergeOutput| async move {
        let bytes = tokio::fs::read(&output.output_path).await.unwrap();
        Ok((output.output_path, bytes))
    };
    let (one, two) = tokio::join!(
        harness.service.merge_with(first, read),
        harness.service.merge_with(second, read)
    );
    let (path_one, bytes_one) = one.unwrap();
    let (path_two, bytes_two) = two.unwrap();

    assert_ne!(path_one, path_two);
    assert_eq!(bytes_one, b"123");
    assert_eq!(bytes_two, b"xyz");
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_remote_and_uploaded_inputs_mix() {
    let server = StaticHttpServer::start()
        .await
        .route("/intro.mp4", 200, b"intro-".to_vec())
        .route("/outro.mp4", 200, b"-outro".to_vec());
    let harness = TestHarness::new(CONCAT_SCRIPT);

    let bytes = harness
        .service
        .merge_with(
            vec![
                RemoteInput::new(server.url("/intro.mp4")).into(),
                upload("main.mp4", b"main"),
                RemoteInput::new(server.url("/outro.mp4")).into(),
            ],
            |output| async move { Ok(tokio::fs::read(&output.output_path).await.unwrap()) },
        )
        .await
        .unwrap();

    assert_eq!(bytes, b"intro-main-outro");
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_failed_fetch_aborts_merge() {
    let server = StaticHttpServer::start().await;
    let harness = TestHarness::new(CONCAT_SCRIPT);

    let err = harness
        .service
        .merge(vec![
            RemoteInput::new(server.url("/missing.mp4")).into(),
            upload("b.mp4", b"b"),
            upload("c.mp4", b"c"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, MergeError::Fetch { .. }));
    assert_eq!(harness.leftover_workspaces(), 0);
}

fn tool_available(name: &str) -> bool {
    std::process::Command::new(name)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn make_clip(dir: &Path, name: &str, seconds: u32) -> Vec<u8> {
    let path = dir.join(name);
    let status = std::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={}:size=64x64:rate=10", seconds))
        .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .expect("Failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not generate {}", name);
    std::fs::read(&path).expect("Failed to read clip")
}

fn probe_duration(path: &Path) -> f64 {
    let output = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .expect("Failed to run ffprobe");
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .expect("ffprobe returned no duration")
}

#[tokio::test]
async fn test_real_ffmpeg_output_duration_is_sum_of_inputs() {
    if !tool_available("ffmpeg") || !tool_available("ffprobe") {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return;
    }

    let clips = TempDir::new().unwrap();
    let one = make_clip(clips.path(), "one.mp4", 1);
    let two = make_clip(clips.path(), "two.mp4", 2);
    let three = make_clip(clips.path(), "three.mp4", 1);

    let root = TempDir::new().unwrap();
    let config = MergeConfig::default().with_temp_root(root.path());
    let concatenator = Arc::new(FfmpegConcatenator::new(config.clone()));
    let fetcher = Arc::new(RemoteFetcher::with_defaults().unwrap());
    let service = MergeService::new(config, concatenator, fetcher);

    let inputs = vec![
        UploadedInput::new(Some("one.mp4".to_string()), one).into(),
        UploadedInput::new(Some("two.mp4".to_string()), two).into(),
        UploadedInput::new(Some("three.mp4".to_string()), three).into(),
    ];
    let duration = service
        .merge_with(inputs, |output| async move {
            Ok(probe_duration(&output.output_path))
        })
        .await
        .unwrap();

    assert!((duration - 4.0).abs() < 0.3, "duration was {}", duration);
}
