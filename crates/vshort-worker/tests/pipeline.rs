//! End-to-end pipeline tests against in-process fakes of the fetcher and toolkit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use vshort_media::{
    FfmpegCommand, MediaError, MediaFetcher, MediaResult, MediaToolkit, ProgressMode,
    VideoMetadata,
};
use vshort_models::{EncoderProfile, EventSink, JobSpec, PipelineEvent, VideoTrack};
use vshort_worker::{Pipeline, PipelineError, WorkerConfig};

const SONG_URL: &str = "https://youtube.com/watch?v=song";
const CLIP1_URL: &str = "https://youtube.com/watch?v=clip1";
const CLIP2_URL: &str = "https://youtube.com/watch?v=clip2";

const SINGLE_LAYOUT: &str = r#"[
    {"id": "video-placeholder", "type": "video", "zIndex": 1, "x": 0, "y": 0, "width": 720, "height": 1280},
    {"id": "thumbnail-placeholder", "type": "thumbnail", "zIndex": 2, "x": 60, "y": 200, "width": 600, "height": 338},
    {"id": "text-placeholder", "type": "text", "zIndex": 3, "x": 0, "y": 1000, "width": 720, "height": 100, "content": "Part"}
]"#;

const DUAL_LAYOUT: &str = r#"[
    {"id": "video-placeholder-1", "type": "video", "zIndex": 1, "x": 0, "y": 0, "width": 720, "height": 640},
    {"id": "video-placeholder-2", "type": "video", "zIndex": 1, "x": 0, "y": 640, "width": 720, "height": 640},
    {"id": "thumbnail-placeholder", "type": "thumbnail", "zIndex": 2, "x": 60, "y": 200, "width": 600, "height": 338}
]"#;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    fn lines(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(PipelineEvent::to_line)
            .collect()
    }

    fn position(&self, line: &str) -> Option<usize> {
        self.lines().iter().position(|l| l == line)
    }

    fn position_prefix(&self, prefix: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.starts_with(prefix))
    }

    fn count_prefix(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
struct FakeFetcher {
    metadata: HashMap<String, VideoMetadata>,
    fail_url: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn new() -> Self {
        let mut metadata = HashMap::new();
        for (url, id, title) in [
            (SONG_URL, "song", "My Song: Live"),
            (CLIP1_URL, "clip1", "Clip one"),
            (CLIP2_URL, "clip2", "Clip two"),
        ] {
            metadata.insert(
                url.to_string(),
                VideoMetadata {
                    id: id.to_string(),
                    title: title.to_string(),
                    thumbnail: Some(format!("https://img.example/{id}.jpg")),
                    duration: None,
                },
            );
        }
        Self {
            metadata,
            ..Default::default()
        }
    }

    fn failing_on(mut self, url: &str) -> Self {
        self.fail_url = Some(url.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, call: String, url: &str) -> MediaResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_url.as_deref() == Some(url) {
            return Err(MediaError::auth_required("HTTP Error 403: Forbidden"));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_metadata(&self, url: &str) -> MediaResult<VideoMetadata> {
        self.check(format!("metadata {url}"), url)?;
        self.metadata
            .get(url)
            .cloned()
            .ok_or_else(|| MediaError::download_failed(format!("unknown url {url}")))
    }

    async fn download_audio(&self, url: &str, dest: &Path) -> MediaResult<()> {
        self.check(format!("audio {url}"), url)?;
        tokio::fs::write(dest, b"audio").await?;
        Ok(())
    }

    async fn download_video(&self, url: &str, dest: &Path) -> MediaResult<()> {
        self.check(format!("video {url}"), url)?;
        tokio::fs::write(dest, b"video").await?;
        Ok(())
    }

    async fn download_thumbnail(&self, thumbnail_url: &str, dest: &Path) -> MediaResult<()> {
        self.check(format!("thumbnail {thumbnail_url}"), thumbnail_url)?;
        tokio::fs::write(dest, b"jpeg").await?;
        Ok(())
    }
}

/// Records every ffmpeg invocation and writes its output file.
#[derive(Default)]
struct FakeToolkit {
    /// File-name substring to probed duration
    durations: Vec<(&'static str, f64)>,
    /// Fail any command whose output path contains this
    fail_output: Option<&'static str>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeToolkit {
    fn with_durations(durations: Vec<(&'static str, f64)>) -> Self {
        Self {
            durations,
            ..Default::default()
        }
    }

    fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    fn command_for(&self, output_suffix: &str) -> Option<Vec<String>> {
        self.commands()
            .into_iter()
            .find(|args| args.last().is_some_and(|out| out.ends_with(output_suffix)))
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe_duration(&self, path: &Path) -> f64 {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.durations
            .iter()
            .find(|(pattern, _)| name.contains(pattern))
            .map(|(_, secs)| *secs)
            .unwrap_or(0.0)
    }

    async fn run_ffmpeg(&self, command: &FfmpegCommand, _mode: ProgressMode) -> MediaResult<()> {
        self.commands.lock().unwrap().push(command.build_args());
        let output = command.output();
        if let Some(pattern) = self.fail_output {
            if output.to_string_lossy().contains(pattern) {
                return Err(MediaError::tool_failed(
                    "ffmpeg",
                    Some(1),
                    "Conversion failed!",
                    "",
                ));
            }
        }
        tokio::fs::write(output, b"rendered").await?;
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(layout: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("layout.json"), layout).unwrap();
        Self {
            dir,
            sink: Arc::new(RecordingSink::default()),
        }
    }

    fn config(&self) -> WorkerConfig {
        WorkerConfig::new(self.dir.path().join("res"), self.dir.path().join("data"), None)
            .with_cpu_count(4)
    }

    fn job(&self, videos: &[(&str, f64)], parts: i64, part_duration: f64) -> JobSpec {
        let urls: Vec<String> = videos.iter().map(|(url, _)| url.to_string()).collect();
        let speeds: Vec<f64> = videos.iter().map(|(_, speed)| *speed).collect();
        JobSpec {
            audio_url: SONG_URL.to_string(),
            videos: VideoTrack::from_sources(&urls, &speeds).unwrap(),
            requested_parts: parts,
            requested_part_duration: part_duration,
            layout_path: self.dir.path().join("layout.json"),
            output_dir: None,
            encoder: EncoderProfile::from_name("libx264"),
        }
    }

    fn pipeline(&self, fetcher: &Arc<FakeFetcher>, toolkit: &Arc<FakeToolkit>) -> Pipeline {
        Pipeline::new(
            self.config(),
            fetcher.clone(),
            toolkit.clone(),
            self.sink.clone(),
        )
    }

    fn scratch_dir(&self) -> PathBuf {
        self.config().scratch_dir
    }
}

#[tokio::test]
async fn test_two_part_job_emits_results_then_success() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 100.0),
        ("_video1.mp4", 120.0),
    ]));

    let outputs = assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 2, 0.0))
            .await
    );

    let output_dir = harness.config().output_dir;
    assert_eq!(
        outputs,
        vec![
            output_dir.join("My Song Live_Part_1.mp4"),
            output_dir.join("My Song Live_Part_2.mp4"),
        ]
    );
    assert!(outputs.iter().all(|p| p.is_file()));

    let sink = &harness.sink;
    assert_eq!(sink.count_prefix("RESULT:"), 2);
    let success = sink.position("LINK_SUCCESS").unwrap();
    let last_result = sink
        .lines()
        .iter()
        .rposition(|l| l.starts_with("RESULT:"))
        .unwrap();
    assert!(last_result < success);
    assert_eq!(
        sink.lines().last().unwrap(),
        "STATUS: Cleaning up temporary files..."
    );
    assert_eq!(sink.count_prefix("LINK_ERROR"), 0);
    assert!(!harness.scratch_dir().exists());

    // No retime or loop for a long enough video at normal speed
    assert!(toolkit.command_for("_speeded.mp4").is_none());
    assert!(toolkit.command_for("_looped.mp4").is_none());

    let part2 = toolkit.command_for("_Part_2.mp4").unwrap();
    let graph = &part2[part2.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert!(graph.contains("[0:v]trim=start=50:duration=50"));
    assert!(graph.contains("[2:a]atrim=start=50:duration=50"));
    assert!(graph.contains("text='Part 2'"));
}

#[tokio::test]
async fn test_muxed_download_is_stripped_and_removed() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 30.0),
        ("_video1.mp4", 30.0),
    ]));

    assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 1, 0.0))
            .await
    );

    let strip = toolkit.command_for("clip1_video1.mp4").unwrap();
    assert!(strip.iter().any(|a| a.ends_with("clip1_video1_raw.mp4")));
    assert!(strip.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
    assert!(strip.iter().any(|a| a == "-an"));

    assert_eq!(
        fetcher.calls(),
        vec![
            format!("metadata {SONG_URL}"),
            format!("audio {SONG_URL}"),
            "thumbnail https://img.example/song.jpg".to_string(),
            format!("metadata {CLIP1_URL}"),
            format!("video {CLIP1_URL}"),
        ]
    );
}

#[tokio::test]
async fn test_fetch_failure_reports_link_error_and_cleans_up() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new().failing_on(CLIP1_URL));
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![("_audio", 100.0)]));

    let err = assert_err!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 2, 0.0))
            .await
    );
    assert!(matches!(
        err,
        PipelineError::Fetch(MediaError::AuthRequired { .. })
    ));

    let sink = &harness.sink;
    assert!(sink
        .position("LINK_ERROR: Video requires cookies: HTTP Error 403: Forbidden")
        .is_some());
    assert_eq!(sink.count_prefix("PYTHON_ERROR:"), 1);
    assert_eq!(sink.count_prefix("RESULT:"), 0);
    assert_eq!(sink.count_prefix("LINK_SUCCESS"), 0);
    assert!(!harness.scratch_dir().exists());
    assert!(toolkit.commands().is_empty());
}

#[tokio::test]
async fn test_speed_and_loop_padding() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 100.0),
        ("_video1.mp4", 60.0),
    ]));

    assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 2.0)], 1, 0.0))
            .await
    );

    let retime = toolkit.command_for("clip1_video1_speeded.mp4").unwrap();
    assert!(retime
        .windows(2)
        .any(|w| w[0] == "-filter:v" && w[1] == "setpts=PTS/2"));
    assert!(retime.iter().any(|a| a == "-an"));

    // 60s at 2x lasts 30s; covering 100s takes 4 loops
    let looped = toolkit.command_for("clip1_video1_looped.mp4").unwrap();
    assert!(looped
        .windows(4)
        .any(|w| w[0] == "-stream_loop" && w[1] == "4" && w[2] == "-i" && w[3].ends_with("_speeded.mp4")));
    assert!(looped.windows(2).any(|w| w[0] == "-t" && w[1] == "100"));

    let render = toolkit.command_for("_Part_1.mp4").unwrap();
    assert!(render.iter().any(|a| a.ends_with("clip1_video1_looped.mp4")));
}

#[tokio::test]
async fn test_render_failure_stops_remaining_parts() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit {
        fail_output: Some("_Part_2.mp4"),
        ..FakeToolkit::with_durations(vec![("_audio", 90.0), ("_video1.mp4", 90.0)])
    });

    let err = assert_err!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 3, 0.0))
            .await
    );
    assert!(matches!(err, PipelineError::Render { part: 2, .. }));

    let sink = &harness.sink;
    assert_eq!(sink.count_prefix("RESULT:"), 1);
    assert_eq!(sink.count_prefix("LINK_ERROR: Render failed for part 2"), 1);
    assert!(toolkit.command_for("_Part_3.mp4").is_none());

    // Finished parts stay on disk
    let output_dir = harness.config().output_dir;
    assert!(output_dir.join("My Song Live_Part_1.mp4").is_file());
}

#[tokio::test]
async fn test_unknown_audio_duration_fails() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![("_video1.mp4", 60.0)]));

    let err = assert_err!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 1, 0.0))
            .await
    );
    assert!(matches!(err, PipelineError::Probe(_)));
    assert_eq!(
        harness
            .sink
            .count_prefix("WARNING: Could not read the duration of the audio"),
        1
    );
    let warning = harness
        .sink
        .position_prefix("WARNING: Could not read the duration")
        .unwrap();
    let failure = harness.sink.position_prefix("LINK_ERROR:").unwrap();
    assert!(warning < failure);
}

#[tokio::test]
async fn test_dual_video_binds_audio_after_both_tracks() {
    let harness = Harness::new(DUAL_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 40.0),
        ("_video1.mp4", 50.0),
        ("_video2.mp4", 45.0),
    ]));

    assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0), (CLIP2_URL, 1.0)], 1, 0.0))
            .await
    );

    let render = toolkit.command_for("_Part_1.mp4").unwrap();
    let graph = &render[render.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert!(graph.contains("[0:v]trim"));
    assert!(graph.contains("[1:v]trim"));
    assert!(graph.contains("[2:v]scale=600:338"));
    assert!(graph.contains("[3:a]atrim"));
}

#[tokio::test]
async fn test_inline_images_shift_audio_and_bad_ones_warn() {
    let layout = r#"[
        {"id": "video-placeholder", "type": "video", "zIndex": 1},
        {"id": "thumbnail-placeholder", "type": "thumbnail", "zIndex": 2},
        {"id": "logo", "type": "image", "zIndex": 3, "width": 64, "height": 64, "source": "data:image/png;base64,iVBORw0KGgo="},
        {"id": "broken", "type": "image", "zIndex": 4, "width": 32, "height": 32, "source": "data:image/png;base64,@@@"}
    ]"#;
    let harness = Harness::new(layout);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 20.0),
        ("_video1.mp4", 20.0),
    ]));

    assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 1, 0.0))
            .await
    );

    let render = toolkit.command_for("_Part_1.mp4").unwrap();
    assert!(render.iter().any(|a| a.ends_with("inline_2_logo.png")));
    let graph = &render[render.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert!(graph.contains("[2:v]scale=64:64"));
    assert!(graph.contains("[3:a]atrim"));
    assert!(!graph.contains("scale=32:32"));

    assert_eq!(harness.sink.count_prefix("WARNING: Failed to decode image broken"), 1);
    assert_eq!(harness.sink.count_prefix("LINK_SUCCESS"), 1);
}

#[tokio::test]
async fn test_invalid_part_count_fails_before_fetching() {
    let harness = Harness::new(SINGLE_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::default());

    let err = assert_err!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 0, 0.0))
            .await
    );
    assert!(matches!(err, PipelineError::InvalidJob(_)));
    assert!(err.is_startup_failure());
    assert!(fetcher.calls().is_empty());
    assert_eq!(harness.sink.count_prefix("LINK_ERROR: Invalid job"), 1);
}

#[tokio::test]
async fn test_missing_layout_is_a_config_error() {
    let harness = Harness::new(SINGLE_LAYOUT);
    std::fs::remove_file(harness.dir.path().join("layout.json")).unwrap();
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::default());

    let err = assert_err!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 1.0)], 1, 0.0))
            .await
    );
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_dual_tracks_are_retimed_and_looped_independently() {
    let harness = Harness::new(DUAL_LAYOUT);
    let fetcher = Arc::new(FakeFetcher::new());
    let toolkit = Arc::new(FakeToolkit::with_durations(vec![
        ("_audio", 100.0),
        ("_video1.mp4", 60.0),
        ("_video2.mp4", 20.0),
    ]));

    assert_ok!(
        harness
            .pipeline(&fetcher, &toolkit)
            .run(&harness.job(&[(CLIP1_URL, 2.0), (CLIP2_URL, 0.5)], 1, 0.0))
            .await
    );

    let retime1 = toolkit.command_for("clip1_video1_speeded.mp4").unwrap();
    assert!(retime1
        .windows(2)
        .any(|w| w[0] == "-filter:v" && w[1] == "setpts=PTS/2"));
    let retime2 = toolkit.command_for("clip2_video2_speeded.mp4").unwrap();
    assert!(retime2
        .windows(2)
        .any(|w| w[0] == "-filter:v" && w[1] == "setpts=PTS/0.5"));

    // Video 1 lasts 30s after retiming and needs 4 loops
    let looped1 = toolkit.command_for("clip1_video1_looped.mp4").unwrap();
    assert!(looped1.windows(4).any(|w| w[0] == "-stream_loop"
        && w[1] == "4"
        && w[2] == "-i"
        && w[3].ends_with("clip1_video1_speeded.mp4")));
    assert!(looped1.windows(2).any(|w| w[0] == "-t" && w[1] == "100"));

    // Video 2 lasts 40s after retiming and needs 3 loops
    let looped2 = toolkit.command_for("clip2_video2_looped.mp4").unwrap();
    assert!(looped2.windows(4).any(|w| w[0] == "-stream_loop"
        && w[1] == "3"
        && w[2] == "-i"
        && w[3].ends_with("clip2_video2_speeded.mp4")));
    assert!(looped2.windows(2).any(|w| w[0] == "-t" && w[1] == "100"));

    let render = toolkit.command_for("_Part_1.mp4").unwrap();
    let inputs: Vec<&String> = render
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| &w[1])
        .collect();
    assert!(inputs[0].ends_with("clip1_video1_looped.mp4"));
    assert!(inputs[1].ends_with("clip2_video2_looped.mp4"));
}

#[cfg(unix)]
mod with_tool_scripts {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use vshort_media::FfmpegToolkit;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_render_progress_lines() {
        let harness = Harness::new(SINGLE_LAYOUT);
        let bin = harness.dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        // Writes its last argument and reports half, then more than all, of a 10s part
        let ffmpeg = script(
            &bin,
            "ffmpeg",
            r#"for last; do :; done
: > "$last"
printf 'frame=1 time=00:00:05.00 bitrate=1k\r' >&2
printf 'frame=2 time=00:00:15.00 bitrate=1k\n' >&2"#,
        );
        let ffprobe = script(&bin, "ffprobe", r#"echo '{"format":{"duration":"10.0"}}'"#);

        let fetcher = Arc::new(FakeFetcher::new());
        let toolkit = Arc::new(FfmpegToolkit::new(&ffmpeg, &ffprobe, harness.sink.clone()));
        let pipeline = Pipeline::new(
            harness.config(),
            fetcher,
            toolkit,
            harness.sink.clone(),
        );

        assert_ok!(pipeline.run(&harness.job(&[(CLIP1_URL, 1.0)], 1, 0.0)).await);

        let progress: Vec<String> = harness
            .sink
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("PROGRESS:RENDER:"))
            .collect();
        assert_eq!(progress, vec!["PROGRESS:RENDER:50.00", "PROGRESS:RENDER:100.00"]);
        assert_eq!(harness.sink.count_prefix("LINK_SUCCESS"), 1);
    }
}
