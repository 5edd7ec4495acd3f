use std::sync::Arc;
use std::time::Instant;

use relaydrop_telemetry::LoadMonitor;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::sink::{ChatRef, MessageRef, NotificationSink};
use crate::status::{Phase, TransferStatus};

/// Lower bound for the sampling interval and the ETA divisor, in seconds.
const EPSILON: f64 = 1e-6;

/// Number of segments in the rendered progress bar.
const BAR_SEGMENTS: usize = 20;

/// Longest file name shown before truncation.
const NAME_DISPLAY_LIMIT: usize = 30;

// ---------------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------------

/// Derived progress figures for one reporting tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    pub file_name: String,
    pub completed_bytes: u64,
    pub total_bytes: u64,
    /// 0.0–1.0, or 0.0 while the size is unknown.
    pub fraction: f64,
    /// Bytes per second since the previous sample.
    pub bytes_per_second: f64,
    pub eta_secs: f64,
}

impl ProgressSnapshot {
    /// Computes a snapshot and moves the status's sampling point to `now`.
    ///
    /// Speed is the rate over the interval since the previous call, not a
    /// running average.
    pub fn sample(status: &mut TransferStatus, now: Instant) -> Self {
        let (last_at, last_bytes) = status.last_sample();
        let elapsed = now
            .saturating_duration_since(last_at)
            .as_secs_f64()
            .max(EPSILON);

        let completed = status.completed_bytes();
        let total = status.file_size();
        let bytes_per_second = completed.saturating_sub(last_bytes) as f64 / elapsed;
        status.record_sample(now);

        let fraction = if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        };
        let eta_secs = total.saturating_sub(completed) as f64 / (bytes_per_second + EPSILON);

        Self {
            phase: status.phase(),
            file_name: status.file_name.clone(),
            completed_bytes: completed,
            total_bytes: total,
            fraction,
            bytes_per_second,
            eta_secs,
        }
    }

    /// Renders the multi-line status text. `aux` is the phase-specific line.
    pub fn render(&self, aux: &str) -> String {
        let title = match self.phase {
            Phase::Downloading => "╭────── DOWNLOADING ──────〄",
            Phase::Uploading => "╭────── UPLOADING ──────〄",
        };

        format!(
            "{title}\n│\n├ File: {name}\n├ Size: {current} / {total}\n│\n\
             ├ Progress: {percent:.2}%\n│\n├ Speed: {speed}/s\n│\n├ ETA: {eta}\n│\n\
             ├ {aux}\n│\n╰─[{bar}]",
            name = display_name(&self.file_name),
            current = format_bytes(self.completed_bytes),
            total = format_bytes(self.total_bytes),
            percent = self.fraction * 100.0,
            speed = format_bytes(self.bytes_per_second as u64),
            eta = format_eta(self.eta_secs),
            bar = render_bar(self.fraction),
        )
    }
}

fn display_name(name: &str) -> String {
    if name.chars().count() > NAME_DISPLAY_LIMIT {
        let head: String = name.chars().take(NAME_DISPLAY_LIMIT).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Formats a byte count with 1024-based units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} TB")
}

/// Formats an ETA as `"42s"`, or `"3m 5s"` from one minute up.
pub fn format_eta(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let whole = secs as u64;
    if secs < 60.0 {
        format!("{whole}s")
    } else {
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

/// Renders a fixed-width bar proportional to `fraction`.
pub fn render_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * BAR_SEGMENTS as f64) as usize;
    let mut bar = "▩".repeat(filled);
    bar.push_str(&"□".repeat(BAR_SEGMENTS - filled));
    bar
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

/// Publishes rendered progress for one job.
///
/// Rendering happens inline in [`report`](Self::report); delivery runs on a
/// background task fed through a latest-value channel, so a slow or failing
/// sink never stalls the byte-copy loop. Intermediate updates the sink has
/// not picked up yet are coalesced.
pub struct ProgressReporter {
    updates: watch::Sender<Option<String>>,
    delivery: JoinHandle<()>,
    load: Arc<LoadMonitor>,
    engine_label: String,
}

impl ProgressReporter {
    /// Starts the delivery task editing `message` in `chat`.
    pub fn spawn(
        sink: Arc<dyn NotificationSink>,
        chat: ChatRef,
        message: MessageRef,
        load: Arc<LoadMonitor>,
        engine_label: impl Into<String>,
    ) -> Self {
        let (updates, rx) = watch::channel(None);
        let delivery = tokio::spawn(deliver(sink, chat, message, rx));
        Self {
            updates,
            delivery,
            load,
            engine_label: engine_label.into(),
        }
    }

    /// Samples `status`, renders it and queues the text for delivery.
    pub fn report(&self, status: &mut TransferStatus) -> ProgressSnapshot {
        let snapshot = ProgressSnapshot::sample(status, Instant::now());
        let aux = match snapshot.phase {
            Phase::Downloading => self.load.sample().to_string(),
            Phase::Uploading => format!("Engine: {}", self.engine_label),
        };

        trace!(
            phase = ?snapshot.phase,
            completed = snapshot.completed_bytes,
            total = snapshot.total_bytes,
            "progress"
        );
        self.updates.send_replace(Some(snapshot.render(&aux)));
        snapshot
    }

    /// Flushes the last queued update and stops the delivery task.
    pub async fn finish(self) {
        let Self {
            updates, delivery, ..
        } = self;
        drop(updates);
        if let Err(e) = delivery.await {
            warn!(error = %e, "progress delivery task failed");
        }
    }
}

async fn deliver(
    sink: Arc<dyn NotificationSink>,
    chat: ChatRef,
    message: MessageRef,
    mut rx: watch::Receiver<Option<String>>,
) {
    // `changed` still yields a value sent just before the sender dropped.
    while rx.changed().await.is_ok() {
        let Some(text) = rx.borrow_and_update().clone() else {
            continue;
        };
        if let Err(e) = sink.edit_message(&chat, &message, &text).await {
            debug!(chat = %chat, message = %message, error = %e, "progress edit dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{BoxFuture, NotifyError};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingSink {
        edits: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                edits: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl NotificationSink for RecordingSink {
        fn send_message(
            &self,
            _chat: &ChatRef,
            _text: &str,
        ) -> BoxFuture<'_, Result<MessageRef, NotifyError>> {
            Box::pin(async { Ok(MessageRef("m".into())) })
        }

        fn edit_message(
            &self,
            _chat: &ChatRef,
            _message: &MessageRef,
            text: &str,
        ) -> BoxFuture<'_, Result<(), NotifyError>> {
            self.edits.lock().unwrap().push(text.to_string());
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(NotifyError::MessageNotFound("m".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn status() -> TransferStatus {
        let mut s = TransferStatus::new(ChatRef("c".into()), MessageRef("m".into()));
        s.file_name = "video.mp4".into();
        s
    }

    #[test]
    fn format_bytes_examples() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
        assert_eq!(format_bytes(5 * 1024u64.pow(4)), "5.00 TB");
    }

    #[test]
    fn format_eta_seconds_and_minutes() {
        assert_eq!(format_eta(0.0), "0s");
        assert_eq!(format_eta(42.9), "42s");
        assert_eq!(format_eta(60.0), "1m 0s");
        assert_eq!(format_eta(185.0), "3m 5s");
        assert_eq!(format_eta(f64::NAN), "0s");
    }

    #[test]
    fn bar_is_always_twenty_segments() {
        for fraction in [0.0, 0.04, 0.5, 0.99, 1.0, 1.7, -0.3] {
            assert_eq!(render_bar(fraction).chars().count(), 20);
        }
        assert_eq!(render_bar(0.5).matches('▩').count(), 10);
        assert_eq!(render_bar(1.0).matches('□').count(), 0);
    }

    #[test]
    fn sample_computes_interval_speed() {
        let mut s = status();
        s.set_file_size(10_240);
        s.advance_to(2048);
        let (start, _) = s.last_sample();

        let snap = ProgressSnapshot::sample(&mut s, start + Duration::from_secs(2));
        assert!((snap.bytes_per_second - 1024.0).abs() < 1e-3);
        assert!((snap.fraction - 0.2).abs() < 1e-9);
        assert!((snap.eta_secs - 8.0).abs() < 1e-3);
        assert_eq!(s.last_sample(), (start + Duration::from_secs(2), 2048));

        // Next interval only counts the new bytes.
        s.advance_to(3072);
        let snap = ProgressSnapshot::sample(&mut s, start + Duration::from_secs(3));
        assert!((snap.bytes_per_second - 1024.0).abs() < 1e-3);
    }

    #[test]
    fn sample_with_unknown_size() {
        let mut s = status();
        s.advance_to(500);
        let (start, _) = s.last_sample();
        let snap = ProgressSnapshot::sample(&mut s, start);
        assert_eq!(snap.fraction, 0.0);
        assert!(snap.bytes_per_second > 0.0);
    }

    #[test]
    fn render_contains_phase_and_sizes() {
        let mut s = status();
        s.set_file_size(2048);
        s.advance_to(1024);
        let (start, _) = s.last_sample();
        let text = ProgressSnapshot::sample(&mut s, start + Duration::from_secs(1))
            .render("CPU: 1.0% | RAM: 2.0%");

        assert!(text.starts_with("╭────── DOWNLOADING"));
        assert!(text.contains("File: video.mp4\n"));
        assert!(text.contains("Size: 1.00 KB / 2.00 KB"));
        assert!(text.contains("Progress: 50.00%"));
        assert!(text.contains("CPU: 1.0% | RAM: 2.0%"));
    }

    #[test]
    fn render_truncates_long_names() {
        let mut s = status();
        s.file_name = "a".repeat(45);
        let (start, _) = s.last_sample();
        let text = ProgressSnapshot::sample(&mut s, start).render("x");
        assert!(text.contains(&format!("File: {}...", "a".repeat(30))));
    }

    #[tokio::test]
    async fn reporter_delivers_latest_update() {
        let sink = RecordingSink::new(false);
        let reporter = ProgressReporter::spawn(
            sink.clone(),
            ChatRef("c".into()),
            MessageRef("m".into()),
            Arc::new(LoadMonitor::new()),
            "relaydrop",
        );

        let mut s = status();
        s.set_file_size(100);
        s.advance_to(30);
        reporter.report(&mut s);
        s.advance_to(100);
        reporter.report(&mut s);
        s.begin_upload(100).unwrap();
        s.advance_to(100);
        let last = reporter.report(&mut s);
        reporter.finish().await;

        let edits = sink.edits.lock().unwrap();
        assert!(!edits.is_empty());
        let final_text = edits.last().unwrap();
        assert_eq!(last.phase, Phase::Uploading);
        assert!(final_text.contains("UPLOADING"));
        assert!(final_text.contains("Engine: relaydrop"));
        assert!(final_text.contains("Progress: 100.00%"));
    }

    #[tokio::test]
    async fn reporter_swallows_sink_failures() {
        let sink = RecordingSink::new(true);
        let reporter = ProgressReporter::spawn(
            sink.clone(),
            ChatRef("c".into()),
            MessageRef("m".into()),
            Arc::new(LoadMonitor::new()),
            "relaydrop",
        );

        let mut s = status();
        s.advance_to(10);
        reporter.report(&mut s);
        reporter.finish().await;

        assert_eq!(sink.edits.lock().unwrap().len(), 1);
    }
}
