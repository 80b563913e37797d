//! Progress bars and summary reporting for CLI uploads.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::format::{format_duration, format_size, format_speed};
use crate::progress::{ProgressSink, Snapshot};
use crate::task::TaskId;

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar for a single upload. The length is set from the
/// first progress snapshot (a resumed attempt sends fewer bytes than the
/// file holds).
pub fn make_progress_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {prefix} - {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar.set_prefix(name.to_string());
    bar
}

/// Renders engine events as indicatif progress bars and keeps the counters
/// the post-run summary needs.
pub struct CliSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
    names: Mutex<HashMap<TaskId, String>>,
    reasons: Mutex<HashMap<TaskId, Option<String>>>,
    completed: AtomicUsize,
}

impl Default for CliSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CliSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            reasons: Mutex::new(HashMap::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// Number of uploads that completed.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Last failure reason recorded for a task, if any.
    #[must_use]
    pub fn reason_for(&self, id: TaskId) -> Option<String> {
        self.reasons.lock().unwrap().get(&id).cloned().flatten()
    }

    fn name_for(&self, id: TaskId) -> String {
        self.names
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("#{id}"))
    }
}

impl ProgressSink for CliSink {
    fn on_task_queued(&self, id: TaskId, path: &str) {
        self.names.lock().unwrap().insert(id, path.to_string());
    }

    fn on_task_started(&self, id: TaskId, path: &str) {
        self.names.lock().unwrap().insert(id, path.to_string());
        let bar = self.multi.add(make_progress_bar(path));
        bar.enable_steady_tick(Duration::from_millis(250));
        self.bars.lock().unwrap().insert(id, bar);
    }

    fn on_progress(&self, id: TaskId, snapshot: &Snapshot) {
        if let Some(bar) = self.bars.lock().unwrap().get(&id) {
            bar.set_length(snapshot.total);
            bar.set_position(snapshot.sent);
            bar.set_message(snapshot.status_line());
        }
    }

    fn on_task_completed(&self, id: TaskId) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(bar) = self.bars.lock().unwrap().remove(&id) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!("  ✓ {}", self.name_for(id)));
    }

    fn on_task_failed(&self, id: TaskId, reason: Option<&str>) {
        self.reasons
            .lock()
            .unwrap()
            .insert(id, reason.map(String::from));
        if let Some(bar) = self.bars.lock().unwrap().remove(&id) {
            bar.finish_and_clear();
        }
        let _ = self.multi.println(format!(
            "  ✗ {} ({})",
            self.name_for(id),
            reason.unwrap_or("aborted")
        ));
    }
}

/// Prints the list of files about to be uploaded.
pub fn print_file_list(files: &[(&str, u64)], total: u64) {
    println!("\n{SEPARATOR}");
    println!("Files to upload:");
    println!("{SEPARATOR}");
    for (path, size) in files {
        println!("  {path} ({})", format_size(*size));
    }
    println!("{SEPARATOR}");
    println!("  {} file(s), {} total", files.len(), format_size(total));
    println!("{SEPARATOR}\n");
}

/// Prints a summary of the upload session.
#[allow(clippy::cast_precision_loss)]
pub fn print_summary(
    uploaded: usize,
    failed: &[(String, Option<String>)],
    total_bytes: u64,
    elapsed: Duration,
) {
    println!("\n{SEPARATOR}");
    println!("Upload Summary");
    println!("{SEPARATOR}");
    println!("  Files uploaded:    {uploaded}");
    println!("  Total size:        {}", format_size(total_bytes));
    println!("  Total time:        {}", format_duration(elapsed));
    let secs = elapsed.as_secs_f64();
    if uploaded > 0 && secs > 0.0 {
        println!(
            "  Average speed:     {}",
            format_speed(total_bytes as f64 / secs)
        );
    }
    if !failed.is_empty() {
        println!("  Failed:            {}", failed.len());
        for (path, reason) in failed {
            println!("    ✗ {path} ({})", reason.as_deref().unwrap_or("aborted"));
        }
    }
    println!("{SEPARATOR}");
}
