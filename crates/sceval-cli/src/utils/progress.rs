use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use sceval::engine::progress::{Progress, ProgressCallback};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders workflow progress events on a single stderr bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
    skipped: Arc<AtomicUsize>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(spinner_style())
            .with_message("Initializing...");
        bar.finish_and_clear();

        Self {
            bar: Arc::new(Mutex::new(bar)),
            skipped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Candidates reported as skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = Arc::clone(&self.bar);
        let skipped = Arc::clone(&self.skipped);

        Box::new(move |event: Progress| {
            if matches!(event, Progress::CandidateSkipped { .. }) {
                skipped.fetch_add(1, Ordering::Relaxed);
            }
            match bar.lock() {
                Ok(bar) => render(&bar, event),
                Err(_) => warn!("Progress bar mutex was poisoned. Cannot update progress."),
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn render(bar: &ProgressBar, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            bar.reset();
            bar.set_length(0);
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            bar.set_message(name);
        }
        Progress::PhaseFinish => {
            bar.disable_steady_tick();
            bar.finish_with_message("✓ Done");
        }
        Progress::TaskStart { total_steps } => {
            bar.disable_steady_tick();
            bar.reset();
            bar.set_length(total_steps);
            bar.set_style(bar_style());
        }
        Progress::TaskIncrement => bar.inc(1),
        Progress::TaskFinish => {
            if let Some(length) = bar.length() {
                bar.set_position(length);
            }
            bar.finish();
        }
        Progress::CandidateStart { name } => bar.set_message(name),
        Progress::CandidateSkipped { name, reason } => {
            bar.println(format!("  ⚠ Skipped {name}: {reason}"));
        }
        Progress::Message(msg) if bar.is_finished() => bar.set_message(msg),
        Progress::Message(msg) => bar.println(format!("  {msg}")),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("##-")
}
