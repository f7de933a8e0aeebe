use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Terminal progress for one run: a bar counting finished phases and a
/// spinner per phase in flight. Every method is a no-op when disabled.
pub struct ProgressMonitor {
    bars: Option<Bars>,
}

struct Bars {
    multi: MultiProgress,
    overall: ProgressBar,
    running: HashMap<String, ProgressBar>,
    total_waves: Option<usize>,
}

impl ProgressMonitor {
    /// `enabled` is false for jsonl output, so nothing interleaves with events.
    pub fn new(total_phases: usize, enabled: bool) -> Self {
        if !enabled {
            return Self { bars: None };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_phases as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} phases {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("planning");

        Self {
            bars: Some(Bars {
                multi,
                overall,
                running: HashMap::new(),
                total_waves: None,
            }),
        }
    }

    /// Number of waves a successful run launches, shown as "wave n/m".
    pub fn with_expected_waves(mut self, waves: usize) -> Self {
        if let Some(bars) = self.bars.as_mut() {
            bars.total_waves = Some(waves);
        }
        self
    }

    pub fn start_phase(&mut self, phase: &str) {
        let Some(bars) = self.bars.as_mut() else {
            return;
        };

        let spinner = bars.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            spinner.set_style(style.tick_strings(SPINNER_TICKS));
        }
        spinner.set_message(format!("⏳ {phase}"));
        spinner.enable_steady_tick(Duration::from_millis(100));
        bars.running.insert(phase.to_string(), spinner);
    }

    pub fn complete_phase(&mut self, phase: &str, success: bool, duration_ms: u64) {
        let Some(bars) = self.bars.as_mut() else {
            return;
        };

        if let Some(spinner) = bars.running.remove(phase) {
            let mark = if success { "✅" } else { "❌" };
            spinner.finish_with_message(format!("{mark} {phase} ({duration_ms}ms)"));
        }
        bars.overall.inc(1);
    }

    pub fn update_wave(&self, wave_id: usize) {
        if let Some(bars) = &self.bars {
            let label = match bars.total_waves {
                Some(total) => format!("wave {}/{}", wave_id + 1, total),
                None => format!("wave {}", wave_id + 1),
            };
            bars.overall.set_message(label);
        }
    }

    pub fn finish(&self, success: bool) {
        if let Some(bars) = &self.bars {
            let msg = if success { "✅ done" } else { "❌ stopped" };
            bars.overall.finish_with_message(msg);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bars.is_some()
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        if let Some(bars) = self.bars.as_mut() {
            for (_, spinner) in bars.running.drain() {
                spinner.finish_and_clear();
            }
        }
    }
}
