//! Live console report for runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::{ExecutionResult, RunObserver, RunSummary};
use crate::suite::TestCase;

/// Prints each case as it runs, with a progress bar for multi-case runs
pub struct ConsoleReporter {
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            progress: None,
        }
    }

    /// Print above the progress bar, if one is showing
    fn line(&self, text: String) {
        match &self.progress {
            Some(pb) => pb.suspend(|| println!("{}", text)),
            None => println!("{}", text),
        }
    }

    fn progress_bar(total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

impl RunObserver for ConsoleReporter {
    fn case_started(&mut self, case: &TestCase, position: usize, total: usize) {
        if total > 1 && self.progress.is_none() {
            self.progress = Some(Self::progress_bar(total));
        }
        match &self.progress {
            Some(pb) => pb.set_message(case.name.clone()),
            None => self.line(format!("  {} {}", "→".cyan(), case.name.dimmed())),
        }
    }

    fn case_finished(&mut self, result: &ExecutionResult) {
        let path = result
            .request_url
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|i| rest[i..].to_string()))
            .unwrap_or_else(|| result.request_url.clone());

        if result.passed() {
            self.line(format!(
                "  {} {} {}",
                "✓".green(),
                result.case_name,
                format!("({}ms · {})", result.duration_ms, path).dimmed()
            ));
        } else {
            self.line(format!(
                "  {} {} {}",
                "✗".red(),
                result.case_name.red(),
                format!("({}ms · {})", result.duration_ms, path).dimmed()
            ));
            if let Some(error) = &result.error {
                self.line(format!("      {}", error.red()));
            }
        }

        for outcome in &result.validation_results {
            if !outcome.pass {
                self.line(format!(
                    "      {} {} {}",
                    "✗".red(),
                    outcome.assertion,
                    format!("(actual: {})", outcome.actual).dimmed()
                ));
            } else if self.verbose {
                self.line(format!("      {} {}", "✓".green(), outcome.assertion));
            }
        }

        for snapshot in &result.snapshots {
            if let Some(error) = &snapshot.error {
                self.line(format!("      {} {}: {}", "◦".yellow(), snapshot.label, error));
            } else if self.verbose {
                self.line(format!("      {} {}", "◦".cyan(), snapshot.label));
            }
        }

        if self.verbose {
            if let Ok(body) = serde_json::to_string(&result.request_body) {
                self.line(format!("      {} {}", "request:".dimmed(), body));
            }
            if let Some(response) = &result.response_body {
                if let Ok(pretty) = serde_json::to_string_pretty(response) {
                    self.line(format!("      {}\n{}", "response:".dimmed(), pretty));
                }
            }
            if let Ok(state) = serde_json::to_string(&result.state_after) {
                self.line(format!("      {} {}", "state:".dimmed(), state));
            }
        }

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    fn notice(&mut self, case: &TestCase, message: &str) {
        self.line(format!(
            "  {} {}: {}",
            "!".yellow().bold(),
            case.name,
            message.yellow()
        ));
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }

        let elapsed = format!("{:.1}s", summary.elapsed_ms as f64 / 1000.0);
        if summary.stopped {
            println!(
                "\n{} {}\n",
                "◼".yellow().bold(),
                format!(
                    "Stopped after {} of {} cases: {} passed, {} failed ({})",
                    summary.executed, summary.total, summary.passed, summary.failed, elapsed
                )
                .yellow()
            );
        } else if summary.failed == 0 {
            println!(
                "\n{} {}\n",
                "✓".green().bold(),
                format!("All {} cases passed ({})", summary.executed, elapsed)
                    .green()
                    .bold()
            );
        } else {
            println!(
                "\n{} {}\n",
                "✗".red().bold(),
                format!(
                    "{} of {} cases failed, {} passed ({})",
                    summary.failed, summary.executed, summary.passed, elapsed
                )
                .red()
                .bold()
            );
        }
    }
}
