//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stepwright_e2e::{ScenarioResult, TestSuiteResult};
use stepwright_report::ScenarioStatus;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for ScenarioResult {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            status_cell(self.status),
            format!("{} ms", self.duration_ms),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

fn status_cell(status: ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Passed => format!("✅ {}", status),
        ScenarioStatus::Failed => format!("❌ {}", status),
        _ => format!("⚠️  {}", status),
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No scenarios ran.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print the suite summary: one row per scenario, then the totals
pub fn print_summary(suite: &TestSuiteResult, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_list(&suite.results, format);
            let line = format!(
                "{} passed, {} failed, {} broken, {} timed out, {} setup failed in {} ms",
                suite.passed,
                suite.failed,
                suite.broken,
                suite.timed_out,
                suite.setup_failed,
                suite.duration_ms
            );
            if suite.success() {
                print_success(&line);
            } else {
                print_error(&line);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(suite).unwrap_or_default());
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
