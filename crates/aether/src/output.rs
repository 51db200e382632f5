//! Output formatting utilities

use aether_lib::GaugeKind;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Width of the gauge bar in cells
const BAR_WIDTH: usize = 30;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat, empty: &str) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", empty.yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as GiB, the unit the memory gauge reports in
pub fn format_gib(bytes: u64) -> String {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    format!("{:.2} GiB", bytes as f64 / GIB)
}

/// Format a percentage reading
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Render a horizontal gauge bar, e.g. `[######........]`
pub fn gauge_bar(percent: f64) -> String {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled)
    );

    let colored = if clamped >= 85.0 {
        bar.red()
    } else if clamped >= 60.0 {
        bar.yellow()
    } else {
        bar.green()
    };
    format!("[{}]", colored)
}

/// One gauge line: label, bar and reading
pub fn gauge_line(gauge: GaugeKind, percent: f64) -> String {
    format!(
        "{:>3} {} {:>6}",
        gauge.to_string().bold(),
        gauge_bar(percent),
        format_percent(percent)
    )
}

/// Color a predicted value against its threshold
pub fn color_prediction(value: f64, threshold: f64) -> String {
    let formatted = format!("{:.2}", value);
    if value > threshold {
        formatted.red().bold().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color a component status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gib() {
        assert_eq!(format_gib(0), "0.00 GiB");
        assert_eq!(format_gib(8 * 1024 * 1024 * 1024), "8.00 GiB");
        assert_eq!(format_gib(1536 * 1024 * 1024), "1.50 GiB");
    }

    #[test]
    fn test_gauge_bar_fill() {
        colored::control::set_override(false);
        assert_eq!(gauge_bar(0.0), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(gauge_bar(100.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(gauge_bar(50.0).matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn test_gauge_bar_clamps_out_of_range() {
        colored::control::set_override(false);
        assert_eq!(gauge_bar(150.0), gauge_bar(100.0));
        assert_eq!(gauge_bar(-3.0), gauge_bar(0.0));
        assert_eq!(gauge_bar(f64::NAN), gauge_bar(0.0));
    }
}
