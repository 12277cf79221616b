//! Terminal output helpers

use chrono::{DateTime, NaiveDateTime, Utc};
use colored::{Color, Colorize};
use serde::Serialize;

use crate::deploy::upload::UploadProgress;
use crate::errors::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn heading(text: &str) {
    println!("{}", text.bright_blue());
}

pub fn success(text: &str) {
    println!("{}", text.bright_green());
}

pub fn notice(text: &str) {
    println!("{}", text.bright_yellow());
}

/// `-` for absent or empty values
pub fn or_dash(value: Option<impl AsRef<str>>) -> String {
    value
        .map(|v| v.as_ref().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

/// Backend timestamp in UTC, or the raw value when it does not parse
///
/// Naive timestamps are taken as UTC.
pub fn timestamp(value: Option<impl AsRef<str>>) -> String {
    let Some(raw) = value
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return "-".to_string();
    };
    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
        });
    match parsed {
        Ok(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => raw,
    }
}

/// Color of a deployment or application status in listings
pub fn listing_color(status: &str) -> Option<Color> {
    match status.trim().to_lowercase().as_str() {
        "validation in progress" | "deployment in progress" => Some(Color::Cyan),
        "deployed" => Some(Color::Green),
        "deployment failed" => Some(Color::Red),
        "partially successful" => Some(Color::Yellow),
        "deployment canceled" => Some(Color::Magenta),
        _ => None,
    }
}

/// Pad a cell to `width`, then color it
///
/// Padding happens before coloring so escape codes do not count toward
/// the width.
fn cell(text: &str, width: usize, color: Option<Color>) -> String {
    let padded = format!("{:width$}", text, width = width);
    match color {
        Some(color) => padded.color(color).to_string(),
        None => padded,
    }
}

/// Print an aligned table; `status_column` cells are colored by status
pub fn print_table(headers: &[&str], rows: &[Vec<String>], status_column: Option<usize>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    println!();
    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:width$}", h, width = *w))
        .collect();
    println!("{}", header.join("  ").bright_blue());
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", separator.join("  ").blue());

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let width = widths.get(i).copied().unwrap_or(0);
                let color = if Some(i) == status_column {
                    listing_color(value)
                } else {
                    None
                };
                cell(value, width, color)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
    println!();
}

/// One line per finished upload
pub fn upload_line(progress: &UploadProgress) -> String {
    let counter = format!("[{}/{}]", progress.completed, progress.total);
    match &progress.error {
        None => format!("✓ {} {}/{}", counter, progress.service, progress.file)
            .green()
            .to_string(),
        Some(error) => format!(
            "✗ {} {}/{}: {}",
            counter, progress.service, progress.file, error
        )
        .red()
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None::<&str>), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("1.0.0")), "1.0.0");
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(Some("2025-01-01T10:00:00+02:00")), "2025-01-01 08:00:00 UTC");
        assert_eq!(timestamp(Some("2025-03-04T05:06:07.123456")), "2025-03-04 05:06:07 UTC");
        assert_eq!(timestamp(Some("yesterday")), "yesterday");
        assert_eq!(timestamp(None::<&str>), "-");
    }

    #[test]
    fn test_listing_color() {
        assert_eq!(listing_color("Deployed"), Some(Color::Green));
        assert_eq!(listing_color(" deployment in progress "), Some(Color::Cyan));
        assert_eq!(listing_color("Deployment Canceled"), Some(Color::Magenta));
        assert_eq!(listing_color("unknown"), None);
    }

    #[test]
    fn test_upload_line() {
        colored::control::set_override(false);
        let mut progress = UploadProgress {
            completed: 2,
            total: 3,
            service: "iam".to_string(),
            file: "iam.json".to_string(),
            error: None,
        };
        assert_eq!(upload_line(&progress), "✓ [2/3] iam/iam.json");

        progress.error = Some("presign failed".to_string());
        assert_eq!(upload_line(&progress), "✗ [2/3] iam/iam.json: presign failed");
    }
}
