//! Rendering of records for the terminal.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};

use crate::error::Result;
use crate::intervals::Interval;
use crate::model::{Contraction, Hospital};
use crate::stopwatch::format_signed_hms;

use super::OutputFormat;

fn local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn duration_label(contraction: &Contraction) -> String {
    match contraction.duration_seconds {
        Some(seconds) => format_signed_hms(seconds),
        None => "in progress".to_string(),
    }
}

/// Render contractions.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn contractions(list: &[Contraction], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(list)?);
    }
    if list.is_empty() {
        return Ok("No contractions recorded.".to_string());
    }

    let mut out = String::new();
    if format == OutputFormat::Table {
        let _ = writeln!(
            out,
            "{:>6}  {:<19}  {:<19}  {:>11}",
            "ID", "START", "END", "DURATION"
        );
    }
    for c in list {
        let end = c.end_time.map_or_else(|| "-".to_string(), local);
        let _ = match format {
            OutputFormat::Table => writeln!(
                out,
                "{:>6}  {:<19}  {:<19}  {:>11}",
                c.id,
                local(c.start_time),
                end,
                duration_label(c)
            ),
            _ => writeln!(
                out,
                "#{} {} ({})",
                c.id,
                local(c.start_time),
                duration_label(c)
            ),
        };
    }
    Ok(out.trim_end().to_string())
}

/// Render intervals, oldest first.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn intervals(list: &[Interval], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(list)?);
    }
    if list.is_empty() {
        return Ok("No intervals yet.".to_string());
    }

    let mut out = String::new();
    if format == OutputFormat::Table {
        let _ = writeln!(out, "{:<19}  {:<19}  {:>7}", "FROM", "TO", "MINUTES");
    }
    for interval in list {
        let _ = match format {
            OutputFormat::Table => writeln!(
                out,
                "{:<19}  {:<19}  {:>7}",
                local(interval.from),
                local(interval.to),
                interval.minutes
            ),
            _ => writeln!(
                out,
                "{} min (until {})",
                interval.minutes,
                local(interval.to)
            ),
        };
    }
    Ok(out.trim_end().to_string())
}

/// Render hospitals.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn hospitals(list: &[Hospital], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(list)?);
    }
    if list.is_empty() {
        return Ok("No hospitals saved.".to_string());
    }

    let mut out = String::new();
    if format == OutputFormat::Table {
        let _ = writeln!(
            out,
            "{:>6}  {:<1}  {:<30}  {:<16}  ADDRESS",
            "ID", "*", "NAME", "PHONE"
        );
    }
    for h in list {
        let marker = if h.is_primary { "*" } else { " " };
        let _ = match format {
            OutputFormat::Table => writeln!(
                out,
                "{:>6}  {:<1}  {:<30}  {:<16}  {}",
                h.id,
                marker,
                h.name,
                h.phone_number,
                h.address.as_deref().unwrap_or("")
            ),
            _ => {
                let mut line =
                    format!("#{} {}{} {}", h.id, h.name, primary_tag(h), h.phone_number);
                if let Some(address) = &h.address {
                    let _ = write!(line, ", {address}");
                }
                writeln!(out, "{line}")
            }
        };
        if format == OutputFormat::Plain {
            if let Some(notes) = &h.notes {
                let _ = writeln!(out, "    {notes}");
            }
        }
    }
    Ok(out.trim_end().to_string())
}

fn primary_tag(hospital: &Hospital) -> &'static str {
    if hospital.is_primary {
        " (primary)"
    } else {
        ""
    }
}
