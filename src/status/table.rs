//! Status Table Rendering

use colored::Colorize;

use super::client::JobStatus;

const HEADERS: [&str; 5] = ["Job", "Status", "Last Run", "Next Run", "Runtime"];

/// Renders jobs as a bordered text table.
///
/// With `colorize`, the status column is green for successful jobs and
/// red for failed ones.
pub fn render_table(jobs: &[JobStatus], colorize: bool) -> String {
    let rows: Vec<[String; 5]> = jobs.iter().map(format_row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let mut output = String::new();
    output.push_str(&separator);
    output.push('\n');
    output.push_str(&render_line(&HEADERS.map(str::to_string), &widths, false));
    output.push_str(&separator);
    output.push('\n');
    for row in &rows {
        output.push_str(&render_line(row, &widths, colorize));
    }
    output.push_str(&separator);
    output.push('\n');
    output
}

fn render_line(cells: &[String; 5], widths: &[usize; 5], colorize: bool) -> String {
    let mut line = String::from("|");
    for (index, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        let padded = format!(" {:<width$} ", cell, width = width);
        if colorize && index == 1 {
            line.push_str(&color_status(cell, &padded));
        } else {
            line.push_str(&padded);
        }
        line.push('|');
    }
    line.push('\n');
    line
}

fn color_status(status: &str, padded: &str) -> String {
    match status.to_ascii_lowercase().as_str() {
        "ok" | "finished" | "success" => padded.green().to_string(),
        "failed" | "error" => padded.red().to_string(),
        _ => padded.to_string(),
    }
}

fn format_row(job: &JobStatus) -> [String; 5] {
    [
        job.name.clone().unwrap_or_else(|| "Unknown".to_string()),
        job.status.clone().unwrap_or_else(|| "Unknown".to_string()),
        job.last_run.clone().unwrap_or_else(|| "Never".to_string()),
        job.next_run.clone().unwrap_or_else(|| "Unknown".to_string()),
        format_runtime(job.runtime.as_ref()),
    ]
}

fn format_runtime(runtime: Option<&serde_json::Value>) -> String {
    match runtime {
        Some(serde_json::Value::Number(number)) => format!("{}s", number),
        Some(serde_json::Value::String(text)) if !text.is_empty() => format!("{}s", text),
        _ => "N/A".to_string(),
    }
}
