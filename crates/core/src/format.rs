use crate::{
    stats::{DailyViewsReport, UploadPattern, WEEKDAY_LABELS},
    types::VideoRecord,
};

const PREVIEW_CHARS: usize = 80;

/// Format a count with thousands separators, e.g. `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// First line of `text`, cut to `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max).collect();
    format!("{cut}…")
}

/// One-line listing entry, numbered from 1.
pub fn format_record_line(position: usize, record: &VideoRecord) -> String {
    let published = match record.published_display() {
        date if date.is_empty() => "date unknown".to_string(),
        date => date,
    };
    format!(
        "{:>3}. [{}] {} ({} views, {})",
        position,
        record.channel_name,
        record.title,
        format_count(record.view_count),
        published
    )
}

pub fn format_record_readable(record: &VideoRecord) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", record.title));
    output.push_str(&format!(
        "**Channel:** {} | **Views:** {} | **Published:** {}\n\n",
        record.channel_name,
        format_count(record.view_count),
        record.published_display()
    ));
    output.push_str(&format!("{}\n\n", record.url()));

    output.push_str("## Description\n\n");
    output.push_str(&record.description);
    output.push_str("\n\n");

    output.push_str("## Transcript\n\n");
    output.push_str(&record.transcript.render());
    output.push_str("\n\n");

    output.push_str("## Comments\n\n");
    for comment in record.comments.render().lines() {
        output.push_str(&format!("• {}\n", comment));
    }
    output.push('\n');

    output
}

/// Markdown document with every record in full.
pub fn records_to_markdown<'a>(
    heading: &str,
    records: impl IntoIterator<Item = &'a VideoRecord>,
) -> String {
    let mut output = format!("# {heading}\n\n");
    for record in records {
        output.push_str("---\n\n");
        // Demote record headings under the document heading.
        for line in format_record_readable(record).lines() {
            if line.starts_with('#') {
                output.push('#');
            }
            output.push_str(line);
            output.push('\n');
        }
    }
    output
}

/// Compact listing with transcript previews, as shown by `plotline list`.
pub fn format_listing<'a>(records: impl IntoIterator<Item = &'a VideoRecord>) -> String {
    let mut output = String::new();
    for (i, record) in records.into_iter().enumerate() {
        output.push_str(&format_record_line(i + 1, record));
        output.push('\n');
        output.push_str(&format!(
            "       {}\n",
            preview(&record.transcript.render(), PREVIEW_CHARS)
        ));
    }
    output
}

pub fn format_daily_views(report: &DailyViewsReport) -> String {
    let mut output = String::new();
    output.push_str("## Daily views by channel\n\n");
    for channel in &report.channels {
        output.push_str(&format!(
            "{:>12}  {} ({} videos)\n",
            format_count(channel.daily_views),
            channel.channel_name,
            channel.videos
        ));
    }
    output.push_str(&format!("\nTotal: {}\n", format_count(report.total)));
    output
}

pub fn format_upload_pattern(channel_title: &str, pattern: &UploadPattern) -> String {
    let mut output = format!(
        "## Upload times of {} ({} videos, KST)\n\n",
        channel_title, pattern.total
    );
    let scale = pattern.weekday.iter().chain(&pattern.hourly).max().copied().unwrap_or(0);

    output.push_str("### By weekday\n\n");
    for (label, count) in WEEKDAY_LABELS.iter().zip(pattern.weekday) {
        output.push_str(&format!("{label}  {}\n", bar(count, scale)));
    }

    output.push_str("\n### By hour\n\n");
    for (hour, count) in pattern.hourly.iter().enumerate() {
        output.push_str(&format!("{hour:02}h  {}\n", bar(*count, scale)));
    }
    output
}

fn bar(count: usize, scale: usize) -> String {
    const WIDTH: usize = 30;
    let filled = if scale == 0 { 0 } else { count * WIDTH / scale };
    format!("{:<width$} {count}", "█".repeat(filled), width = WIDTH)
}
