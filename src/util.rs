pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// `m:ss` below an hour, `h:mm:ss` above
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Render an optional weight without trailing `.0`
pub fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(w) if w.fract() == 0.0 => format!("{w:.0}"),
        Some(w) => format!("{w:.1}"),
        None => "-".to_string(),
    }
}
