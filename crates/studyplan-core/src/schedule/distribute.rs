//! Topic distribution across the days of a plan.
//!
//! Pure and deterministic: identical inputs always yield identical day
//! assignments and titles.

/// Fallback topic when the caller supplies nothing usable.
pub const PLACEHOLDER_TOPIC: &str = "General Study";

/// Parse a free-text topic string (comma or newline separated) into a
/// non-empty ordered list of trimmed names.
///
/// Blank entries are dropped; an entirely blank input yields the single
/// placeholder topic.
pub fn parse_topics(raw: &str) -> Vec<String> {
    let topics: Vec<String> = raw
        .split([',', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect();

    if topics.is_empty() {
        vec![PLACEHOLDER_TOPIC.to_owned()]
    } else {
        topics
    }
}

/// Topics assigned to day `day_index` of a `total_days`-day plan.
///
/// With more topics than days, each day takes the slice
/// `[i*T/total_days, (i+1)*T/total_days)` so the whole list is covered;
/// a slice emptied by integer rounding falls back to the single topic at
/// `i % T`. With at least as many days as topics, each day takes exactly
/// `topics[i % T]`, cycling the list as revision once it is exhausted.
pub fn topics_for_day(topics: &[String], day_index: usize, total_days: usize) -> Vec<&str> {
    debug_assert!(!topics.is_empty());
    debug_assert!(day_index < total_days);

    let t = topics.len();
    if t > total_days {
        let start = day_index * t / total_days;
        let end = (day_index + 1) * t / total_days;
        if start < end {
            return topics[start..end].iter().map(String::as_str).collect();
        }
    }
    vec![topics[day_index % t].as_str()]
}

/// Title for the task on day `day_index`: topic names joined with
/// `" & "`, prefixed with `"Study "`.
pub fn day_title(topics: &[String], day_index: usize, total_days: usize) -> String {
    let names = topics_for_day(topics, day_index, total_days);
    format!("Study {}", names.join(" & "))
}
