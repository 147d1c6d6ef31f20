use std::time::Duration;
use std::time::Instant;

/// Returns a string representing the elapsed time since `start_time` like
/// "1m15s" or "1.50s".
pub fn format_elapsed(start_time: Instant) -> String {
    format_duration(start_time.elapsed())
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();

    if millis < 1000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if millis < 3_600_000 {
        let minutes = millis / 60_000;
        let seconds = (millis % 60_000) / 1000;
        format!("{minutes}m{seconds:02}s")
    } else {
        let hours = millis / 3_600_000;
        let minutes = (millis % 3_600_000) / 60_000;
        format!("{hours}h{minutes:02}m")
    }
}
