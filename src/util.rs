use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::time::{Duration, Instant};
use uuid::Uuid;

const ID_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// "Jan 5, 2024"
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    date.format("%b %-d, %Y").to_string()
}

/// "3:07 PM"
pub fn format_time<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    date.format("%-I:%M %p").to_string()
}

/// Cut `text` to `max_chars` characters, appending "..." when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// A short random base-36 id. Callers that need uniqueness must check for collisions.
pub fn generate_id() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut id = String::with_capacity(ID_LEN);
    for _ in 0..ID_LEN {
        id.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    id
}

/// Coalesces bursts of calls into one, fired once `wait` has passed since the last call.
///
/// Poll-driven: the owner calls [`Debouncer::call`] on every event and
/// [`Debouncer::poll`] from its loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    last_call: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            last_call: None,
        }
    }

    pub fn call(&mut self, now: Instant) {
        self.last_call = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_call.is_some()
    }

    /// Returns true exactly once per burst, when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_call {
            Some(last) if now.saturating_duration_since(last) >= self.wait => {
                self.last_call = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.last_call = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    #[test]
    fn formats_date_and_time() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 5, 15, 7, 0).unwrap();
        assert_eq!(format_date(&dt), "Jan 5, 2024");
        assert_eq!(format_time(&dt), "3:07 PM");

        let morning = Utc.with_ymd_and_hms(2024, 12, 25, 0, 30, 0).unwrap();
        assert_eq!(format_date(&morning), "Dec 25, 2024");
        assert_eq!(format_time(&morning), "12:30 AM");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly", 7), "exactly");
        assert_eq!(truncate_text("milk, eggs, bread", 4), "milk...");
        assert_eq!(truncate_text("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn ids_are_short_base36() {
        let ids: HashSet<String> = (0..500).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 500);
        for id in &ids {
            assert_eq!(id.len(), ID_LEN);
            assert!(id.bytes().all(|b| BASE36.contains(&b)));
        }
    }

    #[test]
    fn debouncer_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(!debouncer.poll(start));

        debouncer.call(start);
        debouncer.call(start + Duration::from_millis(200));
        assert!(!debouncer.poll(start + Duration::from_millis(400)));
        assert!(debouncer.poll(start + Duration::from_millis(500)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.poll(start + Duration::from_millis(900)));
    }

    #[test]
    fn debouncer_cancel_drops_pending_call() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.call(start);
        debouncer.cancel();
        assert!(!debouncer.poll(start + Duration::from_secs(1)));
    }
}
