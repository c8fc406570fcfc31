use std::time::{Duration, Instant};

/// Clock-injected throttle: the first value passes immediately, later values inside the
/// interval are held until it elapses.  
/// 以外部時鐘驅動的節流器：第一個值立即放行，間隔內的後續值暫存至間隔結束。
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    latest: bool,
    last_emit: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    /// `latest = true` keeps the newest held value, `false` keeps the first one.  
    /// `latest = true` 保留最新的暫存值，`false` 則保留第一個。
    pub fn new(interval: Duration, latest: bool) -> Self {
        Self {
            interval,
            latest,
            last_emit: None,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offers a value; returns the value to emit now, if any.  
    /// 提交一個值；若此刻應放行則回傳該值。
    pub fn offer(&mut self, value: T, now: Instant) -> Option<T> {
        if self.latest || self.pending.is_none() {
            self.pending = Some(value);
        }
        self.poll(now)
    }

    /// Emits the held value once the interval has elapsed.  
    /// 間隔結束後放行暫存的值。
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_none() || !self.is_open(now) {
            return None;
        }
        self.last_emit = Some(now);
        self.pending.take()
    }

    /// Instant at which the held value becomes due.  
    /// 暫存值可放行的時間點。
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(match self.last_emit {
            Some(last) => last + self.interval,
            None => Instant::now(),
        })
    }

    /// Removes the held value without waiting for the interval.  
    /// 不等待間隔直接取出暫存值。
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take()
    }

    fn is_open(&self, now: Instant) -> bool {
        self.last_emit
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn first_value_passes_then_latest_is_held() {
        let start = Instant::now();
        let mut throttle = Throttle::new(SECOND, true);

        assert_eq!(throttle.offer(1, start), Some(1));
        assert_eq!(throttle.offer(2, start + Duration::from_millis(200)), None);
        assert_eq!(throttle.offer(3, start + Duration::from_millis(400)), None);
        assert_eq!(throttle.deadline(), Some(start + SECOND));
        assert_eq!(throttle.poll(start + Duration::from_millis(900)), None);
        assert_eq!(throttle.poll(start + SECOND), Some(3));
        assert!(!throttle.has_pending());
        assert_eq!(throttle.poll(start + SECOND * 5), None);
    }

    #[test]
    fn non_latest_keeps_first_held_value() {
        let start = Instant::now();
        let mut throttle = Throttle::new(SECOND * 60, false);

        assert_eq!(throttle.offer("a", start), Some("a"));
        assert_eq!(throttle.offer("b", start + SECOND), None);
        assert_eq!(throttle.offer("c", start + SECOND * 2), None);
        assert_eq!(throttle.poll(start + SECOND * 60), Some("b"));
    }

    #[test]
    fn take_pending_skips_the_window() {
        let start = Instant::now();
        let mut throttle = Throttle::new(SECOND, true);
        throttle.offer(1, start);
        throttle.offer(2, start);
        assert_eq!(throttle.take_pending(), Some(2));
        assert_eq!(throttle.deadline(), None);
    }
}
