use std::fmt;

use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

#[cfg(target_arch = "wasm32")]
fn now_millis() -> u64 {
    web_sys::js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// 一条带时间戳的日志。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = (self.timestamp_ms % MILLIS_PER_DAY) / 1000;
        write!(
            f,
            "[{:02}:{:02}:{:02}] {}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60,
            self.message
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameLog {
    #[serde(default)]
    entries: Vec<LogEntry>,
}

impl GameLog {
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(now_millis(), message);
    }

    pub fn push_at(&mut self, timestamp_ms: u64, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "sanguo::log", "{message}");
        self.entries.push(LogEntry {
            timestamp_ms,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// 最近的 `count` 条，按时间先后排列。
    pub fn recent(&self, count: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, count: usize) -> Vec<String> {
        self.recent(count).iter().map(ToString::to_string).collect()
    }
}
