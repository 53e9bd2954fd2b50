use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Local;

/// Number of entries kept; older ones are dropped.
pub const LOG_CAP: usize = 100;

/// Append-only activity log: a capped ring of pre-formatted lines.
///
/// Appending never fails the calling operation; a poisoned lock is reported
/// through the process logger and the entry is dropped.
pub struct ActivityLog {
    entries: Mutex<VecDeque<String>>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(LOG_CAP)),
        }
    }

    pub fn append(&self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        match self.entries.lock() {
            Ok(mut entries) => {
                if entries.len() == LOG_CAP {
                    entries.pop_front();
                }
                entries.push_back(line);
            }
            Err(_) => log::warn!("activity log unavailable, dropping entry: {message}"),
        }
    }

    /// Current entries, newest first.
    pub fn snapshot(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().rev().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}
