/// Transient status-line notices, the terminal stand-in for toasts
use std::time::{Duration, Instant};

const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    expires: Instant,
}

/// Holds notices until they expire; the newest visible one is displayed
#[derive(Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.push_at(level, text, Instant::now());
    }

    fn push_at(&mut self, level: NoticeLevel, text: impl Into<String>, now: Instant) {
        self.notices.push(Notice {
            level,
            text: text.into(),
            expires: now + NOTICE_TTL,
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Warn, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text);
    }

    /// Drop expired notices and return the most recent survivor
    pub fn current(&mut self) -> Option<&Notice> {
        self.current_at(Instant::now())
    }

    fn current_at(&mut self, now: Instant) -> Option<&Notice> {
        self.notices.retain(|n| n.expires > now);
        self.notices.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_notice_is_current() {
        let mut board = NoticeBoard::new();
        board.info("first");
        board.warn("second");
        let current = board.current().unwrap();
        assert_eq!(current.text, "second");
        assert_eq!(current.level, NoticeLevel::Warn);
    }

    #[test]
    fn notices_expire_after_ttl() {
        let mut board = NoticeBoard::new();
        let start = Instant::now();
        board.push_at(NoticeLevel::Info, "soon gone", start);

        assert!(board.current_at(start + Duration::from_secs(1)).is_some());
        assert!(board.current_at(start + NOTICE_TTL + Duration::from_millis(1)).is_none());
    }

    #[test]
    fn empty_board_has_no_current() {
        let mut board = NoticeBoard::new();
        assert!(board.current().is_none());
    }
}
