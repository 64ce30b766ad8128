//! One-shot suppression of the change notification caused by fix writes.
//!
//! After a lint pass rewrites files, the watcher reports those writes as
//! ordinary changes. Arming the suppressor swallows the next notification so
//! the pipeline does not lint its own output. If the watcher delivers the
//! write before the suppressor is armed, one redundant pass runs instead.

#[derive(Debug, Default)]
pub struct ChangeSuppressor {
    armed: bool,
}

impl ChangeSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Read-and-clear: returns whether this notification must be swallowed.
    pub fn should_suppress(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppresses_exactly_once_per_arm() {
        let mut s = ChangeSuppressor::new();
        assert!(!s.should_suppress());
        s.arm();
        assert!(s.is_armed());
        assert!(s.should_suppress());
        assert!(!s.should_suppress());
        assert!(!s.is_armed());
    }

    #[test]
    fn test_double_arm_does_not_stack() {
        let mut s = ChangeSuppressor::new();
        s.arm();
        s.arm();
        assert!(s.should_suppress());
        assert!(!s.should_suppress());
    }
}
