//! ANSI styling for terminal output.
//!
//! Every styled string goes through a [`Palette`], so disabling color is a
//! value passed around rather than process-wide state.

use hillclimb_core::model::Status;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const BLUE: &str = "\x1b[94m";
pub const GREEN: &str = "\x1b[92m";
pub const ORANGE: &str = "\x1b[93m";
pub const RED: &str = "\x1b[91m";

/// Whether styling is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A palette that emits no escape codes.
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    /// Colors on unless `no_color` is set or `NO_COLOR` is present.
    pub fn from_env(no_color: bool) -> Self {
        Self::new(!no_color && std::env::var_os("NO_COLOR").is_none())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn wrap(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn bold(&self, s: &str) -> String {
        self.wrap(BOLD, s)
    }

    pub fn blue(&self, s: &str) -> String {
        self.wrap(BLUE, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.wrap(GREEN, s)
    }

    pub fn orange(&self, s: &str) -> String {
        self.wrap(ORANGE, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.wrap(RED, s)
    }

    /// Status label in its color.
    pub fn status(&self, status: Status) -> String {
        let label = status.label();
        match status {
            Status::Better => self.green(label),
            Status::Same => self.orange(label),
            Status::Worse => self.red(label),
            Status::Failed => self.red(&self.bold(label)),
        }
    }
}
