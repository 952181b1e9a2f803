//! ANSI palette for table dumps and layout reports.
//!
//! - Blue: section headers, type names
//! - Green: names from the string table
//! - Dim: indices, offsets, padding
//! - Reset: back to default

/// Terminal colors, or empty strings when disabled.
#[derive(Clone, Copy, Debug)]
pub struct Colors {
    pub blue: &'static str,
    pub green: &'static str,
    pub dim: &'static str,
    pub reset: &'static str,
}

impl Default for Colors {
    fn default() -> Self {
        Self::OFF
    }
}

impl Colors {
    pub const ON: Self = Self {
        blue: "\x1b[34m",
        green: "\x1b[32m",
        dim: "\x1b[2m",
        reset: "\x1b[0m",
    };

    pub const OFF: Self = Self {
        blue: "",
        green: "",
        dim: "",
        reset: "",
    };

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::ON } else { Self::OFF }
    }

    pub fn is_enabled(&self) -> bool {
        !self.reset.is_empty()
    }

    /// Wrap a section header, e.g. `[records]`.
    pub fn header(&self, title: &str) -> String {
        format!("{}[{title}]{}", self.blue, self.reset)
    }

    /// Wrap a name.
    pub fn name(&self, name: &str) -> String {
        format!("{}{name}{}", self.green, self.reset)
    }
}
