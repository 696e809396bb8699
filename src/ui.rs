//! User-facing progress reporting.
//!
//! Build steps report through a [`Ui`] rather than printing directly, so the
//! caller decides where messages go.

/// Sink for progress and error messages.
pub trait Ui {
    /// A top-level progress line.
    fn say(&self, message: &str);

    /// A detail line beneath the current progress line.
    fn message(&self, message: &str);

    /// An error the user needs to see.
    fn error(&self, message: &str);
}

/// Writes to stdout and stderr, tagging every line with a prefix.
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    prefix: String,
}

impl ConsoleUi {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn format(&self, message: &str) -> String {
        format!("[{}] {}", self.prefix, message)
    }
}

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("{}", self.format(message));
    }

    fn message(&self, message: &str) {
        println!("{}   {}", self.format(""), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.format(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prefixes_lines() {
        let ui = ConsoleUi::new("cdrom");
        assert_eq!(ui.format("Creating CD disk..."), "[cdrom] Creating CD disk...");
    }
}
