//! CLI output helpers
//!
//! Status lines go to stderr so that avatar art on stdout can be piped.

/// ANSI color codes for terminal styling
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const GREEN: &str = "\x1b[32m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
}

/// Check if colors should be enabled
pub fn colors_enabled() -> bool {
    // Respect NO_COLOR and TERM conventions
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
        return false;
    }
    atty::is(atty::Stream::Stderr)
}

/// Whether stdout can show 24-bit colour character art
pub fn stdout_supports_color() -> bool {
    std::env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout)
}

/// Terminal columns and rows, defaulting to 80x24
pub fn terminal_dimensions() -> (u16, u16) {
    terminal_size::terminal_size()
        .map(|(w, h)| (w.0, h.0))
        .unwrap_or((80, 24))
}

/// Strip ANSI colour sequences from character art.
pub fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequences end at the first letter
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }
    plain
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Keyword-prefixed lines on stderr: `     Evicted 3 avatars, freed 1.2 MB`
pub struct StatusPrinter {
    use_colors: bool,
}

impl StatusPrinter {
    pub fn new() -> Self {
        Self {
            use_colors: colors_enabled(),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", code, text, colors::RESET)
        } else {
            text.to_string()
        }
    }

    fn keyword_line(&self, color: &str, keyword: &str, message: &str) {
        let code = format!("{}{}", colors::BOLD, color);
        eprintln!("{} {}", self.paint(&code, &format!("{:>12}", keyword)), message);
    }

    pub fn info(&self, keyword: &str, message: &str) {
        self.keyword_line(colors::BRIGHT_CYAN, keyword, message);
    }

    pub fn warning(&self, keyword: &str, message: &str) {
        self.keyword_line(colors::BRIGHT_YELLOW, keyword, message);
    }

    pub fn error(&self, keyword: &str, message: &str) {
        self.keyword_line(colors::BRIGHT_RED, keyword, message);
    }

    pub fn success(&self, keyword: &str, message: &str) {
        self.keyword_line(colors::GREEN, keyword, message);
    }

    /// Secondary line, indented under the keyword column
    pub fn dim(&self, message: &str) {
        eprintln!("             {}", self.paint(colors::DIM, message));
    }

    pub fn section(&self, title: &str) {
        eprintln!();
        eprintln!("{}", self.paint(colors::BOLD, title));
    }

    pub fn kv(&self, key: &str, value: &str) {
        eprintln!("  {}: {}", self.paint(colors::DIM, key), value);
    }

    pub fn bullet(&self, text: &str) {
        eprintln!("  {} {}", self.paint(colors::DIM, "•"), text);
    }
}

impl Default for StatusPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress indicator styles
pub mod progress {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Duration;

    /// Create a spinner for indeterminate progress
    pub fn create_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}
