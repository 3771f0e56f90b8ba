use clap::ValueEnum;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

/// User-facing output. Logs go through `tracing` to stderr; this is what the
/// user asked to see, either as text or as one JSON object per message.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.is_human() {
            println!("{} {}", "✓".green(), msg.as_ref());
        } else {
            self.message("success", msg.as_ref());
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.is_human() {
            println!("{}", msg.as_ref());
        } else {
            self.message("info", msg.as_ref());
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.is_human() {
            println!("{} {}", "⚠".yellow(), msg.as_ref());
        } else {
            self.message("warning", msg.as_ref());
        }
    }

    /// Shown even in quiet mode.
    pub fn error(&self, msg: impl AsRef<str>) {
        if self.is_human() {
            eprintln!("{} {}", "✗".red(), msg.as_ref());
        } else {
            self.message("error", msg.as_ref());
        }
    }

    /// Blank line in human mode, nothing in JSON mode.
    pub fn blank(&self) {
        if !self.quiet && self.is_human() {
            println!();
        }
    }

    /// Tables only make sense for humans; JSON callers emit their own document.
    pub fn table(&self, table: &Table) {
        if !self.quiet && self.is_human() {
            println!("{}", table);
        }
    }

    pub fn json(&self, data: &Value) {
        if self.quiet || self.is_human() {
            return;
        }
        self.print_json(data);
    }

    fn message(&self, kind: &str, msg: &str) {
        self.print_json(&json!({
            "type": kind,
            "message": msg
        }));
    }

    fn print_json(&self, data: &Value) {
        let rendered = match self.format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(data),
            _ => serde_json::to_string(data),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

/// A table with the rounded UTF-8 preset used throughout the CLI.
pub fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

pub fn check_mark(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}
