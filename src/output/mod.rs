pub mod json;
pub mod text;

use serde::Serialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(json: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn emit<T: Serialize>(&self, text_line: &str, json_value: &T) -> AppResult<()> {
        match self.mode {
            OutputMode::Text => text::print_line(text_line),
            OutputMode::Json => json::print(json_value),
        }
    }

    /// Emits `rows` as a table in text mode, or `json_value` in JSON mode.
    /// An empty table prints `empty` instead.
    pub fn emit_table<T: Serialize>(
        &self,
        header: &[&str],
        rows: &[Vec<String>],
        empty: &str,
        json_value: &T,
    ) -> AppResult<()> {
        match self.mode {
            OutputMode::Json => json::print(json_value),
            OutputMode::Text if rows.is_empty() => text::print_line(empty),
            OutputMode::Text => text::print_table(header, rows),
        }
    }
}
