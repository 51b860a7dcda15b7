//! Table formatting for list commands
//!
//! Rows are built from typed cells so each output format can render them
//! its own way: padded and coloured for the terminal, escaped for CSV and
//! Markdown, bare ids for piping.

use console::style;

use crate::cli::helpers::{escape_csv, format_euros, truncate_str};
use crate::cli::OutputFormat;

#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Maximum width for text columns before wrapping (None = truncate instead)
    pub wrap_width: Option<usize>,
    /// Show "N product(s) found" after the table
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            wrap_width: None,
            show_summary: true,
        }
    }
}

impl TableConfig {
    pub fn with_wrap(width: usize) -> Self {
        Self {
            wrap_width: Some(width),
            show_summary: true,
        }
    }

    pub fn for_pipe() -> Self {
        Self {
            wrap_width: None,
            show_summary: false,
        }
    }
}

/// Wrap text at word boundaries, counting characters
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.chars().count() <= max_width || max_width < 5 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let current_len = current.chars().count();
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= max_width {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }

        // Hard-break words longer than a line
        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(max_width).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(piece);
            } else {
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Product id (cyan)
    Id(i64),
    Text(String),
    /// Category or sub-category name
    Category(String),
    /// Euro amount, right-aligned
    Price(f64),
    /// Active flag (active=green, inactive=dim)
    Active(bool),
    /// Attached document: stored path and whether the file exists
    Document(String, bool),
    Number(i64),
    Empty,
}

impl CellValue {
    /// Optional text, `Empty` when absent
    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(CellValue::Empty, |s| CellValue::Text(s.to_string()))
    }

    /// Format for terminal output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) => format!(
                "{:<width$}",
                truncate_str(s, width.saturating_sub(2)),
                width = width
            ),
            CellValue::Category(c) => format!(
                "{:<width$}",
                style(truncate_str(c, width.saturating_sub(2))).yellow(),
                width = width
            ),
            CellValue::Price(p) => format!("{:>width$}", format_euros(*p), width = width),
            CellValue::Active(active) => {
                let styled = if *active {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Document(path, exists) => {
                let shown = truncate_str(path, width.saturating_sub(2));
                let styled = if *exists {
                    style(shown)
                } else {
                    style(shown).red()
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Number(n) => format!("{:>width$}", n, width = width),
            CellValue::Empty => format!("{:<width$}", style("-").dim(), width = width),
        }
    }

    /// Format for CSV output (no colors, decimal point)
    pub fn format_csv(&self) -> String {
        match self {
            CellValue::Price(p) => format!("{:.2}", p),
            CellValue::Active(a) => (if *a { "1" } else { "0" }).to_string(),
            CellValue::Empty => String::new(),
            other => escape_csv(&other.raw()),
        }
    }

    /// Format for Markdown output (escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Price(p) => format_euros(*p),
            CellValue::Active(true) => "yes".to_string(),
            CellValue::Active(false) => "*no*".to_string(),
            CellValue::Document(path, false) => format!("~~{}~~", path),
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Unformatted value
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.to_string(),
            CellValue::Text(s) | CellValue::Category(s) => s.clone(),
            CellValue::Price(p) => format!("{:.2}", p),
            CellValue::Active(a) => a.to_string(),
            CellValue::Document(path, _) => path.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Display width in characters, for column sizing
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Price(p) => format_euros(*p).chars().count(),
            CellValue::Active(_) => 3,
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition: key, header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cells keyed by column
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            config: TableConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the given format; `Auto`, `Yaml` and `Json` fall back to the terminal table
    pub fn output<I>(&self, rows: I, format: OutputFormat, visible_columns: &[&str])
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();
        let visible: Vec<&ColumnDef> = self
            .columns
            .iter()
            .filter(|c| visible_columns.contains(&c.key))
            .collect();

        match format {
            OutputFormat::Csv => self.output_csv(&rows, &visible),
            OutputFormat::Md => self.output_md(&rows, &visible),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.id);
                }
            }
            _ => self.output_tsv(&rows, &visible),
        }
    }

    /// Widths from content, capped at each column's maximum
    fn calculate_widths(&self, rows: &[TableRow], visible: &[&ColumnDef]) -> Vec<usize> {
        visible
            .iter()
            .map(|col| {
                let content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                col.header
                    .len()
                    .max(content.saturating_add(2))
                    .min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow], visible: &[&ColumnDef]) {
        let widths = self.calculate_widths(rows, visible);

        let header: Vec<String> = visible
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = *w))
            .collect();
        println!("{}", header.join(" "));
        let total: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total));

        for row in rows {
            match self.config.wrap_width {
                Some(wrap) => self.output_row_wrapped(row, visible, &widths, wrap),
                None => {
                    let parts: Vec<String> = visible
                        .iter()
                        .zip(&widths)
                        .map(|(col, w)| match row.get(col.key) {
                            Some(value) => value.format_tsv(*w),
                            None => format!("{:<width$}", "-", width = *w),
                        })
                        .collect();
                    println!("{}", parts.join(" "));
                }
            }
        }

        if self.config.show_summary {
            println!();
            println!("{} {}(s) found.", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_row_wrapped(&self, row: &TableRow, visible: &[&ColumnDef], widths: &[usize], wrap: usize) {
        let cells: Vec<Vec<String>> = visible
            .iter()
            .map(|col| match row.get(col.key) {
                Some(value @ CellValue::Text(_)) => wrap_text(&value.raw(), wrap),
                Some(value) => vec![value.raw()],
                None => vec!["-".to_string()],
            })
            .collect();

        let height = cells.iter().map(Vec::len).max().unwrap_or(1);
        for line in 0..height {
            let parts: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(lines, w)| {
                    let content = lines.get(line).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", content, width = *w)
                })
                .collect();
            println!("{}", parts.join(" "));
        }
        if height > 1 {
            println!();
        }
    }

    fn output_csv(&self, rows: &[TableRow], visible: &[&ColumnDef]) {
        let headers: Vec<&str> = visible.iter().map(|c| c.key).collect();
        println!("{}", headers.join(","));
        for row in rows {
            let values: Vec<String> = visible
                .iter()
                .map(|col| row.get(col.key).map(CellValue::format_csv).unwrap_or_default())
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow], visible: &[&ColumnDef]) {
        let headers: Vec<&str> = visible.iter().map(|c| c.header).collect();
        println!("| {} |", headers.join(" | "));
        println!("|{}|", vec!["---"; headers.len()].join("|"));
        for row in rows {
            let values: Vec<String> = visible
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            println!("| {} |", values.join(" | "));
        }
    }
}
