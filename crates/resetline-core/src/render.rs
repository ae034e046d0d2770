use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, FixedOffset};
use unicode_width::UnicodeWidthStr;

use crate::catalog::{Catalog, Event};
use crate::config::Config;
use crate::countdown::{Countdown, format_remaining};
use crate::datastore::CompletionStore;
use crate::occurrence::{Occurrence, active_occurrence};
use crate::window::Window;

const DONE_CODE: &str = "90";
const NOW_CODE: &str = "31";

/// Text stand-in for the timeline canvas: one bar row per event on a shared
/// column grid spanning the window.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    code: Option<&'static str>,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', code: None };
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
            width: cfg.timeline.width.max(8),
        }
    }

    pub fn plain(width: usize) -> Self {
        Self {
            color: false,
            width: width.max(8),
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_timeline(
        &self,
        catalog: &Catalog,
        store: &CompletionStore,
        window: &Window,
        now: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_timeline(&mut out, catalog, store, window, now)
    }

    pub fn write_timeline<W: Write>(
        &self,
        mut out: W,
        catalog: &Catalog,
        store: &CompletionStore,
        window: &Window,
        now: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let label_width = catalog
            .events
            .iter()
            .map(|event| UnicodeWidthStr::width(event.name.as_str()))
            .max()
            .unwrap_or(0)
            + 2;
        let now_col = self.column(window, now);

        let mut scale = vec![Cell::BLANK; self.width];
        for (col, label) in self.day_labels(window) {
            for (offset, ch) in format!("|{label}").chars().enumerate() {
                if let Some(cell) = scale.get_mut(col + offset) {
                    cell.ch = ch;
                }
            }
        }
        writeln!(out, "{}{}", " ".repeat(label_width), self.paint_cells(&scale))?;

        let mut marker = vec![Cell::BLANK; self.width];
        if let Some(col) = now_col {
            let label = format!("v {}", now.format("%H:%M"));
            let begin = col.min(self.width.saturating_sub(label.len()));
            for (offset, ch) in label.chars().enumerate() {
                if let Some(cell) = marker.get_mut(begin + offset) {
                    *cell = Cell {
                        ch,
                        code: Some(NOW_CODE),
                    };
                }
            }
        }
        writeln!(out, "{}{}", " ".repeat(label_width), self.paint_cells(&marker))?;

        for event in &catalog.events {
            let segments = event.occurrences(window);
            let mut row = self.bar_row(event, &segments, window, store);
            if let Some(col) = now_col
                && let Some(cell) = row.get_mut(col)
                && cell.ch == ' '
            {
                *cell = Cell {
                    ch: '|',
                    code: Some(NOW_CODE),
                };
            }

            let name_width = UnicodeWidthStr::width(event.name.as_str());
            write!(out, "{}", event.name)?;
            write!(out, "{}", " ".repeat(label_width.saturating_sub(name_width)))?;
            writeln!(out, "{}", self.paint_cells(&row))?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_countdowns(
        &self,
        rows: &[Countdown<'_>],
        store: &CompletionStore,
        now: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_countdowns(&mut out, rows, store, now)
    }

    pub fn write_countdowns<W: Write>(
        &self,
        out: W,
        rows: &[Countdown<'_>],
        store: &CompletionStore,
        now: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let mut table = Table::new(["Event", "Category", "Resets", "Remaining", "Done"]);
        for row in rows {
            let done = active_occurrence(&row.event.rule, now)
                .map(|occ| store.is_done(&occ.key(&row.event.id)))
                .unwrap_or(false);
            table.push([
                Label::painted(row.event.name.as_str(), category_code(&row.event.category)),
                Label::plain(row.event.category.as_str()),
                Label::plain(row.reset_at.format("%m/%d %a %H:%M").to_string()),
                Label::plain(format_remaining(row.remaining)),
                Label::flag(done, Some(DONE_CODE)),
            ]);
        }

        table.write(out, self)
    }

    pub fn write_segments<W: Write>(
        &self,
        out: W,
        event: &Event,
        segments: &[Occurrence],
        store: &CompletionStore,
    ) -> anyhow::Result<()> {
        let mut table = Table::new(["Start", "End", "Clipped", "Key", "Done"]);
        for occ in segments {
            let key = occ.key(&event.id);
            let done = store.is_done(&key);
            table.push([
                Label::plain(occ.start.format("%Y-%m-%d %a %H:%M").to_string()),
                Label::plain(occ.end.format("%Y-%m-%d %a %H:%M").to_string()),
                Label::flag(occ.is_clipped(), None),
                Label::plain(key),
                Label::flag(done, Some(DONE_CODE)),
            ]);
        }

        table.write(out, self)
    }

    pub fn write_issues<W: Write>(&self, mut out: W, catalog: &Catalog) -> anyhow::Result<()> {
        for issue in &catalog.issues {
            writeln!(
                out,
                "{} entry #{} ({}): {}",
                self.paint("skipped", NOW_CODE),
                issue.index,
                issue.event_id,
                issue.kind
            )?;
        }
        Ok(())
    }

    fn column(&self, window: &Window, instant: DateTime<FixedOffset>) -> Option<usize> {
        let fraction = window.fraction(instant);
        if !(0.0..1.0).contains(&fraction) {
            return None;
        }
        Some(((fraction * self.width as f64).floor() as usize).min(self.width - 1))
    }

    /// Column and `M/D Wed` label for every reference-local midnight in the window.
    fn day_labels(&self, window: &Window) -> Vec<(usize, String)> {
        let clock = window.clock();
        let mut labels = Vec::new();
        let mut day = 0;
        loop {
            let midnight = clock.midnight(window.start(), day);
            if midnight >= window.end() {
                break;
            }
            if let Some(col) = self.column(window, midnight) {
                labels.push((col, midnight.format("%-m/%-d %a").to_string()));
            }
            day += 1;
        }
        labels
    }

    fn bar_row(
        &self,
        event: &Event,
        segments: &[Occurrence],
        window: &Window,
        store: &CompletionStore,
    ) -> Vec<Cell> {
        let mut row = vec![Cell::BLANK; self.width];
        let base = category_code(&event.category);
        let scale = self.width as f64;

        for occ in segments {
            let done = store.is_done(&occ.key(&event.id));
            let code = Some(if done { DONE_CODE } else { base });
            let first = (window.fraction(occ.start) * scale).floor().max(0.0) as usize;
            let last = ((window.fraction(occ.end) * scale).ceil() as usize)
                .min(self.width)
                .saturating_sub(1)
                .max(first);

            for cell in row.iter_mut().take(last + 1).skip(first) {
                *cell = Cell {
                    ch: if done { '-' } else { '=' },
                    code,
                };
            }
            if let Some(cell) = row.get_mut(first) {
                *cell = Cell { ch: 'o', code };
            }
            if last > first
                && let Some(cell) = row.get_mut(last)
            {
                *cell = Cell { ch: 'o', code };
            }
        }

        row
    }

    fn paint_cells(&self, cells: &[Cell]) -> String {
        let mut out = String::with_capacity(cells.len());
        let mut run = String::new();
        let mut run_code: Option<&'static str> = None;

        for cell in cells {
            if cell.code != run_code && !run.is_empty() {
                out.push_str(&self.paint_opt(&run, run_code));
                run.clear();
            }
            run_code = cell.code;
            run.push(cell.ch);
        }
        if !run.is_empty() {
            out.push_str(&self.paint_opt(&run, run_code));
        }

        out.trim_end().to_string()
    }

    fn paint_opt(&self, text: &str, code: Option<&str>) -> String {
        match code {
            Some(code) => self.paint(text, code),
            None => text.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn category_code(category: &str) -> &'static str {
    match category {
        "gold_saucer" => "36",
        "gc" => "32",
        "roulette" => "33",
        "weekly" => "35",
        _ => "34",
    }
}

/// Text of one table cell plus the color it is painted with on output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    text: String,
    code: Option<&'static str>,
}

impl Label {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), code: None }
    }

    fn painted(text: impl Into<String>, code: &'static str) -> Self {
        Self { text: text.into(), code: Some(code) }
    }

    fn flag(set: bool, code: Option<&'static str>) -> Self {
        Self {
            text: if set { "yes".to_string() } else { String::new() },
            code,
        }
    }

    fn width(&self) -> usize {
        self.text.width()
    }
}

/// Fixed-arity table. Widths are measured on the raw text, so color codes
/// never shift the columns.
#[derive(Debug, Clone)]
struct Table<const N: usize> {
    headers: [&'static str; N],
    rows: Vec<[Label; N]>,
}

impl<const N: usize> Table<N> {
    fn new(headers: [&'static str; N]) -> Self {
        Self { headers, rows: Vec::new() }
    }

    fn push(&mut self, row: [Label; N]) {
        self.rows.push(row);
    }

    fn widths(&self) -> [usize; N] {
        let mut widths = self.headers.map(|header| header.width());
        for row in &self.rows {
            for (width, label) in widths.iter_mut().zip(row) {
                *width = (*width).max(label.width());
            }
        }
        widths
    }

    fn write<W: Write>(&self, mut out: W, renderer: &Renderer) -> anyhow::Result<()> {
        let widths = self.widths();

        let header: Vec<String> = self
            .headers
            .iter()
            .zip(widths)
            .map(|(header, width)| format!("{header:<width$}"))
            .collect();
        writeln!(out, "{}", header.join(" ").trim_end())?;

        let underline: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(out, "{}", underline.join(" "))?;

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(label, width)| {
                    let padding = " ".repeat(width.saturating_sub(label.width()));
                    format!("{}{padding}", renderer.paint_opt(&label.text, label.code))
                })
                .collect();
            writeln!(out, "{}", cells.join(" ").trim_end())?;
        }

        Ok(())
    }
}
