//! Frame rendering: model → styled lines → crossterm draw commands.
//!
//! [`build_frame`] is pure and is what the tests look at; [`paint`] only
//! translates a finished frame into queued terminal commands.

#![allow(missing_docs)]

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::feed::record::ParameterRecord;

use super::model::DashboardModel;

const FOCUS_MARKER: &str = "▶";
const AUTONOMOUS_BANNER: &str = "AUTONOMOUS MODE";
const KEY_HINTS: &str = "↑↓ focus  A/D tab  r refresh  l blocks  q quit";

/// Visual role of a text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Title,
    Tab,
    ActiveTab,
    Row,
    Focused,
    Overlay,
    Error,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tone: Tone,
    pub text: String,
}

pub type Line = Vec<Segment>;

/// A full screen: body from the top, footer pinned to the last row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub body: Vec<Line>,
    pub footer: Line,
}

impl Frame {
    /// Plain text of the body, one string per line.
    #[must_use]
    pub fn body_text(&self) -> Vec<String> {
        self.body.iter().map(line_text).collect()
    }
}

fn seg(tone: Tone, text: impl Into<String>) -> Segment {
    Segment {
        tone,
        text: text.into(),
    }
}

fn line_text(line: &Line) -> String {
    line.iter().map(|s| s.text.as_str()).collect()
}

/// Build the frame for the current model.
#[must_use]
pub fn build_frame(model: &DashboardModel) -> Frame {
    let mut body = vec![
        vec![
            seg(Tone::Title, " race-dash "),
            seg(Tone::Muted, format!(" {}", model.source_label)),
        ],
        tab_bar(model),
        Vec::new(),
    ];

    // Error panel outranks the overlay: stale rows are never shown under it.
    if let Some(err) = &model.error {
        body.push(vec![seg(Tone::Error, format!("  ✖ Error [{}]", err.code))]);
        body.push(vec![seg(Tone::Error, format!("    {}", err.message))]);
        body.push(vec![seg(
            Tone::Muted,
            "    retrying on the next poll; last values are kept",
        )]);
    } else if model.auto_mode {
        let rule = "═".repeat(AUTONOMOUS_BANNER.chars().count() + 4);
        body.push(vec![seg(Tone::Overlay, format!("  ╔{rule}╗"))]);
        body.push(vec![seg(Tone::Overlay, format!("  ║  {AUTONOMOUS_BANNER}  ║"))]);
        body.push(vec![seg(Tone::Overlay, format!("  ╚{rule}╝"))]);
    } else {
        body.extend(parameter_rows(model));
    }

    if model.show_live_blocks {
        body.push(Vec::new());
        body.push(vec![seg(Tone::Title, " live blocks ")]);
        let blocks = live_block_lines(&model.records);
        if model.error.is_some() {
            body.push(vec![seg(Tone::Muted, "  (feed unavailable)")]);
        } else if blocks.is_empty() {
            body.push(vec![seg(Tone::Muted, "  (no records yet)")]);
        } else {
            body.extend(
                blocks
                    .into_iter()
                    .map(|text| vec![seg(Tone::Row, format!("  {text}"))]),
            );
        }
    }

    Frame {
        body,
        footer: footer(model),
    }
}

fn tab_bar(model: &DashboardModel) -> Line {
    let mut line = vec![seg(Tone::Muted, " ")];
    for (idx, tab) in model.tabs.iter().enumerate() {
        let tone = if idx == model.active_tab {
            Tone::ActiveTab
        } else {
            Tone::Tab
        };
        line.push(seg(tone, format!(" {} {} ", idx + 1, tab.title)));
        line.push(seg(Tone::Muted, " "));
    }
    line
}

fn parameter_rows(model: &DashboardModel) -> Vec<Line> {
    let params = model.active_parameters();
    let label_width = params
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);
    let focused = model.active_index();

    params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            let value = model.display_value(&param.key);
            if idx == focused {
                vec![seg(
                    Tone::Focused,
                    format!("  {FOCUS_MARKER} {:<label_width$}  {value}", param.label),
                )]
            } else {
                vec![seg(
                    Tone::Row,
                    format!("    {:<label_width$}  {value}", param.label),
                )]
            }
        })
        .collect()
}

fn footer(model: &DashboardModel) -> Line {
    let latency = model
        .last_latency
        .map_or_else(|| "-".to_string(), |d| format!("{} ms", d.as_millis()));
    vec![
        seg(
            Tone::Muted,
            format!(
                " polls {}  failures {}  latency {latency}  ",
                model.polls, model.failures
            ),
        ),
        seg(Tone::Muted, KEY_HINTS),
    ]
}

/// One `name  value unit` line per named record, in wire order.
#[must_use]
pub fn live_block_lines(records: &[ParameterRecord]) -> Vec<String> {
    let named: Vec<&ParameterRecord> = records.iter().filter(|r| r.name.is_some()).collect();
    let width = named
        .iter()
        .filter_map(|r| r.name.as_deref())
        .map(|n| n.chars().count())
        .max()
        .unwrap_or(0);

    named
        .into_iter()
        .map(|r| {
            let name = r.name.as_deref().unwrap_or_default();
            let value = r.value.as_ref().map(ToString::to_string).unwrap_or_default();
            let line = match r.unit.as_deref() {
                Some(unit) if !unit.is_empty() => format!("{name:<width$}  {value} {unit}"),
                _ => format!("{name:<width$}  {value}"),
            };
            line.trim_end().to_string()
        })
        .collect()
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Title => Color::Cyan,
        Tone::Tab | Tone::Row => Color::White,
        Tone::ActiveTab | Tone::Focused | Tone::Overlay => Color::Yellow,
        Tone::Error => Color::Red,
        Tone::Muted => Color::DarkGrey,
    }
}

/// Queue the frame onto `out` and flush. Lines are clipped to `cols`, and body
/// lines that would collide with the footer are dropped.
pub fn paint<W: Write>(out: &mut W, frame: &Frame, size: (u16, u16), color: bool) -> io::Result<()> {
    let (cols, rows) = size;
    let cols = usize::from(cols);
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    let body_rows = rows.saturating_sub(1);
    for (row, line) in (0..body_rows).zip(&frame.body) {
        paint_line(out, row, line, cols, color)?;
    }
    if rows > 0 {
        paint_line(out, rows - 1, &frame.footer, cols, color)?;
    }
    out.flush()
}

fn paint_line<W: Write>(out: &mut W, row: u16, line: &Line, cols: usize, color: bool) -> io::Result<()> {
    queue!(out, MoveTo(0, row))?;
    let mut remaining = cols;
    for segment in line {
        if remaining == 0 {
            break;
        }
        let text: String = segment.text.chars().take(remaining).collect();
        remaining -= text.chars().count();
        if color {
            queue!(out, SetForegroundColor(tone_color(segment.tone)))?;
            if matches!(segment.tone, Tone::Title | Tone::ActiveTab | Tone::Focused | Tone::Overlay)
            {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            if segment.tone == Tone::ActiveTab {
                queue!(out, SetAttribute(Attribute::Reverse))?;
            }
        }
        queue!(out, Print(text))?;
        if color {
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
    }
    Ok(())
}
