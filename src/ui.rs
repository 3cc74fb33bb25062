use std::{collections::HashMap, process::Command};

use anyhow::{Context, Result};
use clap::ValueEnum;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use serde::Deserialize;
use tui_textarea::TextArea;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    answer::{is_numeric, Verdict},
    controller::{Action, Controller, Phase},
    gallery::{Gallery, ImageDisplayState},
    keymap::KeyAction,
    render::RecordView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    fg: Color,
    muted: Color,
    accent: Color,
    bar_bg: Color,
    selection_bg: Color,
    good: Color,
    warn: Color,
    info: Color,
}

pub fn theme_of(kind: ThemeKind) -> Theme {
    match kind {
        ThemeKind::Dark => Theme {
            fg: Color::Rgb(222, 222, 216),
            muted: Color::Rgb(136, 140, 146),
            accent: Color::Rgb(240, 178, 90),
            bar_bg: Color::Rgb(32, 36, 42),
            selection_bg: Color::Rgb(58, 64, 74),
            good: Color::Rgb(126, 204, 126),
            warn: Color::Rgb(238, 110, 100),
            info: Color::Rgb(120, 176, 250),
        },
        ThemeKind::Light => Theme {
            fg: Color::Rgb(28, 28, 30),
            muted: Color::Rgb(118, 118, 124),
            accent: Color::Rgb(196, 110, 0),
            bar_bg: Color::Rgb(236, 238, 242),
            selection_bg: Color::Rgb(212, 220, 234),
            good: Color::Rgb(34, 150, 80),
            warn: Color::Rgb(200, 50, 40),
            info: Color::Rgb(0, 110, 220),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Browse,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftPanel {
    Folders,
    Records,
}

pub struct App {
    pub controller: Controller,
    focus: Focus,
    left_panel: LeftPanel,
    folder_state: ListState,
    record_state: ListState,
    input: TextArea<'static>,
    image_cursor: usize,
    theme: Theme,
    keymap: HashMap<char, KeyAction>,
    left_width: u16,
    seen_renders: u64,
    notice: Option<String>,
}

fn answer_input() -> TextArea<'static> {
    let mut ta = TextArea::default();
    ta.set_cursor_line_style(Style::default());
    ta.set_placeholder_text("Type your answer, Enter to check");
    ta
}

impl App {
    pub fn new(
        controller: Controller,
        theme: Theme,
        keymap: HashMap<char, KeyAction>,
        left_width: u16,
    ) -> Self {
        Self {
            controller,
            focus: Focus::Browse,
            left_panel: LeftPanel::Records,
            folder_state: ListState::default(),
            record_state: ListState::default(),
            input: answer_input(),
            image_cursor: 0,
            theme,
            keymap,
            left_width,
            seen_renders: 0,
            notice: None,
        }
    }

    /// Bring widget state in line with the controller after completions were applied.
    pub fn sync(&mut self) {
        if self.controller.renders() != self.seen_renders {
            self.seen_renders = self.controller.renders();
            self.input = answer_input();
            self.image_cursor = 0;
        }
        self.align_lists();
    }

    fn align_lists(&mut self) {
        let Some(nav) = self.controller.nav() else {
            self.folder_state.select(None);
            self.record_state.select(None);
            return;
        };
        let folder = nav
            .folder()
            .and_then(|f| nav.folders().iter().position(|x| x == f));
        self.folder_state.select(folder);
        self.record_state.select(nav.position());
    }

    fn dispatch(&mut self, action: Action) -> Option<Verdict> {
        self.notice = None;
        let verdict = self.controller.dispatch(action);
        self.align_lists();
        verdict
    }

    fn answer_text(&self) -> String {
        self.input.lines().join(" ")
    }
}

/// Returns `true` when the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.kind != KeyEventKind::Press {
        return Ok(false);
    }
    if app.focus == Focus::Answer {
        handle_answer_key(app, key);
        return Ok(false);
    }
    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
        KeyCode::Down => move_cursor(app, 1),
        KeyCode::Up => move_cursor(app, -1),
        KeyCode::Right => {
            app.dispatch(Action::Step(1));
        }
        KeyCode::Left => {
            app.dispatch(Action::Step(-1));
        }
        KeyCode::Enter => commit_selection(app),
        KeyCode::Tab => switch_left_panel(app),
        KeyCode::Char(ch) => {
            if let Some(act) = app.keymap.get(&ch).copied() {
                apply_action(app, act)?;
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_answer_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.focus = Focus::Browse,
        KeyCode::Enter => {
            let text = app.answer_text();
            if let Some(v) = app.dispatch(Action::CheckAnswer(text)) {
                tracing::debug!(?v, "answer checked");
            }
        }
        _ => {
            app.input.input(key);
        }
    }
}

fn apply_action(app: &mut App, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::NextRecord => {
            app.dispatch(Action::Step(1));
        }
        KeyAction::PrevRecord => {
            app.dispatch(Action::Step(-1));
        }
        KeyAction::CursorDown => move_cursor(app, 1),
        KeyAction::CursorUp => move_cursor(app, -1),
        KeyAction::FocusAnswer => {
            if app.controller.view().is_some() {
                app.focus = Focus::Answer;
            }
        }
        KeyAction::SwitchPanel => switch_left_panel(app),
        KeyAction::NextImage => move_image_cursor(app, 1),
        KeyAction::PrevImage => move_image_cursor(app, -1),
        KeyAction::OpenImage => open_selected_image(app),
        KeyAction::Reload => {
            app.dispatch(Action::Reload);
        }
        KeyAction::ResizeLeftShrink => resize_left(app, -5),
        KeyAction::ResizeLeftExpand => resize_left(app, 5),
    }
    Ok(())
}

fn move_cursor(app: &mut App, delta: isize) {
    let Some(nav) = app.controller.nav() else {
        return;
    };
    let (len, state) = match app.left_panel {
        LeftPanel::Folders => (nav.folders().len(), &mut app.folder_state),
        LeftPanel::Records => (nav.len(), &mut app.record_state),
    };
    if len == 0 {
        return;
    }
    let cur = state.selected().unwrap_or(0) as isize;
    state.select(Some((cur + delta).clamp(0, len as isize - 1) as usize));
}

fn commit_selection(app: &mut App) {
    let Some(nav) = app.controller.nav() else {
        return;
    };
    let action = match app.left_panel {
        LeftPanel::Folders => app
            .folder_state
            .selected()
            .and_then(|i| nav.folders().get(i))
            .map(|f| Action::SelectFolder(f.clone())),
        LeftPanel::Records => app
            .record_state
            .selected()
            .and_then(|i| nav.active_entries().nth(i))
            .map(|e| Action::SelectRecord(e.json_path.clone())),
    };
    let Some(action) = action else {
        return;
    };
    if matches!(action, Action::SelectFolder(_)) {
        app.left_panel = LeftPanel::Records;
    }
    app.dispatch(action);
}

fn switch_left_panel(app: &mut App) {
    app.left_panel = match app.left_panel {
        LeftPanel::Folders => LeftPanel::Records,
        LeftPanel::Records => LeftPanel::Folders,
    };
}

fn resize_left(app: &mut App, delta: i16) {
    let w = app.left_width as i16 + delta;
    app.left_width = w.clamp(15, 70) as u16;
}

fn move_image_cursor(app: &mut App, delta: isize) {
    let n = current_gallery(app).map_or(0, |g| g.slots.len());
    if n == 0 {
        return;
    }
    app.image_cursor = (app.image_cursor as isize + delta).rem_euclid(n as isize) as usize;
}

fn current_gallery(app: &App) -> Option<&Gallery> {
    app.controller.view().and_then(|v| v.gallery.as_ref())
}

fn open_selected_image(app: &mut App) {
    let Some(slot) = current_gallery(app).and_then(|g| g.slots.get(app.image_cursor)) else {
        return;
    };
    if !matches!(slot.state, ImageDisplayState::Loaded { .. }) {
        app.notice = Some(format!("{} is not available", slot.local_path));
        return;
    }
    let target = app.controller.resolve(&slot.local_path);
    match open_external(&target) {
        Ok(()) => app.notice = Some(format!("opened {}", target)),
        Err(e) => {
            tracing::warn!(error = %e, %target, "could not open image");
            app.notice = Some(format!("{:#}", e));
        }
    }
}

fn open_external(target: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target)
        .spawn()
        .with_context(|| format!("failed to open {}", target))?;
    Ok(())
}

/// Cut `s` to at most `max` terminal columns, marking the cut with `…`.
fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut w = 0;
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if w + cw + 1 > max {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push('…');
    out
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(app.left_width),
            Constraint::Percentage(100 - app.left_width),
        ])
        .split(v[1]);

    draw_header(f, v[0], app);
    draw_left_panel(f, h[0], app);
    draw_detail(f, h[1], app);
    draw_footer(f, v[2], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let th = app.theme;
    let (phase, color) = match app.controller.phase() {
        Phase::Loading => ("loading", th.info),
        _ if app.controller.in_flight().is_some() => ("loading", th.info),
        Phase::Ready => ("ready", th.good),
        Phase::Error(_) => ("error", th.warn),
    };
    let segs = vec![
        Span::styled(
            " LudoBench · Viewer ",
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", Style::default().fg(th.muted)),
        Span::styled(phase, Style::default().fg(color)),
        Span::styled(" | ", Style::default().fg(th.muted)),
        Span::styled(app.controller.status_line(), Style::default().fg(th.fg)),
    ];
    let para = Paragraph::new(Line::from(segs)).style(Style::default().bg(th.bar_bg).fg(th.fg));
    f.render_widget(para, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let th = app.theme;
    let line = if let Some(n) = &app.notice {
        Line::from(Span::styled(format!(" {}", n), Style::default().fg(th.info)))
    } else {
        let tips = match app.focus {
            Focus::Browse => " [q]quit  [j/k]move  [Enter]open  [n/p]next/prev  [Tab]folders/records  [a]answer  [[/]]image  [o]open image  [R]reload ",
            Focus::Answer => " [Enter]check  [Esc]back ",
        };
        Line::from(Span::styled(tips, Style::default().fg(th.muted)))
    };
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(th.bar_bg)),
        area,
    );
}

fn panel_block(title: &str, active: bool, th: Theme) -> Block<'static> {
    let border = if active { th.accent } else { th.muted };
    Block::default()
        .title(Span::styled(format!(" {} ", title), Style::default().fg(th.accent)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_left_panel(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    let folders: Vec<String> = app
        .controller
        .nav()
        .map(|n| n.folders().to_vec())
        .unwrap_or_default();
    let records: Vec<String> = app
        .controller
        .nav()
        .map(|n| n.active_entries().map(|e| e.name.clone()).collect())
        .unwrap_or_default();

    let folder_height = (folders.len() as u16 + 2).min(area.height / 3).max(3);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(folder_height), Constraint::Min(3)])
        .split(area);

    let label_width = area.width.saturating_sub(4) as usize;
    let highlight = Style::default()
        .bg(th.selection_bg)
        .fg(th.fg)
        .add_modifier(Modifier::BOLD);

    let items: Vec<ListItem> = folders
        .iter()
        .map(|name| ListItem::new(Span::raw(truncate_to_width(name, label_width))))
        .collect();
    let list = List::new(items)
        .block(panel_block(
            "Folders",
            app.left_panel == LeftPanel::Folders,
            th,
        ))
        .highlight_style(highlight)
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, parts[0], &mut app.folder_state);

    let title = format!("Records ({})", records.len());
    let items: Vec<ListItem> = records
        .iter()
        .map(|name| ListItem::new(Span::raw(truncate_to_width(name, label_width))))
        .collect();
    let list = List::new(items)
        .block(panel_block(
            &title,
            app.left_panel == LeftPanel::Records,
            th,
        ))
        .highlight_style(highlight)
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, parts[1], &mut app.record_state);
}

fn draw_detail(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    let view = app.controller.view().cloned();
    let error = match app.controller.phase() {
        Phase::Error(msg) => Some(msg.clone()),
        _ => None,
    };

    let Some(view) = view else {
        let empty_folder = app.controller.nav().is_some_and(|n| n.is_empty());
        let text = match (&error, app.controller.phase()) {
            (Some(msg), _) => Span::styled(msg.clone(), Style::default().fg(th.warn)),
            (None, Phase::Loading) => Span::styled("Loading…", Style::default().fg(th.muted)),
            _ if empty_folder => {
                Span::styled("This folder has no records.", Style::default().fg(th.muted))
            }
            _ => Span::styled("No record selected.", Style::default().fg(th.muted)),
        };
        let para = Paragraph::new(Line::from(text))
            .block(panel_block("Question", false, th))
            .wrap(Wrap { trim: false });
        f.render_widget(para, area);
        return;
    };

    let gallery_rows = view.gallery.as_ref().map_or(0, |g| g.slots.len() as u16 + 2);
    let mut constraints = vec![
        Constraint::Min(5),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(7),
    ];
    if gallery_rows > 0 {
        constraints.push(Constraint::Length(gallery_rows.min(area.height / 3)));
    }
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    draw_question(f, parts[0], &view, error.as_deref(), th);
    draw_answer_input(f, parts[1], app);
    draw_feedback(f, parts[2], &view, th);
    draw_reference(f, parts[3], &view, th);
    if let Some(g) = &view.gallery {
        draw_gallery(f, parts[4], g, app.image_cursor, th);
    }
}

fn draw_question(f: &mut Frame, area: Rect, view: &RecordView, error: Option<&str>, th: Theme) {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            view.question.game.clone(),
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ·  ID ", Style::default().fg(th.muted)),
        Span::styled(view.question.id.clone(), Style::default().fg(th.fg)),
    ])];
    lines.push(Line::from(" "));
    match error {
        Some(msg) => lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(th.warn),
        ))),
        None => {
            for l in view.question.question.lines() {
                lines.push(Line::from(Span::raw(l.to_string())));
            }
        }
    }
    let para = Paragraph::new(lines)
        .block(panel_block("Question", false, th))
        .wrap(Wrap { trim: false });
    f.render_widget(para, area);
}

fn draw_answer_input(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    app.input.set_block(panel_block(
        "Your answer",
        app.focus == Focus::Answer,
        th,
    ));
    let cursor = if app.focus == Focus::Answer {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    app.input.set_cursor_style(cursor);
    f.render_widget(&app.input, area);
}

fn draw_feedback(f: &mut Frame, area: Rect, view: &RecordView, th: Theme) {
    let span = match view.answer.feedback {
        Some(v @ Verdict::Correct) => Span::styled(
            format!(" {}", v.message()),
            Style::default().fg(th.good).add_modifier(Modifier::BOLD),
        ),
        Some(v @ Verdict::TryAgain) => {
            Span::styled(format!(" {}", v.message()), Style::default().fg(th.warn))
        }
        None => Span::raw(""),
    };
    f.render_widget(Paragraph::new(Line::from(span)), area);
}

fn draw_reference(f: &mut Frame, area: Rect, view: &RecordView, th: Theme) {
    let label = Style::default().fg(th.info).add_modifier(Modifier::BOLD);
    let accepted = &view.answer.accepted;
    let mut lines = vec![Line::from(vec![
        Span::styled("Expected: ", label),
        Span::raw(view.answer.expected.clone()),
    ])];
    if accepted.len() > 1 {
        lines.push(Line::from(vec![
            Span::styled("Accepted: ", label),
            Span::raw(accepted.iter().collect::<Vec<_>>().join(" · ")),
        ]));
    }
    if accepted.iter().any(is_numeric) {
        lines.push(Line::from(Span::styled(
            "numbers are compared with a small tolerance",
            Style::default().fg(th.muted),
        )));
    }
    lines.push(Line::from(vec![
        Span::styled("Rationale: ", label),
        Span::raw(view.answer.rationale.clone()),
    ]));
    let para = Paragraph::new(lines)
        .block(panel_block("Reference", false, th))
        .wrap(Wrap { trim: false });
    f.render_widget(para, area);
}

fn draw_gallery(f: &mut Frame, area: Rect, gallery: &Gallery, cursor: usize, th: Theme) {
    let (pending, loaded, failed) = gallery.counts();
    let items: Vec<ListItem> = gallery
        .slots
        .iter()
        .map(|slot| {
            let (icon, detail, color) = match &slot.state {
                ImageDisplayState::Pending => ("⏳", "loading".to_string(), th.muted),
                ImageDisplayState::Loaded { bytes, format } => {
                    ("✔", format!("{} · {} bytes", format, bytes), th.good)
                }
                ImageDisplayState::Failed { reason } => ("✖", reason.clone(), th.warn),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(slot.file_name.clone(), Style::default().fg(th.fg)),
                Span::styled(format!("  {}", slot.local_path), Style::default().fg(th.muted)),
                Span::styled(format!("  {}", detail), Style::default().fg(color)),
            ]))
        })
        .collect();
    let title = format!(
        "Game state  {} ok / {} failed / {} pending",
        loaded, failed, pending
    );
    let mut state = ListState::default().with_selected(Some(cursor));
    let list = List::new(items)
        .block(panel_block(&title, false, th))
        .highlight_style(Style::default().bg(th.selection_bg));
    f.render_stateful_widget(list, area, &mut state);
}
