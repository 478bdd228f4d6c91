use cc_coach::feedback::feedback_or_idle;
use cc_coach::session::Streams;
use cc_coach::{CoachSession, Feedback, StreamStatus, Tone, Verdict};
use cc_core::config::{Thresholds, UiConfig};
use cc_core::frame::FrameBuffer;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph};

use crate::canvas::{self, OverlayOptions};
use crate::fps::FpsCounter;

const SIDEBAR_WIDTH: u16 = 34;
const HISTORY_HEIGHT: u16 = 9;
const HEADER: Style = Style::new().fg(Color::Yellow);

/// Toggles of the view, seeded from `[ui]` and flipped by keys.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    pub show_landmarks: bool,
    pub show_boxes: bool,
    pub show_history: bool,
    pub show_help: bool,
}

impl ViewOptions {
    #[must_use]
    pub fn from_config(ui: &UiConfig) -> Self {
        Self {
            show_landmarks: ui.show_landmarks,
            show_boxes: ui.show_boxes,
            show_history: ui.show_history,
            show_help: false,
        }
    }
}

/// Everything one UI frame needs besides the session.
pub struct DrawContext<'a> {
    /// Latest video frame, if the source delivered one.
    pub video: Option<&'a FrameBuffer>,
    pub fps: &'a FpsCounter,
    pub view: ViewOptions,
    /// Short description of the video source (device or image path).
    pub source: &'a str,
    /// Detection ticks dropped because the previous one was still running.
    pub dropped_ticks: u64,
}

/// Draw the full UI: video | panel, history chart underneath.
pub fn draw(frame: &mut Frame, session: &CoachSession, ctx: &DrawContext<'_>) {
    let area = frame.area();

    let [left, sidebar] =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)]).areas(area);

    let history_height = if ctx.view.show_history { HISTORY_HEIGHT } else { 0 };
    let [video_area, history_area] =
        Layout::vertical([Constraint::Min(4), Constraint::Length(history_height)]).areas(left);

    draw_video(frame, video_area, session, ctx);
    if ctx.view.show_history {
        draw_history(frame, history_area, session);
    }

    let panel = Paragraph::new(panel_lines(session, ctx))
        .block(Block::default().borders(Borders::LEFT).title(" camcoach "));
    frame.render_widget(panel, sidebar);

    if ctx.view.show_help {
        draw_help_overlay(frame, area);
    }
}

fn draw_video(frame: &mut Frame, area: Rect, session: &CoachSession, ctx: &DrawContext<'_>) {
    let Some(video) = ctx.video.filter(|v| v.is_ready()) else {
        let text = match &session.streams().video {
            StreamStatus::Failed(reason) => format!("Camera unavailable: {reason}"),
            _ => format!("Waiting for video from {}…", ctx.source),
        };
        let msg = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return;
    };

    canvas::render_video(frame.buffer_mut(), area, video);
    canvas::draw_overlay(
        frame.buffer_mut(),
        area,
        session.faces(),
        session.display_size(),
        OverlayOptions {
            boxes: ctx.view.show_boxes,
            landmarks: ctx.view.show_landmarks,
        },
    );
}

/// Series for the history chart: one point per snapshot, oldest at x = 0.
#[must_use]
pub fn history_points(session: &CoachSession) -> Vec<(f64, f64)> {
    session
        .history()
        .averages()
        .enumerate()
        .map(|(i, avg)| (i as f64, f64::from(avg)))
        .collect()
}

/// Horizontal reference lines at the volume band edges.
fn threshold_lines(t: &Thresholds, width: f64) -> [(Color, [(f64, f64); 2]); 4] {
    let line = |y: f32| [(0.0, f64::from(y)), (width, f64::from(y))];
    [
        (Color::DarkGray, line(t.volume_quiet_above)),
        (Color::Green, line(t.volume_ok_from)),
        (Color::Yellow, line(t.volume_loud_from)),
        (Color::Red, line(t.volume_loud_below)),
    ]
}

fn draw_history(frame: &mut Frame, area: Rect, session: &CoachSession) {
    let width = session.history().capacity().saturating_sub(1).max(1) as f64;
    let points = history_points(session);
    let refs = threshold_lines(session.thresholds(), width);

    let mut datasets: Vec<Dataset<'_>> = refs
        .iter()
        .map(|(color, pts)| {
            Dataset::default()
                .marker(Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(pts)
        })
        .collect();
    datasets.push(
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points),
    );

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::TOP).title(" Volume history "))
        .x_axis(Axis::default().bounds([0.0, width]))
        .y_axis(
            Axis::default()
                .bounds([0.0, 255.0])
                .labels(["0", "128", "255"])
                .style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(chart, area);
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Ok => Style::default(),
        Tone::Warn => Style::default().fg(Color::Red),
        Tone::Idle => Style::default().fg(Color::DarkGray),
    }
}

fn verdict_line(name: &str, feedback: Feedback) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!(" {name:<11}")),
        Span::styled(feedback.label, tone_style(feedback.tone)),
    ])
}

fn status_line(name: &str, status: &StreamStatus) -> Line<'static> {
    let style = match status {
        StreamStatus::Live => Style::default().fg(Color::Green),
        StreamStatus::Failed(_) => Style::default().fg(Color::Red),
        StreamStatus::Starting | StreamStatus::Disabled => Style::default().fg(Color::DarkGray),
    };
    Line::from(vec![
        Span::raw(format!(" {name:<10}")),
        Span::styled(status.to_string(), style),
    ])
}

fn fmt_opt(value: Option<f32>) -> String {
    value.map_or_else(|| "—".to_string(), |v| format!("{v:.2}"))
}

/// Lines of the side panel.
#[must_use]
pub fn panel_lines(session: &CoachSession, ctx: &DrawContext<'_>) -> Vec<Line<'static>> {
    let m = session.measurement();
    let v = session.verdicts();

    let mut lines = vec![Line::from(Span::styled("─ Face ──────────", HEADER))];
    match m.face.as_ref().and_then(|f| f.anchor()) {
        Some(p) => lines.push(Line::from(format!(" x: {:.2}  y: {:.2}", p.x, p.y))),
        None => lines.push(Line::from(Span::styled(
            " no face",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines.push(Line::from(format!(" Faces: {}", m.face_count)));
    if let Some((expr, conf)) = session.dominant_expression() {
        lines.push(Line::from(format!(" Expr: {expr} ({conf:.2})")));
    }
    if let Some(face) = &m.face {
        for (expr, conf) in face.expressions.iter() {
            lines.push(Line::from(Span::styled(
                format!("   {:<10}{conf:.2}", expr.label()),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("─ Coaching ──────", HEADER)));
    lines.push(verdict_line("Position", feedback_or_idle(v.position)));
    lines.push(verdict_line("Expression", feedback_or_idle(v.expression)));
    lines.push(verdict_line("Volume", v.volume.feedback()));
    lines.push(verdict_line("Brightness", feedback_or_idle(v.brightness)));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("─ Measures ──────", HEADER)));
    lines.push(Line::from(format!(" Volume: {}", fmt_opt(session.max_volume()))));
    lines.push(Line::from(format!(" Level:  {}", fmt_opt(m.loudness))));
    lines.push(Line::from(format!(" Bright: {}", fmt_opt(m.brightness))));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("─ Streams ───────", HEADER)));
    let Streams {
        video,
        audio,
        detection,
    } = session.streams();
    lines.push(status_line("Video", video));
    lines.push(status_line("Audio", audio));
    lines.push(status_line("Detection", detection));

    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        " {:.0} FPS  {:.1}ms",
        ctx.fps.fps(),
        ctx.fps.frame_time_ms()
    )));
    if ctx.dropped_ticks > 0 {
        lines.push(Line::from(Span::styled(
            format!(" {} ticks dropped", ctx.dropped_ticks),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(Span::styled(
        " ? = help",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

/// Draw the help overlay with all keybindings.
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(" camcoach — Controls ", HEADER)),
        Line::from(""),
        Line::from(" q/Esc    Quit"),
        Line::from(" r        Restart session"),
        Line::from(" l        Toggle landmarks"),
        Line::from(" b        Toggle boxes"),
        Line::from(" h        Toggle history"),
        Line::from(" ?        Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 32u16.min(area.width);
    let help_height = (help_text.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}
