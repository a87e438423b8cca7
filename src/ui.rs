pub mod charting;

use keypace::{
    history::HistorySummary,
    metrics::CharState,
    passage::Difficulty,
    session::{SessionResult, TypingSession},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.controller.session(), self.state) {
            (None, _) => render_waiting(area, buf),
            (Some(session), AppState::Typing) => render_typing(self, session, area, buf),
            (Some(session), AppState::Results) => match session.result() {
                Some(result) => render_results(self, session, result, area, buf),
                None => render_typing(self, session, area, buf),
            },
        }
    }
}

fn render_waiting(area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "fetching a quote...",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}

fn render_typing(app: &App, session: &TypingSession, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let passage = session.passage();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = passage.text().width();
    let prompt_occupied_lines = if prompt_width <= max_chars_per_line as usize {
        1
    } else {
        ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let spacer = area.height.saturating_sub(prompt_occupied_lines + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(spacer),
            Constraint::Length(2),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let cursor = session.input().len();
    let spans = session
        .char_states()
        .into_iter()
        .zip(session.target())
        .enumerate()
        .map(|(idx, (state, expected))| match state {
            CharState::Correct => Span::styled(expected.to_string(), green_bold_style),
            CharState::Incorrect => {
                let typed = session.input()[idx];
                Span::styled(
                    match typed {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )
            }
            CharState::Untyped if idx == cursor => {
                Span::styled(expected.to_string(), underlined_dim_bold_style)
            }
            CharState::Untyped => Span::styled(expected.to_string(), dim_bold_style),
        })
        .collect::<Vec<Span>>();

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_occupied_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    let snapshot = app.controller.snapshot();
    let clock = match (session.seconds_remaining(), snapshot) {
        (Some(remaining), _) => format!("{remaining}s"),
        (None, Some(snap)) => format!("{:.1}s", snap.elapsed_secs),
        (None, None) => String::new(),
    };
    let live = if session.has_started() {
        format!(
            "{clock}   {} wpm   {}% acc",
            session.wpm(),
            session.accuracy()
        )
    } else {
        clock
    };
    Paragraph::new(Span::styled(live, dim_bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} · {} · {}",
            passage.source(),
            passage.difficulty(),
            passage.category()
        ),
        italic_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

fn render_results(
    app: &App,
    session: &TypingSession,
    result: &SessionResult,
    area: Rect,
    buf: &mut Buffer,
) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // history
            Constraint::Length(1), // difficulty
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let samples = session.wpm_samples();
    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(samples, session.time_limit_secs());
    let points = charting::chart_points(samples);
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} errors   {:.1}s",
            result.wpm, result.accuracy, result.error_count, result.elapsed_secs
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let summary = HistorySummary::from_entries(&app.history);
    if let (Some(best), Some(mean_wpm), Some(mean_acc), Some(sd)) = (
        summary.best_wpm,
        summary.mean_wpm,
        summary.mean_accuracy,
        summary.wpm_std_dev,
    ) {
        Paragraph::new(Span::styled(
            format!(
                "{} tests   best {best} wpm   mean {mean_wpm:.0} wpm / {mean_acc:.0}% acc   {sd:.2} sd",
                summary.points.len()
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    let current = app.controller.settings().difficulty;
    let difficulty_spans = Difficulty::ALL
        .iter()
        .enumerate()
        .map(|(idx, difficulty)| {
            let style = if *difficulty == current {
                Style::default().patch(bold_style).fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            };
            Span::styled(format!(" ({}) {difficulty} ", idx + 1), style)
        })
        .collect::<Vec<_>>();
    Paragraph::new(Line::from(difficulty_spans))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (1-4) difficulty / (esc)ape",
        italic_style,
    ))
    .render(chunks[5], buf);
}
