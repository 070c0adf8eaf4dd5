use std::{io::stdout, time::Duration};

use crate::byte_source::ByteSource;
use crate::gui::error::ScopeGuiError;
use crate::pipeline::{CycleOutcome, PipelineController, PipelineStats};
use crate::sink::{LagFrame, SinkMode};

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::warn;
use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
    Terminal,
};

/// Series currently on screen. Replaced wholesale on every emitted frame.
#[derive(Default)]
struct Plot {
    lag: Vec<(f64, f64)>,
    channel: Vec<(f64, f64)>,
}

impl Plot {
    fn update(&mut self, frame: &LagFrame, mode: SinkMode) {
        if mode.wants_lag() {
            self.lag = frame.lag_points();
        }
        if mode.wants_channel() {
            self.channel = frame.channel_points();
        }
    }
}

/// Runs the pipeline one cycle at a time, redrawing after each, until the
/// user presses any key. Nothing runs concurrently: a cycle finishes, the
/// screen is drawn, input is polled without waiting, and round it goes.
pub fn live_scope<S: ByteSource>(
    pipeline: &mut PipelineController<S>,
    mode: SinkMode,
) -> Result<PipelineStats, ScopeGuiError> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let res = scope_loop(&mut terminal, pipeline, mode);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    res.map(|_| pipeline.stats())
}

fn scope_loop<B: Backend, S: ByteSource>(
    terminal: &mut Terminal<B>,
    pipeline: &mut PipelineController<S>,
    mode: SinkMode,
) -> Result<(), ScopeGuiError> {
    let mut plot = Plot::default();
    loop {
        match pipeline.run_cycle()? {
            CycleOutcome::Emitted(frame) => plot.update(&frame, mode),
            CycleOutcome::Resync { .. } | CycleOutcome::Skipped { .. } => {}
        }

        let stats = pipeline.stats();
        terminal.draw(|f| ui(f, &plot, mode, &stats))?;

        if event::poll(Duration::ZERO)? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }
    }
    if pipeline.stats().emitted == 0 {
        warn!("Live scope closed before any lag frame was produced");
    }
    Ok(())
}

fn bounds(points: &[(f64, f64)]) -> [f64; 2] {
    let (lo, hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    if !lo.is_finite() || !hi.is_finite() || hi - lo < f64::EPSILON {
        return [-1.0, 1.0];
    }
    let pad = (hi - lo) * 0.05;
    [lo - pad, hi + pad]
}

fn chart<'a>(name: &'a str, points: &'a [(f64, f64)], color: Color) -> Chart<'a> {
    let x_max = points.len().saturating_sub(1).max(1) as f64;
    let [y_lo, y_hi] = bounds(points);
    Chart::new(vec![Dataset::default()
        .name(name)
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(points)])
    .block(
        Block::default()
            .title(Title::from(format!(" {name} ").magenta().bold()))
            .borders(Borders::ALL),
    )
    .x_axis(
        Axis::default()
            .style(Style::default().fg(Color::White))
            .bounds([0.0, x_max])
            .labels(vec![
                Span::from("0"),
                Span::from(format!("{}", x_max as usize / 2)),
                Span::from(format!("{}", x_max as usize)),
            ]),
    )
    .y_axis(
        Axis::default()
            .style(Style::default().fg(Color::White))
            .bounds([y_lo, y_hi])
            .labels(vec![
                Span::from(format!("{y_lo:.2e}")),
                Span::from(format!("{y_hi:.2e}")),
            ]),
    )
}

fn ui(f: &mut Frame, plot: &Plot, mode: SinkMode, stats: &PipelineStats) {
    let rows = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(f.size());
    let (header, body) = (rows[0], rows[1]);

    let status = Paragraph::new(Line::from(vec![
        format!(
            " cycles {}  emitted {}  resyncs {}  skipped {} ",
            stats.cycles, stats.emitted, stats.resyncs, stats.skipped
        )
        .into(),
        " Press any key to stop ".magenta().bold(),
    ]))
    .block(
        Block::default()
            .title(Title::from(" Lag Scope ".magenta().bold()).alignment(Alignment::Center))
            .borders(Borders::ALL),
    );
    f.render_widget(status, header);

    match mode {
        SinkMode::Lag => f.render_widget(chart("lag", &plot.lag, Color::Red), body),
        SinkMode::Channel => {
            f.render_widget(chart("channel 2", &plot.channel, Color::Blue), body)
        }
        SinkMode::Both => {
            let halves = Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(body);
            f.render_widget(chart("lag", &plot.lag, Color::Red), halves[0]);
            f.render_widget(chart("channel 2", &plot.channel, Color::Blue), halves[1]);
        }
    }
}
