use std::{io::stdout, path::PathBuf, time::Duration};

use crate::gui::error::ScopeGuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Lets the user pick one of `available_ports` with the arrow keys.
/// Returns `None` if they quit, or if there is nothing to pick from.
pub fn device_selector(
    mut available_ports: Vec<PathBuf>,
) -> Result<Option<PathBuf>, ScopeGuiError> {
    if available_ports.is_empty() {
        return Ok(None);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let selected = select_loop(&mut terminal, &available_ports);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(selected?.map(|i| available_ports.swap_remove(i)))
}

fn select_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    available_ports: &[PathBuf],
) -> Result<Option<usize>, ScopeGuiError> {
    let n_ports = available_ports.len();
    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));

    loop {
        let title = Title::from(" Microphone Front End ".magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Navigate ".into(),
            "<Up>/<Down>".magenta().bold(),
            " Open ".into(),
            "<Enter>".magenta().bold(),
            " Quit ".into(),
            "<Q> ".magenta().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let port_names = available_ports.iter().map(|p| p.to_string_lossy());
        let list = List::new(port_names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Magenta))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Down => cursor = (cursor + 1) % n_ports,
                        KeyCode::Up => cursor = (cursor + n_ports - 1) % n_ports,
                        KeyCode::Enter => return Ok(Some(cursor)),
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
                        _ => {}
                    }
                }
            }
        }
    }
}
