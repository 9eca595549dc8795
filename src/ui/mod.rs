pub mod app;
pub mod widgets;

use crate::api::NewsApi;
use crate::config::PollingConfig;
use crate::Result;
use app::App;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::sync::Arc;
use tracing::info;

/// Runs the interactive client until the user quits. The terminal is
/// restored even when the loop fails.
pub async fn run_tui(api: Arc<dyn NewsApi>, polling: PollingConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, api, polling).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    api: Arc<dyn NewsApi>,
    polling: PollingConfig,
) -> Result<()> {
    let (mut app, mut messages, mut poll_events) = App::new(api, polling);
    let mut events = EventStream::new();
    app.load_news();
    info!("tui started");

    while !app.should_quit() {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            Some(event) = events.next() => match event? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            },
            Some(message) = messages.recv() => app.handle_message(message),
            Some(event) = poll_events.recv() => app.handle_poll_event(event),
            else => break,
        }
    }

    info!("tui stopped");
    Ok(())
}
