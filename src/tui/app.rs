use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info};

use crate::io::tracker::{FieldUpdate, Tracker, TrackerError};

use super::render;
use super::session::{Session, SessionExit};
use super::theme::Theme;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type WriteResult = (FieldUpdate, Result<(), TrackerError>);

/// How the interactive session ended
#[derive(Debug)]
pub struct Outcome {
    pub exit: SessionExit,
    /// Writes that failed after the screen was already closing
    pub late_failures: Vec<String>,
}

/// Single background thread that runs queued field writes in order
struct Writer {
    tx: Option<Sender<FieldUpdate>>,
    done: Receiver<WriteResult>,
    handle: Option<JoinHandle<()>>,
}

impl Writer {
    fn spawn<T>(tracker: T) -> Self
    where
        T: Tracker + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<FieldUpdate>();
        let (done_tx, done) = mpsc::channel::<WriteResult>();
        let handle = thread::spawn(move || {
            for update in rx {
                debug!(%update, "writing");
                let result = tracker.update(&update);
                if done_tx.send((update, result)).is_err() {
                    break;
                }
            }
        });
        Writer {
            tx: Some(tx),
            done,
            handle: Some(handle),
        }
    }

    fn send(&self, update: FieldUpdate) -> Result<(), FieldUpdate> {
        match &self.tx {
            Some(tx) => tx.send(update).map_err(|e| e.0),
            None => Err(update),
        }
    }

    /// Stop accepting writes and wait for the queue to drain
    fn finish(&mut self) -> Vec<WriteResult> {
        self.tx = None;
        let results = self.done.iter().collect();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        results
    }
}

/// Run the TUI application until the session exits
pub fn run<T>(
    mut session: Session,
    tracker: T,
    theme: Theme,
) -> Result<Outcome, Box<dyn std::error::Error>>
where
    T: Tracker + Clone + Send + 'static,
{
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let size = terminal.size()?;
    session.resize(size.width, size.height);

    let mut writer = Writer::spawn(tracker.clone());
    let result = run_event_loop(&mut terminal, &mut session, &tracker, &theme, &writer);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    let mut late_failures = Vec::new();
    for (update, written) in writer.finish() {
        if let Err(e) = &written {
            late_failures.push(format!("update failed: {}: {}", update, e));
        }
        session.write_finished(&update, written);
    }

    result?;
    let exit = session.take_exit().unwrap_or(SessionExit::Cancelled);
    info!(?exit, "session ended");
    Ok(Outcome {
        exit,
        late_failures,
    })
}

fn run_event_loop<T: Tracker>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session,
    tracker: &T,
    theme: &Theme,
    writer: &Writer,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        for update in session.take_outbox() {
            if let Err(update) = writer.send(update) {
                let err = TrackerError::Io(io::Error::other("writer thread stopped"));
                session.write_finished(&update, Err(err));
            }
        }
        while let Ok((update, result)) = writer.done.try_recv() {
            session.write_finished(&update, result);
        }

        terminal.draw(|frame| render::render(frame, session, theme))?;

        if session.exit().is_some() {
            break;
        }

        // Draw first so the busy indicator is on screen while the call blocks
        if session.pending().is_some() {
            // Queued writes land before the call re-fetches
            while session.writes_in_flight() > 0 {
                match writer.done.recv() {
                    Ok((update, result)) => session.write_finished(&update, result),
                    Err(_) => break,
                }
            }
            session.run_pending(tracker);
            continue;
        }

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => session.handle_key(key),
                Event::Paste(text) => session.paste(&text),
                Event::Resize(w, h) => session.resize(w, h),
                _ => {}
            }
        }
    }
    Ok(())
}
