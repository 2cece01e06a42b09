//! Typing Input - terminal playground
//!
//! Feeds terminal key events through the input pipeline and shows what it
//! publishes. `--replay <trace.json>` runs a recorded trace instead and
//! prints the report.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Terminal,
};
use std::{
    env,
    fs::File,
    io::stdout,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use typing_input::{
    config::{self, Config},
    replay::{self, Trace},
    ui::{to_logical, App, AppState, AppView, EventLogPanel, HelpPanel, ShortcutsPanel, StatusBar, TabBar, WordPanel},
};

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // The terminal belongs to the UI, so logs go to a file when possible.
    if let Ok(file) = config::config_dir().and_then(|dir| Ok(File::create(dir.join("typing-input.log"))?)) {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

fn run_replay(path: &Path, config: &Config) -> Result<()> {
    let trace = Trace::load(path).with_context(|| format!("loading trace {}", path.display()))?;
    let report = replay::run(&trace, config)?;
    println!("{}", report.to_json()?);
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default config: {}", e);
            Config::default()
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    if let [flag, path] = args.as_slice() {
        if flag == "--replay" {
            return run_replay(Path::new(path), &config);
        }
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.clone())?;
    let tick_rate = config.refresh_interval();

    loop {
        app.tick(Instant::now());

        terminal.draw(|frame| {
            let colors = app.colors();
            frame.render_widget(Block::default().style(Style::default().bg(colors.bg)), frame.area());

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Tab bar
                    Constraint::Length(5), // Word
                    Constraint::Min(6),    // Main content
                    Constraint::Length(1), // Status bar
                ])
                .split(frame.area());

            let tab_names: Vec<&str> = AppView::all().iter().map(|v| v.name()).collect();
            frame.render_widget(TabBar::new(&tab_names, app.view.index(), colors), chunks[0]);
            frame.render_widget(WordPanel::new(app.word(), &app.input, app.completed, colors), chunks[1]);

            match app.view {
                AppView::Practice => frame.render_widget(EventLogPanel::new(&app.log, colors), chunks[2]),
                AppView::Shortcuts => {
                    let shortcuts = app.manager.context().shortcuts();
                    frame.render_widget(ShortcutsPanel::new(&shortcuts, colors), chunks[2]);
                }
                AppView::Help => frame.render_widget(HelpPanel::new(colors), chunks[2]),
            }

            let elapsed = app.elapsed_formatted();
            let status = StatusBar::new(app.is_listening(), app.view.name(), &elapsed, app.total_events, colors)
                .message(app.get_status());
            frame.render_widget(status, chunks[3]);
        })?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                let pressed = key.kind != KeyEventKind::Release;
                match key.code {
                    CtKeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
                    CtKeyCode::F(1) if pressed => app.next_view(),
                    CtKeyCode::F(2) if pressed => app.toggle_listening(),
                    _ => {
                        if let Some(logical) = to_logical(&key, Instant::now()) {
                            app.handle_key(logical);
                        }
                    }
                }
            }
        }

        if interrupted.load(Ordering::Relaxed) {
            app.quit();
        }

        if app.state == AppState::Quitting {
            break;
        }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    println!("\nTyping Input session complete.");
    println!("Words completed: {}", app.completed);
    println!("Publications: {}", app.total_events);
    println!("Session duration: {}", app.elapsed_formatted());

    Ok(())
}
