use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::{Color, Style},
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, Borders,
    },
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};

use emonitor::{
    cues::CuePlayer,
    geometry::{Role, Scene},
    monitor::Monitor,
};

const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Counts drawn frames and turns them into a rate every [`FPS_WINDOW`].
struct FpsCounter {
    frames: u32,
    since: Instant,
    fps: f64,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
            fps: 0.0,
        }
    }

    fn frame(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= FPS_WINDOW {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

pub fn engage_gui<P: CuePlayer>(monitor: &mut Monitor<P>, tick_rate: f64) -> io::Result<()> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, monitor, Duration::from_secs_f64(1.0 / tick_rate));

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend, P: CuePlayer>(
    terminal: &mut Terminal<B>,
    monitor: &mut Monitor<P>,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut fps = FpsCounter::new();
    let mut last_tick = Instant::now();
    loop {
        monitor.tick();
        terminal.draw(|f| ui(f, monitor, fps.fps))?;
        fps.frame();

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
                {
                    return Ok(());
                }
            }
        }
        last_tick = Instant::now();
    }
}

fn color(role: Role) -> Color {
    match role {
        Role::Target => Color::Black,
        Role::Limit => Color::Blue,
        Role::Measured => Color::Red,
    }
}

fn ui<P: CuePlayer>(f: &mut Frame, monitor: &Monitor<P>, fps: f64) {
    let counters = monitor.counters();
    let listening = monitor
        .receiver()
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "?".to_owned());
    let block = Block::default()
        .title(format!(
            " EMonitor {} | {:.0} fps | {} frames | {} dropped | Esc to exit ",
            listening, fps, counters.applied, counters.errors
        ))
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Black).bg(Color::White));

    let area = f.size();
    let inner = block.inner(area);

    // Braille markers give two dots per cell across and four down.
    let width = f64::from(inner.width) * 2.0;
    let height = f64::from(inner.height) * 4.0;
    let scene = Scene::layout(monitor.state(), width, height);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .background_color(Color::White)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for ring in scene.rings.iter().chain([&scene.measured_ring]) {
                ctx.draw(&Circle {
                    x: scene.center_x,
                    y: scene.center_y,
                    radius: ring.radius,
                    color: color(ring.role),
                });
            }
            for line in &scene.lines {
                ctx.draw(&CanvasLine {
                    x1: 0.0,
                    y1: line.y,
                    x2: scene.width,
                    y2: line.y,
                    color: color(line.role),
                });
            }
        });

    f.render_widget(canvas, area);
}
