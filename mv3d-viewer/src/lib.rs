/// MV3D terminal viewer
///
/// Owns at most one scene session at a time. Opening a URL tears down the
/// previous session before constructing the next, and fetch results are
/// matched against the live session's generation so late arrivals from a
/// replaced session are dropped.
use std::io::{self, stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use tracing::{info, warn};

use mv3d_core::obj;

pub mod client;
pub mod controls;
pub mod fetch;
pub mod notify;
pub mod renderer;
pub mod session;

use fetch::{FetchResult, MeshFetcher};
use notify::{NoticeBoard, NoticeLevel};
use session::{SceneSession, SceneState};

pub const EXPORT_FILENAME: &str = "exported_model.obj";

const ROTATE_SPEED: f32 = 0.05;
const PAN_SPEED: f32 = 0.1;

/// Main application struct for the terminal model viewer
pub struct ViewerApp {
    session: Option<SceneSession>,
    next_generation: u64,
    fetcher: MeshFetcher,
    notices: NoticeBoard,
    width: usize,
    height: usize,
    running: bool,
    drag_from: Option<(u16, u16)>,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl ViewerApp {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            session: None,
            next_generation: 0,
            fetcher: MeshFetcher::new(),
            notices: NoticeBoard::new(),
            width,
            height,
            running: true,
            drag_from: None,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn from_terminal() -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::new(width as usize, height as usize))
    }

    pub fn session(&self) -> Option<&SceneSession> {
        self.session.as_ref()
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    /// Open a model URL: tear down any previous session, construct a fresh
    /// one, and start fetching in the background.
    pub fn open(&mut self, url: &str) {
        self.close_session();

        self.next_generation += 1;
        let generation = self.next_generation;
        let session = SceneSession::new(url.to_string(), generation, self.width, self.height);
        self.fetcher.spawn(url.to_string(), generation);
        self.session = Some(session);
        info!("opening {url} (generation {generation})");
    }

    /// Tear down the current session, if any. Safe to call repeatedly.
    pub fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }

    /// Route a completed fetch to the session that requested it; results
    /// from replaced sessions are dropped.
    pub fn on_fetch_result(&mut self, result: FetchResult) {
        let Some(session) = self.session.as_mut() else {
            warn!("dropping fetch result for {}: no live session", result.url);
            return;
        };
        if session.generation() != result.generation {
            warn!(
                "dropping stale fetch result for {} (generation {})",
                result.url, result.generation
            );
            return;
        }

        match result.outcome {
            Ok(mesh) => {
                info!("loaded {} ({} triangles)", result.url, mesh.triangle_count());
                session.attach_mesh(mesh);
            }
            Err(err) => {
                // Scene stays valid, just mesh-less
                warn!("failed to load {}: {err}", result.url);
                self.notices.error("Failed to load model");
            }
        }
    }

    /// Export the current mesh as OBJ next to the working directory
    pub fn export_current(&mut self) {
        self.export_to(Path::new(EXPORT_FILENAME));
    }

    /// Export the current mesh as OBJ to `path`; notifies instead of
    /// writing when no mesh is loaded.
    pub fn export_to(&mut self, path: &Path) {
        let Some(mesh) = self.session.as_ref().and_then(|s| s.mesh()) else {
            self.notices.error("No model loaded to export");
            return;
        };

        let result = std::fs::File::create(path)
            .and_then(|mut file| obj::write_obj(mesh, &mut file));
        match result {
            Ok(()) => {
                info!("exported mesh to {}", path.display());
                self.notices.info(format!("Model exported to {}", path.display()));
            }
            Err(err) => {
                warn!("export to {} failed: {err}", path.display());
                self.notices.error("Export failed");
            }
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            // Deliver completed fetches
            while let Some(result) = self.fetcher.try_recv() {
                self.on_fetch_result(result);
            }

            // Update and render
            if let Some(session) = self.session.as_mut() {
                if session.state() == SceneState::Ready {
                    session.update();
                }
                session.render_frame();
            }
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, .. }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char('o') => {
                    self.export_current();
                }
                _ => {}
            },
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                self.width = width as usize;
                self.height = height as usize;
                if let Some(session) = self.session.as_mut() {
                    session.resize(self.width, self.height);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_from = None;
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((px, py)) = self.drag_from {
                    let dx = mouse.column as f32 - px as f32;
                    let dy = mouse.row as f32 - py as f32;
                    if mouse.modifiers.contains(KeyModifiers::SHIFT) {
                        session.controls.pan(-dx * PAN_SPEED, dy * PAN_SPEED);
                    } else {
                        session.controls.rotate(dx * ROTATE_SPEED, dy * ROTATE_SPEED);
                    }
                }
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::ScrollUp => {
                let step = session.controls.distance() * 0.1;
                session.controls.zoom(-step);
            }
            MouseEventKind::ScrollDown => {
                let step = session.controls.distance() * 0.1;
                session.controls.zoom(step);
            }
            _ => {}
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let mut stdout = stdout();

        match self.session.as_ref().map(|s| s.state()) {
            Some(SceneState::Ready) => {
                let session = self.session.as_ref().unwrap();
                queue!(stdout, cursor::MoveTo(0, 0))?;
                session.renderer.draw(&mut stdout)?;
            }
            Some(_) => self.draw_placeholder(&mut stdout, "Loading model...")?,
            None => self.draw_placeholder(&mut stdout, "No file selected")?,
        }

        // Status overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "MV3D Viewer | FPS: {:.1} | Drag=Rotate Shift+Drag=Pan Scroll=Zoom O=Export Q=Quit",
                self.fps
            )),
            ResetColor
        )?;

        if let Some(notice) = self.notices.current() {
            let color = match notice.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Warn => Color::Yellow,
                NoticeLevel::Error => Color::Red,
            };
            let row = self.height.saturating_sub(1) as u16;
            queue!(
                stdout,
                cursor::MoveTo(0, row),
                Clear(ClearType::CurrentLine),
                SetForegroundColor(color),
                Print(&notice.text),
                ResetColor
            )?;
        }

        stdout.flush()
    }

    fn draw_placeholder<W: Write>(&self, writer: &mut W, message: &str) -> io::Result<()> {
        let col = (self.width.saturating_sub(message.len()) / 2) as u16;
        let row = (self.height / 2) as u16;
        queue!(
            writer,
            Clear(ClearType::All),
            cursor::MoveTo(col, row),
            SetForegroundColor(Color::Grey),
            Print(message),
            ResetColor
        )?;
        Ok(())
    }
}
