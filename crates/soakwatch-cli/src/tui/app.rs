//! Live dashboard state and event loop.
//!
//! The orchestrator runs on its own thread and pushes snapshots over a
//! bounded channel. The UI drains the channel every frame, keeps only the
//! newest snapshot plus a short temperature history, and never blocks the
//! tick loop. Quitting raises the shared stop signal; the dashboard closes by
//! itself once the orchestrator drops its end of the channel.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use soakwatch_core::{IntensityLevel, Snapshot, StopSignal, is_valid_temp};

/// Points kept per temperature trace.
const HISTORY_LEN: usize = 120;

/// Fixed facts shown in the title bar.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub level: IntensityLevel,
    pub interval: Duration,
    pub duration: Duration,
    pub planned_ticks: u64,
    pub stress: bool,
    pub csv_log: PathBuf,
}

pub struct App {
    rx: Receiver<Arc<Snapshot>>,
    stop: StopSignal,
    header: RunHeader,
    started: Instant,
    latest: Option<Arc<Snapshot>>,
    received: u64,
    cpu_history: VecDeque<f64>,
    bus_history: VecDeque<f64>,
    running: bool,
}

impl App {
    pub fn new(rx: Receiver<Arc<Snapshot>>, stop: StopSignal, header: RunHeader) -> Self {
        Self {
            rx,
            stop,
            header,
            started: Instant::now(),
            latest: None,
            received: 0,
            cpu_history: VecDeque::with_capacity(HISTORY_LEN),
            bus_history: VecDeque::with_capacity(HISTORY_LEN),
            running: true,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before printing a panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            self.drain();
            if !self.running {
                break;
            }

            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code, key.modifiers);
            }
        }
        Ok(())
    }

    /// Pull every pending snapshot. Closes the dashboard when the producer is gone.
    pub fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => self.push(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running = false;
                    break;
                }
            }
        }
    }

    fn push(&mut self, snapshot: Arc<Snapshot>) {
        push_history(&mut self.cpu_history, snapshot.resources.cpu_temp_c);
        push_history(&mut self.bus_history, snapshot.bus.sensor1_c);
        self.received += 1;
        self.latest = Some(snapshot);
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.request_stop(),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.request_stop(),
            _ => {}
        }
    }

    /// Ask the orchestrator to stop. The view keeps drawing until the
    /// current tick finishes and the channel closes.
    fn request_stop(&mut self) {
        if !self.stop.is_stopped() {
            log::info!("stop requested from dashboard");
        }
        self.stop.stop();
    }

    // -----------------------------------------------------------------------
    // Accessors for ui.rs
    // -----------------------------------------------------------------------

    pub fn header(&self) -> &RunHeader {
        &self.header
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_deref()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stopping(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Valid CPU temperatures as `(tick offset, celsius)` chart points.
    pub fn cpu_points(&self) -> Vec<(f64, f64)> {
        chart_points(&self.cpu_history)
    }

    /// Valid bus sensor-1 temperatures as chart points.
    pub fn bus_points(&self) -> Vec<(f64, f64)> {
        chart_points(&self.bus_history)
    }
}

fn push_history(history: &mut VecDeque<f64>, celsius: f64) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(celsius);
}

/// Sentinels leave gaps; x stays the position in the window.
fn chart_points(history: &VecDeque<f64>) -> Vec<(f64, f64)> {
    history
        .iter()
        .enumerate()
        .filter(|(_, c)| is_valid_temp(**c))
        .map(|(i, &c)| (i as f64, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use soakwatch_core::{BusSample, ResourceReading, ResourceSample, TEMP_SENTINEL_C};
    use std::collections::BTreeMap;
    use std::sync::mpsc;
    use std::time::SystemTime;

    fn header() -> RunHeader {
        RunHeader {
            level: IntensityLevel::Medium,
            interval: Duration::from_secs(2),
            duration: Duration::from_secs(300),
            planned_ticks: 150,
            stress: true,
            csv_log: PathBuf::from("logs/soak.csv"),
        }
    }

    fn snap(tick: u64, cpu_temp: f64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            tick,
            tick_time: SystemTime::now(),
            level: IntensityLevel::Medium,
            bus: BusSample::failed("no frame"),
            reachability: Vec::new(),
            resources: ResourceSample::from_reading(ResourceReading {
                cpu_pct: 1.0,
                mem_pct: 2.0,
                disk_pct: 3.0,
                cpu_temp_c: cpu_temp,
            }),
            stress: BTreeMap::new(),
            assembly_time: Duration::ZERO,
        })
    }

    #[test]
    fn test_drain_keeps_latest() {
        let (tx, rx) = mpsc::sync_channel(8);
        let mut app = App::new(rx, StopSignal::new(), header());
        tx.send(snap(0, 40.0)).unwrap();
        tx.send(snap(1, 41.6)).unwrap();
        app.drain();
        assert!(app.running);
        assert_eq!(app.received(), 2);
        assert_eq!(app.latest().unwrap().tick, 1);
        assert_eq!(app.cpu_points(), vec![(0.0, 40.0), (1.0, 41.6)]);
        assert!(app.bus_points().is_empty());
    }

    #[test]
    fn test_disconnect_closes_view() {
        let (tx, rx) = mpsc::sync_channel(8);
        let mut app = App::new(rx, StopSignal::new(), header());
        tx.send(snap(0, 40.0)).unwrap();
        drop(tx);
        app.drain();
        assert!(!app.running);
        assert_eq!(app.received(), 1);
    }

    #[test]
    fn test_quit_raises_stop() {
        let (_tx, rx) = mpsc::sync_channel::<Arc<Snapshot>>(1);
        let stop = StopSignal::new();
        let mut app = App::new(rx, stop.clone(), header());
        app.handle_key(KeyCode::Char('x'), KeyModifiers::NONE);
        assert!(!stop.is_stopped());
        app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(stop.is_stopped());
        assert!(app.stopping());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut h = VecDeque::new();
        for _ in 0..HISTORY_LEN + 10 {
            push_history(&mut h, 50.0);
        }
        push_history(&mut h, TEMP_SENTINEL_C);
        assert_eq!(h.len(), HISTORY_LEN);
        assert_eq!(chart_points(&h).len(), HISTORY_LEN - 1);
    }
}
