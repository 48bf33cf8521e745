//! Human behavior simulation
//!
//! Runs idle-browsing loops against a page: mouse movement along cubic
//! Bezier curves, periodic scrolling, and a visible cursor overlay. A
//! navigation watcher pauses the loops while the page loads and resumes
//! them once the network settles.

use bezier_rs::{Bezier, TValue};
use rand::Rng;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cdp::EvaluationResult;
use crate::session::PageSession;
use crate::Error;

/// Simulator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl SimulatorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SimulatorState::Running,
            2 => SimulatorState::Paused,
            3 => SimulatorState::Stopped,
            _ => SimulatorState::Idle,
        }
    }
}

/// Loop timing knobs
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// Interval between mouse movement bursts
    pub mouse_move_interval_ms: u64,
    /// Interval between scroll steps
    pub scroll_interval_ms: u64,
    /// Pixels scrolled per step
    pub scroll_amount: f64,
    /// Bounds of the random pause between curve points
    pub step_delay_min_ms: u64,
    pub step_delay_max_ms: u64,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            mouse_move_interval_ms: 3000,
            scroll_interval_ms: 5000,
            scroll_amount: 100.0,
            step_delay_min_ms: 50,
            step_delay_max_ms: 150,
        }
    }
}

/// Cubic Bezier path from start to end.
///
/// Control points sit at 1/3 and 2/3 of the segment with a small random
/// offset; the curve is sampled at 21 evenly spaced points.
pub fn bezier_path(start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    if dx == 0.0 && dy == 0.0 {
        // Zero-length curves cannot be arc-length sampled.
        return vec![start; 21];
    }

    let mut rng = rand::thread_rng();
    let mut jitter = || (rng.gen::<f64>() - 0.5) * 0.1;

    let cp1 = (
        start.0 + dx * (1.0 / 3.0 + jitter()),
        start.1 + dy * (1.0 / 3.0 + jitter()),
    );
    let cp2 = (
        start.0 + dx * (2.0 / 3.0 + jitter()),
        start.1 + dy * (2.0 / 3.0 + jitter()),
    );

    let bezier = Bezier::from_cubic_coordinates(
        start.0, start.1, cp1.0, cp1.1, cp2.0, cp2.1, end.0, end.1,
    );

    (0..=20)
        .map(|i| {
            let t = f64::from(i) * 0.05;
            let point = bezier.evaluate(TValue::Euclidean(t.min(1.0)));
            (point.x, point.y)
        })
        .collect()
}

const CURSOR_INSTALL_SCRIPT: &str = r#"(function() {
    if (!document.querySelector('#custom-cursor')) {
        const cursor = document.createElement('div');
        cursor.id = 'custom-cursor';
        cursor.style.position = 'fixed';
        cursor.style.width = '24px';
        cursor.style.height = '24px';
        cursor.style.borderRadius = '50%';
        cursor.style.background = 'radial-gradient(circle, rgba(0,0,255,0.7) 0%, rgba(255,0,255,0.7) 100%)';
        cursor.style.border = '1px solid #1a0033';
        cursor.style.pointerEvents = 'none';
        cursor.style.zIndex = '9999999';
        cursor.style.boxShadow = '0 0 5px rgba(0,0,0,0.5)';
        document.body.appendChild(cursor);
    }
})();"#;

/// Idle-browsing simulator bound to one page
pub struct BehaviorSimulator {
    page: Arc<dyn PageSession>,
    options: SimulatorOptions,
    state: Arc<AtomicU8>,
    /// Last cursor position, shared with the mouse loop
    cursor: Arc<Mutex<(f64, f64)>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BehaviorSimulator {
    pub fn new(page: Arc<dyn PageSession>, options: SimulatorOptions) -> Self {
        Self {
            page,
            options,
            state: Arc::new(AtomicU8::new(SimulatorState::Idle as u8)),
            cursor: Arc::new(Mutex::new((0.0, 0.0))),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> SimulatorState {
        SimulatorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Suspend the loops without tearing them down
    pub fn pause(&self) {
        // Stopped is terminal
        let _ = self.state.compare_exchange(
            SimulatorState::Running as u8,
            SimulatorState::Paused as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn resume(&self) {
        let _ = self.state.compare_exchange(
            SimulatorState::Paused as u8,
            SimulatorState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Stop the loops permanently
    pub async fn stop(&self) {
        self.state
            .store(SimulatorState::Stopped as u8, Ordering::SeqCst);

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    /// Install the cursor overlay and spawn the browsing loops
    pub async fn start(&self) -> Result<(), Error> {
        if self.state() == SimulatorState::Running {
            return Ok(());
        }
        self.state
            .store(SimulatorState::Running as u8, Ordering::SeqCst);

        Self::show_cursor(&self.page).await;

        let mut handles = self.handles.lock().await;
        handles.push(tokio::spawn(Self::mouse_loop(
            Arc::clone(&self.page),
            self.options.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.cursor),
        )));
        handles.push(tokio::spawn(Self::scroll_loop(
            Arc::clone(&self.page),
            self.options.clone(),
            Arc::clone(&self.state),
        )));
        handles.push(tokio::spawn(Self::navigation_watcher(
            Arc::clone(&self.page),
            Arc::clone(&self.state),
        )));

        Ok(())
    }

    /// Create the overlay div, retrying while the document settles
    async fn show_cursor(page: &Arc<dyn PageSession>) {
        for attempt in 0..3 {
            match page.evaluate(CURSOR_INSTALL_SCRIPT, false).await {
                Ok(_) => return,
                Err(e) => {
                    debug!("Cursor install attempt {} failed: {}", attempt + 1, e);
                    tokio::time::sleep(tokio::time::Duration::from_millis(1000)).await;
                }
            }
        }
        warn!("Cursor overlay could not be installed");
    }

    /// Move the overlay; falls back to a native mouse event when the
    /// overlay script keeps failing.
    async fn move_cursor(page: &Arc<dyn PageSession>, x: f64, y: f64) {
        let script = format!(
            "(function() {{ \
               const cursor = document.querySelector('#custom-cursor'); \
               if (cursor) {{ cursor.style.left = '{x}px'; cursor.style.top = '{y}px'; }} \
               window.mouseX = {x}; window.mouseY = {y}; \
             }})();",
            x = x,
            y = y
        );

        for attempt in 0..3 {
            match page.evaluate(&script, false).await {
                Ok(_) => {
                    // Keep the real pointer in sync with the overlay.
                    let _ = page
                        .cdp()
                        .dispatch_mouse_event("mouseMoved", x, y, None, None)
                        .await;
                    return;
                }
                Err(e) => {
                    debug!("Cursor move attempt {} failed: {}", attempt + 1, e);
                    if attempt == 2 {
                        let _ = page
                            .cdp()
                            .dispatch_mouse_event("mouseMoved", x, y, None, None)
                            .await;
                        return;
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                }
            }
        }
    }

    async fn viewport_size(page: &Arc<dyn PageSession>) -> (f64, f64) {
        let result = page
            .evaluate(
                "({ width: window.innerWidth, height: window.innerHeight })",
                false,
            )
            .await;

        match result {
            Ok(EvaluationResult::Object(value)) => {
                let width = value.get("width").and_then(|v| v.as_f64()).unwrap_or(1280.0);
                let height = value.get("height").and_then(|v| v.as_f64()).unwrap_or(720.0);
                (width, height)
            }
            _ => (1280.0, 720.0),
        }
    }

    async fn mouse_loop(
        page: Arc<dyn PageSession>,
        options: SimulatorOptions,
        state: Arc<AtomicU8>,
        cursor: Arc<Mutex<(f64, f64)>>,
    ) {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_millis(options.mouse_move_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match SimulatorState::from_u8(state.load(Ordering::SeqCst)) {
                SimulatorState::Stopped => break,
                SimulatorState::Running => {}
                _ => continue,
            }
            if !page.is_active() {
                break;
            }

            let (width, height) = Self::viewport_size(&page).await;
            let start = *cursor.lock().await;

            // Path and delays are generated up front; the rng cannot be
            // held across an await.
            let steps: Vec<((f64, f64), u64)> = {
                let mut rng = rand::thread_rng();
                let end = (rng.gen::<f64>() * width, rng.gen::<f64>() * height);
                bezier_path(start, end)
                    .into_iter()
                    .map(|point| {
                        let delay =
                            rng.gen_range(options.step_delay_min_ms..=options.step_delay_max_ms);
                        (point, delay)
                    })
                    .collect()
            };

            for ((x, y), delay) in steps {
                if SimulatorState::from_u8(state.load(Ordering::SeqCst)) != SimulatorState::Running
                {
                    break;
                }
                Self::move_cursor(&page, x, y).await;
                *cursor.lock().await = (x, y);
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }
        }
    }

    async fn scroll_loop(
        page: Arc<dyn PageSession>,
        options: SimulatorOptions,
        state: Arc<AtomicU8>,
    ) {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_millis(options.scroll_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match SimulatorState::from_u8(state.load(Ordering::SeqCst)) {
                SimulatorState::Stopped => break,
                SimulatorState::Running => {}
                _ => continue,
            }
            if !page.is_active() {
                break;
            }

            if let Err(e) = page.scroll_by(0.0, options.scroll_amount).await {
                debug!("Scroll step failed: {}", e);
            }
        }
    }

    /// Pause on navigation, resume once the target page settles
    async fn navigation_watcher(page: Arc<dyn PageSession>, state: Arc<AtomicU8>) {
        let mut events = match page.cdp().subscribe_events("Page.frameNavigated").await {
            Ok(events) => events,
            Err(e) => {
                warn!("Navigation watcher could not subscribe: {}", e);
                return;
            }
        };

        while let Some(_event) = events.recv().await {
            if SimulatorState::from_u8(state.load(Ordering::SeqCst)) == SimulatorState::Stopped {
                break;
            }

            debug!("Navigation detected, pausing simulation");
            let _ = state.compare_exchange(
                SimulatorState::Running as u8,
                SimulatorState::Paused as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );

            if let Err(e) = page.wait_for_network_idle(60_000).await {
                warn!("Page did not settle after navigation: {}", e);
            }
            if let Err(e) = Self::wait_for_stable_network(&page, 30_000).await {
                warn!("Network did not stabilize after navigation: {}", e);
            }

            Self::show_cursor(&page).await;

            let _ = state.compare_exchange(
                SimulatorState::Paused as u8,
                SimulatorState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            debug!("Simulation resumed after navigation");
        }
    }

    /// Poll navigator.onLine until the page reports connectivity.
    ///
    /// Pages without the API pass after a one second grace period.
    pub async fn wait_for_stable_network(
        page: &Arc<dyn PageSession>,
        timeout_ms: u64,
    ) -> Result<(), Error> {
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(timeout_ms);

        loop {
            match page.evaluate("'onLine' in navigator ? navigator.onLine : null", false).await {
                Ok(EvaluationResult::Bool(true)) => return Ok(()),
                Ok(EvaluationResult::Null) => {
                    tokio::time::sleep(tokio::time::Duration::from_millis(1000)).await;
                    return Ok(());
                }
                Ok(_) | Err(_) => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout("Network did not stabilize"));
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(1000)).await;
        }
    }
}
