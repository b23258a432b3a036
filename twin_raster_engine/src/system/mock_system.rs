/// Mock windowing system for unit tests
///
/// `run` replays a scripted list of window events into the listener and
/// returns once the script is exhausted (as if the window was closed).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::graphics::{GraphicsApi, PresentationProperties};
use crate::system::{Key, System, SystemInfo, SystemListener, Timer};

/// One scripted window event
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ScriptEvent {
    Idle,
    KeyDown(Key),
    KeyUp(Key),
    Char(char),
    Reset(GraphicsApi),
    Resize(u32, u32),
}

/// Counters shared with the test after the system is boxed into the engine
#[derive(Debug, Default)]
pub(crate) struct SystemMonitor {
    pub initialize_calls: u32,
    pub shutdown_calls: u32,
    pub run_calls: u32,
    pub events_delivered: u32,
    pub window_open: bool,
    pub last_properties: Option<PresentationProperties>,
}

pub(crate) struct MockSystem {
    script: VecDeque<ScriptEvent>,
    info: SystemInfo,
    frame_ms: f32,
    fail_initialize: bool,
    monitor: Rc<RefCell<SystemMonitor>>,
}

impl MockSystem {
    pub fn new(application_directory: PathBuf) -> Self {
        Self {
            script: VecDeque::new(),
            info: SystemInfo {
                window: None,
                display: None,
                supported_apis: GraphicsApi::ALL.to_vec(),
                application_directory,
            },
            frame_ms: 16.0,
            fail_initialize: false,
            monitor: Rc::new(RefCell::new(SystemMonitor::default())),
        }
    }

    pub fn with_script(mut self, events: impl IntoIterator<Item = ScriptEvent>) -> Self {
        self.script.extend(events);
        self
    }

    pub fn with_supported_apis(mut self, apis: &[GraphicsApi]) -> Self {
        self.info.supported_apis = apis.to_vec();
        self
    }

    pub fn with_frame_ms(mut self, frame_ms: f32) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn monitor(&self) -> Rc<RefCell<SystemMonitor>> {
        self.monitor.clone()
    }
}

impl System for MockSystem {
    fn initialize(&mut self, properties: &PresentationProperties) -> Result<()> {
        let mut monitor = self.monitor.borrow_mut();
        monitor.initialize_calls += 1;
        monitor.last_properties = Some(*properties);
        if self.fail_initialize {
            return Err(Error::InitializationFailed("mock window creation failed".to_string()));
        }
        monitor.window_open = true;
        Ok(())
    }

    fn run(&mut self, listener: &mut dyn SystemListener) -> Result<()> {
        self.monitor.borrow_mut().run_calls += 1;
        while let Some(event) = self.script.pop_front() {
            self.monitor.borrow_mut().events_delivered += 1;
            match event {
                ScriptEvent::Idle => listener.on_idle()?,
                ScriptEvent::KeyDown(key) => listener.on_key_down(key),
                ScriptEvent::KeyUp(key) => listener.on_key_up(key),
                ScriptEvent::Char(character) => listener.on_char(character),
                ScriptEvent::Reset(api) => listener.on_graphics_reset(api)?,
                ScriptEvent::Resize(width, height) => listener.on_window_resize(width, height),
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut monitor = self.monitor.borrow_mut();
        if monitor.window_open {
            monitor.window_open = false;
            monitor.shutdown_calls += 1;
        }
    }

    fn current_application_directory(&self) -> PathBuf {
        self.info.application_directory.clone()
    }

    fn create_timer(&self) -> Box<dyn Timer> {
        Box::new(FixedStepTimer::new(self.frame_ms))
    }

    fn info(&self) -> SystemInfo {
        self.info.clone()
    }
}

/// Timer reporting the same step on every tick while running
#[derive(Debug)]
pub(crate) struct FixedStepTimer {
    step_ms: f32,
    running: bool,
    elapsed: f32,
}

impl FixedStepTimer {
    pub fn new(step_ms: f32) -> Self {
        Self { step_ms, running: false, elapsed: 0.0 }
    }
}

impl Timer for FixedStepTimer {
    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
        self.elapsed = 0.0;
    }

    fn stop(&mut self) {
        self.running = false;
        self.elapsed = 0.0;
    }

    fn run(&mut self) {
        self.elapsed = if self.running { self.step_ms } else { 0.0 };
    }

    fn elapsed_time(&self) -> f32 {
        self.elapsed
    }
}
