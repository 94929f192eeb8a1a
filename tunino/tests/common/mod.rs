//! Mock daemon, inputs and side effects for driving the workers in tests.
//!
//! `MockDaemon` stands in for MPD: every session it hands out records calls
//! into one shared log and mutates one shared playback state, so a test can
//! assert on the exact command sequence the workers produced.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mpd_client::{Connector, DaemonStatus, PlaybackSession, SessionError, TransportState};
use tunino::clock::{Clock, ManualClock};
use tunino::config::{Config, Settings, Timings};
use tunino::error::{PowerError, SoundError};
use tunino::power::PowerControl;
use tunino::sound::NotificationSound;
use tunino::tracks::TagToTrackMap;
use tunino_hardware::{DigitalInput, InputError, ReaderError, TagId, TagReader};

/// One command as the daemon received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status,
    TogglePause,
    Pause,
    SetVolume(u8),
    Clear,
    Enqueue(String),
    PlayFromStart,
}

#[derive(Debug, Default)]
struct DaemonState {
    calls: Vec<Call>,
    transport: TransportState,
    volume: u8,
    queue: Vec<String>,
    generation: u32,
}

/// Shared fake MPD server state
#[derive(Clone, Default)]
pub struct MockDaemon {
    state: Arc<Mutex<DaemonState>>,
    refuse_connections: Arc<AtomicBool>,
    connects: Arc<AtomicU32>,
}

impl MockDaemon {
    pub fn new(transport: TransportState, volume: u8) -> Self {
        let daemon = Self::default();
        {
            let mut state = daemon.state.lock().unwrap();
            state.transport = transport;
            state.volume = volume;
        }
        daemon
    }

    pub fn connector(&self) -> Box<dyn Connector> {
        Box::new(MockConnector {
            daemon: self.clone(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls other than status probes
    pub fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| *call != Call::Status)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    pub fn transport(&self) -> TransportState {
        self.state.lock().unwrap().transport
    }

    pub fn queue(&self) -> Vec<String> {
        self.state.lock().unwrap().queue.clone()
    }

    pub fn set_transport(&self, transport: TransportState) {
        self.state.lock().unwrap().transport = transport;
    }

    /// Kill every open session; new connections still succeed
    pub fn break_connection(&self) {
        self.state.lock().unwrap().generation += 1;
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

struct MockConnector {
    daemon: MockDaemon,
}

impl Connector for MockConnector {
    fn connect(&self) -> Result<Box<dyn PlaybackSession>, SessionError> {
        if self.daemon.refuse_connections.load(Ordering::SeqCst) {
            return Err(SessionError::Network("connection refused".to_string()));
        }
        self.daemon.connects.fetch_add(1, Ordering::SeqCst);
        let generation = self.daemon.state.lock().unwrap().generation;
        Ok(Box::new(MockSession {
            daemon: self.daemon.clone(),
            generation,
        }))
    }

    fn describe(&self) -> String {
        "mock:6600".to_string()
    }
}

struct MockSession {
    daemon: MockDaemon,
    generation: u32,
}

impl MockSession {
    fn apply<T>(&mut self, call: Call, f: impl FnOnce(&mut DaemonState) -> T) -> Result<T, SessionError> {
        let mut state = self.daemon.state.lock().unwrap();
        if state.generation != self.generation {
            return Err(SessionError::Network("broken pipe".to_string()));
        }
        state.calls.push(call);
        Ok(f(&mut state))
    }
}

impl PlaybackSession for MockSession {
    fn status(&mut self) -> Result<DaemonStatus, SessionError> {
        self.apply(Call::Status, |s| DaemonStatus::new(s.transport, s.volume))
    }

    fn toggle_pause(&mut self) -> Result<(), SessionError> {
        self.apply(Call::TogglePause, |s| {
            s.transport = match s.transport {
                TransportState::Playing => TransportState::Paused,
                TransportState::Paused => TransportState::Playing,
                TransportState::Stopped => TransportState::Stopped,
            }
        })
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        self.apply(Call::Pause, |s| {
            if s.transport == TransportState::Playing {
                s.transport = TransportState::Paused;
            }
        })
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), SessionError> {
        self.apply(Call::SetVolume(volume), |s| s.volume = volume)
    }

    fn clear_queue(&mut self) -> Result<(), SessionError> {
        self.apply(Call::Clear, |s| {
            s.queue.clear();
            s.transport = TransportState::Stopped;
        })
    }

    fn enqueue(&mut self, track: &str) -> Result<(), SessionError> {
        self.apply(Call::Enqueue(track.to_string()), |s| s.queue.push(track.to_string()))
    }

    fn play_from_start(&mut self) -> Result<(), SessionError> {
        self.apply(Call::PlayFromStart, |s| {
            if !s.queue.is_empty() {
                s.transport = TransportState::Playing;
            }
        })
    }

    fn protocol_version(&self) -> String {
        "0.23.5".to_string()
    }
}

/// Button that reports a fixed list of presses, then fails
pub struct ScriptedInput {
    presses: VecDeque<Result<(), InputError>>,
}

impl ScriptedInput {
    pub fn presses(count: usize) -> Self {
        Self {
            presses: (0..count).map(|_| Ok(())).collect(),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.presses
            .push_front(Err(InputError::Unavailable("scripted failure".to_string())));
        self
    }
}

impl DigitalInput for ScriptedInput {
    fn wait_for_active(&mut self) -> Result<(), InputError> {
        self.presses
            .pop_front()
            .unwrap_or_else(|| Err(InputError::Unavailable("no more presses".to_string())))
    }

    fn is_active(&mut self) -> Result<bool, InputError> {
        Ok(false)
    }
}

/// Button pressed from the test thread through a channel
pub struct ChannelInput {
    rx: Receiver<()>,
}

impl ChannelInput {
    pub fn new() -> (Sender<()>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl DigitalInput for ChannelInput {
    fn wait_for_active(&mut self) -> Result<(), InputError> {
        self.rx
            .recv()
            .map_err(|_| InputError::Unavailable("channel closed".to_string()))
    }

    fn is_active(&mut self) -> Result<bool, InputError> {
        Ok(false)
    }
}

/// Button that stays down for `hold` after every press, timed by a ManualClock
pub struct HeldInput {
    clock: Arc<ManualClock>,
    holds: VecDeque<Duration>,
    current: Option<(Instant, Duration)>,
}

impl HeldInput {
    pub fn new(clock: Arc<ManualClock>, holds: Vec<Duration>) -> Self {
        Self {
            clock,
            holds: holds.into(),
            current: None,
        }
    }
}

impl DigitalInput for HeldInput {
    fn wait_for_active(&mut self) -> Result<(), InputError> {
        let hold = self
            .holds
            .pop_front()
            .ok_or_else(|| InputError::Unavailable("no more presses".to_string()))?;
        self.current = Some((self.clock.now(), hold));
        Ok(())
    }

    fn is_active(&mut self) -> Result<bool, InputError> {
        Ok(match self.current {
            Some((pressed_at, hold)) => self.clock.now().duration_since(pressed_at) < hold,
            None => false,
        })
    }
}

/// Reader that yields a fixed list of results, then fails
pub struct ScriptedReader {
    reads: VecDeque<Result<TagId, ReaderError>>,
}

impl ScriptedReader {
    pub fn tags(tags: &[&str]) -> Self {
        Self {
            reads: tags.iter().map(|t| Ok(TagId::new(*t))).collect(),
        }
    }
}

impl TagReader for ScriptedReader {
    fn read_tag(&mut self) -> Result<TagId, ReaderError> {
        self.reads
            .pop_front()
            .unwrap_or_else(|| Err(ReaderError::Unavailable("no more tags".to_string())))
    }
}

/// Reader fed tag ids from the test thread
pub struct ChannelReader {
    rx: Receiver<TagId>,
}

impl ChannelReader {
    pub fn new() -> (Sender<TagId>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl TagReader for ChannelReader {
    fn read_tag(&mut self) -> Result<TagId, ReaderError> {
        self.rx
            .recv()
            .map_err(|_| ReaderError::Unavailable("channel closed".to_string()))
    }
}

/// Records played assets
#[derive(Clone, Default)]
pub struct RecordingSound {
    played: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingSound {
    pub fn failing() -> Self {
        let sound = Self::default();
        sound.fail.store(true, Ordering::SeqCst);
        sound
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

impl NotificationSound for RecordingSound {
    fn play(&self, asset: &str) -> Result<(), SoundError> {
        self.played.lock().unwrap().push(asset.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SoundError::MissingAsset(asset.to_string()));
        }
        Ok(())
    }
}

/// Counts power-off invocations
#[derive(Clone, Default)]
pub struct RecordingPower {
    invocations: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl RecordingPower {
    pub fn failing() -> Self {
        let power = Self::default();
        power.fail.store(true, Ordering::SeqCst);
        power
    }

    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl PowerControl for RecordingPower {
    fn power_off(&self) -> Result<(), PowerError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PowerError::NoCommand);
        }
        Ok(())
    }
}

/// Settings as a device would have them, with tag X mapped to songA.mp3
pub fn test_settings() -> Settings {
    serde_json::from_value(serde_json::json!({
        "play_pause_button_pin": 17,
        "volume_up_button_pin": 27,
        "volume_down_button_pin": 22,
        "poweroff_button_pin": 3,
        "initial_volume": 40,
        "rfid_map": {"X": 584190276000u64, "Y": "12345"}
    }))
    .unwrap()
}

pub fn test_tracks() -> TagToTrackMap {
    let tags = test_settings().named_tags();
    let songs: HashMap<String, String> = [
        ("X".to_string(), "songA.mp3".to_string()),
        ("Y".to_string(), "songB.mp3".to_string()),
    ]
    .into_iter()
    .collect();
    TagToTrackMap::from_named(&tags, &songs)
}

pub fn test_config() -> Config {
    Config {
        settings: test_settings(),
        tracks: test_tracks(),
    }
}

/// Millisecond timings for tests that run workers on real threads
pub fn fast_timings() -> Timings {
    Timings {
        play_pause_debounce: Duration::from_millis(5),
        volume_debounce: Duration::from_millis(5),
        tag_debounce: Duration::from_millis(5),
        power_off_rearm: Duration::from_millis(5),
        hold_poll_interval: Duration::from_millis(5),
        long_press_threshold: Duration::from_secs(10),
        shutdown_grace: Duration::from_millis(5),
        keepalive_interval: Duration::from_millis(20),
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub const TAG_X: &str = "584190276000";
pub const TAG_Y: &str = "12345";
