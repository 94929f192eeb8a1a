mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, HeldInput, MockDaemon, RecordingPower, RecordingSound};
use mpd_client::TransportState;
use tunino::clock::ManualClock;
use tunino::config::Timings;
use tunino::connection::DaemonConnection;
use tunino::power_off::{PowerOffOutcome, PowerOffWorker};
use tunino::sound::SHUTDOWN_SOUND;

struct Rig {
    daemon: MockDaemon,
    sound: RecordingSound,
    power: RecordingPower,
    clock: Arc<ManualClock>,
}

impl Rig {
    fn new(sound: RecordingSound, power: RecordingPower) -> Self {
        Self {
            daemon: MockDaemon::new(TransportState::Playing, 40),
            sound,
            power,
            clock: Arc::new(ManualClock::new()),
        }
    }

    fn worker(&self, holds: &[Duration]) -> PowerOffWorker {
        let connection = DaemonConnection::connect(self.daemon.connector(), 40).unwrap();
        self.daemon.clear_calls();
        PowerOffWorker::new(
            Box::new(HeldInput::new(self.clock.clone(), holds.to_vec())),
            Arc::new(connection),
            Arc::new(self.sound.clone()),
            Arc::new(self.power.clone()),
            Timings::default(),
            self.clock.clone(),
        )
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[test]
fn test_short_hold_does_nothing() {
    let rig = Rig::new(RecordingSound::default(), RecordingPower::default());
    let mut worker = rig.worker(&[secs(9.9)]);

    assert!(matches!(worker.step(), PowerOffOutcome::Released(_)));

    assert_eq!(rig.power.invocations(), 0);
    assert!(rig.sound.played().is_empty());
    assert!(rig.daemon.calls().is_empty());
    assert_eq!(rig.daemon.transport(), TransportState::Playing);
}

#[test]
fn test_long_hold_shuts_down() {
    let rig = Rig::new(RecordingSound::default(), RecordingPower::default());
    let mut worker = rig.worker(&[secs(12.0)]);

    assert_eq!(worker.step(), PowerOffOutcome::ShutdownInvoked);

    assert_eq!(rig.daemon.calls(), vec![Call::Pause]);
    assert_eq!(rig.daemon.transport(), TransportState::Paused);
    assert_eq!(rig.sound.played(), vec![SHUTDOWN_SOUND.to_string()]);
    assert_eq!(rig.power.invocations(), 1);
    // 10 s threshold plus 3 s grace
    assert_eq!(rig.clock.elapsed(), secs(13.0));
}

#[test]
fn test_very_long_hold_shuts_down_once() {
    let rig = Rig::new(RecordingSound::default(), RecordingPower::default());
    let worker = rig.worker(&[secs(60.0)]);

    worker.run();

    assert_eq!(rig.power.invocations(), 1);
    assert_eq!(rig.sound.played().len(), 1);
}

#[test]
fn test_short_then_long_hold() {
    let rig = Rig::new(RecordingSound::default(), RecordingPower::default());
    let worker = rig.worker(&[secs(2.0), secs(4.5), secs(11.0)]);

    worker.run();

    assert_eq!(rig.power.invocations(), 1);
}

#[test]
fn test_failed_power_off_rearms() {
    let rig = Rig::new(RecordingSound::default(), RecordingPower::failing());
    let mut worker = rig.worker(&[secs(30.0), secs(15.0)]);

    assert_eq!(worker.step(), PowerOffOutcome::ShutdownFailed);
    assert_eq!(rig.power.invocations(), 1);
    // Released at 30 s, re-armed 1 s later
    assert_eq!(rig.clock.elapsed(), secs(31.0));

    assert_eq!(worker.step(), PowerOffOutcome::ShutdownFailed);
    assert_eq!(rig.power.invocations(), 2);

    assert_eq!(worker.step(), PowerOffOutcome::InputFailed);
    assert_eq!(rig.power.invocations(), 2);
}

#[test]
fn test_shutdown_survives_sound_and_daemon_failures() {
    let rig = Rig::new(RecordingSound::failing(), RecordingPower::default());
    let mut worker = rig.worker(&[secs(20.0)]);

    rig.daemon.refuse_connections(true);
    rig.daemon.break_connection();

    assert_eq!(worker.step(), PowerOffOutcome::ShutdownInvoked);
    assert_eq!(rig.sound.played(), vec![SHUTDOWN_SOUND.to_string()]);
    assert_eq!(rig.power.invocations(), 1);
}
