//! Command to effector mapping

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info};

use crate::command::Command;
use crate::events::HelmetEvent;

use super::gpio::{GpioError, GpioPin, Level};
use super::led::{Grb, LedError, LedStrip};
use super::servo::{ServoConfig, ServoController, ServoError, ServoSession};

/// LED strip shared between dispatch and wake feedback
pub type SharedStrip = Arc<Mutex<LedStrip>>;

pub(crate) fn lock_strip(strip: &SharedStrip) -> Result<MutexGuard<'_, LedStrip>, LedError> {
    strip.lock().map_err(|_| LedError::Poisoned)
}

/// Everything one faceplate position needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelmetPose {
    /// Channel 0 angle; channel 1 gets the mirrored value
    pub logical_angle: u16,
    /// Level of the indicator line once the pose is reached
    pub indicator_level: Level,
    /// Pause between releasing the servos and touching the indicator
    pub indicator_delay: Duration,
    pub color: Grb,
}

impl HelmetPose {
    pub fn open() -> Self {
        Self {
            logical_angle: 0,
            indicator_level: Level::Low,
            indicator_delay: Duration::from_millis(700),
            color: Grb::new(50, 50, 0),
        }
    }

    pub fn close() -> Self {
        Self {
            logical_angle: 150,
            indicator_level: Level::High,
            indicator_delay: Duration::from_millis(500),
            color: Grb::new(0, 0, 100),
        }
    }
}

/// Runs the finite effector sequence for a recognized command
pub struct EffectorDispatch {
    servo: Box<dyn ServoController>,
    servo_config: ServoConfig,
    indicator: Box<dyn GpioPin>,
    strip: SharedStrip,
    open: HelmetPose,
    close: HelmetPose,
}

impl EffectorDispatch {
    pub fn new(
        servo: Box<dyn ServoController>,
        servo_config: ServoConfig,
        indicator: Box<dyn GpioPin>,
        strip: SharedStrip,
    ) -> Self {
        Self {
            servo,
            servo_config,
            indicator,
            strip,
            open: HelmetPose::open(),
            close: HelmetPose::close(),
        }
    }

    /// Replace the default open/close poses
    pub fn with_poses(mut self, open: HelmetPose, close: HelmetPose) -> Self {
        self.open = open;
        self.close = close;
        self
    }

    /// Perform the command's effector sequence and return once it settled
    ///
    /// Commands other than open and close touch nothing and yield `None`.
    pub fn dispatch(&mut self, command: Command) -> Result<Option<HelmetEvent>, EffectorError> {
        let (pose, event) = match command {
            Command::Open => (self.open, HelmetEvent::HelmetOpened),
            Command::Close => (self.close, HelmetEvent::HelmetClosed),
            other => {
                debug!(command = %other, "no effector action");
                return Ok(None);
            }
        };

        info!(command = %command, angle = pose.logical_angle, "running helmet sequence");
        self.move_servos(pose.logical_angle)?;

        std::thread::sleep(pose.indicator_delay);
        debug!(pin = self.indicator.pin(), level = ?pose.indicator_level, "indicator");
        self.indicator.set_level(pose.indicator_level)?;
        let Grb { g, r, b } = pose.color;
        lock_strip(&self.strip)?.set_color(g, r, b)?;

        Ok(Some(event))
    }

    /// Energize, drive, settle and release
    fn move_servos(&mut self, angle: u16) -> Result<(), ServoError> {
        let mut session = ServoSession::open(self.servo.as_mut(), &self.servo_config)?;
        session.drive(angle)?;
        session.settle();
        session.close()
    }
}

/// Errors raised by any effector
#[derive(Debug, thiserror::Error)]
pub enum EffectorError {
    #[error(transparent)]
    Servo(#[from] ServoError),

    #[error(transparent)]
    Led(#[from] LedError),

    #[error(transparent)]
    Gpio(#[from] GpioError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Call, CallLog, RecordingGpio, RecordingLed, RecordingServo};

    fn quick(mut pose: HelmetPose) -> HelmetPose {
        pose.indicator_delay = Duration::ZERO;
        pose
    }

    fn dispatcher() -> (EffectorDispatch, CallLog) {
        let log = CallLog::default();
        let servo_config = ServoConfig {
            settle: Duration::ZERO,
            ..ServoConfig::default()
        };
        let strip = Arc::new(Mutex::new(LedStrip::new(
            Box::new(RecordingLed::new(log.clone())),
            8,
        )));
        let dispatch = EffectorDispatch::new(
            Box::new(RecordingServo::new(log.clone())),
            servo_config,
            Box::new(RecordingGpio::new(38, log.clone())),
            strip,
        )
        .with_poses(quick(HelmetPose::open()), quick(HelmetPose::close()));
        (dispatch, log)
    }

    #[test]
    fn test_open_sequence() {
        let (mut dispatch, log) = dispatcher();

        let event = dispatch.dispatch(Command::Open).unwrap();

        assert_eq!(event, Some(HelmetEvent::HelmetOpened));
        assert_eq!(
            log.calls(),
            vec![
                Call::ServoInit,
                Call::ServoAngle {
                    channel: 0,
                    degrees: 0
                },
                Call::ServoAngle {
                    channel: 1,
                    degrees: 180
                },
                Call::ServoDeinit,
                Call::Gpio {
                    pin: 38,
                    level: Level::Low
                },
                Call::Led(Grb::new(50, 50, 0)),
            ]
        );
    }

    #[test]
    fn test_close_sequence() {
        let (mut dispatch, log) = dispatcher();

        let event = dispatch.dispatch(Command::Close).unwrap();

        assert_eq!(event, Some(HelmetEvent::HelmetClosed));
        assert_eq!(log.servo_angles(), vec![(0, 150), (1, 30)]);
        assert!(log.calls().contains(&Call::Gpio {
            pin: 38,
            level: Level::High
        }));
        assert_eq!(log.calls().last(), Some(&Call::Led(Grb::new(0, 0, 100))));
    }

    #[test]
    fn test_close_twice_sets_same_angles() {
        let (mut dispatch, log) = dispatcher();

        dispatch.dispatch(Command::Close).unwrap();
        let first = log.servo_angles();
        dispatch.dispatch(Command::Close).unwrap();
        let all = log.servo_angles();

        assert_eq!(&all[..2], first.as_slice());
        assert_eq!(&all[2..], first.as_slice());
    }

    #[test]
    fn test_mirrored_law_for_both_commands() {
        let (mut dispatch, log) = dispatcher();

        dispatch.dispatch(Command::Open).unwrap();
        dispatch.dispatch(Command::Close).unwrap();

        for pair in log.servo_angles().chunks(2) {
            assert_eq!(pair[0].0, 0);
            assert_eq!(pair[1].0, 1);
            assert_eq!(pair[1].1, 180 - pair[0].1);
        }
    }

    #[test]
    fn test_non_actuating_commands_touch_nothing() {
        let (mut dispatch, log) = dispatcher();

        for id in [1, 3, 4, 99, -7] {
            assert_eq!(dispatch.dispatch(Command::from(id)).unwrap(), None);
        }

        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_each_dispatch_releases_servos() {
        let (mut dispatch, log) = dispatcher();

        dispatch.dispatch(Command::Open).unwrap();
        dispatch.dispatch(Command::Close).unwrap();

        let calls = log.calls();
        let inits = calls.iter().filter(|c| **c == Call::ServoInit).count();
        let deinits = calls.iter().filter(|c| **c == Call::ServoDeinit).count();
        assert_eq!(inits, 2);
        assert_eq!(deinits, 2);
    }

    #[test]
    fn test_servos_released_when_pose_is_out_of_range() {
        let (dispatch, log) = dispatcher();
        let mut bad = quick(HelmetPose::open());
        bad.logical_angle = 200;
        let mut dispatch = dispatch.with_poses(bad, quick(HelmetPose::close()));

        let err = dispatch.dispatch(Command::Open).unwrap_err();

        assert!(matches!(
            err,
            EffectorError::Servo(ServoError::AngleOutOfRange { .. })
        ));
        assert_eq!(log.calls(), vec![Call::ServoInit, Call::ServoDeinit]);
    }
}
