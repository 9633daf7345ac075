//! Rig – wires ports, drive controller, interlock and obstacle monitor
//! together according to the loaded [`Config`].

use std::sync::Arc;

use rover_hal::{
    ActuatorPort, GpioActuatorPort, RangingPort, SimActuatorPort, SimRanger, UltrasonicRanger,
};
use rover_kernel::{
    ClearanceView, CommandDispatcher, DriveController, MinDistance, ObstacleDetector,
    ObstacleMonitor, SafetyInterlock,
};
use tracing::{error, info};

use crate::config::{Config, Hardware};

/// Distance the simulated ranger reports until steered with `/obstacle`.
const SIM_OPEN_FLOOR_CM: f64 = 200.0;

/// The assembled motion core.
pub struct Rig {
    pub drive: Arc<DriveController>,
    pub interlock: Arc<SafetyInterlock>,
    pub dispatcher: CommandDispatcher,
    pub monitor: ObstacleMonitor,
    /// Steering handle, present only for [`Hardware::Sim`].
    pub sim_ranger: Option<SimRanger>,
    pub hardware: Hardware,
}

impl Rig {
    pub fn min_distance(&self) -> MinDistance {
        self.monitor.min_distance()
    }

    pub fn clearance(&self) -> ClearanceView {
        self.monitor.clearance()
    }
}

/// Build the rig and start the obstacle monitor.
///
/// A GPIO actuator that cannot be opened leaves the drive controller
/// unbound (drive commands become no-ops); a ranger that cannot be opened
/// is fatal because the interlock would be blind.
pub fn assemble(cfg: &Config) -> Result<Rig, String> {
    let drive = Arc::new(DriveController::new());
    let (ranger, sim_ranger): (Box<dyn RangingPort>, Option<SimRanger>) = match cfg.hardware {
        Hardware::Sim => {
            drive.bind(Box::new(SimActuatorPort::new()));
            let ranger = SimRanger::new(SIM_OPEN_FLOOR_CM);
            (Box::new(ranger.clone()), Some(ranger))
        }
        Hardware::Gpio => {
            match GpioActuatorPort::open(cfg.pins.motor_pins()) {
                Ok(port) => {
                    let port: Box<dyn ActuatorPort> = Box::new(port);
                    drive.bind(port);
                }
                Err(e) => error!(error = %e, "motor pins unavailable; drive commands will be ignored"),
            }
            let ranger = UltrasonicRanger::open(cfg.pins.trigger, cfg.pins.echo, cfg.echo_timeout())
                .map_err(|e| format!("Failed to open ultrasonic ranger: {e}"))?;
            (Box::new(ranger), None)
        }
    };

    let interlock = Arc::new(SafetyInterlock::new(drive.clone(), cfg.avoidance_enabled));
    let dispatcher = CommandDispatcher::new(drive.clone(), interlock.clone());

    let mut detector = ObstacleDetector::new(ranger, cfg.detector());
    detector.subscribe(interlock.clone());
    let monitor = detector
        .spawn()
        .map_err(|e| format!("Failed to start obstacle monitor: {e}"))?;

    info!(
        hardware = %cfg.hardware,
        min_distance_cm = cfg.min_distance_cm,
        avoidance = cfg.avoidance_enabled,
        "rig assembled"
    );

    Ok(Rig {
        drive,
        interlock,
        dispatcher,
        monitor,
        sim_ranger,
        hardware: cfg.hardware,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::{ClearanceState, DriveState};
    use std::thread;
    use std::time::{Duration, Instant};

    fn fast_sim() -> Config {
        Config {
            sample_period_ms: 5,
            ..Config::default()
        }
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn sim_rig_stops_forward_motion_when_an_obstacle_appears() {
        let rig = assemble(&fast_sim()).expect("sim rig");
        assert!(rig.drive.is_bound());

        rig.dispatcher.dispatch("move forward");
        assert_eq!(rig.drive.state(), DriveState::MovingForward);

        rig.sim_ranger.as_ref().expect("sim ranger").set_distance(12.0);
        assert!(wait_until(|| rig.drive.state() == DriveState::Stopped));
        assert_eq!(rig.clearance().get(), ClearanceState::Detected);
        assert_eq!(rig.interlock.interventions(), 1);
    }

    #[test]
    fn sim_rig_honours_initial_avoidance_flag() {
        let cfg = Config {
            avoidance_enabled: false,
            ..fast_sim()
        };
        let rig = assemble(&cfg).expect("sim rig");
        rig.dispatcher.dispatch("move-forward");
        rig.sim_ranger.as_ref().expect("sim ranger").set_distance(12.0);

        assert!(wait_until(|| rig.clearance().get() == ClearanceState::Detected));
        assert_eq!(rig.drive.state(), DriveState::MovingForward);
    }

    #[test]
    fn runtime_threshold_change_is_picked_up() {
        let rig = assemble(&fast_sim()).expect("sim rig");
        rig.sim_ranger.as_ref().expect("sim ranger").set_distance(150.0);
        rig.min_distance().set(160.0);
        assert!(wait_until(|| rig.clearance().get() == ClearanceState::Detected));
    }

    #[test]
    fn rig_from_out_of_range_file_still_stops_for_obstacles() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sample_period_ms = 0\nmin_distance_cm = nan\n").unwrap();
        let cfg = crate::config::load_from(&path).expect("load ok").expect("some");

        let rig = assemble(&cfg).expect("sim rig");
        rig.dispatcher.dispatch("move forward");
        rig.sim_ranger.as_ref().expect("sim ranger").set_distance(1.0);

        assert!(wait_until(|| rig.clearance().get() == ClearanceState::Detected));
        assert!(wait_until(|| rig.drive.state() == DriveState::Stopped));
    }
}
