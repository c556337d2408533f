/// ----- RUNTIME STATE MODULE -----
/// The mutable per-car state. The dispatch loop owns the tick-to-tick
/// transitions; request producers only append to `reqs` and trigger door
/// transitions, always under the car's lock.
use std::time::Instant;

use crate::config::LiftConfig;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftStatus {
    Up,
    Down,
    Idle,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoorStatus {
    Open,
    Opening,
    Close,
    Closing,
    Error,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReqSource {
    OutDoor,
    InDoor,
    Tcp,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LiftReq {
    pub dest_floor: i32,
    #[serde(default = "default_source")]
    pub source: ReqSource,
    /// Travel direction of the button press; set only for hall calls.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<LiftStatus>,
}

fn default_source() -> ReqSource {
    ReqSource::Tcp
}

impl LiftReq {
    pub fn tcp(dest_floor: i32) -> Self {
        LiftReq { dest_floor, source: ReqSource::Tcp, direction: None }
    }

    pub fn cabin(dest_floor: i32) -> Self {
        LiftReq { dest_floor, source: ReqSource::InDoor, direction: None }
    }

    pub fn hall(dest_floor: i32, direction: LiftStatus) -> Self {
        LiftReq { dest_floor, source: ReqSource::OutDoor, direction: Some(direction) }
    }
}

#[derive(Debug)]
pub struct RuntimeState {
    /// Last computed resting/passing floor index, derived from `h`.
    pub cur_floor: i32,
    /// Continuous position in meters; the source of truth for motion.
    pub h: f64,
    pub lift_status: LiftStatus,
    /// True while directed motion changed `h` during the last tick.
    pub lifting: bool,
    pub door_status: DoorStatus,
    /// Recomputed every tick from `reqs`; never set directly by callers.
    pub target_floor: Option<i32>,
    pub reqs: Vec<LiftReq>,
    pub door_op_start_on: Option<Instant>,
    pub door_op_done_on: Option<Instant>,
}

impl RuntimeState {
    pub fn new(config: &LiftConfig) -> Self {
        RuntimeState {
            cur_floor: config.nearest_floor(0.0).map(|f| f.index).unwrap_or(0),
            h: 0.0,
            lift_status: LiftStatus::Idle,
            lifting: false,
            door_status: DoorStatus::Close,
            target_floor: None,
            reqs: Vec::new(),
            door_op_start_on: None,
            door_op_done_on: None,
        }
    }

    /// The car sits exactly at a configured floor height.
    pub fn infloor(&self, config: &LiftConfig) -> bool {
        config.is_floor_height(self.h)
    }

    /// Begin opening the door. Refused while the car is moving. Opening is
    /// idempotent; re-opening an already open door only restarts the hold
    /// timer.
    pub fn open_door(&mut self, now: Instant) -> bool {
        if self.lifting {
            return false;
        }
        match self.door_status {
            DoorStatus::Opening => true,
            DoorStatus::Open => {
                self.door_op_done_on = Some(now);
                self.door_op_start_on = None;
                true
            }
            _ => {
                self.door_status = DoorStatus::Opening;
                self.door_op_done_on = None;
                self.door_op_start_on = Some(now);
                true
            }
        }
    }

    /// Begin closing the door. Refused while the car is moving. The close
    /// timer restarts even when already closing or closed.
    pub fn close_door(&mut self, now: Instant) -> bool {
        if self.lifting {
            return false;
        }
        self.door_status = DoorStatus::Closing;
        self.door_op_done_on = None;
        self.door_op_start_on = Some(now);
        true
    }
}
