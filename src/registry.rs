/// ----- CAR REGISTRY & REQUEST GATEWAY -----
/// The registry maps car ids to their runtime and is handed to every
/// interface explicitly; there is no process-wide singleton. The gateway
/// operations (`request`, `close`, `status`) are the only entry points the
/// TCP and HTTP layers use to touch a car, and each takes the car's lock.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use parking_lot::{Mutex, RwLock};

use crate::config::LiftConfig;
use crate::runtime::{DoorStatus, LiftReq, LiftStatus, RuntimeState};

pub struct Lift {
    pub config: LiftConfig,
    pub state: Mutex<RuntimeState>,
}

impl Lift {
    pub fn new(config: LiftConfig) -> Self {
        let state = Mutex::new(RuntimeState::new(&config));
        Lift { config, state }
    }

    pub fn snapshot(&self) -> LiftSnapshot {
        let state = self.state.lock();
        LiftSnapshot {
            id: self.config.id.clone(),
            cur_floor: state.cur_floor,
            floor_label: self
                .config
                .floor_by_index(state.cur_floor)
                .map(|f| f.label.clone())
                .unwrap_or_default(),
            h: state.h,
            lift_status: state.lift_status,
            door_status: state.door_status,
            target_floor: state.target_floor,
            pending: state.reqs.len(),
        }
    }
}

/// Read-only view of one car, for the status panel and debugging.
#[derive(Debug, Clone)]
pub struct LiftSnapshot {
    pub id: String,
    pub cur_floor: i32,
    pub floor_label: String,
    pub h: f64,
    pub lift_status: LiftStatus,
    pub door_status: DoorStatus,
    pub target_floor: Option<i32>,
    pub pending: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum LiftError {
    #[error("lift {0} does not exist")]
    NotFound(String),
}

/// Outcome of a close request. Busy is a normal answer, not a failure: the
/// car refuses to touch the door while it is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closing,
    Busy,
}

impl CloseOutcome {
    /// Response body for the HTTP interface, where busy surfaces as code 400.
    pub fn ack(self, lift_id: &str) -> Ack {
        match self {
            CloseOutcome::Closing => Ack::ok(),
            CloseOutcome::Busy => Ack {
                code: String::from("400"),
                msg: format!("lift {} is moving, cannot close the door", lift_id),
            },
        }
    }
}

pub struct Registry {
    lifts: RwLock<HashMap<String, Arc<Lift>>>,
}

impl Registry {
    pub fn new(configs: Vec<LiftConfig>) -> Self {
        let lifts = configs
            .into_iter()
            .map(|config| (config.id.clone(), Arc::new(Lift::new(config))))
            .collect();
        Registry { lifts: RwLock::new(lifts) }
    }

    pub fn get(&self, lift_id: &str) -> Option<Arc<Lift>> {
        self.lifts.read().get(lift_id).cloned()
    }

    pub fn lifts(&self) -> Vec<Arc<Lift>> {
        self.lifts.read().values().cloned().collect()
    }

    /// Replace a car wholesale after a config edit. The old runtime is
    /// dropped; the next tick picks up the fresh one.
    pub fn replace(&self, config: LiftConfig) {
        self.lifts
            .write()
            .insert(config.id.clone(), Arc::new(Lift::new(config)));
    }

    pub fn remove(&self, lift_id: &str) -> bool {
        self.lifts.write().remove(lift_id).is_some()
    }

    /// Queue a request for a car. Fire-and-forget: the dispatch loop picks
    /// it up on its next tick.
    pub fn request(&self, lift_id: &str, req: LiftReq) -> Result<Ack, LiftError> {
        let lift = self.must_get(lift_id)?;
        info!("lift {}: request to floor {} from {:?}", lift_id, req.dest_floor, req.source);
        lift.state.lock().reqs.push(req);
        Ok(Ack::ok())
    }

    pub fn close(&self, lift_id: &str) -> Result<CloseOutcome, LiftError> {
        let lift = self.must_get(lift_id)?;
        let mut state = lift.state.lock();
        if state.close_door(Instant::now()) {
            Ok(CloseOutcome::Closing)
        } else {
            warn!("lift {}: moving, close refused", lift_id);
            Ok(CloseOutcome::Busy)
        }
    }

    pub fn status(&self, lift_id: &str) -> Result<StatusResp, LiftError> {
        let lift = self.must_get(lift_id)?;
        let state = lift.state.lock();
        Ok(StatusResp {
            current_floor: state.cur_floor.to_string(),
            door_status: state.door_status,
            code: String::from("0"),
            msg: String::from("noError"),
        })
    }

    fn must_get(&self, lift_id: &str) -> Result<Arc<Lift>, LiftError> {
        self.get(lift_id)
            .ok_or_else(|| LiftError::NotFound(lift_id.to_string()))
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct Ack {
    pub code: String,
    pub msg: String,
}

impl Ack {
    pub fn ok() -> Self {
        Ack { code: String::from("0"), msg: String::from("noError") }
    }

    pub fn not_found(lift_id: &str) -> Self {
        Ack {
            code: String::from("404"),
            msg: format!("lift {} does not exist", lift_id),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusResp {
    pub current_floor: String,
    pub door_status: DoorStatus,
    pub code: String,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_lift;

    fn registry() -> Registry {
        Registry::new(vec![default_lift()])
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.request("B", LiftReq::tcp(2)),
            Err(LiftError::NotFound(_))
        ));
        assert!(matches!(registry.close("B"), Err(LiftError::NotFound(_))));
        assert!(matches!(registry.status("B"), Err(LiftError::NotFound(_))));
    }

    #[test]
    fn request_appends_to_the_queue() {
        let registry = registry();
        registry.request("A", LiftReq::tcp(3)).unwrap();
        registry.request("A", LiftReq::cabin(2)).unwrap();

        let lift = registry.get("A").unwrap();
        let state = lift.state.lock();
        assert_eq!(state.reqs.len(), 2);
        assert_eq!(state.reqs[0].dest_floor, 3);
        // queuing alone does not move the car
        assert_eq!(state.target_floor, None);
    }

    #[test]
    fn status_reports_floor_and_door() {
        let registry = registry();
        let status = registry.status("A").unwrap();
        assert_eq!(status.current_floor, "1");
        assert_eq!(status.door_status, DoorStatus::Close);
        assert_eq!(status.code, "0");

        let body = serde_json::to_string(&status).unwrap();
        assert!(body.contains("\"currentFloor\":\"1\""));
        assert!(body.contains("\"doorStatus\":\"CLOSE\""));
    }

    #[test]
    fn close_on_a_parked_car_starts_closing() {
        let registry = registry();
        assert_eq!(registry.close("A").unwrap(), CloseOutcome::Closing);
        let lift = registry.get("A").unwrap();
        assert_eq!(lift.state.lock().door_status, DoorStatus::Closing);
    }

    #[test]
    fn busy_maps_to_code_400() {
        let ack = CloseOutcome::Busy.ack("A");
        assert_eq!(ack.code, "400");
        assert_eq!(CloseOutcome::Closing.ack("A").code, "0");
    }

    #[test]
    fn replace_re_points_the_runtime() {
        let registry = registry();
        registry.request("A", LiftReq::tcp(3)).unwrap();

        registry.replace(default_lift());
        let lift = registry.get("A").unwrap();
        assert!(lift.state.lock().reqs.is_empty());

        assert!(registry.remove("A"));
        assert!(registry.get("A").is_none());
    }
}
