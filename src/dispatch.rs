/// ----- DISPATCH LOOP MODULE -----
/// One background thread advances every car once per tick. Per car the
/// sequence is: prune served same-floor requests, select the next target
/// (continuation-biased scan), advance the position, handle arrival, then
/// run the timer-driven door transitions. The whole sequence holds the
/// car's lock, so concurrent request/close calls always see a consistent
/// state. Nothing in here may panic: a target floor that no longer exists
/// simply skips the tick.
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};

use crate::config::LiftConfig;
use crate::registry::{Lift, Registry};
use crate::runtime::{DoorStatus, LiftStatus, ReqSource, RuntimeState};

/// One simulation step. Lift speed is expressed in meters per tick.
pub const TICK_DURATION: Duration = Duration::from_secs(1);

/// Spawns the dispatch loop. Dropping the returned sender (or sending on
/// it) stops the loop as a unit; there is no per-car cancellation.
pub fn init(registry: Arc<Registry>) -> Sender<()> {
    let (shutdown_tx, shutdown_rx) = unbounded();
    thread::spawn(move || main(registry, shutdown_rx));
    shutdown_tx
}

fn main(registry: Arc<Registry>, shutdown_rx: Receiver<()>) {
    let ticker = tick(TICK_DURATION);
    loop {
        select! {
            recv(ticker) -> _ => {
                for lift in registry.lifts() {
                    process_lift(&lift, Instant::now());
                }
            },
            recv(shutdown_rx) -> _ => return,
        }
    }
}

/// Runs one tick for one car.
pub fn process_lift(lift: &Lift, now: Instant) {
    let config = &lift.config;
    let mut state = lift.state.lock();
    prune_served(&mut state);
    select_target(&mut state, config);
    step(&mut state, config);
    arrive(&mut state, now);
    update_door(&mut state, config, now);
}

/// While the car is stationary, drop every request already satisfied at the
/// current floor. Hall calls count as satisfied only when their direction
/// matches the car's (or the car is idle); cabin and TCP requests are
/// satisfied unconditionally.
fn prune_served(state: &mut RuntimeState) {
    if state.lifting {
        return;
    }
    let cur_floor = state.cur_floor;
    let lift_status = state.lift_status;
    state.reqs.retain(|req| {
        !(req.dest_floor == cur_floor
            && (req.source != ReqSource::OutDoor
                || req.direction == Some(lift_status)
                || lift_status == LiftStatus::Idle))
    });
}

/// Continuation-biased scan: a moving car keeps serving requests in its
/// direction of travel and only reverses once nothing lies ahead. An idle
/// car takes the request closest to its current floor. All ties go to the
/// earliest queued request.
fn select_target(state: &mut RuntimeState, config: &LiftConfig) {
    let cur_floor = state.cur_floor;
    let infloor = state.infloor(config);

    let candidate = match state.lift_status {
        LiftStatus::Up => {
            let mut best: Option<i32> = None;
            for req in &state.reqs {
                if req.dest_floor > cur_floor || (req.dest_floor == cur_floor && infloor) {
                    if best.map_or(true, |b| req.dest_floor < b) {
                        best = Some(req.dest_floor);
                    }
                }
            }
            best
        }
        LiftStatus::Down => {
            let mut best: Option<i32> = None;
            for req in &state.reqs {
                if req.dest_floor < cur_floor || (req.dest_floor == cur_floor && infloor) {
                    if best.map_or(true, |b| req.dest_floor > b) {
                        best = Some(req.dest_floor);
                    }
                }
            }
            best
        }
        LiftStatus::Idle => {
            let mut best: Option<i32> = None;
            for req in &state.reqs {
                if best.map_or(true, |b| {
                    (req.dest_floor - cur_floor).abs() < (b - cur_floor).abs()
                }) {
                    best = Some(req.dest_floor);
                }
            }
            best
        }
    };

    state.target_floor = candidate;
    match candidate {
        Some(target) => {
            state.lift_status = if target > cur_floor {
                LiftStatus::Up
            } else if target < cur_floor {
                LiftStatus::Down
            } else {
                LiftStatus::Idle
            };
        }
        None => {
            state.lift_status = LiftStatus::Idle;
            state.lifting = false;
        }
    }
}

/// Advance the continuous position toward the target floor. The car never
/// moves unless the door is fully closed.
fn step(state: &mut RuntimeState, config: &LiftConfig) {
    if state.door_status != DoorStatus::Close {
        return;
    }
    let step_h = config.lift_speed * TICK_DURATION.as_secs_f64();
    let target = match state.target_floor.and_then(|t| config.floor_by_index(t)) {
        Some(floor) => floor,
        None => return, // unknown target floor, skip this tick
    };

    match state.lift_status {
        LiftStatus::Up => {
            let before = state.h;
            state.h = (state.h + step_h).min(target.height);
            if let Some(floor) = config.highest_floor_at_or_below(state.h) {
                state.cur_floor = floor.index;
            }
            state.lifting = state.h != before;
        }
        LiftStatus::Down => {
            let before = state.h;
            state.h = (state.h - step_h).max(target.height);
            if let Some(floor) = config.lowest_floor_at_or_above(state.h) {
                state.cur_floor = floor.index;
            }
            state.lifting = state.h != before;
        }
        LiftStatus::Idle => {
            // settling: snap to the nearest floor
            if let Some(floor) = config.nearest_floor(state.h) {
                state.cur_floor = floor.index;
            }
        }
    }
}

fn arrive(state: &mut RuntimeState, now: Instant) {
    if state.target_floor != Some(state.cur_floor) {
        return;
    }
    state.lifting = false;
    prune_served(state);
    state.open_door(now);
}

fn update_door(state: &mut RuntimeState, config: &LiftConfig, now: Instant) {
    if state.lifting {
        return;
    }
    match state.door_status {
        DoorStatus::Opening => {
            let started = *state.door_op_start_on.get_or_insert(now);
            if now.duration_since(started) >= config.door_op_cost() {
                state.door_status = DoorStatus::Open;
                state.door_op_start_on = None;
                state.door_op_done_on = Some(now);
            }
        }
        DoorStatus::Closing => {
            let started = *state.door_op_start_on.get_or_insert(now);
            if now.duration_since(started) >= config.door_op_cost() {
                state.door_status = DoorStatus::Close;
                state.door_op_start_on = None;
            }
        }
        DoorStatus::Open => {
            let done = *state.door_op_done_on.get_or_insert(now);
            if now.duration_since(done) >= config.door_hold() {
                state.close_door(now);
            }
        }
        DoorStatus::Close | DoorStatus::Error => (),
    }
}
