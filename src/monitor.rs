/// ----- STATUS MONITOR MODULE -----
/// Redraws a status table for every car in place, pulling snapshots from
/// the registry. Purely a read-only view; the cars never know it exists.
use std::io::{stdout, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, tick};
use crossterm::{cursor, terminal, ExecutableCommand, Result};

use crate::registry::{LiftSnapshot, Registry};
use crate::runtime::{DoorStatus, LiftStatus};

const REDRAW_PERIOD: Duration = Duration::from_millis(500);

pub fn main(registry: Arc<Registry>) -> Result<()> {
    let mut stdout = stdout();
    let ticker = tick(REDRAW_PERIOD);
    let mut drawn: u16 = 0;

    loop {
        select! {
            recv(ticker) -> _ => {
                drawn = printstatus(&mut stdout, &registry, drawn)?;
            },
        }
    }
}

fn printstatus(stdout: &mut Stdout, registry: &Registry, drawn: u16) -> Result<u16> {
    if drawn > 0 {
        stdout.execute(cursor::MoveUp(drawn))?;
        stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
    }

    let mut snapshots: Vec<LiftSnapshot> =
        registry.lifts().iter().map(|lift| lift.snapshot()).collect();
    snapshots.sort_by(|a, b| a.id.cmp(&b.id));

    let mut lines: u16 = 0;
    writeln!(stdout, "+------------+------------+------------+------------+------------+------------+")?;
    writeln!(
        stdout,
        "| {0:<10} | {1:<10} | {2:<10} | {3:<10} | {4:<10} | {5:<10} |",
        "LIFT", "FLOOR", "HEIGHT", "STATE", "DOOR", "QUEUE"
    )?;
    lines += 2;
    for snapshot in snapshots {
        let state = match snapshot.lift_status {
            LiftStatus::Up => "up",
            LiftStatus::Down => "down",
            LiftStatus::Idle => "idle",
        };
        let door = match snapshot.door_status {
            DoorStatus::Open => "open",
            DoorStatus::Opening => "opening",
            DoorStatus::Close => "close",
            DoorStatus::Closing => "closing",
            DoorStatus::Error => "error",
        };
        writeln!(stdout, "+------------+------------+------------+------------+------------+------------+")?;
        writeln!(
            stdout,
            "| {0:<10} | {1:<10} | {2:<10.2} | {3:<10} | {4:<10} | {5:<10} |",
            snapshot.id,
            format!("{} {}", snapshot.cur_floor, snapshot.floor_label),
            snapshot.h,
            state,
            door,
            snapshot.pending,
        )?;
        lines += 2;
    }
    writeln!(stdout, "+------------+------------+------------+------------+------------+------------+")?;
    lines += 1;

    Ok(lines)
}
