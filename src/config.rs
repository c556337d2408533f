/// ----- CONFIG MODULE -----
/// Loads the per-car configuration files from a directory of JSON files,
/// one file per car. A missing directory, an empty directory or a directory
/// where every file fails to parse all fall back to one built-in 4-floor car.
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};

pub const DEFAULT_CONFIG_DIR: &str = "config";

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub index: i32,
    pub label: String,
    pub height: f64,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LiftConfig {
    pub id: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Floors in ascending index order; heights must increase with index.
    pub floors: Vec<Floor>,
    /// Travel speed in meters per tick.
    pub lift_speed: f64,
    /// Time to fully open or fully close the door, in milliseconds.
    pub cost_door_op: u64,
    /// Time the door stays open before closing on its own, in milliseconds.
    pub door_hold_duration: u64,
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    #[error("lift {id}: floor heights must increase with floor index")]
    UnorderedFloors { id: String },
}

impl LiftConfig {
    pub fn floor_by_index(&self, index: i32) -> Option<&Floor> {
        self.floors.iter().find(|f| f.index == index)
    }

    /// Highest floor whose height is at or below `h`.
    pub fn highest_floor_at_or_below(&self, h: f64) -> Option<&Floor> {
        self.floors.iter().rev().find(|f| f.height <= h)
    }

    /// Lowest floor whose height is at or above `h`.
    pub fn lowest_floor_at_or_above(&self, h: f64) -> Option<&Floor> {
        self.floors.iter().find(|f| f.height >= h)
    }

    pub fn nearest_floor(&self, h: f64) -> Option<&Floor> {
        self.floors
            .iter()
            .min_by(|a, b| (a.height - h).abs().total_cmp(&(b.height - h).abs()))
    }

    /// True iff `h` exactly matches a configured floor height.
    pub fn is_floor_height(&self, h: f64) -> bool {
        self.floors.iter().any(|f| f.height == h)
    }

    pub fn door_op_cost(&self) -> Duration {
        Duration::from_millis(self.cost_door_op)
    }

    pub fn door_hold(&self) -> Duration {
        Duration::from_millis(self.door_hold_duration)
    }

    /// The dispatch scan derives floors from heights, so height order must
    /// agree with index order. An empty floor list is fine and yields a
    /// car that never moves.
    fn validate(&self) -> Result<(), ConfigError> {
        for pair in self.floors.windows(2) {
            if pair[1].height <= pair[0].height {
                return Err(ConfigError::UnorderedFloors {
                    id: self.id.clone(),
                });
            }
        }
        Ok(())
    }
}

pub fn parse(contents: &str) -> Result<LiftConfig, ConfigError> {
    let mut config: LiftConfig = serde_json::from_str(contents)?;
    config.floors.sort_by_key(|f| f.index);
    config.validate()?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<LiftConfig, ConfigError> {
    parse(&fs::read_to_string(path)?)
}

pub fn load_dir(dir: &Path) -> Vec<LiftConfig> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            info!("config directory {} not found, using default configuration", dir.display());
            return vec![default_lift()];
        }
    };

    let mut configs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        match load_file(&path) {
            Ok(config) => {
                info!(
                    "loaded lift {} with {} floors from {}",
                    config.id,
                    config.floors.len(),
                    path.display()
                );
                configs.push(config);
            }
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }

    if configs.is_empty() {
        info!("no usable configuration in {}, using default configuration", dir.display());
        return vec![default_lift()];
    }
    configs
}

pub fn default_lift() -> LiftConfig {
    LiftConfig {
        id: String::from("A"),
        host: default_host(),
        port: default_port(),
        floors: vec![
            Floor { index: 1, label: String::from("L1"), height: 0.0, disabled: false },
            Floor { index: 2, label: String::from("L2"), height: 3.0, disabled: false },
            Floor { index: 3, label: String::from("L3"), height: 6.0, disabled: false },
            Floor { index: 4, label: String::from("L4"), height: 9.0, disabled: false },
        ],
        lift_speed: 0.6,
        cost_door_op: 1000,
        door_hold_duration: 3000,
    }
}

/// Writes sample configuration files for initial setup or reset.
pub fn generate_defaults(dir: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(dir)?;

    let default_config = LiftConfig {
        id: String::from("default"),
        ..default_lift()
    };

    let elevator_a = LiftConfig {
        id: String::from("A"),
        host: default_host(),
        port: default_port(),
        floors: vec![
            Floor { index: 1, label: String::from("G"), height: 0.0, disabled: false },
            Floor { index: 2, label: String::from("L1"), height: 3.0, disabled: false },
            Floor { index: 3, label: String::from("L2"), height: 6.0, disabled: false },
            Floor { index: 4, label: String::from("L3"), height: 9.0, disabled: false },
            Floor { index: 5, label: String::from("L4"), height: 12.0, disabled: false },
            Floor { index: 6, label: String::from("L5"), height: 15.0, disabled: true },
        ],
        lift_speed: 0.6,
        cost_door_op: 1000,
        door_hold_duration: 3000,
    };

    for (name, config) in [("default.json", &default_config), ("elevator_A.json", &elevator_a)] {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        info!("generated {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Options {
    pub config_dir: String,
    pub monitor: bool,
    pub generate_config: bool,
}

pub fn parse_env_args() -> Options {
    let mut options = Options {
        config_dir: String::from(DEFAULT_CONFIG_DIR),
        monitor: false,
        generate_config: false,
    };

    let args: Vec<String> = env::args().collect();
    for arg_pair in args.rchunks_exact(2) {
        match arg_pair[0].as_str() {
            "--config-dir" => options.config_dir = arg_pair[1].clone(),
            "--monitor" => options.monitor = parse_bool(&arg_pair[1], options.monitor),
            "--generate-config" => {
                options.generate_config = parse_bool(&arg_pair[1], options.generate_config)
            }
            _ => (),
        }
    }
    options
}

fn parse_bool(arg: &str, default: bool) -> bool {
    match arg.parse::<bool>() {
        Ok(value) => value,
        Err(_) => {
            println!("{} is not a boolean, skipping...", arg);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_config_file() {
        let contents = r#"{
            "id": "A",
            "floors": [
                {"index": 1, "label": "L1", "height": 0.0},
                {"index": 2, "label": "L2", "height": 3.0, "disabled": true}
            ],
            "liftSpeed": 0.6,
            "costDoorOp": 1000,
            "doorHoldDuration": 3000
        }"#;
        let config = parse(contents).unwrap();
        assert_eq!(config.id, "A");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.floors.len(), 2);
        assert!(!config.floors[0].disabled);
        assert!(config.floors[1].disabled);
        assert_eq!(config.lift_speed, 0.6);
        assert_eq!(config.door_op_cost(), Duration::from_secs(1));
        assert_eq!(config.door_hold(), Duration::from_secs(3));
    }

    #[test]
    fn sorts_floors_by_index() {
        let contents = r#"{
            "id": "A",
            "floors": [
                {"index": 2, "label": "L2", "height": 3.0},
                {"index": 1, "label": "L1", "height": 0.0}
            ],
            "liftSpeed": 0.6,
            "costDoorOp": 1000,
            "doorHoldDuration": 3000
        }"#;
        let config = parse(contents).unwrap();
        assert_eq!(config.floors[0].index, 1);
        assert_eq!(config.floors[1].index, 2);
    }

    #[test]
    fn rejects_heights_that_disagree_with_index_order() {
        let contents = r#"{
            "id": "A",
            "floors": [
                {"index": 1, "label": "L1", "height": 3.0},
                {"index": 2, "label": "L2", "height": 0.0}
            ],
            "liftSpeed": 0.6,
            "costDoorOp": 1000,
            "doorHoldDuration": 3000
        }"#;
        assert!(matches!(
            parse(contents),
            Err(ConfigError::UnorderedFloors { .. })
        ));
    }

    #[test]
    fn accepts_an_empty_floor_list() {
        let contents = r#"{
            "id": "A",
            "floors": [],
            "liftSpeed": 0.6,
            "costDoorOp": 1000,
            "doorHoldDuration": 3000
        }"#;
        let config = parse(contents).unwrap();
        assert!(config.floors.is_empty());
        assert!(config.nearest_floor(0.0).is_none());
    }

    #[test]
    fn floor_lookups_follow_height() {
        let config = default_lift();
        assert_eq!(config.highest_floor_at_or_below(4.7).unwrap().index, 2);
        assert_eq!(config.lowest_floor_at_or_above(4.7).unwrap().index, 3);
        assert_eq!(config.nearest_floor(4.7).unwrap().index, 3);
        assert!(config.is_floor_height(6.0));
        assert!(!config.is_floor_height(6.1));
    }
}
