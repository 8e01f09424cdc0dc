use crate::core::driver::DriverPars;
use crate::core::race::RacePars;
use crate::core::tireset::{Compound, WearPars};
use crate::interfaces::telemetry::{map_driver_pars, TelemetryDriverRecord};
use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub driver_pars_all: Vec<DriverPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.to_str().unwrap()
        ))?;
    let pars: SimPars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.to_str().unwrap()
    ))?;

    if pars.driver_pars_all.is_empty() {
        anyhow::bail!(
            "Parameter file {} contains no drivers!",
            filepath.to_str().unwrap()
        );
    }

    Ok(pars)
}

/// read_telemetry_snapshot reads a JSON array of provider driver records and maps them into
/// driver parameters, filling gaps with the usual fallbacks.
pub fn read_telemetry_snapshot(filepath: &Path) -> anyhow::Result<Vec<DriverPars>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open telemetry snapshot {}!",
            filepath.to_str().unwrap()
        ))?;
    let records: Vec<TelemetryDriverRecord> = serde_json::from_reader(&fh).context(format!(
        "Failed to parse telemetry snapshot {}!",
        filepath.to_str().unwrap()
    ))?;

    if records.is_empty() {
        anyhow::bail!(
            "Telemetry snapshot {} contains no drivers!",
            filepath.to_str().unwrap()
        );
    }

    Ok(map_driver_pars(&records))
}

/// default_sim_pars returns a built-in 24h scenario with a three driver crew, used whenever
/// no parameter file is inserted.
pub fn default_sim_pars() -> SimPars {
    SimPars {
        race_pars: RacePars {
            track_name: "Circuit de la Sarthe".to_string(),
            tot_no_laps: 380,
            t_race_total: 86_400.0,
            t_per_tick: 225.0,
            t_lap_base: 225.0,
            t_lap_var: 4.0,
            n_hist: 20,
            stint_max_laps: 35,
            t_drive_max: 50_400.0,
            t_drive_margin: 900.0,
            s_drive_safety: 0.95,
            b_fuel_per_lap: 3.0,
            fuel_reserve_pct: 8.0,
            default_compound: Compound::Medium,
            wear_pars: WearPars::default(),
            p_weather_change: 0.04,
            p_sc_deploy: 0.02,
            p_sc_clear: 0.25,
            p_pos_swap: 0.08,
            t_adv_min_interval: 600.0,
            t_adv_cooldown: 1_800.0,
            seed: None,
        },
        driver_pars_all: vec![
            DriverPars {
                id: 1,
                name: "Marc Duval".to_string(),
                code: "DUV".to_string(),
                color: "#3366CC".to_string(),
                compound: Compound::Medium,
            },
            DriverPars {
                id: 2,
                name: "Tom Albers".to_string(),
                code: "ALB".to_string(),
                color: "#DC3912".to_string(),
                compound: Compound::Medium,
            },
            DriverPars {
                id: 3,
                name: "Kenji Mori".to_string(),
                code: "MOR".to_string(),
                color: "#FF9900".to_string(),
                compound: Compound::Medium,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_pars_are_consistent() {
        let sim_pars = default_sim_pars();

        assert_eq!(sim_pars.driver_pars_all.len(), 3);
        assert!(sim_pars.race_pars.t_drive_max < sim_pars.race_pars.t_race_total);
        assert!(sim_pars.race_pars.t_lap_var < sim_pars.race_pars.t_lap_base);
    }

    #[test]
    fn parfile_is_read_and_validated() {
        let json = r##"{
            "race_pars": {
                "track_name": "Test Ring", "tot_no_laps": 50, "t_race_total": 11250.0,
                "t_per_tick": 225.0, "t_lap_base": 225.0, "t_lap_var": 4.0, "n_hist": 20,
                "stint_max_laps": 12, "t_drive_max": 50400.0, "t_drive_margin": 900.0,
                "s_drive_safety": 0.95, "b_fuel_per_lap": 3.0, "fuel_reserve_pct": 8.0,
                "default_compound": "Medium", "p_weather_change": 0.0, "p_sc_deploy": 0.0,
                "p_sc_clear": 0.0, "p_pos_swap": 0.0, "t_adv_min_interval": 600.0,
                "t_adv_cooldown": 1800.0, "seed": 42
            },
            "driver_pars_all": [
                {"id": 1, "name": "Marc Duval", "code": "DUV", "color": "#3366CC"},
                {"id": 2, "name": "Tom Albers", "code": "ALB", "color": "#DC3912"}
            ]
        }"##;

        let tmpfile = tempfile_path("parfile_is_read_and_validated.json");
        let mut fh = std::fs::File::create(&tmpfile).unwrap();
        fh.write_all(json.as_bytes()).unwrap();
        drop(fh);

        let pars = read_sim_pars(&tmpfile).unwrap();
        assert_eq!(pars.race_pars.tot_no_laps, 50);
        assert_eq!(pars.race_pars.seed, Some(42));
        assert_eq!(pars.driver_pars_all[1].code, "ALB");
        // compound falls back to the deserialization default when not given
        assert_eq!(pars.driver_pars_all[0].compound, Compound::Medium);

        std::fs::remove_file(&tmpfile).unwrap();
    }

    #[test]
    fn telemetry_snapshot_is_mapped_with_fallbacks() {
        let json = r#"[
            {"driver_number": 44, "full_name": "Lewis Hamilton", "name_acronym": "HAM",
             "team_colour": "00D2BE", "tire_compound": "SOFT"},
            {"driver_number": 7}
        ]"#;

        let tmpfile = tempfile_path("telemetry_snapshot.json");
        std::fs::write(&tmpfile, json).unwrap();

        let drivers = read_telemetry_snapshot(&tmpfile).unwrap();
        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].name, "Lewis Hamilton");
        assert_eq!(drivers[0].color, "#00D2BE");
        assert_eq!(drivers[0].compound, Compound::Soft);
        assert_eq!(drivers[1].name, "Driver 7");
        assert_eq!(drivers[1].compound, Compound::Medium);

        std::fs::remove_file(&tmpfile).unwrap();
    }

    fn tempfile_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        path
    }
}
