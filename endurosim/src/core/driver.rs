use crate::core::tireset::{Compound, Tireset, WearPars};
use helpers::general::clamp_pct;
use serde::{Deserialize, Serialize};

fn default_compound() -> Compound {
    Compound::Medium
}

/// * `id` - Driver id, unique within the team
/// * `name` - Driver name, e.g. Marc Duval
/// * `code` - Driver short code, e.g. DUV
/// * `color` - Hex color used by dashboard consumers
/// * `compound` - Compound fitted at the start of the race
#[derive(Debug, Deserialize, Clone)]
pub struct DriverPars {
    pub id: u32,
    pub name: String,
    pub code: String,
    pub color: String,
    #[serde(default = "default_compound")]
    pub compound: Compound,
}

/// LapRecord is one entry of the bounded lap history shown on the driver cards.
#[derive(Debug, Serialize, Clone)]
pub struct LapRecord {
    pub lap: u32,
    pub t_lap: f64,
    pub tire_wear: f64,
    pub fuel: f64,
    pub position: u32,
}

/// PlannedPit is a structured pit request: pit at the given inlap and fit the given compound.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PlannedPit {
    pub inlap: u32,
    pub compound: Compound,
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub id: u32,
    pub name: String,
    pub code: String,
    pub color: String,
    pub tireset: Tireset,
    pub fuel: f64,
    pub t_drive_total: f64,
    pub is_driving: bool,
    pub position: u32,
    pub laps_driven: u32,
    pub pit_stops: u32,
    pub planned_pit: Option<PlannedPit>,
    pub t_lap_last: Option<f64>,
    pub t_lap_best: Option<f64>,
    pub lap_history: Vec<LapRecord>,
}

impl Driver {
    pub fn new(driver_pars: &DriverPars, position: u32) -> Driver {
        Driver {
            id: driver_pars.id,
            name: driver_pars.name.to_owned(),
            code: driver_pars.code.to_owned(),
            color: driver_pars.color.to_owned(),
            tireset: Tireset::new(driver_pars.compound),
            fuel: 100.0,
            t_drive_total: 0.0,
            is_driving: false,
            position,
            laps_driven: 0,
            pit_stops: 0,
            planned_pit: None,
            t_lap_last: None,
            t_lap_best: None,
            lap_history: Vec::new(),
        }
    }

    /// drive_lap books one completed lap onto the driver: tire wear, fuel burn, drive time,
    /// best/last lap, and a history entry truncated to the most recent n_hist laps.
    pub fn drive_lap(
        &mut self,
        lap: u32,
        t_lap: f64,
        wear_pars: &WearPars,
        b_fuel_per_lap: f64,
        n_hist: usize,
    ) {
        self.tireset.drive_lap(wear_pars);
        self.fuel = clamp_pct(self.fuel - b_fuel_per_lap);
        self.t_drive_total += t_lap;
        self.laps_driven += 1;

        self.t_lap_last = Some(t_lap);
        if self.t_lap_best.map_or(true, |t_best| t_lap < t_best) {
            self.t_lap_best = Some(t_lap);
        }

        self.lap_history.push(LapRecord {
            lap,
            t_lap,
            tire_wear: self.tireset.wear,
            fuel: self.fuel,
            position: self.position,
        });

        if self.lap_history.len() > n_hist {
            let excess = self.lap_history.len() - n_hist;
            self.lap_history.drain(..excess);
        }
    }

    /// perform_pitstop models the stop at the end of a stint: a fresh tireset of the given
    /// compound, a full tank, and an incremented pit stop count.
    pub fn perform_pitstop(&mut self, compound: Compound) {
        self.tireset = Tireset::new(compound);
        self.fuel = 100.0;
        self.pit_stops += 1;
        self.planned_pit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_driver() -> Driver {
        let driver_pars = DriverPars {
            id: 7,
            name: "Marc Duval".to_string(),
            code: "DUV".to_string(),
            color: "#FF0000".to_string(),
            compound: Compound::Medium,
        };
        Driver::new(&driver_pars, 1)
    }

    #[test]
    fn lap_history_is_bounded() {
        let mut driver = test_driver();
        let wear_pars = WearPars::default();

        for lap in 1..=50 {
            driver.drive_lap(lap, 225.0, &wear_pars, 1.0, 15);
        }

        assert_eq!(driver.lap_history.len(), 15);
        assert_eq!(driver.lap_history.first().unwrap().lap, 36);
        assert_eq!(driver.lap_history.last().unwrap().lap, 50);
    }

    #[test]
    fn fuel_burn_is_exact_and_clamped() {
        let mut driver = test_driver();
        let wear_pars = WearPars::default();

        for lap in 1..=10 {
            driver.drive_lap(lap, 225.0, &wear_pars, 3.0, 20);
        }
        assert_relative_eq!(driver.fuel, 70.0);

        for lap in 11..=100 {
            driver.drive_lap(lap, 225.0, &wear_pars, 3.0, 20);
        }
        assert_relative_eq!(driver.fuel, 0.0);
    }

    #[test]
    fn best_lap_tracks_minimum() {
        let mut driver = test_driver();
        let wear_pars = WearPars::default();

        driver.drive_lap(1, 226.0, &wear_pars, 3.0, 20);
        driver.drive_lap(2, 223.5, &wear_pars, 3.0, 20);
        driver.drive_lap(3, 228.0, &wear_pars, 3.0, 20);

        assert_relative_eq!(driver.t_lap_best.unwrap(), 223.5);
        assert_relative_eq!(driver.t_lap_last.unwrap(), 228.0);
    }

    #[test]
    fn pitstop_resets_tires_and_fuel() {
        let mut driver = test_driver();
        let wear_pars = WearPars::default();

        for lap in 1..=12 {
            driver.drive_lap(lap, 225.0, &wear_pars, 3.0, 20);
        }
        driver.perform_pitstop(Compound::Hard);

        assert_eq!(driver.tireset.compound, Compound::Hard);
        assert_relative_eq!(driver.tireset.wear, 0.0);
        assert_eq!(driver.tireset.age_laps, 0);
        assert_relative_eq!(driver.fuel, 100.0);
        assert_eq!(driver.pit_stops, 1);
    }
}
