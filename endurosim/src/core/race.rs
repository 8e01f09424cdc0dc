use crate::core::driver::{Driver, DriverPars};
use crate::core::tireset::{Compound, WearPars};
use serde::{Deserialize, Serialize};

/// Weather is an ordered intensity scale; random transitions only move one step at a time.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    HeavyRain,
}

impl Default for Weather {
    fn default() -> Self {
        Weather::Sunny
    }
}

impl Weather {
    /// adjacent returns the neighboring intensity in the requested direction, staying put at
    /// the ends of the scale.
    pub fn adjacent(&self, towards_rain: bool) -> Weather {
        match (self, towards_rain) {
            (Weather::Sunny, true) => Weather::Cloudy,
            (Weather::Cloudy, true) => Weather::Rainy,
            (Weather::Rainy, true) => Weather::HeavyRain,
            (Weather::HeavyRain, false) => Weather::Rainy,
            (Weather::Rainy, false) => Weather::Cloudy,
            (Weather::Cloudy, false) => Weather::Sunny,
            (weather, _) => *weather,
        }
    }

    /// pace_factor returns the lap time scaling applied under this weather.
    pub fn pace_factor(&self) -> f64 {
        match self {
            Weather::Sunny | Weather::Cloudy => 1.0,
            Weather::Rainy => 1.08,
            Weather::HeavyRain => 1.15,
        }
    }

    /// pit_compound returns the compound fitted at a stop under this weather.
    pub fn pit_compound(&self, default_compound: Compound) -> Compound {
        match self {
            Weather::Rainy => Compound::Intermediate,
            Weather::HeavyRain => Compound::Wet,
            _ => default_compound,
        }
    }

    pub fn is_rain(&self) -> bool {
        matches!(self, Weather::Rainy | Weather::HeavyRain)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Sunny => "Sunny",
            Weather::Cloudy => "Cloudy",
            Weather::Rainy => "Rainy",
            Weather::HeavyRain => "Heavy Rain",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SafetyCarState {
    None,
    Deployed,
    Virtual,
}

impl Default for SafetyCarState {
    fn default() -> Self {
        SafetyCarState::None
    }
}

impl SafetyCarState {
    /// pace_factor returns the lap time scaling applied while the field is neutralized.
    pub fn pace_factor(&self) -> f64 {
        match self {
            SafetyCarState::None => 1.0,
            SafetyCarState::Deployed => 1.4,
            SafetyCarState::Virtual => 1.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCarState::None => "None",
            SafetyCarState::Deployed => "Deployed",
            SafetyCarState::Virtual => "Virtual",
        }
    }
}

/// * `track_name` - Track name, e.g. Circuit de la Sarthe
/// * `tot_no_laps` - Total number of laps
/// * `t_race_total` - (s) Total race duration
/// * `t_per_tick` - (s) Simulated race time booked per tick
/// * `t_lap_base` - (s) Base lap time
/// * `t_lap_var` - (s) Half width of the uniform lap time band
/// * `n_hist` - Number of lap history entries retained per driver
/// * `stint_max_laps` - Stint length threshold triggering a driver rotation
/// * `t_drive_max` - (s) Regulatory cap on cumulative drive time per driver
/// * `t_drive_margin` - (s) Safety margin before the cap at which the active driver is rotated out
/// * `s_drive_safety` - Fraction of the cap above which a standby driver is skipped at rotation
/// * `b_fuel_per_lap` - (%/lap) Fuel consumption
/// * `fuel_reserve_pct` - (%) Fuel level at which a stop is forced
/// * `default_compound` - Compound fitted at stops in dry conditions
/// * `wear_pars` - Per-compound tire wear rates
/// * `p_weather_change` - Per-tick probability of a weather step
/// * `p_sc_deploy` - Per-tick probability of a safety car deployment
/// * `p_sc_clear` - Per-tick probability that an active safety car period ends
/// * `p_pos_swap` - Per-tick probability of a classification swap
/// * `t_adv_min_interval` - (s) Minimum race time between advisory calls
/// * `t_adv_cooldown` - (s) Cool-down after a failed or timed-out advisory call
/// * `seed` - Seed for the pseudo-random source (entropy-seeded when omitted)
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    pub track_name: String,
    pub tot_no_laps: u32,
    pub t_race_total: f64,
    pub t_per_tick: f64,
    pub t_lap_base: f64,
    pub t_lap_var: f64,
    pub n_hist: usize,
    pub stint_max_laps: u32,
    pub t_drive_max: f64,
    pub t_drive_margin: f64,
    pub s_drive_safety: f64,
    pub b_fuel_per_lap: f64,
    pub fuel_reserve_pct: f64,
    pub default_compound: Compound,
    #[serde(default)]
    pub wear_pars: WearPars,
    pub p_weather_change: f64,
    pub p_sc_deploy: f64,
    pub p_sc_clear: f64,
    pub p_pos_swap: f64,
    pub t_adv_min_interval: f64,
    pub t_adv_cooldown: f64,
    pub seed: Option<u64>,
}

/// RaceState is the single mutable record of the simulation. It is only ever advanced by the
/// tick reducer; current lap never exceeds tot_no_laps and exactly one driver is driving.
#[derive(Debug, Clone)]
pub struct RaceState {
    pub cur_lap: u32,
    pub tot_no_laps: u32,
    pub t_elapsed: f64,
    pub t_race_total: f64,
    pub weather: Weather,
    pub safety_car: SafetyCarState,
    pub track_name: String,
    pub drivers: Vec<Driver>,
    pub finished: bool,
    pub weather_history: Vec<Weather>,
}

impl RaceState {
    pub fn new(race_pars: &RacePars, driver_pars_all: &[DriverPars]) -> RaceState {
        if driver_pars_all.is_empty() {
            panic!("Cannot create a race state without drivers!")
        }

        let mut drivers: Vec<Driver> = driver_pars_all
            .iter()
            .enumerate()
            .map(|(i, driver_pars)| Driver::new(driver_pars, i as u32 + 1))
            .collect();

        // sort drivers list by driver id and put the first one in the car
        drivers.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        drivers[0].is_driving = true;

        RaceState {
            cur_lap: 0,
            tot_no_laps: race_pars.tot_no_laps,
            t_elapsed: 0.0,
            t_race_total: race_pars.t_race_total,
            weather: Weather::default(),
            safety_car: SafetyCarState::default(),
            track_name: race_pars.track_name.to_owned(),
            drivers,
            finished: false,
            weather_history: Vec::new(),
        }
    }

    /// active_idx returns the index of the driver currently in the car.
    pub fn active_idx(&self) -> usize {
        self.drivers
            .iter()
            .position(|driver| driver.is_driving)
            .expect("No active driver in race state!")
    }
}
