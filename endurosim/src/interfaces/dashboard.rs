use crate::core::race::{SafetyCarState, Weather};
use crate::core::tireset::Compound;
use crate::interfaces::advisory::AdvisoryResponse;
use crate::post::race_report::RaceReport;

pub const MAX_UI_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// DriverState is the per-driver card payload sent to dashboard consumers.
#[derive(Debug, Clone)]
pub struct DriverState {
    pub id: u32,
    pub name: String,
    pub code: String,
    pub color: RgbColor,
    pub is_driving: bool,
    pub position: u32,
    pub compound: Compound,
    pub tire_wear: f64,
    pub tire_age_laps: u32,
    pub fuel: f64,
    pub t_drive_total: f64,
    pub pit_stops: u32,
    pub t_lap_last: Option<f64>,
    pub t_lap_best: Option<f64>,
}

/// DashboardUpdate is one snapshot of the race sent over the channel to the UI layer.
/// Notices are the transient notification lines raised since the previous update; the final
/// update of a race carries the report.
#[derive(Debug, Clone, Default)]
pub struct DashboardUpdate {
    pub cur_lap: u32,
    pub tot_no_laps: u32,
    pub t_elapsed: f64,
    pub t_race_total: f64,
    pub weather: Weather,
    pub safety_car: SafetyCarState,
    pub track_name: String,
    pub driver_states: Vec<DriverState>,
    pub advisory: Option<AdvisoryResponse>,
    pub notices: Vec<String>,
    pub final_report: Option<RaceReport>,
}
