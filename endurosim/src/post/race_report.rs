use crate::core::driver::LapRecord;
use crate::core::race::{RaceState, Weather};
use crate::core::reducer::RaceEvent;
use helpers::general::{format_laptime, format_race_clock};
use serde::Serialize;

/// DriverSummary is the per-driver part of the post-processing payload.
#[derive(Debug, Serialize, Clone)]
pub struct DriverSummary {
    pub id: u32,
    pub name: String,
    pub code: String,
    pub laps_driven: u32,
    pub pit_stops: u32,
    pub t_drive_total: f64,
    pub t_lap_best: Option<f64>,
    pub lap_history: Vec<LapRecord>,
}

/// RaceReport contains all race information that is required for post-processing: the final
/// numbers, the weather by lap, the event log, and one summary per driver.
#[derive(Debug, Serialize, Clone, Default)]
pub struct RaceReport {
    pub track_name: String,
    pub tot_no_laps: u32,
    pub laps_completed: u32,
    pub t_race: f64,
    pub weather_history: Vec<Weather>,
    pub events: Vec<RaceEvent>,
    pub driver_summaries: Vec<DriverSummary>,
}

impl RaceReport {
    pub fn from_state(state: &RaceState, events: Vec<RaceEvent>) -> RaceReport {
        RaceReport {
            track_name: state.track_name.to_owned(),
            tot_no_laps: state.tot_no_laps,
            laps_completed: state.cur_lap,
            t_race: state.t_elapsed,
            weather_history: state.weather_history.to_owned(),
            events,
            driver_summaries: state
                .drivers
                .iter()
                .map(|driver| DriverSummary {
                    id: driver.id,
                    name: driver.name.to_owned(),
                    code: driver.code.to_owned(),
                    laps_driven: driver.laps_driven,
                    pit_stops: driver.pit_stops,
                    t_drive_total: driver.t_drive_total,
                    t_lap_best: driver.t_lap_best,
                    lap_history: driver.lap_history.to_owned(),
                })
                .collect(),
        }
    }

    /// print_summary prints the race outcome to the console output.
    pub fn print_summary(&self) {
        println!(
            "RESULT: {} finished after {}/{} laps in {}",
            self.track_name,
            self.laps_completed,
            self.tot_no_laps,
            format_race_clock(self.t_race)
        );

        for summary in &self.driver_summaries {
            let t_lap_best = summary
                .t_lap_best
                .map(format_laptime)
                .unwrap_or_else(|| "-".to_string());

            println!(
                "RESULT: {} ({}): {} laps driven, {} pit stops, drive time {}, best lap {}",
                summary.code,
                summary.name,
                summary.laps_driven,
                summary.pit_stops,
                format_race_clock(summary.t_drive_total),
                t_lap_best
            );
        }

        println!("RESULT: {} race events logged", self.events.len());
    }

    /// write_lap_history_csv writes the retained lap history of all drivers to a CSV file in
    /// output/ and returns the path to the written file.
    pub fn write_lap_history_csv(&self, path: Option<&std::path::Path>) -> anyhow::Result<String> {
        let out_dir = std::path::Path::new("output");
        std::fs::create_dir_all(out_dir)?;
        let out_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            out_dir.join("lap_history.csv")
        };

        let mut writer = csv::Writer::from_path(&out_path)?;
        writer.write_record(&["driver", "lap", "t_lap", "tire_wear", "fuel", "position"])?;

        for summary in &self.driver_summaries {
            for record in &summary.lap_history {
                writer.write_record(&[
                    summary.code.to_owned(),
                    record.lap.to_string(),
                    format!("{:.3}", record.t_lap),
                    format!("{:.1}", record.tire_wear),
                    format!("{:.1}", record.fuel),
                    record.position.to_string(),
                ])?;
            }
        }

        writer.flush()?;
        Ok(out_path.to_string_lossy().into_owned())
    }
}

/// format_event renders one race event as a notification line for the UI layer.
pub fn format_event(event: &RaceEvent) -> String {
    match event {
        RaceEvent::RaceFinished { lap, t_race } => format!(
            "INFO: Race finished after {} laps in {}",
            lap,
            format_race_clock(*t_race)
        ),
        RaceEvent::DriverRotation {
            outgoing_id,
            incoming_id,
            lap,
            reason,
        } => format!(
            "INFO: Driver rotation on lap {}: driver {} out, driver {} in ({:?})",
            lap, outgoing_id, incoming_id, reason
        ),
        RaceEvent::PitStop {
            driver_id,
            lap,
            compound,
        } => format!(
            "INFO: Pit stop on lap {}: driver {} takes {} tires",
            lap,
            driver_id,
            compound.as_str()
        ),
        RaceEvent::WeatherChange { from, to, lap } => format!(
            "INFO: Weather changed from {} to {} on lap {}",
            from.as_str(),
            to.as_str(),
            lap
        ),
        RaceEvent::SafetyCar { state, lap } => format!(
            "INFO: Safety car status on lap {}: {}",
            lap,
            state.as_str()
        ),
        RaceEvent::PositionSwap {
            id_gained,
            id_lost,
            lap,
        } => format!(
            "INFO: Position change on lap {}: driver {} ahead of driver {}",
            lap, id_gained, id_lost
        ),
        RaceEvent::DriveTimeCapAnomaly { lap } => format!(
            "WARNING: All drivers at or near the drive time cap on lap {}, best-effort rotation",
            lap
        ),
    }
}
