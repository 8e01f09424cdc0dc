use crate::core::race::{RaceState, SafetyCarState, Weather};
use crate::core::tireset::Compound;
use helpers::general::format_race_clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// DriverStatus is one per-driver record of the advisory request shape.
#[derive(Debug, Serialize, Clone)]
pub struct DriverStatus {
    pub id: u32,
    pub name: String,
    pub compound: Compound,
    pub tire_age_laps: u32,
    pub tire_wear: f64,
    pub fuel_level: f64,
    pub t_drive_total: f64,
    pub is_driving: bool,
    pub cur_lap: u32,
}

/// AdvisoryRequest is the fixed request shape sent to the external strategy collaborator:
/// all team driver statuses plus the race-level context.
#[derive(Debug, Serialize, Clone)]
pub struct AdvisoryRequest {
    pub driver_statuses: Vec<DriverStatus>,
    pub cur_lap: u32,
    pub tot_no_laps: u32,
    pub t_elapsed: f64,
    pub t_race_total: f64,
    pub weather: Weather,
    pub safety_car: SafetyCarState,
    pub track_name: String,
}

/// PlannedStop is the structured control part of a response. The simulation acts on this
/// field only and never parses the free-text fields.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PlannedStop {
    pub driver_id: u32,
    pub inlap: u32,
    pub compound: Compound,
}

/// AdvisoryResponse is the fixed response shape. The two text fields are opaque and only
/// displayed; the optional fields carry the machine-readable part of the suggestion.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdvisoryResponse {
    pub suggested_actions: String,
    pub strategic_reasoning: String,
    #[serde(default)]
    pub next_optimal_pit_lap: Option<u32>,
    #[serde(default)]
    pub recommended_next_driver: Option<String>,
    #[serde(default)]
    pub planned_stop: Option<PlannedStop>,
}

/// StrategyAdvisor is the seam to the external text-generation collaborator. Implementations
/// may block; callers bound them with call_with_timeout.
pub trait StrategyAdvisor {
    fn suggest(&self, request: &AdvisoryRequest) -> anyhow::Result<AdvisoryResponse>;
}

/// assemble_request serializes the current race state into the fixed request shape.
pub fn assemble_request(state: &RaceState) -> AdvisoryRequest {
    AdvisoryRequest {
        driver_statuses: state
            .drivers
            .iter()
            .map(|driver| DriverStatus {
                id: driver.id,
                name: driver.name.to_owned(),
                compound: driver.tireset.compound,
                tire_age_laps: driver.tireset.age_laps,
                tire_wear: driver.tireset.wear,
                fuel_level: driver.fuel,
                t_drive_total: driver.t_drive_total,
                is_driving: driver.is_driving,
                cur_lap: state.cur_lap,
            })
            .collect(),
        cur_lap: state.cur_lap,
        tot_no_laps: state.tot_no_laps,
        t_elapsed: state.t_elapsed,
        t_race_total: state.t_race_total,
        weather: state.weather,
        safety_car: state.safety_car,
        track_name: state.track_name.to_owned(),
    }
}

#[derive(Debug)]
pub enum AdvisoryOutcome {
    Suggestion(AdvisoryResponse),
    TimedOut,
    Failed(String),
}

/// call_with_timeout races the advisory call against a caller-side timeout: the call runs on
/// a worker thread and whichever resolves first wins. A late response is dropped with the
/// channel.
pub fn call_with_timeout(
    advisor: Arc<dyn StrategyAdvisor + Send + Sync>,
    request: AdvisoryRequest,
    timeout: Duration,
) -> AdvisoryOutcome {
    let (tx, rx) = flume::bounded(1);

    thread::spawn(move || {
        let _ = tx.send(advisor.suggest(&request));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(response)) => AdvisoryOutcome::Suggestion(response),
        Ok(Err(e)) => AdvisoryOutcome::Failed(e.to_string()),
        Err(_) => AdvisoryOutcome::TimedOut,
    }
}

/// Fingerprint captures the request inputs that must change materially before another call
/// is worth making: the lap plus 5%-buckets of the active driver's wear and fuel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    lap: u32,
    wear_bucket: u32,
    fuel_bucket: u32,
}

impl Fingerprint {
    fn of(request: &AdvisoryRequest) -> Fingerprint {
        let active = request
            .driver_statuses
            .iter()
            .find(|d| d.is_driving)
            .or_else(|| request.driver_statuses.first());

        let (wear, fuel) = active.map_or((0.0, 0.0), |d| (d.tire_wear, d.fuel_level));

        Fingerprint {
            lap: request.cur_lap,
            wear_bucket: (wear / 5.0) as u32,
            fuel_bucket: (fuel / 5.0) as u32,
        }
    }
}

/// AdvisoryGate bounds the request volume toward the collaborator: a minimum interval
/// between calls, de-duplication of materially unchanged inputs, and a cool-down window
/// after a timeout or failure. It is keyed on race time seconds, not wall clock, so the
/// behavior is deterministic under test.
#[derive(Debug)]
pub struct AdvisoryGate {
    t_min_interval: f64,
    t_cooldown: f64,
    t_last_attempt: f64,
    t_cooldown_until: f64,
    last_fingerprint: Option<Fingerprint>,
}

impl AdvisoryGate {
    pub fn new(t_min_interval: f64, t_cooldown: f64) -> AdvisoryGate {
        AdvisoryGate {
            t_min_interval,
            t_cooldown,
            t_last_attempt: f64::NEG_INFINITY,
            t_cooldown_until: f64::NEG_INFINITY,
            last_fingerprint: None,
        }
    }

    /// should_call returns whether an advisory call is permitted for this request now.
    pub fn should_call(&self, t_race: f64, request: &AdvisoryRequest) -> bool {
        if t_race < self.t_cooldown_until {
            return false;
        }

        if t_race - self.t_last_attempt < self.t_min_interval {
            return false;
        }

        self.last_fingerprint != Some(Fingerprint::of(request))
    }

    pub fn record_success(&mut self, t_race: f64, request: &AdvisoryRequest) {
        self.t_last_attempt = t_race;
        self.last_fingerprint = Some(Fingerprint::of(request));
    }

    pub fn record_failure(&mut self, t_race: f64) {
        self.t_last_attempt = t_race;
        self.t_cooldown_until = t_race + self.t_cooldown;
    }
}

/// HeuristicAdvisor is a deterministic stand-in for the external collaborator ("mock data
/// mode"): it projects the next stop from the stint budget and recommends the freshest
/// standby driver.
#[derive(Debug, Clone)]
pub struct HeuristicAdvisor {
    pub stint_max_laps: u32,
    pub t_drive_max: f64,
    pub s_drive_safety: f64,
}

impl StrategyAdvisor for HeuristicAdvisor {
    fn suggest(&self, request: &AdvisoryRequest) -> anyhow::Result<AdvisoryResponse> {
        let active = request
            .driver_statuses
            .iter()
            .find(|d| d.is_driving)
            .ok_or_else(|| anyhow::anyhow!("Advisory request contains no active driver!"))?;

        let laps_left = self
            .stint_max_laps
            .saturating_sub(active.tire_age_laps)
            .max(1);
        let pit_lap = (request.cur_lap + laps_left).min(request.tot_no_laps);

        // freshest standby driver with room under the cap takes the next stint
        let next = request
            .driver_statuses
            .iter()
            .filter(|d| !d.is_driving)
            .filter(|d| d.t_drive_total < self.t_drive_max * self.s_drive_safety)
            .min_by(|a, b| a.t_drive_total.partial_cmp(&b.t_drive_total).unwrap());

        let compound = request.weather.pit_compound(Compound::Medium);

        let suggested_actions = match next {
            Some(next) => format!(
                "{} should pit on lap {} for {} tires. {} to take over the stint.",
                active.name,
                pit_lap,
                compound.as_str(),
                next.name
            ),
            None => format!(
                "{} should pit on lap {} for {} tires and stay in; every other driver is near the drive time cap.",
                active.name,
                pit_lap,
                compound.as_str()
            ),
        };

        let strategic_reasoning = format!(
            "Tires are {} laps into a {}-lap stint at {:.0}% wear, fuel is at {:.0}% and the \
             weather is {}. {} has driven {} so far, which leaves headroom under the cap.",
            active.tire_age_laps,
            self.stint_max_laps,
            active.tire_wear,
            active.fuel_level,
            request.weather.as_str(),
            active.name,
            format_race_clock(active.t_drive_total)
        );

        Ok(AdvisoryResponse {
            suggested_actions,
            strategic_reasoning,
            next_optimal_pit_lap: Some(pit_lap),
            recommended_next_driver: next.map(|d| d.name.to_owned()),
            planned_stop: Some(PlannedStop {
                driver_id: active.id,
                inlap: pit_lap,
                compound,
            }),
        })
    }
}
