use crate::core::driver::{Driver, PlannedPit};
use crate::core::race::{RacePars, RaceState, SafetyCarState, Weather};
use crate::core::tireset::Compound;
use helpers::general::{argsort, SortOrder};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;

/// TickEvent is the input alphabet of the reducer: the periodic advance, and structured
/// control requests. The driving loop holds no business logic of its own.
#[derive(Debug, Clone)]
pub enum TickEvent {
    Advance,
    PlanPitStop {
        driver_id: u32,
        inlap: u32,
        compound: Compound,
    },
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    StintLength,
    DriveTimeMargin,
    FuelReserve,
    PlannedStop,
}

/// RaceEvent is raised by the reducer for everything the UI layer reports as a notification
/// and the post-processing keeps in the event log.
#[derive(Debug, Serialize, Clone)]
pub enum RaceEvent {
    RaceFinished {
        lap: u32,
        t_race: f64,
    },
    DriverRotation {
        outgoing_id: u32,
        incoming_id: u32,
        lap: u32,
        reason: RotationReason,
    },
    PitStop {
        driver_id: u32,
        lap: u32,
        compound: Compound,
    },
    WeatherChange {
        from: Weather,
        to: Weather,
        lap: u32,
    },
    SafetyCar {
        state: SafetyCarState,
        lap: u32,
    },
    PositionSwap {
        id_gained: u32,
        id_lost: u32,
        lap: u32,
    },
    DriveTimeCapAnomaly {
        lap: u32,
    },
}

// -------------------------------------------------------------------------------------------------
// MAIN METHOD -------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// reduce applies a single event to the race state and returns the successor state together
/// with the events raised along the way. All race state mutation funnels through this
/// function, so each tick is an atomic read-modify-write.
pub fn reduce(
    mut state: RaceState,
    event: TickEvent,
    race_pars: &RacePars,
    rng: &mut StdRng,
) -> (RaceState, Vec<RaceEvent>) {
    let mut events = Vec::new();

    match event {
        TickEvent::PlanPitStop {
            driver_id,
            inlap,
            compound,
        } => {
            // unknown driver ids are ignored, the plan is advisory input after all
            if let Some(driver) = state.drivers.iter_mut().find(|d| d.id == driver_id) {
                driver.planned_pit = Some(PlannedPit { inlap, compound });
            }
        }
        TickEvent::Advance => advance(&mut state, race_pars, rng, &mut events),
    }

    (state, events)
}

// -------------------------------------------------------------------------------------------------
// TICK PARTS --------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn advance(state: &mut RaceState, race_pars: &RacePars, rng: &mut StdRng, events: &mut Vec<RaceEvent>) {
    if state.finished {
        return;
    }

    // termination is checked up front so the completion notice is emitted exactly once and
    // nothing is mutated past the end of the race
    if state.cur_lap >= state.tot_no_laps || state.t_elapsed >= state.t_race_total {
        state.finished = true;
        events.push(RaceEvent::RaceFinished {
            lap: state.cur_lap,
            t_race: state.t_elapsed,
        });
        return;
    }

    // increment discretization variable
    state.t_elapsed += race_pars.t_per_tick;

    roll_ancillary_events(state, race_pars, rng, events);

    // lap advancement for the active driver
    state.cur_lap += 1;
    state.weather_history.push(state.weather);

    let t_lap = draw_laptime(state, race_pars, rng);
    let active_idx = state.active_idx();
    let cur_lap = state.cur_lap;
    state.drivers[active_idx].drive_lap(
        cur_lap,
        t_lap,
        &race_pars.wear_pars,
        race_pars.b_fuel_per_lap,
        race_pars.n_hist,
    );

    check_rotation(state, race_pars, active_idx, events);
}

/// draw_laptime draws a lap time uniformly from the configured band and scales it with the
/// current weather and safety car pace factors.
fn draw_laptime(state: &RaceState, race_pars: &RacePars, rng: &mut StdRng) -> f64 {
    let band = Uniform::new_inclusive(
        race_pars.t_lap_base - race_pars.t_lap_var,
        race_pars.t_lap_base + race_pars.t_lap_var,
    );

    band.sample(rng) * state.weather.pace_factor() * state.safety_car.pace_factor()
}

/// roll_ancillary_events layers the low-probability weather, safety car, and classification
/// transitions on top of the tick.
fn roll_ancillary_events(
    state: &mut RaceState,
    race_pars: &RacePars,
    rng: &mut StdRng,
    events: &mut Vec<RaceEvent>,
) {
    // weather drifts one intensity step at a time
    if rng.gen::<f64>() < race_pars.p_weather_change {
        let towards_rain = rng.gen::<bool>();
        let to = state.weather.adjacent(towards_rain);

        if to != state.weather {
            events.push(RaceEvent::WeatherChange {
                from: state.weather,
                to,
                lap: state.cur_lap,
            });
            state.weather = to;
        }
    }

    match state.safety_car {
        SafetyCarState::None => {
            if rng.gen::<f64>() < race_pars.p_sc_deploy {
                let sc_state = if rng.gen::<bool>() {
                    SafetyCarState::Deployed
                } else {
                    SafetyCarState::Virtual
                };
                state.safety_car = sc_state;
                events.push(RaceEvent::SafetyCar {
                    state: sc_state,
                    lap: state.cur_lap,
                });
            }
        }
        _ => {
            if rng.gen::<f64>() < race_pars.p_sc_clear {
                state.safety_car = SafetyCarState::None;
                events.push(RaceEvent::SafetyCar {
                    state: SafetyCarState::None,
                    lap: state.cur_lap,
                });
            }
        }
    }

    // occasional swap of two adjacent classification slots
    if state.drivers.len() >= 2 && rng.gen::<f64>() < race_pars.p_pos_swap {
        let positions: Vec<u32> = state.drivers.iter().map(|d| d.position).collect();
        let idxs_sorted = argsort(&positions, SortOrder::Ascending);
        let k = rng.gen_range(0..idxs_sorted.len() - 1);

        let idx_ahead = idxs_sorted[k];
        let idx_behind = idxs_sorted[k + 1];
        let pos_tmp = state.drivers[idx_ahead].position;
        state.drivers[idx_ahead].position = state.drivers[idx_behind].position;
        state.drivers[idx_behind].position = pos_tmp;

        events.push(RaceEvent::PositionSwap {
            id_gained: state.drivers[idx_behind].id,
            id_lost: state.drivers[idx_ahead].id,
            lap: state.cur_lap,
        });
    }
}

/// rotation_due returns the reason the active driver has to come in after this lap, if any.
fn rotation_due(driver: &Driver, cur_lap: u32, race_pars: &RacePars) -> Option<RotationReason> {
    if let Some(planned_pit) = driver.planned_pit {
        if cur_lap >= planned_pit.inlap {
            return Some(RotationReason::PlannedStop);
        }
    }

    if driver.tireset.age_laps >= race_pars.stint_max_laps {
        return Some(RotationReason::StintLength);
    }

    if driver.t_drive_total >= race_pars.t_drive_max - race_pars.t_drive_margin {
        return Some(RotationReason::DriveTimeMargin);
    }

    if driver.fuel <= race_pars.fuel_reserve_pct {
        return Some(RotationReason::FuelReserve);
    }

    None
}

fn check_rotation(
    state: &mut RaceState,
    race_pars: &RacePars,
    active_idx: usize,
    events: &mut Vec<RaceEvent>,
) {
    let reason = match rotation_due(&state.drivers[active_idx], state.cur_lap, race_pars) {
        Some(reason) => reason,
        None => return,
    };

    let outgoing_id = state.drivers[active_idx].id;
    let compound = state.drivers[active_idx]
        .planned_pit
        .map(|planned_pit| planned_pit.compound)
        .unwrap_or_else(|| state.weather.pit_compound(race_pars.default_compound));

    // the stop itself: fresh tires and a full tank for the car the next driver takes over
    state.drivers[active_idx].perform_pitstop(compound);
    state.drivers[active_idx].is_driving = false;
    events.push(RaceEvent::PitStop {
        driver_id: outgoing_id,
        lap: state.cur_lap,
        compound,
    });

    let incoming_idx = match select_next_driver(&state.drivers, active_idx, race_pars) {
        Some(idx) => idx,
        None => {
            // every candidate is at or near the cap: flagged as a non-fatal anomaly, the
            // least-driven driver takes over anyway
            events.push(RaceEvent::DriveTimeCapAnomaly {
                lap: state.cur_lap,
            });
            least_driven_idx(&state.drivers, active_idx)
        }
    };

    state.drivers[incoming_idx].is_driving = true;
    events.push(RaceEvent::DriverRotation {
        outgoing_id,
        incoming_id: state.drivers[incoming_idx].id,
        lap: state.cur_lap,
        reason,
    });
}

// -------------------------------------------------------------------------------------------------
// METHODS (HELPERS) -------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// select_next_driver returns the next driver in rotation order whose cumulative drive time
/// still leaves room under the regulatory cap, skipping the outgoing driver.
fn select_next_driver(drivers: &[Driver], active_idx: usize, race_pars: &RacePars) -> Option<usize> {
    let no_drivers = drivers.len();

    for step in 1..=no_drivers {
        let idx = (active_idx + step) % no_drivers;

        if idx == active_idx {
            continue;
        }

        if drivers[idx].t_drive_total < race_pars.t_drive_max * race_pars.s_drive_safety {
            return Some(idx);
        }
    }

    None
}

/// least_driven_idx returns the standby driver with the smallest cumulative drive time (the
/// outgoing driver only for a single-driver team).
fn least_driven_idx(drivers: &[Driver], active_idx: usize) -> usize {
    let mut idx_min = if drivers.len() == 1 { active_idx } else { (active_idx + 1) % drivers.len() };

    for (idx, driver) in drivers.iter().enumerate() {
        if idx == active_idx && drivers.len() > 1 {
            continue;
        }
        if driver.t_drive_total < drivers[idx_min].t_drive_total {
            idx_min = idx;
        }
    }

    idx_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::DriverPars;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn test_race_pars() -> RacePars {
        RacePars {
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
            wear_pars: Default::default(),
            p_weather_change: 0.0,
            p_sc_deploy: 0.0,
            p_sc_clear: 0.0,
            p_pos_swap: 0.0,
            t_adv_min_interval: 600.0,
            t_adv_cooldown: 1800.0,
            seed: Some(42),
        }
    }

    fn test_driver_pars(no_drivers: u32) -> Vec<DriverPars> {
        (1..=no_drivers)
            .map(|id| DriverPars {
                id,
                name: format!("Driver {}", id),
                code: format!("D{:02}", id),
                color: "#FF0000".to_string(),
                compound: Compound::Medium,
            })
            .collect()
    }

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn tick(state: RaceState, race_pars: &RacePars, rng: &mut StdRng) -> (RaceState, Vec<RaceEvent>) {
        reduce(state, TickEvent::Advance, race_pars, rng)
    }

    #[test]
    fn wear_and_fuel_stay_in_bounds() {
        let race_pars = test_race_pars();
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        for _ in 0..500 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;

            for driver in &state.drivers {
                assert!(driver.tireset.wear >= 0.0 && driver.tireset.wear <= 100.0);
                assert!(driver.fuel >= 0.0 && driver.fuel <= 100.0);
            }
        }
    }

    #[test]
    fn exactly_one_driver_is_driving() {
        let mut race_pars = test_race_pars();
        race_pars.p_weather_change = 0.05;
        race_pars.p_sc_deploy = 0.02;
        race_pars.p_sc_clear = 0.2;
        race_pars.p_pos_swap = 0.05;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        for _ in 0..500 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;

            let no_driving = state.drivers.iter().filter(|d| d.is_driving).count();
            assert_eq!(no_driving, 1);
        }
    }

    #[test]
    fn lap_and_time_never_exceed_totals() {
        let mut race_pars = test_race_pars();
        race_pars.tot_no_laps = 50;
        race_pars.t_race_total = 50.0 * race_pars.t_per_tick;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        for _ in 0..200 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;

            assert!(state.cur_lap <= state.tot_no_laps);
            assert!(state.t_elapsed <= state.t_race_total);
        }
        assert!(state.finished);
    }

    #[test]
    fn lap_history_never_exceeds_window() {
        let race_pars = test_race_pars();
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(2));

        for _ in 0..300 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;

            for driver in &state.drivers {
                assert!(driver.lap_history.len() <= race_pars.n_hist);
            }
        }
    }

    #[test]
    fn fuel_scenario_ten_ticks() {
        // starting fuel 100%, consumption 3.0%/lap, a single driver stint of 10 laps
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 100;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        for _ in 0..10 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;
        }

        assert_relative_eq!(state.drivers[0].fuel, 70.0);
    }

    #[test]
    fn stint_threshold_triggers_rotation() {
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 10;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        for _ in 0..9 {
            let (next, events) = tick(state, &race_pars, &mut rng);
            state = next;
            assert!(events.is_empty());
        }
        assert!(state.drivers[0].is_driving);

        // tire age reaches 10 on this tick, so it must produce the rotation
        let (next, events) = tick(state, &race_pars, &mut rng);
        state = next;

        assert!(events
            .iter()
            .any(|e| matches!(e, RaceEvent::PitStop { driver_id: 1, .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            RaceEvent::DriverRotation {
                outgoing_id: 1,
                incoming_id: 2,
                reason: RotationReason::StintLength,
                ..
            }
        )));
        assert!(!state.drivers[0].is_driving);
        assert!(state.drivers[1].is_driving);
        assert_eq!(state.drivers[0].pit_stops, 1);
        assert_relative_eq!(state.drivers[0].tireset.wear, 0.0);
        assert_relative_eq!(state.drivers[0].fuel, 100.0);
    }

    #[test]
    fn rotation_skips_drivers_near_cap() {
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 5;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        // driver 2 is already over the skip threshold
        state.drivers[1].t_drive_total = race_pars.t_drive_max * race_pars.s_drive_safety + 1.0;

        for _ in 0..5 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;
        }

        assert!(state.drivers[2].is_driving);
        assert!(
            state.drivers[2].t_drive_total < race_pars.t_drive_max,
            "activated driver must be under the regulatory cap"
        );
    }

    #[test]
    fn all_drivers_near_cap_is_flagged_not_fatal() {
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 5;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        let near_cap = race_pars.t_drive_max * race_pars.s_drive_safety + 1.0;
        state.drivers[1].t_drive_total = near_cap;
        state.drivers[2].t_drive_total = near_cap + 500.0;

        let mut saw_anomaly = false;
        for _ in 0..5 {
            let (next, events) = tick(state, &race_pars, &mut rng);
            state = next;
            saw_anomaly |= events
                .iter()
                .any(|e| matches!(e, RaceEvent::DriveTimeCapAnomaly { .. }));
        }

        assert!(saw_anomaly);
        // the least-driven standby driver took over regardless
        assert!(state.drivers[1].is_driving);
    }

    #[test]
    fn completion_notice_is_emitted_exactly_once() {
        let mut race_pars = test_race_pars();
        race_pars.tot_no_laps = 5;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(2));

        for _ in 0..5 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;
        }
        assert_eq!(state.cur_lap, 5);
        assert!(!state.finished);

        // the next tick must not advance the lap counter and must emit the one notice
        let (next, events) = tick(state, &race_pars, &mut rng);
        state = next;
        assert_eq!(state.cur_lap, 5);
        assert!(state.finished);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, RaceEvent::RaceFinished { .. }))
                .count(),
            1
        );

        // and every tick after that is a no-op
        for _ in 0..3 {
            let t_elapsed_before = state.t_elapsed;
            let (next, events) = tick(state, &race_pars, &mut rng);
            state = next;
            assert!(events.is_empty());
            assert_relative_eq!(state.t_elapsed, t_elapsed_before);
        }
    }

    #[test]
    fn planned_pit_stop_is_honored_without_text_parsing() {
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 100;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(3));

        let (next, events) = reduce(
            state,
            TickEvent::PlanPitStop {
                driver_id: 1,
                inlap: 3,
                compound: Compound::Hard,
            },
            &race_pars,
            &mut rng,
        );
        state = next;
        assert!(events.is_empty());

        for _ in 0..3 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;
        }

        assert!(!state.drivers[0].is_driving);
        assert_eq!(state.drivers[0].tireset.compound, Compound::Hard);
        assert!(state.drivers[0].planned_pit.is_none());
        assert!(state.drivers[1].is_driving);
    }

    #[test]
    fn rain_forces_rain_compound_at_the_stop() {
        let mut race_pars = test_race_pars();
        race_pars.stint_max_laps = 2;
        let mut rng = test_rng();
        let mut state = RaceState::new(&race_pars, &test_driver_pars(2));
        state.weather = Weather::HeavyRain;

        for _ in 0..2 {
            let (next, _) = tick(state, &race_pars, &mut rng);
            state = next;
        }

        assert_eq!(state.drivers[0].tireset.compound, Compound::Wet);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let race_pars = test_race_pars();

        let run = || {
            let mut rng = test_rng();
            let mut state = RaceState::new(&race_pars, &test_driver_pars(3));
            for _ in 0..50 {
                let (next, _) = tick(state, &race_pars, &mut rng);
                state = next;
            }
            state
        };

        let a = run();
        let b = run();
        assert_relative_eq!(
            a.drivers[0].t_lap_last.unwrap(),
            b.drivers[0].t_lap_last.unwrap()
        );
        assert_relative_eq!(a.t_elapsed, b.t_elapsed);
    }
}
