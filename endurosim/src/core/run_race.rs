use crate::core::race::RaceState;
use crate::core::reducer::{reduce, RaceEvent, TickEvent};
use crate::interfaces::advisory::{
    assemble_request, call_with_timeout, AdvisoryGate, AdvisoryOutcome, AdvisoryResponse,
    StrategyAdvisor,
};
use crate::interfaces::dashboard::{DashboardUpdate, DriverState, RgbColor, MAX_UI_UPDATE_FREQUENCY};
use crate::post::race_report::{format_event, RaceReport};
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// run_race creates and advances a race on the basis of the inserted parameters and returns
/// the report for post-processing. The loop itself holds no business logic: every state
/// change goes through the reducer, and the loop only handles pacing, the dashboard channel,
/// and the advisory boundary.
///
/// If a sender is inserted the race is simulated in real time (scaled by realtime_factor)
/// and dashboard updates are streamed; otherwise it runs flat out.
#[allow(clippy::too_many_arguments)]
pub fn run_race(
    sim_pars: &SimPars,
    print_debug: bool,
    tx: Option<&Sender<DashboardUpdate>>,
    realtime_factor: f64,
    advisor: Option<Arc<dyn StrategyAdvisor + Send + Sync>>,
    advisory_timeout: f64,
    print_events: bool,
) -> anyhow::Result<RaceReport> {
    let race_pars = &sim_pars.race_pars;

    let mut state = RaceState::new(race_pars, &sim_pars.driver_pars_all);
    let mut rng = match race_pars.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut gate = AdvisoryGate::new(race_pars.t_adv_min_interval, race_pars.t_adv_cooldown);
    let mut latest_advisory: Option<AdvisoryResponse> = None;
    let mut pending_plans: Vec<TickEvent> = Vec::new();
    let mut event_log: Vec<RaceEvent> = Vec::new();
    let mut notices: Vec<String> = Vec::new();

    let sim_realtime = tx.is_some();
    let mut t_race_update_gui = f64::NEG_INFINITY;
    let mut last_printed_lap = 0u32;

    while !state.finished {
        let t_start = Instant::now();

        // apply structured advisory plans first, then advance the tick
        for plan in pending_plans.drain(..) {
            let (next, _) = reduce(state, plan, race_pars, &mut rng);
            state = next;
        }

        let (next, events) = reduce(state, TickEvent::Advance, race_pars, &mut rng);
        state = next;

        for event in &events {
            let line = format_event(event);
            if print_events {
                println!("{}", line);
            }
            notices.push(line);
        }
        event_log.extend(events);

        if print_debug && state.cur_lap > last_printed_lap {
            println!(
                "INFO: Simulating... Current race time is {:.3}s, current lap is {}",
                state.t_elapsed, state.cur_lap
            );
            last_printed_lap = state.cur_lap;
        }

        // advisory boundary: bounded by the gate, raced against the timeout
        if let Some(advisor) = advisor.as_ref() {
            if !state.finished {
                let request = assemble_request(&state);

                if gate.should_call(state.t_elapsed, &request) {
                    match call_with_timeout(
                        Arc::clone(advisor),
                        request.clone(),
                        Duration::from_secs_f64(advisory_timeout),
                    ) {
                        AdvisoryOutcome::Suggestion(response) => {
                            gate.record_success(state.t_elapsed, &request);

                            if let Some(stop) = response.planned_stop {
                                pending_plans.push(TickEvent::PlanPitStop {
                                    driver_id: stop.driver_id,
                                    inlap: stop.inlap,
                                    compound: stop.compound,
                                });
                            }

                            let line = format!("INFO: Advisory: {}", response.suggested_actions);
                            if print_events {
                                println!("{}", line);
                            }
                            notices.push(line);
                            latest_advisory = Some(response);
                        }
                        AdvisoryOutcome::TimedOut => {
                            gate.record_failure(state.t_elapsed);
                            let line = format!(
                                "WARNING: Advisory call exceeded the {:.1}s timeout, cooling down",
                                advisory_timeout
                            );
                            if print_events {
                                println!("{}", line);
                            }
                            notices.push(line);
                        }
                        AdvisoryOutcome::Failed(msg) => {
                            gate.record_failure(state.t_elapsed);
                            let line =
                                format!("WARNING: Advisory call failed ({}), cooling down", msg);
                            if print_events {
                                println!("{}", line);
                            }
                            notices.push(line);
                        }
                    }
                }
            }
        }

        if let Some(tx) = tx {
            if state.t_elapsed > t_race_update_gui + 1.0 / MAX_UI_UPDATE_FREQUENCY - 0.001 {
                let update =
                    build_update(&state, latest_advisory.clone(), std::mem::take(&mut notices))?;
                tx.send(update)
                    .context("Failed to send dashboard update to UI!")?;
                t_race_update_gui = state.t_elapsed;
            }

            // sleep until the tick is finished in real time as well (calculation in ms)
            let t_sleep = (race_pars.t_per_tick * 1000.0 / realtime_factor) as i64
                - t_start.elapsed().as_millis() as i64;

            if t_sleep > 0 {
                sleep(Duration::from_millis(t_sleep as u64));
            } else if sim_realtime {
                println!("WARNING: Could not keep up with real-time!")
            }
        }
    }

    let report = RaceReport::from_state(&state, event_log);

    // after the loop finishes, send the final update carrying the report once
    if let Some(tx) = tx {
        let mut update = build_update(&state, latest_advisory, std::mem::take(&mut notices))?;
        update.final_report = Some(report.clone());
        tx.send(update)
            .context("Failed to send final race report to UI!")?;
    }

    Ok(report)
}

/// build_update maps the race state into the dashboard snapshot shape, parsing the driver
/// hex colors for the consumers.
fn build_update(
    state: &RaceState,
    advisory: Option<AdvisoryResponse>,
    notices: Vec<String>,
) -> anyhow::Result<DashboardUpdate> {
    let mut driver_states = Vec::with_capacity(state.drivers.len());

    for driver in &state.drivers {
        let tmp_color = driver
            .color
            .parse::<css_color_parser::Color>()
            .context("Could not parse hex color!")?;

        driver_states.push(DriverState {
            id: driver.id,
            name: driver.name.to_owned(),
            code: driver.code.to_owned(),
            color: RgbColor {
                r: tmp_color.r,
                g: tmp_color.g,
                b: tmp_color.b,
            },
            is_driving: driver.is_driving,
            position: driver.position,
            compound: driver.tireset.compound,
            tire_wear: driver.tireset.wear,
            tire_age_laps: driver.tireset.age_laps,
            fuel: driver.fuel,
            t_drive_total: driver.t_drive_total,
            pit_stops: driver.pit_stops,
            t_lap_last: driver.t_lap_last,
            t_lap_best: driver.t_lap_best,
        });
    }

    Ok(DashboardUpdate {
        cur_lap: state.cur_lap,
        tot_no_laps: state.tot_no_laps,
        t_elapsed: state.t_elapsed,
        t_race_total: state.t_race_total,
        weather: state.weather,
        safety_car: state.safety_car,
        track_name: state.track_name.to_owned(),
        driver_states,
        advisory,
        notices,
        final_report: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::advisory::HeuristicAdvisor;
    use crate::pre::read_sim_pars::default_sim_pars;

    #[test]
    fn flat_out_run_completes_and_reports() {
        let mut sim_pars = default_sim_pars();
        sim_pars.race_pars.tot_no_laps = 40;
        sim_pars.race_pars.t_race_total = 40.0 * sim_pars.race_pars.t_per_tick;
        sim_pars.race_pars.seed = Some(7);

        let report = run_race(&sim_pars, false, None, 1.0, None, 2.0, false).unwrap();

        assert_eq!(report.laps_completed, 40);
        let laps_driven: u32 = report.driver_summaries.iter().map(|s| s.laps_driven).sum();
        assert_eq!(laps_driven, 40);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, RaceEvent::RaceFinished { .. })));
    }

    #[test]
    fn advisory_plans_are_fed_back_into_the_race() {
        let mut sim_pars = default_sim_pars();
        sim_pars.race_pars.tot_no_laps = 60;
        sim_pars.race_pars.t_race_total = 60.0 * sim_pars.race_pars.t_per_tick;
        sim_pars.race_pars.seed = Some(7);
        // advisory projects the stop before the stint budget forces it
        sim_pars.race_pars.t_adv_min_interval = 0.0;

        let advisor = Arc::new(HeuristicAdvisor {
            stint_max_laps: 10,
            t_drive_max: sim_pars.race_pars.t_drive_max,
            s_drive_safety: sim_pars.race_pars.s_drive_safety,
        });

        let report = run_race(&sim_pars, false, None, 1.0, Some(advisor), 2.0, false).unwrap();

        assert!(report.events.iter().any(|e| matches!(
            e,
            RaceEvent::DriverRotation {
                reason: crate::core::reducer::RotationReason::PlannedStop,
                ..
            }
        )));
    }

    #[test]
    fn streamed_run_ends_with_a_final_report() {
        let mut sim_pars = default_sim_pars();
        sim_pars.race_pars.tot_no_laps = 10;
        sim_pars.race_pars.t_race_total = 10.0 * sim_pars.race_pars.t_per_tick;
        sim_pars.race_pars.seed = Some(7);

        let (tx, rx) = flume::unbounded();
        // a very large factor makes the real-time pacing a no-op in the test
        let report = run_race(&sim_pars, false, Some(&tx), 1.0e9, None, 2.0, false).unwrap();
        drop(tx);

        let updates: Vec<DashboardUpdate> = rx.drain().collect();
        assert!(!updates.is_empty());
        let last = updates.last().unwrap();
        assert!(last.final_report.is_some());
        assert_eq!(
            last.final_report.as_ref().unwrap().laps_completed,
            report.laps_completed
        );
    }
}
