use clap::Parser;
use endurosim::core::reducer::RaceEvent;
use endurosim::core::run_race::run_race;
use endurosim::interfaces::advisory::{HeuristicAdvisor, StrategyAdvisor};
use endurosim::interfaces::dashboard::DashboardUpdate;
use endurosim::post::race_report::RaceReport;
use endurosim::pre::read_sim_pars::{default_sim_pars, read_sim_pars, read_telemetry_snapshot};
use endurosim::pre::sim_opts::SimOpts;
use helpers::general::format_race_clock;
use plotters::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// event_plot_style returns the marker style for an event worth drawing into the laptime
/// plot, or None for events that would only clutter it.
fn event_plot_style(event: &RaceEvent) -> Option<(u32, RGBColor, u32)> {
    match event {
        RaceEvent::WeatherChange { lap, .. } => Some((*lap, RGBColor(150, 150, 150), 1)),
        RaceEvent::SafetyCar { lap, .. } => Some((*lap, RGBColor(255, 165, 0), 1)),
        RaceEvent::DriverRotation { lap, .. } => Some((*lap, RGBColor(70, 70, 200), 1)),
        _ => None,
    }
}

fn export_results_plot(report: &RaceReport) -> anyhow::Result<String> {
    let out_dir = std::path::Path::new("output");
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let filename = format!("race_plot_{}.png", ts);
    let out_path = out_dir.join(filename);

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for summary in &report.driver_summaries {
        for record in &summary.lap_history {
            if record.t_lap.is_finite() && record.t_lap > 0.0 {
                if record.t_lap < y_min { y_min = record.t_lap; }
                if record.t_lap > y_max { y_max = record.t_lap; }
            }
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() { y_min = 0.0; y_max = 1.0; }
    let margin = (y_max - y_min) * 0.05;
    y_min -= margin; y_max += margin;

    let root = BitMapBackend::new(out_path.to_str().unwrap(), (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Lap times per driver", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1u32..report.tot_no_laps.max(2), y_min..y_max)?;

    // Light-grey background bands for rainy laps
    for (i, weather) in report.weather_history.iter().enumerate() {
        if weather.is_rain() {
            let x0 = (i + 1) as u32;
            let x1 = x0.saturating_add(1);
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y_min), (x1, y_max)],
                RGBAColor(200, 200, 200, 0.20).filled(),
            )))?;
        }
    }

    chart.configure_mesh()
        .x_desc("Lap")
        .y_desc("s")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    let palette = Palette99::pick;
    for (i, summary) in report.driver_summaries.iter().enumerate() {
        let series: Vec<(u32, f64)> = summary
            .lap_history
            .iter()
            .filter(|record| record.t_lap.is_finite() && record.t_lap > 0.0)
            .map(|record| (record.lap, record.t_lap))
            .collect();

        chart.draw_series(LineSeries::new(series.into_iter(), palette(i)))?
            .label(format!("{} ({})", summary.name, summary.code))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], palette(i)));
    }

    for event in &report.events {
        if let Some((lap, color, width)) = event_plot_style(event) {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(lap, y_min), (lap, y_max)], color.stroke_width(width),
            )))?;
        }
    }

    chart.configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

/// print_dashboard_line renders one update as a single console dashboard line followed by the
/// notification lines raised since the previous update.
fn print_dashboard_line(update: &DashboardUpdate) {
    if let Some(active) = update.driver_states.iter().find(|d| d.is_driving) {
        println!(
            "DASH: lap {}/{} | {} | {} | SC {} | {} ({}) tires {} {:.0}% fuel {:.0}%",
            update.cur_lap,
            update.tot_no_laps,
            format_race_clock(update.t_elapsed),
            update.weather.as_str(),
            update.safety_car.as_str(),
            active.name,
            active.code,
            active.compound.as_str(),
            active.tire_wear,
            active.fuel,
        );
    }

    for notice in &update.notices {
        println!("{}", notice);
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    // get simulation parameters
    let mut sim_pars = if let Some(parfile_path) = &sim_opts.parfile_path {
        println!("INFO: Reading simulation parameters from {:?}", parfile_path);
        read_sim_pars(parfile_path)?
    } else {
        println!("INFO: No parameter file provided, using the built-in 24h scenario");
        default_sim_pars()
    };

    // a telemetry snapshot overrides the driver lineup, falling back on any read error
    if let Some(telemetry_path) = &sim_opts.telemetry_path {
        match read_telemetry_snapshot(telemetry_path) {
            Ok(driver_pars_all) => {
                println!(
                    "INFO: Sourcing {} drivers from telemetry snapshot {:?}",
                    driver_pars_all.len(),
                    telemetry_path
                );
                sim_pars.driver_pars_all = driver_pars_all;
            }
            Err(e) => {
                println!(
                    "ERROR: Could not read telemetry snapshot ({:#}), keeping configured driver lineup",
                    e
                );
            }
        }
    }

    if sim_opts.seed.is_some() {
        sim_pars.race_pars.seed = sim_opts.seed;
    }

    let advisor: Option<Arc<dyn StrategyAdvisor + Send + Sync>> = if sim_opts.no_advisory {
        None
    } else {
        Some(Arc::new(HeuristicAdvisor {
            stint_max_laps: sim_pars.race_pars.stint_max_laps,
            t_drive_max: sim_pars.race_pars.t_drive_max,
            s_drive_safety: sim_pars.race_pars.s_drive_safety,
        }))
    };

    // print race details
    println!(
        "INFO: Simulating {} over {} laps / {} with {} drivers",
        sim_pars.race_pars.track_name,
        sim_pars.race_pars.tot_no_laps,
        format_race_clock(sim_pars.race_pars.t_race_total),
        sim_pars.driver_pars_all.len()
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if !sim_opts.realtime {
        // NON-REALTIME CASE - run the race flat out and post-process
        println!("INFO: Running simulation without real-time pacing...");
        let t_start = Instant::now();

        let report = run_race(
            &sim_pars,
            sim_opts.debug,
            None,
            1.0,
            advisor,
            sim_opts.advisory_timeout,
            sim_opts.print_events,
        )?;

        println!("INFO: Execution time: {}ms", t_start.elapsed().as_millis());

        report.print_summary();
        let csv_path = report.write_lap_history_csv(None)?;
        println!("INFO: Lap history saved to {}", csv_path);

        if !sim_opts.no_plot {
            match export_results_plot(&report) {
                Ok(path) => println!("INFO: Results plot saved to {}", path),
                Err(e) => println!("WARNING: Could not save results plot: {}", e),
            }
        }
    } else {
        // REALTIME CASE - stream dashboard updates to the console while simulating
        println!("INFO: Running simulation in real time...");

        let (tx, rx) = flume::unbounded();
        let sim_opts_thread = sim_opts.clone();
        let sim_pars_thread = sim_pars.clone();

        let handle = thread::spawn(move || {
            run_race(
                &sim_pars_thread,
                false,
                Some(&tx),
                sim_opts_thread.realtime_factor,
                advisor,
                sim_opts_thread.advisory_timeout,
                false,
            )
        });

        for update in rx.iter() {
            print_dashboard_line(&update);

            if let Some(report) = &update.final_report {
                report.print_summary();
            }
        }

        let report = handle
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??;
        let csv_path = report.write_lap_history_csv(None)?;
        println!("INFO: Lap history saved to {}", csv_path);

        if !sim_opts.no_plot {
            match export_results_plot(&report) {
                Ok(path) => println!("INFO: Results plot saved to {}", path),
                Err(e) => println!("WARNING: Could not save results plot: {}", e),
            }
        }
    }

    Ok(())
}
