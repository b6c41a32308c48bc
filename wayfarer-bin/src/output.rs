use std::io::{self, Write};

use wayfarer_lib::{Comparison, TravelMode};

use crate::commands::CompareReport;

/// Short human-readable report: one block per pair, one line per mode
pub(crate) fn write_compact(report: &CompareReport, out: &mut impl Write) -> io::Result<()> {
    for comparison in &report.comparisons {
        let base = &report.bases[comparison.base_idx];
        let dest = &report.destinations[comparison.dest_idx];
        let reversed = report
            .direction_flags
            .get(comparison.dest_idx)
            .copied()
            .unwrap_or(false);
        let arrow = if reversed { "<-" } else { "->" };
        writeln!(out, "{} {arrow} {}", base.name, dest.name)?;

        match &comparison.driving {
            Some(driving) => {
                let taxi = driving
                    .taxi_cost_yuan
                    .map(|cost| format!("  taxi ~¥{cost:.0}"))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "  driving  {}  {}{taxi}",
                    format_duration(driving.duration_seconds),
                    format_distance(driving.distance_meters),
                )?;
            }
            None => writeln!(out, "  driving  {}", mode_error(comparison, TravelMode::Driving))?,
        }
        match &comparison.walking {
            Some(walking) => writeln!(
                out,
                "  walking  {}  {}",
                format_duration(walking.duration_seconds),
                format_distance(walking.distance_meters),
            )?,
            None => writeln!(out, "  walking  {}", mode_error(comparison, TravelMode::Walking))?,
        }
        match &comparison.cycling {
            Some(cycling) => writeln!(
                out,
                "  cycling  {}  {}",
                format_duration(cycling.duration_seconds),
                format_distance(cycling.distance_meters),
            )?,
            None => writeln!(out, "  cycling  {}", mode_error(comparison, TravelMode::Cycling))?,
        }
        match &comparison.transit {
            Some(transit) => match transit.plans.first() {
                Some(plan) => {
                    let cost = plan
                        .cost_yuan
                        .map(|cost| format!("  ¥{cost:.1}"))
                        .unwrap_or_default();
                    writeln!(
                        out,
                        "  transit  {}{cost}  {}",
                        format_duration(plan.duration_seconds),
                        plan.summary,
                    )?;
                }
                None => writeln!(out, "  transit  no plans")?,
            },
            None => writeln!(out, "  transit  {}", mode_error(comparison, TravelMode::Transit))?,
        }
        writeln!(out)?;
    }
    Ok(())
}

fn mode_error(comparison: &Comparison, mode: TravelMode) -> &str {
    comparison
        .errors
        .as_ref()
        .and_then(|errors| errors.get(&mode))
        .map_or("no result", String::as_str)
}

fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0).round() as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{} h {:02} min", minutes / 60, minutes % 60)
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.max(0.0).round() as u64)
    }
}
