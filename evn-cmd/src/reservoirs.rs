//! Listing of the embedded reservoir catalogue.

use evn_hydro::reservoir::Reservoir;
use evn_utils::timestamps::format_request;

fn describe(reservoir: &Reservoir) -> String {
    let range = match (reservoir.default_start, reservoir.default_end) {
        (Some(start), Some(end)) => format!("{} - {}", format_request(&start), format_request(&end)),
        _ => "-".to_string(),
    };
    format!(
        "{:<12} {:>4}  {:<16} {}",
        reservoir.slug, reservoir.id, reservoir.name, range
    )
}

/// Print one line per bundled reservoir: slug, id, name, default range.
pub fn run_list() -> anyhow::Result<()> {
    let reservoirs = Reservoir::get_reservoir_vector()?;
    println!("{:<12} {:>4}  {:<16} {}", "SLUG", "ID", "NAME", "DEFAULT RANGE");
    for reservoir in &reservoirs {
        println!("{}", describe(reservoir));
    }
    Ok(())
}
