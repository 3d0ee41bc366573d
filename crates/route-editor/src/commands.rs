//! Command implementations
//!
//! Every command loads one route, applies the requested edits and writes its result to the given
//! writer, so the same code serves stdout and tests.

use crate::cli::{Command, RouteArgs, Settings};
use route_geometry::{
    EngineConfig, GeometryError, PartKind, Route, RouteSnapshot, read_gpx, write_gpx,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Engine configuration from the optional JSON file, with flag overrides applied
pub fn load_config(settings: &Settings) -> Result<EngineConfig> {
    let mut config = match &settings.config {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            serde_json::from_str(&text)?
        }
        None => EngineConfig::default(),
    };

    if let Some(weight) = settings.pinned_weight {
        if weight <= config.max_ladder_weight() {
            return Err(CliError::Argument(format!(
                "pinned weight {weight} must exceed the highest ladder weight {}",
                config.max_ladder_weight()
            )));
        }
        config.pinned_weight = weight;
    }
    if let Some(threshold) = settings.outlier_slope {
        if !(threshold > 0.0) {
            return Err(CliError::Argument(format!(
                "outlier slope must be positive, got {threshold}"
            )));
        }
        config.outlier_slope_threshold = threshold;
    }
    Ok(config)
}

/// Load a route, choosing the format from the file extension
///
/// `.gpx` is parsed as GPX, `.json` as a snapshot; anything else is read as polyline text.
pub fn load_route(path: &Path, config: EngineConfig) -> Result<Route> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let route = match extension.as_deref() {
        Some("gpx") => Route::from_gpx(&read_gpx(path)?, config)?,
        Some("json") => {
            let snapshot: RouteSnapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
            Route::unpack(&snapshot, config)?
        }
        _ => Route::from_encoded(fs::read_to_string(path)?.trim(), config)?,
    };

    tracing::info!(
        "Loaded {} points from {} ({:.0} m)",
        route.len(),
        path.display(),
        route.total_distance()
    );
    Ok(route)
}

/// Apply the exclusion, edit window and pin flags of `args`
pub fn apply_edits(route: &mut Route, args: &RouteArgs) -> Result<()> {
    for &(begin, end) in &args.exclude {
        let widened = route.set_exclude(begin, end)?;
        tracing::debug!("Excluded [{}, {}]", widened.begin, widened.end);
    }
    if let Some((begin, end)) = args.edit {
        route.set_edit_range(begin, end)?;
    }
    for &index in &args.pin {
        let id = route
            .point(index)
            .map(|p| p.id())
            .ok_or_else(|| CliError::Argument(format!("cannot pin point {index}")))?;
        route.pin_point(id);
    }
    Ok(())
}

/// Run the selected command against `out`
pub fn run(settings: &Settings, out: &mut impl Write) -> Result<()> {
    let config = load_config(settings)?;

    match &settings.command {
        Command::Info(args) => {
            let route = prepare(args, config)?;
            write_info(&route, out)
        }
        Command::Profile {
            route,
            buckets,
            band_width,
        } => {
            let route = prepare(route, config)?;
            write_profile(&route, *buckets, *band_width, out)
        }
        Command::Locate { route, distance } => {
            let route = prepare(route, config)?;
            write_location(&route, *distance, out)
        }
        Command::Pack { route, output } => {
            let snapshot = prepare(route, config)?.pack()?;
            match output {
                Some(path) => {
                    fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
                    tracing::info!("Snapshot written to {}", path.display());
                }
                None => writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?,
            }
            Ok(())
        }
        Command::ExportGpx {
            route,
            output,
            name,
        } => {
            let route = prepare(route, config)?;
            write_gpx(output, &route.to_gpx(name.as_deref()))?;
            tracing::info!("GPX with {} points written to {}", route.len(), output.display());
            Ok(())
        }
        Command::Encode(args) => {
            let route = prepare(args, config)?;
            writeln!(out, "{}", route.to_encoded()?)?;
            Ok(())
        }
    }
}

fn prepare(args: &RouteArgs, config: EngineConfig) -> Result<Route> {
    let mut route = load_route(&args.input, config)?;
    apply_edits(&mut route, args)?;
    Ok(route)
}

/// Human readable summary of a route
pub fn write_info(route: &Route, out: &mut impl Write) -> Result<()> {
    let (ascent, descent) = route.ascent_descent();
    let bbox = route.bounding_box();
    let pinned = route
        .points()
        .iter()
        .filter(|p| p.weight() >= route.config().pinned_weight)
        .count();
    let missing_alt = route.points().iter().filter(|p| p.alt().is_none()).count();

    writeln!(out, "Points:          {}", route.len())?;
    writeln!(out, "Total distance:  {:.1} m", route.total_distance())?;
    writeln!(out, "Course distance: {:.1} m", route.brm_distance())?;
    writeln!(out, "Ascent/descent:  {ascent:.1} m / {descent:.1} m")?;
    writeln!(
        out,
        "Bounds:          lat {:.5}..{:.5}, lng {:.5}..{:.5}",
        bbox.min().y,
        bbox.max().y,
        bbox.min().x,
        bbox.max().x
    )?;
    writeln!(out, "Pinned points:   {pinned}")?;
    writeln!(out, "No altitude:     {missing_alt}")?;

    for part in route.excluded_ranges() {
        let points = part.points(route);
        let skipped = match (points.first(), points.last()) {
            (Some(first), Some(last)) => last.route_distance() - first.route_distance(),
            _ => 0.0,
        };
        writeln!(
            out,
            "Excluded:        [{}, {}] ({skipped:.1} m)",
            part.range.begin, part.range.end
        )?;
    }
    for part in route.editable_ranges() {
        let label = match part.kind {
            PartKind::BeforeEdit => "before edit",
            PartKind::Editable => "editable",
            PartKind::AfterEdit => "after edit",
            PartKind::Excluded => continue,
        };
        writeln!(
            out,
            "Edit window:     [{}, {}] {label}",
            part.range.begin, part.range.end
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(untagged)]
enum ProfileOutput {
    Buckets(Vec<route_geometry::ProfileBucket>),
    Bands(Vec<route_geometry::ProfileBand>),
}

/// Elevation profile as JSON: equal buckets over route distance, or course bands
pub fn write_profile(
    route: &Route,
    buckets: usize,
    band_width: Option<f64>,
    out: &mut impl Write,
) -> Result<()> {
    let profile = match band_width {
        Some(width) => ProfileOutput::Bands(route.course_bands(width)?.collect()),
        None => ProfileOutput::Buckets(route.elevation_profile(buckets)?),
    };
    serde_json::to_writer_pretty(&mut *out, &profile)?;
    writeln!(out)?;
    Ok(())
}

/// Position and heading at a route distance
pub fn write_location(route: &Route, distance: f64, out: &mut impl Write) -> Result<()> {
    let location = route.location_at(distance)?;
    let heading = route.heading_at(distance)?;

    write!(
        out,
        "{:.6}, {:.6} heading {heading:.1}° after point {}",
        location.lat, location.lng, location.index
    )?;
    if let Some(alt) = location.alt {
        write!(out, " at {alt:.1} m")?;
    }
    if location.is_mirror {
        write!(out, " (mirrored)")?;
    }
    writeln!(out)?;
    Ok(())
}
