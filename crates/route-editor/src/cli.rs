use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Route Editor - Inspect and edit cycling event routes from the command line
pub struct Settings {
    /// JSON file with engine configuration overrides
    #[clap(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Pinned point weight (overrides the configuration file)
    #[clap(long, global = true)]
    pub pinned_weight: Option<u8>,

    /// Maximum |pre + post| grade before an altitude counts as an outlier
    #[clap(long, global = true)]
    pub outlier_slope: Option<f64>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print distances, climbing and section summaries
    Info(RouteArgs),

    /// Print the elevation profile as JSON
    Profile {
        #[clap(flatten)]
        route: RouteArgs,

        /// Number of equal-width buckets over the route distance
        #[clap(long, default_value = "100", conflicts_with = "band_width")]
        buckets: usize,

        /// Band width in meters of course distance; switches to min/mean/max bands
        #[clap(long)]
        band_width: Option<f64>,
    },

    /// Print the position and heading at a route distance
    Locate {
        #[clap(flatten)]
        route: RouteArgs,

        /// Route distance in meters; values past either end are mirrored
        #[clap(short, long, allow_hyphen_values = true)]
        distance: f64,
    },

    /// Write a snapshot (encoded path plus point flags) as JSON
    Pack {
        #[clap(flatten)]
        route: RouteArgs,

        /// Output file, standard output when absent
        #[clap(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Write the route as a GPX 1.1 track
    ExportGpx {
        #[clap(flatten)]
        route: RouteArgs,

        /// Output file
        #[clap(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Track name
        #[clap(long)]
        name: Option<String>,
    },

    /// Print the encoded polyline (with altitude channel)
    Encode(RouteArgs),
}

/// Input route and the edits applied after loading it
#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Route file: `.gpx`, snapshot `.json`, or a text file holding an encoded polyline
    #[clap(value_name = "INPUT")]
    pub input: PathBuf,

    /// Exclude points BEGIN:END (inclusive) from the course distance; repeatable
    #[clap(long, value_name = "BEGIN:END", value_parser = parse_range)]
    pub exclude: Vec<(usize, usize)>,

    /// Mark points BEGIN:END (inclusive) as the editable window
    #[clap(long, value_name = "BEGIN:END", value_parser = parse_range)]
    pub edit: Option<(usize, usize)>,

    /// Pin the point at this index above every simplification level; repeatable
    #[clap(long, value_name = "INDEX")]
    pub pin: Vec<usize>,
}

/// Parse an inclusive `BEGIN:END` index range
pub fn parse_range(value: &str) -> Result<(usize, usize), String> {
    let (begin, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected BEGIN:END, got '{value}'"))?;
    let begin = begin
        .trim()
        .parse()
        .map_err(|e| format!("invalid begin index '{begin}': {e}"))?;
    let end = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end index '{end}': {e}"))?;
    Ok((begin, end))
}
