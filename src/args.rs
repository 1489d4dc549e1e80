use clap::Parser;

/// Computes the leader influence dashboard of a viewpoint group.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. All the other options take precedence over the values
    /// of this file. Relative paths in the file are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) The directory containing the JSON tables of the snapshot (one file per table).
    /// Setting this option overrides the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (group id) The main group of the dashboard. Defaults to the built-in main group.
    #[clap(short, long, value_parser)]
    pub group: Option<String>,

    /// (YYYY-MM-DD or RFC 3339, default: now) The reference time of the metrics. Passing it makes
    /// the output reproducible.
    #[clap(short, long, value_parser)]
    pub today: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the dashboard will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference dashboard in JSON format. If provided, the computed dashboard must match it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, optional) A JSON array of upcoming elections from an external feed.
    #[clap(long, value_parser)]
    pub upcoming_elections: Option<String>,

    /// (file path, optional) A JSON array of peer leaders to compare with.
    #[clap(long, value_parser)]
    pub peer_leaders: Option<String>,

    /// (file path, optional) A JSON array of growth rates of comparable groups.
    #[clap(long, value_parser)]
    pub benchmarks: Option<String>,

    /// If passed as an argument, only the ballot items of primary elections are considered.
    #[clap(long, takes_value = false)]
    pub primary_only: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
