use clap::Parser;

/// This program turns KoboToolbox submissions into verification tables.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file with the server, pipeline and output settings.
    /// Flags given on the command line override the values of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (URL, optional) The root of the KoboToolbox API, for example https://kf.kobotoolbox.org/api/v2
    #[clap(short, long, value_parser)]
    pub url: Option<String>,

    /// (optional) The API token. If not provided, it is read from the configuration file
    /// or from the KOBO_TOKEN environment variable.
    #[clap(short, long, value_parser)]
    pub token: Option<String>,

    /// (default fgd) The family of projects to work with: 'kii' (key informant interviews
    /// and surveys) or 'fgd' (focus group discussions).
    #[clap(short, long, value_parser)]
    pub data_type: Option<String>,

    /// (name or uid, optional) The project to process. If not provided, the projects of
    /// the selected data type are listed.
    #[clap(short, long, value_parser)]
    pub project: Option<String>,

    /// (name, optional) For FGD projects, the verification table to view or export. If not
    /// provided, the names of the tables are listed.
    #[clap(long, value_parser)]
    pub verification: Option<String>,

    /// (file path, directory or 'stdout') If specified, the table is exported to the given location.
    /// An .xlsx path is used as is, any other path is taken as a directory. 'stdout' prints
    /// the table in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (CSV file path, optional) A review file. The first run writes the table to it, the
    /// following runs read the edited table back and export it as reviewed data.
    #[clap(long, value_parser)]
    pub review: Option<String>,

    /// (xlsx file path, optional) A previously exported table. If provided, the program checks
    /// that the produced table matches it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
