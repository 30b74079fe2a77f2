use clap::Parser;

/// This is a ranked-choice poll tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON description of the vote: the options in creation order and,
    /// optionally, the recorded submissions. For more information about the file format,
    /// read the documentation of the instant_runoff::manual module.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference results summary in JSON format. If provided, rankedpoll will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the poll will be written in
    /// JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, submissions are read from this ballot file instead of
    /// the submissions section of the vote description.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the ballot file: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel ballot file, indicates the name of the
    /// worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
