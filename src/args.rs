use clap::Parser;

/// This is a cross-tabulation program for coded survey and radio-show responses.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The pipeline configuration, in JSON format. It names the pipeline (kakuma_pipeline or
    /// dadaab_pipeline) and may override the analysis settings. See the manual for all the keys.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) The coded messages, one JSON object per line.
    #[clap(short, long, value_parser)]
    pub messages: String,

    /// (file path) The coded individuals, one JSON object per line.
    #[clap(short, long, value_parser)]
    pub individuals: String,

    /// (directory) Where the tables and the graphs directory are written. It is created if needed.
    #[clap(short, long, value_parser)]
    pub out_dir: String,

    /// (directory, default code_schemes) The directory holding the code schemes of the pipeline.
    #[clap(long, value_parser, default_value = "code_schemes")]
    pub code_schemes: String,

    /// (directory) A directory of reference tables. If provided, surveytab will check that each computed
    /// table matches the file of the same name.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
