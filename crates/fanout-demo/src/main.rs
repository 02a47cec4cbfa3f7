#![forbid(unsafe_code)]

use fanout_demo::cli::Opts;
use fanout_demo::{logging, scenarios};

fn main() {
    let opts = Opts::parse();
    if let Err(err) = logging::init_tracing(&opts) {
        eprintln!("{err}");
        std::process::exit(1);
    }
    tracing::info!(scenario = %opts.scenario, "fanout-demo starting");

    for line in scenarios::run(opts.scenario) {
        println!("{line}");
    }
}
