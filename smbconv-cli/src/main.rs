use clap::Parser;
use log::{error, LevelFilter};
use std::path::PathBuf;

use smbconv_core::{run, ConvertSettings};

#[derive(Debug, Parser)]
#[command(
    name = "smbconv",
    version,
    about = "Converts stage, model and texture files between SMB2 and SMBD"
)]
struct Args {
    /// File to convert. The converter is picked from the last three
    /// characters of the name: `raw`, `gma` or `tpl`.
    input: Option<PathBuf>,

    /// Write a JSON summary of the conversion to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

fn main() {
    let args = Args::parse();

    if let Err(err) = init_logging(args.verbose) {
        eprintln!("Failed to set up logging: {err}");
    }

    // Nothing to convert.
    let Some(input_path) = args.input else {
        return;
    };

    let settings = ConvertSettings {
        input_path,
        report_path: args.report,
    };

    if let Err(err) = run(&settings) {
        error!("Error: {err}");
        std::process::exit(1);
    }
}
