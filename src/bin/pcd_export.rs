use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use pcdtools::{export::PointCloudExporter, logging::enable_tracing};
use tracing::error;

/// Shows a point cloud file, prints its first rows and saves it as `<input>.csv`.
#[derive(Parser)]
struct CommandLine {
    /// Point cloud file: .ply, .pcd, .off, .xyz, .pts, .txt, .xyzn or .xyzrgb
    input: PathBuf,
    /// Write the CSV here instead of next to the input
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Number of rows printed before saving
    #[clap(long, default_value = "5")]
    preview_rows: usize,
    /// Don't open the viewer window
    #[clap(long)]
    no_view: bool,
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = CommandLine::parse();
    enable_tracing(args.verbose);

    let result = PointCloudExporter::default()
        .preview_rows(args.preview_rows)
        .show_viewer(!args.no_view)
        .output(args.output)
        .run(&args.input, std::io::stdout().lock());

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
