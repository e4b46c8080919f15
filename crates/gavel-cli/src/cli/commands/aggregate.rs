use crate::cli::args::AggregateArgs;
use crate::exit_codes::{INPUT_ERROR, SUCCESS};
use gavel_core::aggregate::aggregate_files;

pub fn run(args: AggregateArgs) -> anyhow::Result<i32> {
    match aggregate_files(
        &args.generations,
        &args.data,
        &args.output,
        args.output_summary.as_deref(),
    ) {
        Ok((report, summary_path)) => {
            println!(
                "Wrote {} rows to {} and summary to {} (overall {:.1})",
                report.rows.len(),
                args.output.display(),
                summary_path.display(),
                report.summary.overall
            );
            Ok(SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            Ok(INPUT_ERROR)
        }
    }
}
