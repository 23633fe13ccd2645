use std::path::PathBuf;

use clap::Args;

use super::InputArg;
use crate::util::Output;

#[derive(Debug, Clone, Args)]
pub(crate) struct ReshapeArg {
    #[clap(flatten)]
    pub input: InputArg,

    /// Output file path (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ReshapeArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    let mut output = Output::from_output_path(arg.output.clone())?;
    output.write_csv("interval", |w| intervals.write_csv(w))?;
    tracing::info!(
        rows = intervals.intervals().len(),
        output = %output.display_path(),
        "interval dataset written"
    );
    Ok(())
}
