//! Apply command - headless filter chain.

use anyhow::{Result, bail};
use ifx_compute::Backend;
use ifx_core::{MenuCommand, menu_text};
use std::path::Path;
use tracing::{info, trace, warn};

use crate::ApplyArgs;

/// Splits command words into menu commands. Unknown characters are skipped.
pub fn parse_commands(words: &[String]) -> Vec<MenuCommand> {
    words
        .iter()
        .flat_map(|w| w.chars())
        .filter_map(|c| {
            let cmd = MenuCommand::parse(c);
            if cmd.is_none() && !c.is_whitespace() && c != ',' {
                warn!("ignoring command {c:?}");
            }
            cmd
        })
        .collect()
}

pub fn run(args: ApplyArgs, backend: Backend, kernels: Option<&Path>) -> Result<()> {
    trace!(input = %args.input.display(), output = %args.output.display(), "apply::run");

    let commands = parse_commands(&args.commands);
    if commands.is_empty() {
        bail!("no filter commands in {:?}", args.commands);
    }

    let mut image = super::load_image(&args.input)?;
    let mut processor = super::open_processor(backend, kernels, &image)?;

    for command in commands {
        match command {
            MenuCommand::ShowMenu => print!("{}", menu_text()),
            MenuCommand::Apply(filter) => {
                let stats = processor.apply(filter, &mut image)?;
                info!(
                    "Kernel {} took {:.2} ms",
                    stats.entry_point,
                    stats.elapsed.as_secs_f64() * 1000.0
                );
            }
        }
    }
    info!("{} dispatches on {}", processor.dispatch_count(), processor.device_name());
    processor.close();

    super::save_image(&args.output, &image)
}
