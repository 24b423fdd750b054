//! Backends command - list compute backends.

use anyhow::Result;
use ifx_compute::{Backend, describe_backends};

pub fn run(verbose: u8) -> Result<()> {
    print!("{}", describe_backends());
    if verbose > 0 {
        println!("auto resolves to: {}", Backend::Auto.resolve().name());
    }
    Ok(())
}
