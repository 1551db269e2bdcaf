//! File manager URI translation.

use std::path::Path;

use zashterminal_core::launch::nautilus_launch_args;

use crate::error::CliError;

/// Prints the `zashterminal` arguments for a file manager location, one
/// per line
pub fn cmd_nautilus_args(uri: &str, local_path: Option<&Path>) -> Result<(), CliError> {
    for arg in nautilus_launch_args(uri, local_path)? {
        println!("{arg}");
    }
    Ok(())
}
