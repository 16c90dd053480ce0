use std::io::Read;
use std::path::Path;

use conduit_common::{ConduitError, TransportError};

pub(super) fn run(file: Option<&Path>) -> Result<(), ConduitError> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    for value in split_lines(&text)? {
        println!("{value}");
    }
    Ok(())
}

fn split_lines(text: &str) -> Result<Vec<&str>, ConduitError> {
    conduit_transport::split(text).map_err(|e| TransportError::Malformed(e).into())
}
