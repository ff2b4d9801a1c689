use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// `None` and `-` both mean stdin.
pub fn input_path(path: &Path) -> Option<&Path> {
    if path.as_os_str() == "-" {
        None
    } else {
        Some(path)
    }
}

pub fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path),
        None => {
            let mut input = Vec::new();
            io::stdin().lock().read_to_end(&mut input)?;
            Ok(input)
        }
    }
}

pub fn display_name(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string())
}
