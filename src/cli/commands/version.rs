//! Version information display

use serde_json::json;

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::config::schema::ManagerKind;

/// Print version information and the supported manager kinds.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let managers: Vec<&str> = ManagerKind::ALL.iter().map(|k| k.as_str()).collect();

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
            println!("managers: {}", managers.join(", "));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                json!({ "name": name, "version": version, "managers": managers })
            );
        }
    }
}
