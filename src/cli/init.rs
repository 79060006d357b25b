//! teamboard init command implementation

use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, OutputOptions, Report};
use crate::remote::local::JsonStore;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: String,
    config_file: String,
    created: bool,
}

pub fn run(dir: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let data_dir = match dir {
        Some(dir) => dir,
        None => crate::config::default_data_dir()?,
    };

    let config_path = data_dir.join(CONFIG_FILE);
    let created = !config_path.exists();

    std::fs::create_dir_all(&data_dir)?;
    if created {
        Config::default().save_to_dir(&data_dir)?;
    }
    // Creates the collection files' directory up front so later commands
    // never race on it. An existing config's store.dir override resolves
    // exactly as it does for every other command.
    let config = Config::load_from_dir(&data_dir)?;
    JsonStore::open(super::collections_dir(&data_dir, &config))?;

    let report_data = InitReport {
        data_dir: data_dir.display().to_string(),
        config_file: config_path.display().to_string(),
        created,
    };

    let mut report = Report::new(if created {
        "Initialized board data directory"
    } else {
        "Board data directory already initialized"
    });
    report.field("dir", report_data.data_dir.clone());
    if created {
        report.next_step("teamboard register --name \"...\" --role member");
    }

    emit_success(output, "init", &report_data, Some(&report))
}
