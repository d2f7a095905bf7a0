use std::process::ExitCode;

use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::sim::run_relocation_scenario;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        paths,
        mut world,
        scenario,
    } = app;

    match run_relocation_scenario(&mut world, &scenario) {
        Ok(report) => {
            info!(
                root = %paths.root.display(),
                save = %report.save_path.display(),
                kept_stores = report.kept_stores,
                landed_stores = report.landed_stores,
                ticks = report.ticks,
                arrived = report.arrived,
                "scenario_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "scenario_failed");
            ExitCode::FAILURE
        }
    }
}
