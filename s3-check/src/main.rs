use std::process::ExitCode;

use s3_check::{storage::S3ObjectStorage, ConnectivityCheck, Outcome, Reporter};
use s3_common::{logging, ConfigError, EnvFiles};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let files = EnvFiles::from_env();
    let loaded = files.load_config();

    logging::init();

    let mut reporter = Reporter::stdout();
    reporter.heading("🚀 AWS S3 Connection Test", 40);

    let config = match loaded {
        Ok(config) => config,
        Err(ConfigError::MissingVars(missing)) => {
            reporter.missing_vars(&missing);
            reporter.blank();
            reporter.text("Please update your .env file with the missing variables.");
            reporter.configuration_help();
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            reporter.status(Outcome::Fail, &e);
            reporter.detail(format_args!(
                "Fix {} and run again",
                files.config_path.display()
            ));
            return Ok(ExitCode::FAILURE);
        }
    };

    info!("Loaded configuration {config:?}");

    let storage = S3ObjectStorage::from_config(&config).await;
    let report = ConnectivityCheck::new(&storage, &config)
        .run(&mut reporter)
        .await;

    if report.passed() {
        reporter.blank();
        reporter.status(
            Outcome::Pass,
            "S3 is configured correctly and ready to use!",
        );
        Ok(ExitCode::SUCCESS)
    } else {
        reporter.blank();
        reporter.status(
            Outcome::Fail,
            "S3 configuration has issues. Please check the errors above.",
        );
        reporter.configuration_help();
        Ok(ExitCode::FAILURE)
    }
}
