use s3_common::{logging, EnvFiles, Reporter};
use s3_setup::{Bootstrap, ProcessLauncher};
use tracing::info;

#[tokio::main]
async fn main() {
    logging::init();

    let files = EnvFiles::from_env();
    let launcher = ProcessLauncher::for_env_files(&files);
    info!(
        "Using env file {} with check program {}",
        files.config_path.display(),
        launcher.program().display()
    );

    let mut reporter = Reporter::stdout();
    let outcome = Bootstrap::new(files, launcher).run(&mut reporter).await;

    // Setup problems are reported on stdout; the exit status stays 0
    info!("Setup finished: {outcome:?}");
}
