//! Elastic transcoder
//!
//! Drop-in replacement for the media server's transcoder binary. The argument
//! vector is the payload: it is rewritten and run inside a Pod.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transcode_job::client::KubeJobClient;
use transcode_job::compiler::compile_job;
use transcode_job::config::TranscoderConfig;
use transcode_job::controller::{self, LifecycleSettings};
use transcode_job::translate::translate;
use transcode_job::{signal, Error};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout belongs to the transcoder protocol
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<u8> {
    let config = TranscoderConfig::from_env()?;

    let translated = translate(
        std::env::vars_os()
            .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy())),
        std::env::args_os().map(|a| a.to_string_lossy().into_owned()),
        &config.internal_address,
    )?;

    let cwd = std::env::current_dir()
        .map_err(|e| Error::configuration(format!("error getting working directory: {e}")))?;
    let spec = compile_job(translated, &config, cwd.to_string_lossy());

    let client = KubeJobClient::connect().await?;
    let cancel = signal::shutdown_token()?;

    let outcome = controller::run(
        Arc::new(client),
        &spec,
        LifecycleSettings::default(),
        cancel,
    )
    .await?;
    Ok(outcome.exit_code())
}
