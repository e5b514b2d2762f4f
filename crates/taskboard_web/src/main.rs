//! `taskboard` binary entry point.

use log::error;
use std::process::ExitCode;
use taskboard_web::{serve, WebConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let result = match WebConfig::from_env() {
        Ok(config) => serve(config).await,
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=app_exit module=web status=error error={err}");
            eprintln!("taskboard: {err}");
            ExitCode::FAILURE
        }
    }
}
