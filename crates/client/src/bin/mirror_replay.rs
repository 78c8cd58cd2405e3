//! Replay a capture of gate-to-client bytes through a session and print what the mirror saw.
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::*;
use structopt::StructOpt;

use mirror_client::*;
use mirror_protocol::{DataCodec, JsonCodec};

#[derive(StructOpt)]
struct Params {
    /// Raw bytes as read from the gate connection.
    capture: PathBuf,

    #[structopt(long = "--json")]
    json: bool,

    #[structopt(long = "--username")]
    username: Option<String>,

    #[structopt(long = "--password", default_value = "")]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    mirror_logging::log_to_stderr();
    let params = Params::from_args();

    let config = SessionConfigBuilder::default()
        .data_codec(if params.json {
            JsonCodec.into()
        } else {
            DataCodec::default()
        })
        .credentials(params.username.map(|u| Credentials::new(u, params.password)))
        .build()?;

    let file = tokio::fs::File::open(&params.capture)
        .await
        .with_context(|| format!("Opening {}", params.capture.display()))?;

    let mut session = Session::new(config, Vec::new(), RecordingPresentation::default());
    pump(file, &mut session).await?;

    for event in &session.presentation().events {
        println!("{:?}", event);
    }
    info!(
        "{:?}, {} bytes would have gone back to the gate",
        session.stats(),
        session.transport().len()
    );
    Ok(())
}
