//! CLI Status Command
//!
//! Probes a running `adkit serve` instance.

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::note_warn;

pub async fn run(url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/health", url.trim_end_matches('/')))
        .send()
        .await
    {
        Ok(resp) => {
            let body: Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => note_warn(&format!("adkit is not running at {url}")),
    }
    Ok(())
}
