//! One-shot commands: `inkwell ask` and `inkwell ip`.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::Context;

use iw_domain::config::Config;
use iw_domain::message::ChatMessage;
use iw_domain::stream::RelayEvent;
use iw_geo::GeoResolver;
use iw_providers::RelayHandle;

use crate::bootstrap;
use crate::runtime::{TransformKind, TransformOutput};

fn read_input(text: String) -> anyhow::Result<String> {
    if text != "-" {
        return Ok(text);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading standard input")?;
    Ok(buf)
}

pub async fn ask(
    config: Arc<Config>,
    operation: &str,
    text: String,
    existing: Vec<String>,
) -> anyhow::Result<()> {
    let kind = TransformKind::parse(operation)
        .with_context(|| format!("unknown operation {operation:?}"))?;
    let input = read_input(text)?;
    let state = bootstrap::build_app_state(config)?;

    match kind {
        TransformKind::Chat => {
            let handle = state.transforms.chat(vec![ChatMessage::user(input)])?;
            print_stream(handle).await
        }
        TransformKind::Optimize => print_stream(state.transforms.optimize(&input)?).await,
        TransformKind::PeriodicSummary | TransformKind::Suggest => {
            anyhow::bail!("{operation} reads stored todos; call it through the HTTP API")
        }
        _ => {
            match state.transforms.run(kind, &input, &existing).await? {
                TransformOutput::Text(answer) => println!("{answer}"),
                TransformOutput::Tags(tags) => {
                    for tag in tags {
                        println!("{tag}");
                    }
                }
            }
            Ok(())
        }
    }
}

/// Print fragments as they arrive.
async fn print_stream(mut handle: RelayHandle) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(event) = handle.recv().await {
        match event {
            RelayEvent::Fragment(fragment) => {
                stdout.write_all(fragment.content.as_bytes())?;
                stdout.flush()?;
            }
            RelayEvent::Done => {
                writeln!(stdout)?;
                return Ok(());
            }
            RelayEvent::Error { message } => {
                writeln!(stdout)?;
                anyhow::bail!(message);
            }
        }
    }
    anyhow::bail!("relay ended without a terminal event")
}

pub async fn ip(config: &Config, addr: &str) -> anyhow::Result<()> {
    let geo = GeoResolver::from_config(&config.geo).context("building geo resolver")?;
    println!("{addr}\t{}", geo.resolve(addr).await);
    Ok(())
}
