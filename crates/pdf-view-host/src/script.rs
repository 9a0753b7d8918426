//! Scripted viewer sessions.
//!
//! A script is JSON lines, one step per line:
//!
//! ```text
//! {"open": "report.pdf"}
//! {"tool": "zoom-in"}
//! {"tool": "go-to-page", "payload": {"page": 3}}
//! {"host": {"type": "SettingsChanged", "zoom": 150}}
//! {"select": "net revenue"}
//! {"dismiss": true}
//! ```

use anyhow::{Context, Result};
use pdf_bridge::{DocumentDescriptor, HostMessage, UiMessage};
use pdf_view_sync::{
    DocumentLoader, HostChannel, Notifier, ToolPayload, ViewState, ViewerConfig, ViewerHandle,
    connect,
};
use serde::Deserialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::document;
use crate::responder::HostResponder;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Open {
        open: PathBuf,
    },
    Host {
        host: HostMessage,
    },
    Tool {
        tool: String,
        #[serde(default)]
        payload: Value,
    },
    Dismiss {
        dismiss: bool,
    },
    Select {
        select: String,
    },
}

/// Parse a script. Blank lines and `#` comments are skipped, malformed lines are logged.
pub fn parse(script: &str) -> (Vec<Step>, usize) {
    let mut steps = Vec::new();
    let mut skipped = 0;

    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(step) => steps.push(step),
            Err(e) => {
                log::warn!("Skipping line {}: {}", index + 1, e);
                skipped += 1;
            }
        }
    }
    (steps, skipped)
}

#[derive(Debug)]
pub struct ReplaySummary {
    pub steps: usize,
    pub skipped: usize,
    pub ui_messages: usize,
    pub state: ViewState,
}

/// Drives a viewer session from the host side
pub struct Replay<W: Write> {
    viewer: ViewerHandle,
    host: HostChannel,
    responder: HostResponder,
    out: W,
    ui_messages: usize,
}

impl<W: Write> Replay<W> {
    pub fn start(
        config: ViewerConfig,
        loader: Arc<dyn DocumentLoader>,
        notifier: Arc<dyn Notifier>,
        out: W,
    ) -> Result<(Self, tokio::task::JoinHandle<()>)> {
        let (ui, host) = connect::<UiMessage, HostMessage>();
        let (viewer, task) = pdf_view_sync::start(config, ui, loader, notifier)?;
        Ok((
            Self {
                viewer,
                host,
                responder: HostResponder::new(),
                out,
                ui_messages: 0,
            },
            task,
        ))
    }

    pub async fn step(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Open { open } => {
                let descriptor = match document::describe(&open).await {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        // Let the viewer's loader report the failure
                        log::warn!("{:#}", e);
                        DocumentDescriptor::new(open, 0)
                    }
                };
                self.host.send(HostMessage::DocumentLoaded(descriptor));
                self.settle().await?;
                self.viewer.wait_for(|s| !s.loading).await?;
            }
            Step::Host { host } => {
                self.host.send(host);
            }
            Step::Tool { tool, payload } => {
                self.viewer.invoke(tool, ToolPayload::from_value(payload))?;
            }
            Step::Dismiss { dismiss } => {
                if dismiss {
                    self.viewer.dismiss_error()?;
                }
            }
            Step::Select { select } => {
                self.viewer.select_text(Some(select))?;
            }
        }
        self.settle().await
    }

    /// Process everything in flight, answering requests until the viewer goes quiet
    async fn settle(&mut self) -> Result<()> {
        loop {
            self.viewer.flush().await?;
            let outbound = self.host.inbox_mut().drain();
            if outbound.is_empty() {
                return Ok(());
            }

            for message in outbound {
                self.ui_messages += 1;
                writeln!(self.out, "{}", message.to_json()?)?;
                if let Some(reply) = self.responder.handle(&message) {
                    self.host.send(reply);
                }
            }
        }
    }

    pub fn finish(mut self, steps: usize, skipped: usize) -> Result<ReplaySummary> {
        let state = self.viewer.state();
        writeln!(self.out, "{}", serde_json::to_string_pretty(&state)?)?;
        self.viewer.shutdown()?;
        Ok(ReplaySummary {
            steps,
            skipped,
            ui_messages: self.ui_messages,
            state,
        })
    }
}

/// Replay a script file and print the outbound messages and final state to `out`
pub async fn run<W: Write>(
    path: &std::path::Path,
    config: ViewerConfig,
    loader: Arc<dyn DocumentLoader>,
    notifier: Arc<dyn Notifier>,
    out: W,
) -> Result<ReplaySummary> {
    let script = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read script {}", path.display()))?;
    let (steps, skipped) = parse(&script);
    log::info!("Replaying {} steps from {}", steps.len(), path.display());

    let (mut replay, task) = Replay::start(config, loader, notifier, out)?;
    let count = steps.len();
    for step in steps {
        replay.step(step).await?;
    }
    let summary = replay.finish(count, skipped)?;
    task.await?;
    Ok(summary)
}
