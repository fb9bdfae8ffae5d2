//! Terminal progress rendering for concurrent transfers.

use std::collections::HashMap;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use vodfetch_engine::ProgressEvent;

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg:>14} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

/// Drain progress events into one bar per file until the engine drops its
/// sender.
pub fn spawn_renderer(mut events: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let mut bars: HashMap<Arc<str>, ProgressBar> = HashMap::new();

        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::Started {
                    file,
                    total,
                    resumed_from,
                } => {
                    let bar = match total {
                        Some(total) => multi.add(ProgressBar::new(total)),
                        None => multi.add(ProgressBar::new_spinner()),
                    };
                    bar.set_style(bar_style());
                    bar.set_message(file.to_string());
                    bar.set_position(resumed_from);
                    bars.insert(file, bar);
                }
                ProgressEvent::Transferred { file, bytes } => {
                    if let Some(bar) = bars.get(&file) {
                        bar.set_position(bytes);
                    }
                }
                ProgressEvent::Finished { file } => {
                    if let Some(bar) = bars.remove(&file) {
                        bar.finish_with_message(format!("{file} done"));
                    }
                }
            }
        }

        for bar in bars.values() {
            bar.abandon();
        }
    })
}
