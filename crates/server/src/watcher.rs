// File watching using notify crate

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::compiler;
use crate::state::SharedState;

fn is_tracked(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".facts.json") || name.ends_with(".html")
}

/// Run the file watcher
pub async fn run_watcher(state: SharedState, root: impl AsRef<Path>) -> Result<()> {
    let root = root.as_ref().to_path_buf();

    let (tx, rx) = mpsc::channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    println!("Watching for changes in {}", root.display());

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(event) => {
                let mut events = vec![event];
                while let Ok(more) = rx.recv_timeout(Duration::from_millis(50)) {
                    events.push(more);
                }

                let mut changed = Vec::new();
                let mut removed = Vec::new();
                for event in events {
                    let tracked: Vec<_> = event.paths.iter().filter(|p| is_tracked(p)).cloned().collect();
                    if tracked.is_empty() {
                        continue;
                    }
                    match event.kind {
                        EventKind::Remove(_) => removed.extend(tracked),
                        _ => changed.extend(tracked),
                    }
                }
                changed.sort();
                changed.dedup();
                removed.sort();
                removed.dedup();

                if changed.is_empty() && removed.is_empty() {
                    continue;
                }

                let result = {
                    let mut state = state.write().await;
                    compiler::handle_changes(&mut state, &changed, &removed)
                };

                if !result.files_changed.is_empty() {
                    println!("  re-derived project in {:?}, {} error(s)", result.duration, result.error_count);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
