use pingwatch::ProgressSnapshot;
use pingwatch::report::fmt_hms;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Print a status line for every progress snapshot until the run ends
pub fn spawn(mut progress: watch::Receiver<ProgressSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = *progress.borrow_and_update();
            println!("{}", status_line(&snapshot));
        }
    })
}

pub fn status_line(snapshot: &ProgressSnapshot) -> String {
    let mut line = format!(
        "Status: {} probes, {} drops, {:.2}% success, elapsed {}",
        snapshot.probes,
        snapshot.drops,
        snapshot.success_rate * 100.0,
        fmt_hms(snapshot.elapsed)
    );
    if let Some(remaining) = snapshot.remaining {
        line.push_str(&format!(", {} remaining", fmt_hms(remaining)));
    }
    if snapshot.current_streak > 0 {
        line.push_str(&format!(" [down, {} consecutive drops]", snapshot.current_streak));
    }
    line
}
