use caption_base_pool::{CaptionNotification, CaptionStatus};
use tokio::sync::mpsc;

const BAR_WIDTH: usize = 24;

/// `[#########---------------]  37%`
pub fn render_bar(progress: f64) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (progress * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        (progress * 100.0).round() as usize
    )
}

/// One line per notification worth showing, `None` for the rest.
pub fn render_notification(notification: &CaptionNotification) -> Option<String> {
    let position = format!("{}/{}", notification.index + 1, notification.total);
    let name = notification.target.file_name();
    match notification.status {
        CaptionStatus::Init => None,
        CaptionStatus::Started => Some(format!(
            "{} {} captioning {}",
            render_bar(notification.progress),
            position,
            name
        )),
        CaptionStatus::Finished => Some(format!(
            "{} {} done {}",
            render_bar(notification.progress),
            position,
            name
        )),
        CaptionStatus::Error => Some(format!(
            "{} {} failed {}: {}",
            render_bar(notification.progress),
            position,
            name,
            notification.message.as_deref().unwrap_or("unknown error")
        )),
        CaptionStatus::Cancelled => Some(format!("{} skipped {}", position, name)),
    }
}

/// Print notifications until every sender is gone.
pub async fn print_notifications(mut rx: mpsc::Receiver<CaptionNotification>) {
    while let Some(notification) = rx.recv().await {
        if let Some(line) = render_notification(&notification) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use caption_base::ImageRef;

    fn notification(status: CaptionStatus, progress: f64) -> CaptionNotification {
        CaptionNotification {
            target: ImageRef::new("/data/b.png"),
            index: 1,
            total: 3,
            status,
            progress,
            message: None,
        }
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0.0), format!("[{}]   0%", "-".repeat(BAR_WIDTH)));
        assert_eq!(render_bar(1.0), format!("[{}] 100%", "#".repeat(BAR_WIDTH)));
        assert_eq!(render_bar(0.5), format!("[{}{}]  50%", "#".repeat(12), "-".repeat(12)));
        assert_eq!(render_bar(2.0), render_bar(1.0));
    }

    #[test]
    fn test_render_notification() {
        assert_eq!(render_notification(&notification(CaptionStatus::Init, 0.0)), None);

        let line = render_notification(&notification(CaptionStatus::Finished, 2.0 / 3.0));
        assert_eq!(line, Some(format!("{} 2/3 done b.png", render_bar(2.0 / 3.0))));

        let mut failed = notification(CaptionStatus::Error, 2.0 / 3.0);
        failed.message = Some("transport error: timeout".into());
        let line = render_notification(&failed).expect("line");
        assert!(line.ends_with("2/3 failed b.png: transport error: timeout"));

        let line = render_notification(&notification(CaptionStatus::Cancelled, 1.0 / 3.0));
        assert_eq!(line.as_deref(), Some("2/3 skipped b.png"));
    }
}
