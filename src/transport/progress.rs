use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sending half of an upload's progress channel.
///
/// Values are clamped to 0..=100 and only forwarded when they exceed the last
/// value sent, so receivers always observe a non-decreasing sequence.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: mpsc::UnboundedSender<u8>,
    last: Arc<AtomicU8>,
    reported: Arc<AtomicBool>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Self {
            sender,
            last: Arc::new(AtomicU8::new(0)),
            reported: Arc::new(AtomicBool::new(false)),
        };
        (sink, receiver)
    }

    pub fn report_percent(&self, percent: u8) {
        let percent = percent.min(100);
        let first = !self.reported.swap(true, Ordering::SeqCst);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if first || percent > previous {
            // The receiver going away just means nobody is watching anymore.
            let _ = self.sender.send(percent.max(previous));
        }
    }

    pub fn report_bytes(&self, sent: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            ((sent.min(total) as u128 * 100) / total as u128) as u8
        };
        self.report_percent(percent);
    }

    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<u8>) -> Vec<u8> {
        let mut seen = Vec::new();
        while let Ok(p) = rx.try_recv() {
            seen.push(p);
        }
        seen
    }

    #[test]
    fn suppresses_regressions_and_duplicates() {
        let (sink, mut rx) = ProgressSink::channel();
        for p in [0, 10, 10, 5, 40, 30, 100] {
            sink.report_percent(p);
        }
        assert_eq!(drain(&mut rx), vec![0, 10, 40, 100]);
        assert_eq!(sink.last(), 100);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report_percent(250);
        assert_eq!(drain(&mut rx), vec![100]);
    }

    #[test]
    fn byte_counts_map_to_percent() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report_bytes(0, 200);
        sink.report_bytes(50, 200);
        sink.report_bytes(300, 200);
        assert_eq!(drain(&mut rx), vec![0, 25, 100]);
    }

    #[test]
    fn empty_body_is_immediately_complete() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report_bytes(0, 0);
        assert_eq!(drain(&mut rx), vec![100]);
    }
}
