//! Push-style status notifications.

use futures_util::Stream;
use tokio::sync::watch;

use super::Status;

/// Receives status changes of one session.
///
/// Ends after a terminal status has been delivered, or when the session is
/// dropped. Rapid consecutive changes may be coalesced into the latest one;
/// a terminal status is never skipped.
#[derive(Debug)]
pub struct StatusEvents {
    receiver: watch::Receiver<Status>,
    done: bool,
}

impl StatusEvents {
    pub(crate) fn new(receiver: watch::Receiver<Status>) -> Self {
        let done = receiver.borrow().is_finished();
        Self { receiver, done }
    }

    /// Status at the time of the last delivered event or subscription.
    pub fn current(&self) -> Status {
        *self.receiver.borrow()
    }

    /// Wait for the next status change.
    pub async fn next(&mut self) -> Option<Status> {
        if self.done {
            return None;
        }
        if self.receiver.changed().await.is_err() {
            self.done = true;
            return None;
        }
        let status = *self.receiver.borrow_and_update();
        if status.is_finished() {
            self.done = true;
        }
        Some(status)
    }

    pub fn into_stream(self) -> impl Stream<Item = Status> + Send + 'static {
        futures_util::stream::unfold(self, |mut events| async move {
            let status = events.next().await?;
            Some((status, events))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_after_terminal() {
        let (tx, rx) = watch::channel(Status::Initialized);
        let events = StatusEvents::new(rx);

        let handle = tokio::spawn(async move { events.into_stream().collect::<Vec<_>>().await });
        tokio::task::yield_now().await;
        tx.send_replace(Status::Connected);
        tokio::task::yield_now().await;
        tx.send_replace(Status::Done);

        let seen = handle.await.unwrap();
        assert_eq!(seen.last(), Some(&Status::Done));
        assert!(seen.iter().all(|s| *s == Status::Connected || *s == Status::Done));
    }

    #[tokio::test]
    async fn test_ends_when_sender_dropped() {
        let (tx, rx) = watch::channel(Status::Connected);
        let mut events = StatusEvents::new(rx);
        drop(tx);
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn test_last_value_survives_sender_drop() {
        let (tx, rx) = watch::channel(Status::Connected);
        let mut events = StatusEvents::new(rx);
        tx.send_replace(Status::Timeout);
        drop(tx);
        assert_eq!(events.next().await, Some(Status::Timeout));
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn test_subscribing_to_finished_yields_nothing() {
        let (_tx, rx) = watch::channel(Status::Done);
        let events = StatusEvents::new(rx);
        assert_eq!(events.current(), Status::Done);
        assert!(events.done);
    }
}
