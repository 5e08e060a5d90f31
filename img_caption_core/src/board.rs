//! The single caption display target.
//!
//! A [`CaptionBoard`] lives on the caller's primary context and is the only
//! place the current caption is written. Pipelines hold a [`CaptionSink`]
//! and post updates to it from any thread; the board applies them in the
//! order they were posted, dropping the ones a newer call has superseded.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::config::ConcurrencyPolicy;

/// Identifies one `classify` invocation.
pub type CallId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionUpdate {
    pub call: CallId,
    pub caption: String,
    /// `false` for the in-progress caption, `true` for the result or error.
    pub terminal: bool,
}

#[derive(Debug)]
struct Posted {
    update: CaptionUpdate,
    policy: ConcurrencyPolicy,
}

#[derive(Debug, Clone)]
pub struct CaptionSink {
    tx: UnboundedSender<Posted>,
    policy: ConcurrencyPolicy,
}

impl CaptionSink {
    /// Updates posted through the returned sink are applied under `policy`.
    pub fn with_policy(self, policy: ConcurrencyPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Never blocks. Updates posted after the board is gone are dropped.
    pub fn post(&self, call: CallId, caption: impl Into<String>, terminal: bool) {
        let posted = Posted {
            update: CaptionUpdate {
                call,
                caption: caption.into(),
                terminal,
            },
            policy: self.policy,
        };
        if self.tx.send(posted).is_err() {
            debug!("caption board dropped, discarding update for call {}", call);
        }
    }
}

#[derive(Debug)]
pub struct CaptionBoard {
    rx: UnboundedReceiver<Posted>,
    current: String,
    newest: CallId,
}

pub fn caption_channel() -> (CaptionSink, CaptionBoard) {
    let (tx, rx) = unbounded_channel();
    (
        CaptionSink {
            tx,
            policy: ConcurrencyPolicy::default(),
        },
        CaptionBoard {
            rx,
            current: String::new(),
            newest: 0,
        },
    )
}

impl CaptionBoard {
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Waits for the next update that changes the caption and applies it.
    /// `None` once every sink is dropped.
    pub async fn next(&mut self) -> Option<CaptionUpdate> {
        loop {
            let Posted { update, policy } = self.rx.recv().await?;
            if policy == ConcurrencyPolicy::SupersedePrevious && update.call < self.newest {
                debug!(
                    "dropping update for call {}, superseded by call {}",
                    update.call, self.newest
                );
                continue;
            }
            self.newest = self.newest.max(update.call);
            self.current.clone_from(&update.caption);
            return Some(update);
        }
    }

    /// Applies updates until every sink is dropped, calling `on_update` after each one.
    ///
    /// Returns the final caption.
    pub async fn run<F>(mut self, mut on_update: F) -> String
    where
        F: FnMut(&CaptionUpdate),
    {
        while let Some(update) = self.next().await {
            on_update(&update);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn applies_updates_in_post_order() {
        let (sink, mut board) = caption_channel();
        sink.post(1, "first", false);
        sink.post(1, "second", true);
        drop(sink);

        assert_eq!(board.current(), "");
        assert_eq!(board.next().await.unwrap().caption, "first");
        assert_eq!(board.current(), "first");
        let last = board.next().await.unwrap();
        assert!(last.terminal);
        assert_eq!(board.current(), "second");
        assert!(board.next().await.is_none());
    }

    #[tokio::test]
    async fn run_returns_final_caption() {
        let (sink, board) = caption_channel();
        let other = sink.clone();
        sink.post(1, "a", false);
        other.post(2, "b", true);
        drop((sink, other));

        let mut seen = vec![];
        let last = board.run(|u| seen.push(u.call)).await;
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(last, "b");
    }

    // Call 1 finishes its inference, then call 2 starts and completes before
    // call 1's result reaches the board.
    #[tokio::test]
    async fn late_result_of_older_call_is_dropped_when_superseding() {
        let (sink, board) = caption_channel();
        let sink = sink.with_policy(ConcurrencyPolicy::SupersedePrevious);
        sink.post(1, "Classifying scene...", false);
        sink.post(2, "Classifying scene...", false);
        sink.post(2, "newer", true);
        sink.post(1, "older", true);
        drop(sink);

        let mut applied = vec![];
        let last = board.run(|u| applied.push((u.call, u.terminal))).await;
        assert_eq!(applied, vec![(1, false), (2, false), (2, true)]);
        assert_eq!(last, "newer");
    }

    #[tokio::test]
    async fn late_result_of_older_call_wins_by_default() {
        let (sink, board) = caption_channel();
        sink.post(1, "Classifying scene...", false);
        sink.post(2, "Classifying scene...", false);
        sink.post(2, "newer", true);
        sink.post(1, "older", true);
        drop(sink);

        assert_eq!(board.run(|_| {}).await, "older");
    }

    #[test]
    fn posting_without_board_is_harmless() {
        let (sink, board) = caption_channel();
        drop(board);
        sink.post(7, "lost", true);
    }
}
