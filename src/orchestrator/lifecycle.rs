//! Cancellation and graceful shutdown.

use super::{MediaDownloader, lock};
use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

impl MediaDownloader {
    /// Cancel the in-flight download, if any
    ///
    /// The poll loop observes the token before its next status check (or
    /// immediately, if it is sleeping) and the cycle ends with
    /// [`Error::Cancelled`](crate::Error::Cancelled). A cancelled job never
    /// produces a history record. Returns whether a download was active.
    pub fn cancel(&self) -> bool {
        match lock(&self.cycle.current_cancel).as_ref() {
            Some(token) => {
                tracing::info!("cancelling active download");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether new downloads are still accepted
    pub fn is_accepting(&self) -> bool {
        self.cycle.accepting_new.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the downloader
    ///
    /// Stops accepting new downloads, cancels the active one and waits (up to
    /// 30 seconds) for its cycle to return to idle before emitting
    /// [`Event::Shutdown`].
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.cycle.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        self.cycle.shutdown_token.cancel();

        let shutdown_timeout = Duration::from_secs(30);
        match tokio::time::timeout(shutdown_timeout, self.wait_for_idle()).await {
            Ok(()) => tracing::info!("Active download stopped"),
            Err(_) => {
                tracing::warn!("Timeout waiting for active download to stop, proceeding with shutdown");
            }
        }

        self.event_tx.send(Event::Shutdown).ok();
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_idle(&self) {
        while !self.is_idle() {
            tracing::debug!("Waiting for active download to stop");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
