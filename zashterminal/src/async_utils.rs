//! Async utilities for GUI code
//!
//! GTK4 runs on a single-threaded main loop while network work (AI requests,
//! keyring lookups) runs on the tokio runtime entered in `main`. Results
//! travel back over a `std::sync::mpsc` channel that a GLib timeout drains
//! on the main thread.
//!
//! | Scenario | Helper |
//! |----------|--------|
//! | `!Send` future touching widgets | [`spawn_async`] |
//! | `Send` future, one result | [`spawn_background`] |
//! | Background task reporting progress | [`poll_channel`] |

use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;

use gtk4::glib;

/// How often the main loop drains background channels
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns an async task on the GLib main context.
///
/// The task runs on the main thread and can safely update GTK widgets.
pub fn spawn_async<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    glib::MainContext::default().spawn_local(future);
}

/// Runs `future` on the tokio runtime and hands its output to `callback`
/// on the main thread.
pub fn spawn_background<F, T, C>(future: F, callback: C)
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
    C: FnOnce(T) + 'static,
{
    let (tx, rx) = mpsc::channel();
    tokio::spawn(async move {
        let result = future.await;
        if tx.send(result).is_err() {
            tracing::debug!("Background result dropped, receiver gone");
        }
    });
    let mut callback = Some(callback);
    poll_channel(rx, move |value| {
        if let Some(cb) = callback.take() {
            cb(value);
        }
    });
}

/// Delivers every message from `rx` to `on_message` on the main thread
/// until all senders are dropped.
pub fn poll_channel<T, C>(rx: mpsc::Receiver<T>, mut on_message: C)
where
    T: 'static,
    C: FnMut(T) + 'static,
{
    glib::timeout_add_local(POLL_INTERVAL, move || {
        loop {
            match rx.try_recv() {
                Ok(message) => on_message(message),
                Err(mpsc::TryRecvError::Empty) => return glib::ControlFlow::Continue,
                Err(mpsc::TryRecvError::Disconnected) => return glib::ControlFlow::Break,
            }
        }
    });
}
