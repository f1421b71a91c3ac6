use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use crate::domain::RawEvent;
use crate::mailbox::Mailbox;
use crate::stream::{Connection, EventSource, ReceiveError};

const PONG: &str = r#"{"type":"pong"}"#;

pub struct ListenerConfig {
    /// Fixed delay before retrying a failed or broken connection.
    pub backoff: Duration,
    /// Idle receive window; expiry means "quiet but alive", not a reconnect.
    pub receive_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            receive_timeout: Duration::from_secs(30),
        }
    }
}

/// Keeps one logical event stream alive for the life of the process, feeding
/// the mailbox from a dedicated thread. Every transport failure is converted
/// into a Disconnected status event plus a retry; nothing propagates out.
pub struct Listener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    pub fn spawn(
        source: Box<dyn EventSource>,
        mailbox: Arc<Mailbox>,
        cfg: ListenerConfig,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("event-listener".to_string())
            .spawn(move || run_listener(source.as_ref(), &mailbox, &cfg, &flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signals the thread to stop and waits for it to exit. Teardown is
    /// cooperative and completes within one receive-timeout interval.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_listener(
    source: &dyn EventSource,
    mailbox: &Mailbox,
    cfg: &ListenerConfig,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        mailbox.push(RawEvent::connection_status("Connecting..."));
        let mut conn = match source.connect() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("event stream connect failed: {e}; retrying in {:?}", cfg.backoff);
                mailbox.push(RawEvent::connection_status("Disconnected"));
                sleep_unless_stopped(cfg.backoff, stop);
                continue;
            }
        };
        info!("event stream connected");
        mailbox.push(RawEvent::connection_status("Connected"));

        let broke = receive_loop(conn.as_mut(), mailbox, cfg, stop);
        conn.close();
        if !broke {
            // Stop was requested; publish nothing further.
            break;
        }
        mailbox.push(RawEvent::connection_status("Disconnected"));
        sleep_unless_stopped(cfg.backoff, stop);
    }
}

/// Returns true when the connection broke and a reconnect is due, false when
/// the stop flag ended the loop.
fn receive_loop(
    conn: &mut dyn Connection,
    mailbox: &Mailbox,
    cfg: &ListenerConfig,
    stop: &AtomicBool,
) -> bool {
    while !stop.load(Ordering::SeqCst) {
        match conn.receive(cfg.receive_timeout) {
            Ok(text) => match RawEvent::decode(&text) {
                Ok(event) if event.kind == "ping" => {
                    // Keepalive: acknowledge, never forward.
                    if let Err(e) = conn.send(PONG) {
                        warn!("keepalive reply failed: {e}");
                        return true;
                    }
                }
                Ok(event) => mailbox.push(event),
                Err(e) => warn!("discarding malformed event: {e}"),
            },
            // Quiet but alive; keep listening.
            Err(ReceiveError::Timeout) => {}
            Err(ReceiveError::Closed(e)) => {
                warn!("event stream lost: {e}; reconnecting in {:?}", cfg.backoff);
                return true;
            }
        }
    }
    false
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let slice = Duration::from_millis(50).min(total);
    let deadline = Instant::now() + total;
    while Instant::now() < deadline && !stop.load(Ordering::SeqCst) {
        thread::sleep(slice);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::vec::IntoIter;

    use super::*;
    use crate::stream::ConnectError;

    enum Step {
        Text(&'static str),
        Timeout,
        Close,
    }

    struct FakeConn {
        steps: IntoIter<Step>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Connection for FakeConn {
        fn receive(&mut self, _timeout: Duration) -> Result<String, ReceiveError> {
            match self.steps.next() {
                Some(Step::Text(t)) => Ok(t.to_string()),
                Some(Step::Timeout) => Err(ReceiveError::Timeout),
                Some(Step::Close) | None => Err(ReceiveError::Closed("gone".to_string())),
            }
        }

        fn send(&mut self, text: &str) -> Result<(), ReceiveError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {}
    }

    /// Scripted transport: each entry is one connection attempt, `None`
    /// meaning the connect itself is refused. Exhausted scripts refuse too.
    struct FakeSource {
        attempts: Mutex<IntoIter<Option<Vec<Step>>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSource {
        fn new(attempts: Vec<Option<Vec<Step>>>) -> (Box<Self>, Arc<Mutex<Vec<String>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let source = Box::new(Self {
                attempts: Mutex::new(attempts.into_iter()),
                sent: sent.clone(),
            });
            (source, sent)
        }
    }

    impl EventSource for FakeSource {
        fn connect(&self) -> Result<Box<dyn Connection + Send>, ConnectError> {
            match self.attempts.lock().unwrap().next() {
                Some(Some(steps)) => Ok(Box::new(FakeConn {
                    steps: steps.into_iter(),
                    sent: self.sent.clone(),
                })),
                _ => Err(ConnectError("refused".to_string())),
            }
        }
    }

    fn fast_cfg() -> ListenerConfig {
        ListenerConfig {
            backoff: Duration::from_millis(1),
            receive_timeout: Duration::from_millis(10),
        }
    }

    /// Drains the mailbox until `done` is satisfied or the deadline passes.
    fn collect_until(
        mailbox: &Mailbox,
        done: impl Fn(&[RawEvent]) -> bool,
    ) -> Vec<RawEvent> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done(&seen) && Instant::now() < deadline {
            seen.extend(mailbox.drain());
            thread::sleep(Duration::from_millis(2));
        }
        seen
    }

    fn statuses(events: &[RawEvent]) -> Vec<String> {
        events
            .iter()
            .filter(|e| e.kind == "connection_status")
            .map(|e| e.str_field("status").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn forwards_events_in_arrival_order() {
        let (source, _sent) = FakeSource::new(vec![Some(vec![
            Step::Text(r#"{"type":"processing_started"}"#),
            Step::Timeout,
            Step::Text(r#"{"type":"status_update","seq":1}"#),
            Step::Close,
        ])]);
        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(source, mailbox.clone(), fast_cfg()).unwrap();

        let seen = collect_until(&mailbox, |seen| {
            seen.iter().any(|e| e.kind == "status_update")
        });
        listener.stop();

        let data: Vec<&str> = seen
            .iter()
            .filter(|e| e.kind != "connection_status")
            .map(|e| e.kind.as_str())
            .collect();
        assert_eq!(data, vec!["processing_started", "status_update"]);
    }

    #[test]
    fn ping_is_answered_once_and_never_forwarded() {
        let (source, sent) = FakeSource::new(vec![Some(vec![
            Step::Text(r#"{"type":"ping"}"#),
            Step::Text(r#"{"type":"status_update"}"#),
            Step::Close,
        ])]);
        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(source, mailbox.clone(), fast_cfg()).unwrap();

        let seen = collect_until(&mailbox, |seen| {
            seen.iter().any(|e| e.kind == "status_update")
        });
        listener.stop();

        assert!(seen.iter().all(|e| e.kind != "ping"));
        assert_eq!(*sent.lock().unwrap(), vec![PONG.to_string()]);
    }

    #[test]
    fn malformed_payloads_are_discarded_and_the_stream_continues() {
        let (source, _sent) = FakeSource::new(vec![Some(vec![
            Step::Text("{not json"),
            Step::Text(r#"{"type":"status_update"}"#),
            Step::Close,
        ])]);
        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(source, mailbox.clone(), fast_cfg()).unwrap();

        let seen = collect_until(&mailbox, |seen| {
            seen.iter().any(|e| e.kind == "status_update")
        });
        listener.stop();

        let data: Vec<&str> = seen
            .iter()
            .filter(|e| e.kind != "connection_status")
            .map(|e| e.kind.as_str())
            .collect();
        assert_eq!(data, vec!["status_update"]);
    }

    #[test]
    fn refused_connects_alternate_connecting_and_disconnected() {
        let (source, _sent) = FakeSource::new(vec![]);
        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(source, mailbox.clone(), fast_cfg()).unwrap();

        let seen = collect_until(&mailbox, |seen| statuses(seen).len() >= 6);
        listener.stop();

        let statuses = statuses(&seen);
        assert!(statuses.len() >= 6);
        for (i, status) in statuses.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(status, "Connecting...");
            } else {
                assert_eq!(status, "Disconnected");
            }
        }
        // Nothing but status events while connects keep failing.
        assert!(seen.iter().all(|e| e.kind == "connection_status"));
    }

    #[test]
    fn broken_stream_publishes_disconnected_then_reconnects() {
        let (source, _sent) = FakeSource::new(vec![
            Some(vec![Step::Close]),
            Some(vec![Step::Text(r#"{"type":"status_update"}"#), Step::Close]),
        ]);
        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(source, mailbox.clone(), fast_cfg()).unwrap();

        let seen = collect_until(&mailbox, |seen| {
            seen.iter().any(|e| e.kind == "status_update")
        });
        listener.stop();

        let prefix = statuses(&seen);
        assert_eq!(
            &prefix[..4],
            &["Connecting...", "Connected", "Disconnected", "Connecting..."]
        );
    }

    #[test]
    fn stop_ends_the_thread_promptly_while_idle() {
        // An endless-idle connection: receive always times out.
        struct IdleConn;
        impl Connection for IdleConn {
            fn receive(&mut self, timeout: Duration) -> Result<String, ReceiveError> {
                thread::sleep(timeout);
                Err(ReceiveError::Timeout)
            }
            fn send(&mut self, _text: &str) -> Result<(), ReceiveError> {
                Ok(())
            }
            fn close(&mut self) {}
        }
        struct IdleSource;
        impl EventSource for IdleSource {
            fn connect(&self) -> Result<Box<dyn Connection + Send>, ConnectError> {
                Ok(Box::new(IdleConn))
            }
        }

        let mailbox = Arc::new(Mailbox::new());
        let listener = Listener::spawn(Box::new(IdleSource), mailbox.clone(), fast_cfg()).unwrap();
        collect_until(&mailbox, |seen| statuses(seen).contains(&"Connected".to_string()));

        let started = Instant::now();
        listener.stop();
        assert!(started.elapsed() < Duration::from_secs(1));

        // No further events after stop.
        thread::sleep(Duration::from_millis(20));
        assert!(mailbox.is_empty());
    }
}
