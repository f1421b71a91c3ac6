use chrono::Utc;
use serde_json::Value;

use crate::domain::{
    ConnectionState, DashboardSnapshot, Notification, ProcessedEmailRecord, RECENT_EVENTS_CAP,
    RawEvent, Stats,
};

/// Folds one raw event into the snapshot. Pure state transition: no I/O, no
/// locking; the polling driver is the snapshot's only writer.
pub fn fold(snapshot: &mut DashboardSnapshot, event: &RawEvent) -> Option<Notification> {
    let mut note = None;

    match event.kind.as_str() {
        "connection_status" => {
            let status = event.str_field("status").unwrap_or("Disconnected");
            snapshot.connection = ConnectionState::from_status(status);
        }
        "processing_started" => snapshot.is_processing = true,
        "status_update" => snapshot.last_status = Some(event.payload.clone()),
        "email_processed" => note = fold_email_processed(snapshot, event),
        _ => {}
    }

    // Stats ride along on any message that carries them, replaced wholesale.
    if let Some(stats) = event.payload.get("stats") {
        snapshot.stats = parse_stats(stats);
    }

    snapshot.last_update = Some(Utc::now());
    note
}

fn fold_email_processed(
    snapshot: &mut DashboardSnapshot,
    event: &RawEvent,
) -> Option<Notification> {
    snapshot.is_processing = false;

    snapshot.recent_events.insert(0, event.clone());
    snapshot.recent_events.truncate(RECENT_EVENTS_CAP);

    let result = event.payload.get("result").cloned().unwrap_or(Value::Null);
    let ai_response = result
        .pointer("/final_state/reply_response/body")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(record) = event.payload.get("record") {
        let mut record: ProcessedEmailRecord =
            serde_json::from_value(record.clone()).unwrap_or_default();
        // A record without a message id cannot be addressed later; it stays
        // out of the archive (transient state above still updated).
        if !record.message_id.is_empty() {
            record.ai_response = ai_response;
            snapshot.processed.insert(record.message_id.clone(), record);
        }
    }

    let email = event.str_field("email").unwrap_or("unknown").to_string();
    let success = result
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let response_sent = result
        .get("response_sent")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(match (success, response_sent) {
        (true, true) => Notification::ReplySent { email },
        (true, false) => Notification::ManualReview { email },
        (false, _) => Notification::ProcessingError { email },
    })
}

fn parse_stats(stats: &Value) -> Stats {
    stats
        .get("processing_stats")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
