use delaysyncrs::config::SysexSettings;
use delaysyncrs::midi::RecordingOutput;
use delaysyncrs::sysex::{SendQueue, SysexConnection, SysexEvent, SysexEventKind, SysexMessage};
use delaysyncrs::Error;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn connection(delay_ms: u64) -> SysexConnection<RecordingOutput> {
    SysexConnection::new(&SysexSettings {
        message_delay_ms: delay_ms,
    })
}

fn addresses(recorder: &RecordingOutput) -> Vec<u8> {
    recorder
        .sent()
        .iter()
        .map(|bytes| SysexMessage::parse(bytes).unwrap().address)
        .collect()
}

#[test]
fn test_send_without_output_is_not_connected() {
    let recorder = RecordingOutput::new("Mock Device 1");
    let queue: SendQueue<RecordingOutput> = SendQueue::new(connection(0));

    assert!(matches!(queue.send("leftDelay", 500), Err(Error::NotConnected)));
    assert!(!queue.is_connected());
    assert_eq!(recorder.sent_count(), 0);
}

#[test]
fn test_missing_output_is_reported_before_bad_value() {
    let queue: SendQueue<RecordingOutput> = SendQueue::new(connection(0));
    assert!(matches!(queue.send("reverbType", 9), Err(Error::NotConnected)));
    assert!(matches!(queue.send("delayFeedback", 1), Err(Error::NotConnected)));

    queue.connect(Some(RecordingOutput::new("Mock Device 1"))).unwrap();
    assert!(matches!(
        queue.send("reverbType", 9),
        Err(Error::InvalidEnumValue { .. })
    ));
}

#[test]
fn test_concurrent_updates_do_not_interleave() {
    let recorder = RecordingOutput::new("Mock Device 1");
    let queue = Arc::new(SendQueue::new(connection(5)));
    queue.connect(Some(recorder.clone())).unwrap();

    let left = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.send("leftDelay", 500))
    };
    let right = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.send("rightDelay", 250))
    };
    left.join().unwrap().unwrap();
    right.join().unwrap().unwrap();

    let sent = addresses(&recorder);
    assert_eq!(sent.len(), 4);
    // Each update's MSB is immediately followed by its own LSB
    assert!(
        sent == vec![0x2A, 0x2B, 0x2C, 0x2D] || sent == vec![0x2C, 0x2D, 0x2A, 0x2B],
        "interleaved: {:02X?}",
        sent
    );
}

#[test]
fn test_updates_are_sent_in_enqueue_order() {
    let recorder = RecordingOutput::new("Mock Device 1");
    let queue = SendQueue::new(connection(0));
    queue.connect(Some(recorder.clone())).unwrap();

    let tickets = vec![
        queue.enqueue("reverbType", 1).unwrap(),
        queue.enqueue("leftDelay", 100).unwrap(),
        queue.enqueue("reverbType", 3).unwrap(),
    ];
    for ticket in tickets {
        ticket.wait().unwrap();
    }

    assert_eq!(addresses(&recorder), vec![0x50, 0x2A, 0x2B, 0x50]);
}

#[test]
fn test_failure_aborts_rest_of_update() {
    let recorder = RecordingOutput::failing_after("Mock Device 1", 1);
    let queue = SendQueue::new(connection(0));
    queue.connect(Some(recorder.clone())).unwrap();

    let failures = Arc::new(Mutex::new(Vec::new()));
    let f = failures.clone();
    queue.with_connection(|c| {
        c.events().subscribe(SysexEventKind::Failed, move |e| {
            f.lock().unwrap().push(e.clone());
        });
    });

    assert!(matches!(queue.send("leftDelay", 500), Err(Error::Transmission(_))));
    assert_eq!(recorder.sent_count(), 1);
    assert_eq!(failures.lock().unwrap().len(), 1);
    assert!(matches!(failures.lock().unwrap()[0], SysexEvent::Failed(_)));
    assert!(queue.with_connection(|c| c.last_sent().is_none()));
}

#[test]
fn test_messages_are_spaced_by_delay() {
    let recorder = RecordingOutput::new("Mock Device 1");
    let queue = SendQueue::new(connection(20));
    queue.connect(Some(recorder.clone())).unwrap();

    let started = Instant::now();
    queue.send("leftDelay", 1000).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(recorder.sent_count(), 2);
}

#[test]
fn test_reconnect_switches_destination() {
    let first = RecordingOutput::new("Mock Device 1");
    let second = RecordingOutput::new("Mock Device 2");
    let queue = SendQueue::new(connection(0));

    queue.connect(Some(first.clone())).unwrap();
    queue.send("reverbType", 0).unwrap();
    queue.connect(Some(second.clone())).unwrap();
    queue.send("reverbType", 1).unwrap();

    assert_eq!(first.sent_count(), 1);
    assert_eq!(second.sent_count(), 1);
    assert!(matches!(queue.connect(None), Err(Error::InvalidDestination)));
    assert!(queue.with_connection(|c| c.output_name() == Some("Mock Device 2")));
}

#[test]
fn test_disconnect_stops_delivery() {
    let recorder = RecordingOutput::new("Mock Device 1");
    let queue = SendQueue::new(connection(0));
    queue.connect(Some(recorder.clone())).unwrap();
    queue.disconnect();

    assert!(matches!(queue.send("reverbType", 2), Err(Error::NotConnected)));
    assert_eq!(recorder.sent_count(), 0);
}
