use super::*;

fn recording_listener() -> (SessionListener, Arc<Mutex<Vec<SessionNotification>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: SessionListener = Arc::new(move |n: SessionNotification| sink.lock().unwrap().push(n));
    (listener, seen)
}

// =============================================================
// attach
// =============================================================

#[test]
fn attach_reports_initial_state_immediately() {
    let broadcaster = SessionBroadcaster::new();
    let (listener, seen) = recording_listener();
    let _sub = broadcaster.attach(listener);
    assert_eq!(*seen.lock().unwrap(), vec![Ok(None)]);
}

#[test]
fn attach_reports_existing_session() {
    let broadcaster = SessionBroadcaster::new();
    broadcaster.publish(Some(Session::new("u1")));
    let (listener, seen) = recording_listener();
    let _sub = broadcaster.attach(listener);
    assert_eq!(*seen.lock().unwrap(), vec![Ok(Some(Session::new("u1")))]);
}

// =============================================================
// publish
// =============================================================

#[test]
fn publish_notifies_only_on_subject_change() {
    let broadcaster = SessionBroadcaster::new();
    let (listener, seen) = recording_listener();
    let _sub = broadcaster.attach(listener);

    assert!(broadcaster.publish(Some(Session::new("u1"))));
    assert!(!broadcaster.publish(Some(Session::new("u1").with_email("a@b.com"))));
    assert!(broadcaster.publish(None));
    assert!(!broadcaster.publish(None));

    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(broadcaster.current(), None);
}

// =============================================================
// Subscription
// =============================================================

#[test]
fn unsubscribe_detaches_listener() {
    let broadcaster = SessionBroadcaster::new();
    let (listener, seen) = recording_listener();
    let sub = broadcaster.attach(listener);
    assert_eq!(broadcaster.listener_count(), 1);

    sub.unsubscribe();
    assert_eq!(broadcaster.listener_count(), 0);

    broadcaster.publish(Some(Session::new("u1")));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn dropping_subscription_detaches_listener() {
    let broadcaster = SessionBroadcaster::new();
    let (listener, _seen) = recording_listener();
    {
        let _sub = broadcaster.attach(listener);
        assert_eq!(broadcaster.listener_count(), 1);
    }
    assert_eq!(broadcaster.listener_count(), 0);
}

#[test]
fn subscription_detach_runs_exactly_once() {
    let count = Arc::new(Mutex::new(0));
    let counter = count.clone();
    let sub = Subscription::new(move || *counter.lock().unwrap() += 1);
    sub.unsubscribe();
    assert_eq!(*count.lock().unwrap(), 1);
}
