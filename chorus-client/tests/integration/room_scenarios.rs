use crate::utils::{TransportCall, start_session, test_config, wait_until};
use chorus_client::ConferenceEvent;
use chorus_core::{Direction, Role, SdpKind, SignalMessage, StreamId};
use std::time::Duration;

#[tokio::test]
async fn presenter_join_opens_publish_record() {
    let s = start_session(test_config(Role::Presenter));

    s.join_as("S1", &[]).await;

    let probe = s.factory.wait_for_probe("S1", 2000).await;
    assert_eq!(probe.direction, Direction::Publish);

    // the offering side creates the data channel and sends the offer
    let cfg = s
        .signaling
        .wait_for_command("takeConfiguration", 2000)
        .await
        .expect("presenter should send an offer");
    match cfg {
        SignalMessage::TakeConfiguration {
            stream_id,
            sdp_type,
            sdp,
            ..
        } => {
            assert_eq!(stream_id, StreamId::from("S1"));
            assert_eq!(sdp_type, SdpKind::Offer);
            assert_eq!(sdp, "offer-sdp-S1");
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert!(probe.calls().contains(&TransportCall::CreateDataChannel));

    // empty room: nothing to subscribe to
    assert_eq!(s.factory.create_count(), 1);
}

#[tokio::test]
async fn listener_join_subscribes_to_initial_streams() {
    let s = start_session(test_config(Role::Listener));

    s.join_as("S1", &["S2", "S3"]).await;

    let p2 = s.factory.wait_for_probe("S2", 2000).await;
    let p3 = s.factory.wait_for_probe("S3", 2000).await;
    assert_eq!(p2.direction, Direction::Subscribe);
    assert_eq!(p3.direction, Direction::Subscribe);

    // a listener never publishes, and subscribe records wait for the
    // remote offer instead of sending one
    assert_eq!(s.factory.create_count(), 2);
    assert_eq!(s.signaling.count_command("takeConfiguration"), 0);
}

#[tokio::test]
async fn remote_offer_is_answered() {
    let s = start_session(test_config(Role::Listener));

    s.join_as("S1", &["S2"]).await;
    let probe = s.factory.wait_for_probe("S2", 2000).await;

    s.feed(r#"{"command":"takeConfiguration","streamId":"S2","type":"offer","sdp":"v=0 remote"}"#)
        .await;

    let answer = s
        .signaling
        .wait_for_command("takeConfiguration", 2000)
        .await
        .expect("remote offer should be answered");
    match answer {
        SignalMessage::TakeConfiguration {
            stream_id,
            sdp_type,
            sdp,
            ..
        } => {
            assert_eq!(stream_id, StreamId::from("S2"));
            assert_eq!(sdp_type, SdpKind::Answer);
            assert_eq!(sdp, "answer-sdp-S2");
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert!(
        probe
            .calls()
            .contains(&TransportCall::SetRemoteDescription(SdpKind::Offer))
    );
}

#[tokio::test]
async fn membership_refresh_adds_and_removes_records() {
    let mut s = start_session(test_config(Role::Presenter));

    s.join_as("S1", &[]).await;
    let publish = s.factory.wait_for_probe("S1", 2000).await;

    s.room_info(&["S2", "S3"]).await;
    let p2 = s.factory.wait_for_probe("S2", 2000).await;
    let p3 = s.factory.wait_for_probe("S3", 2000).await;

    // S3 left; its record goes away, nothing else is touched
    s.room_info(&["S2"]).await;
    assert_eq!(
        s.next_event().await,
        ConferenceEvent::StreamDisconnected(StreamId::from("S3"))
    );
    assert!(p3.was_closed());
    assert!(!p2.was_closed());
    assert!(!publish.was_closed());
}

#[tokio::test]
async fn replayed_room_info_is_idempotent() {
    let mut s = start_session(test_config(Role::Listener));

    s.join_as("S1", &["S2"]).await;
    s.factory.wait_for_probe("S2", 2000).await;

    s.room_info(&["S2"]).await;
    s.room_info(&["S2"]).await;

    s.expect_no_event(150).await;
    assert_eq!(s.factory.create_count(), 1);
}

#[tokio::test]
async fn own_id_is_never_subscribed() {
    let s = start_session(test_config(Role::Listener));

    // server list echoes the session's own id
    s.join_as("S1", &["S1", "S2"]).await;

    s.factory.wait_for_probe("S2", 2000).await;
    assert!(s.factory.probe("S1").is_none());
    assert_eq!(s.factory.create_count(), 1);
}

#[tokio::test]
async fn candidate_for_unknown_stream_is_dropped() {
    let mut s = start_session(test_config(Role::Listener));

    s.join_as("S1", &["S2"]).await;
    s.factory.wait_for_probe("S2", 2000).await;

    s.feed(r#"{"command":"takeCandidate","streamId":"S9","candidate":"cand-x","label":0,"id":"0"}"#)
        .await;

    // no record appears for the unknown stream and the loop stays alive
    assert_eq!(s.factory.create_count(), 1);
    s.feed(r#"{"command":"error","definition":"no_stream_exist"}"#)
        .await;
    assert!(matches!(
        s.next_event().await,
        ConferenceEvent::ServerError { .. }
    ));
}

#[tokio::test]
async fn candidate_is_routed_to_its_record() {
    let s = start_session(test_config(Role::Listener));

    s.join_as("S1", &["S2"]).await;
    let probe = s.factory.wait_for_probe("S2", 2000).await;

    s.feed(r#"{"command":"takeCandidate","streamId":"S2","candidate":"cand-1","label":0,"id":"0"}"#)
        .await;

    let applied = wait_until(
        || {
            probe
                .calls()
                .contains(&TransportCall::AddRemoteCandidate("cand-1".to_string()))
        },
        2000,
    )
    .await;
    assert!(applied, "candidate was not applied to the record");
}

#[tokio::test]
async fn server_error_surfaces_mapped_message() {
    let mut s = start_session(test_config(Role::Listener));

    s.feed(r#"{"command":"error","definition":"unauthorized_access"}"#)
        .await;

    assert_eq!(
        s.next_event().await,
        ConferenceEvent::ServerError {
            message: "Unauthorized access: check your token.".to_string()
        }
    );
}

#[tokio::test]
async fn transport_create_failure_emits_stream_failed() {
    let mut s = start_session(test_config(Role::Listener));

    s.factory.fail_next_create();
    s.join_as("S1", &["S2"]).await;

    match s.next_event().await {
        ConferenceEvent::StreamFailed { stream_id, reason } => {
            assert_eq!(stream_id, StreamId::from("S2"));
            assert!(reason.contains("injected create failure"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(s.factory.create_count(), 0);
}

#[tokio::test]
async fn stats_poll_drives_membership_refresh() {
    // server_url points at a closed port: the REST call fails, the count
    // degrades to zero, and the refresh cycle still runs
    let mut config = test_config(Role::Presenter);
    config.stats_interval = Duration::from_millis(50);
    let mut s = start_session(config);

    s.join_as("S1", &[]).await;

    let info = s
        .signaling
        .wait_for_command("getRoomInfo", 3000)
        .await
        .expect("the poll should issue getRoomInfo");
    match info {
        SignalMessage::GetRoomInfo { room_id, stream_id } => {
            assert_eq!(room_id, "room1");
            assert_eq!(stream_id, "S1");
        }
        other => panic!("unexpected command: {other:?}"),
    }

    assert_eq!(s.next_event().await, ConferenceEvent::ListenerCount(0));
}

#[tokio::test]
async fn listener_role_does_not_observe_listener_count() {
    let mut config = test_config(Role::Listener);
    config.stats_interval = Duration::from_millis(50);
    let mut s = start_session(config);

    s.join_as("S1", &[]).await;

    // the refresh cycle still runs for a listener
    s.signaling
        .wait_for_command("getRoomInfo", 3000)
        .await
        .expect("the poll should issue getRoomInfo");

    // but the count observer stays silent
    s.expect_no_event(150).await;
}
