use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use intercom_client::{CallEvent, CallStateMachine, UserIntent};
use intercom_core::CallState;

use crate::integration::{TestPanel, create_test_relay, init_tracing};
use crate::utils::{RawRoom, RecordingAudio};

#[tokio::test(start_paused = true)]
async fn test_unanswered_call_times_out() {
    init_tracing();

    let relay = create_test_relay();
    let media = TestPanel::connect(&relay, "media-room").await;
    let mut main = RawRoom::register(&relay, "main-room").await.unwrap();
    let audio = RecordingAudio::default();
    let machine = CallStateMachine::new(media.engine.clone(), audio.clone());
    let mut state = machine.subscribe();

    let (intents, intents_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(machine.run(media.events, intents_rx));

    let started = Instant::now();
    intents.send(UserIntent::Call("main-room".into())).unwrap();
    state.wait_for(|s| *s == CallState::Calling).await.unwrap();

    state.wait_for(|s| s.is_idle()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(audio.log(), vec!["start_calling_tone", "stop_calling_tone"]);
    while main.recv().await.unwrap().kind() != "call-ended" {}

    drop(intents);
    runner.await.unwrap();
    assert!(!media.engine.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_ring_times_out() {
    init_tracing();

    let relay = create_test_relay();
    let mut media = TestPanel::connect(&relay, "media-room").await;
    let main = TestPanel::connect(&relay, "main-room").await;
    let audio = RecordingAudio::default();
    let machine = CallStateMachine::new(main.engine.clone(), audio.clone())
        .with_ring_timeout(Some(Duration::from_secs(10)));
    let mut state = machine.subscribe();

    let (intents, intents_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(machine.run(main.events, intents_rx));

    let started = Instant::now();
    media.engine.start_call(&"main-room".into()).await.unwrap();
    state.wait_for(|s| *s == CallState::Receiving).await.unwrap();

    state.wait_for(|s| s.is_idle()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(audio.log(), vec!["start_ringtone", "stop_ringtone"]);

    // The caller is left to its own timeout.
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(event) = media.events.try_recv() {
        assert!(!matches!(event, CallEvent::CallEnded { .. }));
    }
    assert_eq!(media.engine.counterpart().await, Some("main-room".into()));

    drop(intents);
    runner.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ring_timeout_spares_call_answered_on_another_panel() {
    init_tracing();

    let relay = create_test_relay();
    let media = TestPanel::connect(&relay, "media-room").await;
    let kitchen = TestPanel::connect(&relay, "main-room").await;
    let hallway = TestPanel::connect(&relay, "main-room").await;

    let caller = CallStateMachine::new(media.engine.clone(), RecordingAudio::default());
    let answering = CallStateMachine::new(kitchen.engine.clone(), RecordingAudio::default());
    let hallway_audio = RecordingAudio::default();
    let idle_panel = CallStateMachine::new(hallway.engine.clone(), hallway_audio.clone());
    let mut caller_state = caller.subscribe();
    let mut answering_state = answering.subscribe();
    let mut idle_panel_state = idle_panel.subscribe();

    let (caller_intents, caller_rx) = mpsc::unbounded_channel();
    let (answering_intents, answering_rx) = mpsc::unbounded_channel();
    let (idle_panel_intents, idle_panel_rx) = mpsc::unbounded_channel();
    let caller_task = tokio::spawn(caller.run(media.events, caller_rx));
    let answering_task = tokio::spawn(answering.run(kitchen.events, answering_rx));
    let idle_panel_task = tokio::spawn(idle_panel.run(hallway.events, idle_panel_rx));

    caller_intents.send(UserIntent::Call("main-room".into())).unwrap();
    answering_state.wait_for(|s| *s == CallState::Receiving).await.unwrap();
    idle_panel_state.wait_for(|s| *s == CallState::Receiving).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    answering_intents.send(UserIntent::Accept).unwrap();
    caller_state.wait_for(|s| *s == CallState::InCall).await.unwrap();
    answering_state.wait_for(|s| *s == CallState::InCall).await.unwrap();

    // The panel nobody touched stops ringing on its own.
    idle_panel_state.wait_for(|s| s.is_idle()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(*caller_state.borrow(), CallState::InCall);
    assert_eq!(*answering_state.borrow(), CallState::InCall);
    assert_eq!(hallway_audio.log(), vec!["start_ringtone", "stop_ringtone"]);
    assert_eq!(media.engine.counterpart().await, Some("main-room".into()));
    assert!(!media.peers.last().is_closed());
    assert!(!kitchen.peers.last().is_closed());
    assert!(hallway.peers.peers().is_empty());

    drop(idle_panel_intents);
    idle_panel_task.await.unwrap();
    drop(answering_intents);
    answering_task.await.unwrap();
    drop(caller_intents);
    caller_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ring_timeout_can_be_disabled() {
    init_tracing();

    let relay = create_test_relay();
    let media = TestPanel::connect(&relay, "media-room").await;
    let _main = RawRoom::register(&relay, "main-room").await.unwrap();
    let machine =
        CallStateMachine::new(media.engine.clone(), RecordingAudio::default()).with_ring_timeout(None);
    let mut state = machine.subscribe();

    let (intents, intents_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(machine.run(media.events, intents_rx));

    intents.send(UserIntent::Call("main-room".into())).unwrap();
    state.wait_for(|s| *s == CallState::Calling).await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_secs(600), state.wait_for(|s| s.is_idle()))
        .await
        .is_err();
    assert!(timed_out);

    intents.send(UserIntent::HangUp).unwrap();
    state.wait_for(|s| s.is_idle()).await.unwrap();

    drop(intents);
    runner.await.unwrap();
}

#[tokio::test]
async fn test_run_loop_drives_a_call_from_intents() {
    init_tracing();

    let relay = create_test_relay();
    let media = TestPanel::connect(&relay, "media-room").await;
    let main = TestPanel::connect(&relay, "main-room").await;

    let caller = CallStateMachine::new(media.engine.clone(), RecordingAudio::default());
    let callee = CallStateMachine::new(main.engine.clone(), RecordingAudio::default());
    let mut caller_state = caller.subscribe();
    let mut callee_state = callee.subscribe();

    let (caller_intents, caller_rx) = mpsc::unbounded_channel();
    let (callee_intents, callee_rx) = mpsc::unbounded_channel();
    let caller_task = tokio::spawn(caller.run(media.events, caller_rx));
    let callee_task = tokio::spawn(callee.run(main.events, callee_rx));

    caller_intents.send(UserIntent::Call("main-room".into())).unwrap();
    callee_state.wait_for(|s| *s == CallState::Receiving).await.unwrap();
    callee_intents.send(UserIntent::Accept).unwrap();
    caller_state.wait_for(|s| *s == CallState::InCall).await.unwrap();
    callee_state.wait_for(|s| *s == CallState::InCall).await.unwrap();

    // Closing the panel hangs up and disconnects.
    drop(callee_intents);
    callee_task.await.unwrap();
    caller_state.wait_for(|s| s.is_idle()).await.unwrap();
    assert!(!main.engine.is_connected().await);

    drop(caller_intents);
    caller_task.await.unwrap();
}
