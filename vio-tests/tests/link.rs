use tokio::net::TcpListener;
use vio_client::{
    Level, LinkState,
    link::{Builder, DeviceLink},
};
use vio_protocol::Action;
use vio_tests::{FakeVio, RecordingHost, device, pump_until, vio_4k};

fn link_to(device: &FakeVio) -> DeviceLink<RecordingHost> {
    Builder::new()
        .host(device.addr().ip().to_string())
        .port(device.addr().port())
        .build(RecordingHost::default())
}

async fn handshake(link: &mut DeviceLink<RecordingHost>) {
    link.connect().await.unwrap();
    pump_until(link, |link| {
        link.identity().command_set_version().is_some()
    })
    .await;
}

#[tokio::test]
async fn handshake_identifies_vio() {
    let vio = FakeVio::start(vio_4k(2)).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    assert_eq!(link.identity().model(), Some(1024));
    assert_eq!(link.identity().model_name(), Some("VIO 4K"));
    assert_eq!(link.identity().command_set_version(), Some(3));
    assert_eq!(link.state(), LinkState::Connected);
    assert_eq!(vio.received(), vec!["", "?", "0,TPver"]);

    let infos = link.host().messages(Level::Info);
    assert_eq!(infos[0], "VIO 4K has 1 other connected controller(s).");
    assert_eq!(infos[1], "Command set version of VIO 4K is 3");
    assert!(link.host().messages(Level::Error).is_empty());
}

#[tokio::test]
async fn split_responses_are_reassembled() {
    let vio = FakeVio::start_with_chunk_size(vio_4k(1), 1).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    assert_eq!(link.identity().model(), Some(1024));
    assert_eq!(vio.received(), vec!["", "?", "0,TPver"]);
    assert_eq!(
        link.host().messages(Level::Info)[0],
        "VIO 4K has 0 other connected controller(s)."
    );
}

#[tokio::test]
async fn last_free_slot_warns() {
    let vio = FakeVio::start(vio_4k(4)).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    assert_eq!(
        link.host().messages(Level::Warning),
        vec!["VIO 4K has 4 other connected controllers. Maximum reached."]
    );
    assert!(link.is_connected());
}

#[tokio::test]
async fn connection_limit_closes_link() {
    let vio = FakeVio::start(vio_4k(5)).await.unwrap();
    let mut link = link_to(&vio);
    link.connect().await.unwrap();
    pump_until(&mut link, |link| !link.is_connected()).await;

    let errors = link.host().messages(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("got 5"), "{}", errors[0]);
    assert_eq!(link.state(), LinkState::Idle);
    assert_eq!(link.identity().model(), None);
    assert_eq!(vio.received(), vec![""]);
    assert_eq!(vio.connections(), 1);
}

#[tokio::test]
async fn wrong_model_closes_link() {
    let vio = FakeVio::start(device(1, 97)).await.unwrap();
    let mut link = link_to(&vio);
    link.connect().await.unwrap();
    pump_until(&mut link, |link| !link.is_connected()).await;

    let errors = link.host().messages(Level::Error);
    assert_eq!(
        errors,
        vec!["VIO 4K is not connected to a VIO, it is connected to NeXtage 16. Closing connection now."]
    );
    assert_eq!(link.identity().model(), Some(97));
    assert_eq!(link.state(), LinkState::Idle);
    assert_eq!(vio.received(), vec!["", "?"]);
}

#[tokio::test]
async fn send_after_self_close_reconnects() {
    let vio = FakeVio::start(device(1, 97)).await.unwrap();
    let mut link = link_to(&vio);
    link.connect().await.unwrap();
    pump_until(&mut link, |link| !link.is_connected()).await;

    assert!(link.send("1PCrpr").await);
    assert!(link.is_connected());
    vio.wait_for(|received| received.iter().any(|c| c == "1PCrpr"))
        .await;
    assert_eq!(vio.connections(), 2);
}

#[tokio::test]
async fn device_errors_are_reported() {
    let vio = FakeVio::start(|command: &str| match command {
        "" => vec!["TPcon1".to_string()],
        "?" => vec!["DEV1024".to_string()],
        "0,TPver" => vec!["TPver0,3".to_string()],
        "99PRinp" => vec!["E13".to_string()],
        _ => vec!["E10".to_string()],
    })
    .await
    .unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    assert!(link.send("99PRinp").await);
    pump_until(&mut link, |link| {
        !link.host().messages(Level::Error).is_empty()
    })
    .await;
    assert_eq!(
        link.host().messages(Level::Error),
        vec!["Received value out of range error from VIO 4K: E13"]
    );

    assert!(link.send("XXfoo").await);
    pump_until(&mut link, |link| {
        link.host().messages(Level::Error).len() == 2
    })
    .await;
    assert!(link.host().messages(Level::Error)[1].contains("command name error"));
    assert!(link.is_connected());
}

#[tokio::test]
async fn actions_are_encoded_on_the_wire() {
    let vio = FakeVio::start(vio_4k(1)).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    let actions = [
        Action::RecallViewAndInput { view: 5, input: 3 },
        Action::RecallPreset(2),
        Action::Take,
        Action::TestPattern {
            output: 0,
            pattern: 9,
        },
    ];
    for action in &actions {
        assert_eq!(link.execute(action).await, Ok(true));
    }
    assert!(link.execute(&Action::RecallView(65)).await.is_err());

    vio.wait_for(|received| received.len() == 7).await;
    assert_eq!(
        vio.received()[3..],
        ["4,03,1PBrcr", "1,1PKrcr", "1PCrpr", "0,9OUpat"]
    );
}

#[tokio::test]
async fn unreachable_device_drops_commands() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut link = Builder::new()
        .host(addr.ip().to_string())
        .port(addr.port())
        .build(RecordingHost::default());

    assert!(!link.send("1PCrpr").await);
    assert_eq!(link.state(), LinkState::Error);
    assert!(!link.send("1PFfal").await);
    assert!(!link.is_connected());

    let errors = link.host().messages(Level::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.starts_with("Network error")));

    // once the device is reachable, only new commands arrive
    let vio = FakeVio::start_on(addr, vio_4k(1)).await.unwrap();
    assert!(link.send("1PCpum").await);
    vio.wait_for(|received| received.len() >= 2).await;
    assert_eq!(vio.received(), vec!["", "1PCpum"]);
    assert_eq!(vio.connections(), 1);
}

#[tokio::test]
async fn lines_after_a_self_close_are_discarded() {
    let vio = FakeVio::start(|command: &str| match command {
        "" => vec!["TPcon5".to_string(), "TPcon2".to_string(), "E13".to_string()],
        _ => vec![],
    })
    .await
    .unwrap();
    let mut link = link_to(&vio);
    link.connect().await.unwrap();
    pump_until(&mut link, |link| !link.is_connected()).await;

    let errors = link.host().messages(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("got 5"), "{}", errors[0]);
    assert!(link.host().messages(Level::Info).is_empty());
    assert_eq!(link.state(), LinkState::Idle);
    assert_eq!(vio.received(), vec![""]);
    assert_eq!(vio.connections(), 1);
}

#[tokio::test]
async fn changed_target_reconnects() {
    let first = FakeVio::start(vio_4k(1)).await.unwrap();
    let second = FakeVio::start(vio_4k(1)).await.unwrap();
    let mut link = link_to(&first);
    handshake(&mut link).await;

    let mut config = link.config().clone();
    config.port = second.addr().port();
    link.update_config(config).await;
    pump_until(&mut link, |link| {
        link.identity().command_set_version().is_some()
    })
    .await;

    assert!(link.send("1PFfal").await);
    second
        .wait_for(|received| received.iter().any(|c| c == "1PFfal"))
        .await;
    assert_eq!(first.received(), vec!["", "?", "0,TPver"]);
    assert_eq!(second.connections(), 1);
}

#[tokio::test]
async fn clearing_the_host_closes_the_link() {
    let vio = FakeVio::start(vio_4k(1)).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    let mut config = link.config().clone();
    config.host = String::new();
    link.update_config(config).await;

    assert!(!link.is_connected());
    assert_eq!(link.state(), LinkState::Idle);
    assert_eq!(vio.connections(), 1);
}

#[tokio::test]
async fn teardown_stops_the_link() {
    let vio = FakeVio::start(vio_4k(1)).await.unwrap();
    let mut link = link_to(&vio);
    handshake(&mut link).await;

    link.destroy().await;
    link.teardown().await;
    assert!(!link.is_connected());
    assert_eq!(link.state(), LinkState::Idle);

    let idle_reports = link
        .host()
        .states
        .iter()
        .filter(|(state, _)| *state == LinkState::Idle)
        .count();
    assert_eq!(idle_reports, 1);
}
