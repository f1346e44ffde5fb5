//! BDD-style tests for applying desired state through the binary's handlers.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use smarthome::commands::{apply_desired, open_home};
use smarthome::config::AppConfig;
use smarthome::desired::DesiredState;

fn fast_config(state_dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default().with_state_dir(Some(state_dir.path().to_path_buf()));
    config.actuator.tick_interval = Duration::ZERO;
    config.reconciler.requeue_after = Duration::from_millis(1);
    config
}

#[tokio::test]
async fn given_desired_file_when_applied_then_state_persisted_for_next_run() {
    // Given: An empty state directory and a declaration for two shutters and a light
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(&dir);
    let desired = DesiredState::parse(
        "[shutters]\nkitchen = 43\nbedroom = 100\n\n[lights]\nporch = true\n",
    )
    .unwrap();

    // When: Applying it and closing the home
    let home = open_home(&config).await.unwrap();
    let report = timeout(Duration::from_secs(2), apply_desired(&home, &desired, &config))
        .await
        .unwrap()
        .unwrap();
    home.close().await;

    // Then: Every shutter converged
    assert!(report.all_converged());
    assert_eq!(report.outcomes["kitchen"].observed_current, Some(43));

    // And: A fresh run sees the same positions and switches
    let reopened = open_home(&config).await.unwrap();
    let shutters = reopened.shutters().list().await;
    let positions = shutters
        .iter()
        .map(|s| (s.name.as_str(), s.current, s.target, s.moving))
        .collect::<Vec<_>>();
    assert_eq!(
        positions,
        vec![("bedroom", 100, 100, false), ("kitchen", 43, 43, false)]
    );
    assert!(reopened.lights().get("porch").await.on);
    reopened.close().await;
}

#[tokio::test]
async fn given_invalid_position_when_applied_then_others_still_converge() {
    // Given: One valid and one out-of-range shutter
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(&dir);
    let desired = DesiredState::parse("[shutters]\nhall = 20\nattic = 101\n").unwrap();

    // When: Applying it
    let home = open_home(&config).await.unwrap();
    let report = timeout(Duration::from_secs(2), apply_desired(&home, &desired, &config))
        .await
        .unwrap()
        .unwrap();

    // Then: The valid shutter arrived and the invalid one is reported, not created
    assert_eq!(report.outcomes["hall"].observed_current, Some(20));
    let rejected = report.rejected().map(|(name, _)| name).collect::<Vec<_>>();
    assert_eq!(rejected, vec!["attic"]);
    assert!(home.shutters().get("attic").await.is_none());
    home.close().await;
}

#[tokio::test]
async fn given_persisted_shutter_when_reopened_then_resumes_at_rest() {
    // Given: A state file written by an earlier run
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("shutters.json"),
        r#"[{"Name":"study","Target":70,"Current":64,"Moving":true}]"#,
    )
    .unwrap();
    let config = fast_config(&dir);

    // When: Opening the home
    let home = open_home(&config).await.unwrap();
    let state = home.shutters().get("study").await.unwrap().snapshot().await;

    // Then: The shutter rests where it physically was
    assert_eq!((state.current, state.target, state.moving), (64, 64, false));
    home.close().await;
}
