mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingAudio, controller, poi};
use tokio_test::{assert_err, assert_ok};
use tourcontrol::{
    LoadOutcome, PlayPauseOutcome, PlaybackController, PlaybackEvent, PlaybackSettings, PoiId,
    SimulatedAudio, TourError,
};

const EPSILON: f64 = 1e-6;

#[tokio::test]
async fn test_seek_sets_position_and_progress() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;

    for fraction in [0.0, 0.25, 0.5, 0.731, 1.0] {
        let position = player.seek(fraction).await?;
        let session = player.snapshot();

        assert!((position - fraction * 900.0).abs() < EPSILON);
        assert!((session.position_seconds - fraction * 900.0).abs() < EPSILON);
        assert!((session.progress_fraction - fraction).abs() < EPSILON);
    }

    Ok(())
}

#[tokio::test]
async fn test_skip_round_trip_and_clamping() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;

    player.seek(0.5).await?;
    assert_eq!(player.skip(10.0).await?, 460.0);
    assert_eq!(player.skip(-10.0).await?, 450.0);

    player.seek(5.0 / 900.0).await?;
    assert_eq!(player.skip(-10.0).await?, 0.0);
    assert_eq!(player.snapshot().progress_fraction, 0.0);

    player.seek(1.0).await?;
    assert_eq!(player.skip(10.0).await?, 900.0);
    assert_eq!(player.snapshot().progress_fraction, 1.0);

    Ok(())
}

#[tokio::test]
async fn test_loading_another_poi_releases_the_previous_handle() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);

    player.load(&poi("cn-tower")).await?;
    let first = player.audio_handle().await;
    player.load(&poi("rogers-centre")).await?;
    let second = player.audio_handle().await;

    assert_eq!(audio.open_handles(), 1);
    assert_eq!(audio.acquired(), 2);
    assert_eq!(audio.released(), 1);
    assert_ne!(first, second);
    assert!(player.snapshot().is_bound_to(&PoiId::new("rogers-centre")));
    assert_eq!(player.snapshot().duration_seconds, 600.0);

    Ok(())
}

#[tokio::test]
async fn test_first_play_pause_after_failed_load_only_loads() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);

    audio.fail_next_acquires(1);
    let err = assert_err!(player.load(&poi("cn-tower")).await);
    assert!(err.is_retryable());
    assert!(!player.snapshot().is_loading);
    assert_eq!(player.audio_handle().await, None);

    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Loaded);
    let handle = player.audio_handle().await.expect("audio loaded");
    assert!(!player.snapshot().is_playing);
    assert!(!audio.is_playing(handle));
    assert!(!player.is_polling());

    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Playing);
    assert!(player.snapshot().is_playing);
    assert!(audio.is_playing(handle));
    assert!(player.is_polling());

    Ok(())
}

#[tokio::test]
async fn test_pause_cancels_polling() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;

    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Playing);
    assert!(player.is_polling());

    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Paused);
    assert!(!player.is_polling());
    assert!(!player.snapshot().is_playing);

    // Playing again starts exactly one new poller
    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Playing);
    assert!(player.is_polling());

    Ok(())
}

#[tokio::test]
async fn test_play_applies_speed_before_starting() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);

    assert_ok!(player.set_speed(1.5).await);
    player.load(&poi("cn-tower")).await?;
    player.play_pause().await?;

    let handle = player.audio_handle().await.expect("audio loaded");
    assert_eq!(audio.rate(handle), Some(1.5));

    let calls = audio.calls();
    let rate_at = calls.iter().rposition(|c| c == "set_rate").unwrap();
    let play_at = calls.iter().rposition(|c| c == "play").unwrap();
    assert!(rate_at < play_at);

    assert_eq!(player.cycle_speed().await?, 1.0);
    assert_eq!(player.cycle_speed().await?, 2.0);
    assert_eq!(audio.rate(handle), Some(2.0));
    assert_eq!(player.snapshot().speed_multiplier, 2.0);

    Ok(())
}

#[tokio::test]
async fn test_mute_is_applied_on_load() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    let events = player.subscribe();

    assert!(player.toggle_mute().await?);
    player.load(&poi("cn-tower")).await?;
    let handle = player.audio_handle().await.expect("audio loaded");
    assert_eq!(audio.volume(handle), Some(0.0));

    assert!(!player.toggle_mute().await?);
    assert_eq!(audio.volume(handle), Some(1.0));

    let mutes: Vec<PlaybackEvent> = events
        .try_iter()
        .filter(|e| matches!(e, PlaybackEvent::MuteChanged { .. }))
        .collect();
    assert_eq!(
        mutes,
        vec![
            PlaybackEvent::MuteChanged { muted: true },
            PlaybackEvent::MuteChanged { muted: false },
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_release_frees_audio_and_unbinds() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;
    player.play_pause().await?;

    player.release().await?;
    assert_eq!(audio.open_handles(), 0);
    assert!(!player.is_polling());
    assert!(!player.snapshot().is_bound());
    assert_eq!(player.play_pause().await, Err(TourError::NoActivePoi));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_superseded_load_is_discarded() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    audio.set_acquire_delay(Duration::from_millis(100));
    let player = controller(&audio);

    let slow = {
        let player = player.clone();
        tokio::spawn(async move { player.load(&poi("cn-tower")).await })
    };
    // Let the first load reach the backend before starting the second
    while !audio.calls().iter().any(|c| c.starts_with("acquire")) {
        tokio::task::yield_now().await;
    }

    let latest = player.load(&poi("rogers-centre")).await?;
    let stale = slow.await??;

    assert_eq!(stale, LoadOutcome::Superseded);
    assert_eq!(latest, LoadOutcome::Loaded { duration_seconds: 600.0 });
    assert_eq!(audio.open_handles(), 1);
    assert!(player.snapshot().is_bound_to(&PoiId::new("rogers-centre")));
    assert!(!player.snapshot().is_loading);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_polling_tracks_position_while_playing() -> anyhow::Result<()> {
    let audio = Arc::new(
        SimulatedAudio::new().with_asset("audio/cn-tower.mp3", Duration::from_secs(60)),
    );
    let player = PlaybackController::new(audio.clone(), PlaybackSettings::default());
    player.load(&poi("cn-tower")).await?;
    player.play_pause().await?;

    tokio::time::sleep(Duration::from_millis(2_050)).await;
    let session = player.snapshot();
    assert!((session.position_seconds - 2.0).abs() < 0.11);
    assert!((session.progress_fraction - 2.0 / 60.0).abs() < 0.01);

    player.play_pause().await?;
    let paused_at = player.snapshot().position_seconds;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(player.snapshot().position_seconds, paused_at);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_end_of_media_resets_position_and_keeps_audio() -> anyhow::Result<()> {
    let audio = Arc::new(
        SimulatedAudio::new().with_asset("audio/cn-tower.mp3", Duration::from_secs(5)),
    );
    let player = PlaybackController::new(audio.clone(), PlaybackSettings::default());
    let events = player.subscribe();

    player.load(&poi("cn-tower")).await?;
    player.play_pause().await?;
    tokio::time::sleep(Duration::from_secs(6)).await;

    let session = player.snapshot();
    assert!(!session.is_playing);
    assert_eq!(session.position_seconds, 0.0);
    assert_eq!(session.progress_fraction, 0.0);
    assert!(!player.is_polling());
    assert!(player.audio_handle().await.is_some());
    assert_eq!(audio.open_handles(), 1);

    let finished = events
        .try_iter()
        .filter(|e| matches!(e, PlaybackEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 1);

    // The narration can be replayed from the start
    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Playing);
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    assert!(player.snapshot().position_seconds > 0.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_release_queued_behind_loads_keeps_the_newest_binding() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    audio.set_acquire_delay(Duration::from_millis(100));
    let player = controller(&audio);
    let events = player.subscribe();
    let (cn_tower, rogers_centre) = (poi("cn-tower"), poi("rogers-centre"));

    // Polled in order on first poll: the first load holds the handle slot,
    // the release and the second load queue behind it.
    let (first, released, latest) = tokio::join!(
        player.load(&cn_tower),
        player.release(),
        player.load(&rogers_centre),
    );

    assert_eq!(first?, LoadOutcome::Superseded);
    assert_ok!(released);
    assert_eq!(latest?, LoadOutcome::Loaded { duration_seconds: 600.0 });

    let session = player.snapshot();
    assert!(player.audio_handle().await.is_some());
    assert_eq!(audio.open_handles(), 1);
    assert!(session.is_bound_to(&PoiId::new("rogers-centre")));
    assert_eq!(session.duration_seconds, 600.0);
    assert!(!session.is_loading);
    assert!(!events.try_iter().any(|e| e == PlaybackEvent::Released));

    Ok(())
}

#[tokio::test]
async fn test_failed_play_stays_paused_without_polling() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;
    let handle = player.audio_handle().await.expect("audio loaded");

    audio.fail_operation("play");
    let err = assert_err!(player.play_pause().await);
    assert!(matches!(err, TourError::AudioOperation(..)));
    assert!(!player.snapshot().is_playing);
    assert!(!player.is_polling());
    assert!(!audio.is_playing(handle));

    audio.restore_operation("play");
    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Playing);
    assert!(player.is_polling());

    Ok(())
}

#[tokio::test]
async fn test_failed_pause_keeps_playing_and_polling() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;
    player.play_pause().await?;
    let handle = player.audio_handle().await.expect("audio loaded");

    audio.fail_operation("pause");
    assert_err!(player.play_pause().await);
    assert!(player.snapshot().is_playing);
    assert!(player.is_polling());
    assert!(audio.is_playing(handle));

    audio.restore_operation("pause");
    assert_eq!(player.play_pause().await?, PlayPauseOutcome::Paused);
    assert!(!player.is_polling());

    Ok(())
}

#[tokio::test]
async fn test_failed_seek_and_skip_keep_position() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    let events = player.subscribe();
    player.load(&poi("cn-tower")).await?;
    player.seek(0.25).await?;

    audio.fail_operation("seek");
    assert_err!(player.seek(0.75).await);
    assert_err!(player.skip(10.0).await);

    let session = player.snapshot();
    assert_eq!(session.position_seconds, 225.0);
    assert_eq!(session.progress_fraction, 0.25);

    let errors = events
        .try_iter()
        .filter(|e| matches!(e, PlaybackEvent::Error { .. }))
        .count();
    assert_eq!(errors, 2);

    Ok(())
}

#[tokio::test]
async fn test_skip_falls_back_to_session_position() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;
    player.seek(0.5).await?;

    audio.fail_operation("status");
    assert_eq!(player.skip(-10.0).await?, 440.0);

    Ok(())
}

#[tokio::test]
async fn test_failed_volume_and_rate_keep_preferences() -> anyhow::Result<()> {
    let audio = CountingAudio::new();
    let player = controller(&audio);
    player.load(&poi("cn-tower")).await?;
    let handle = player.audio_handle().await.expect("audio loaded");

    audio.fail_operation("set_volume");
    assert_err!(player.toggle_mute().await);
    assert!(!player.snapshot().is_muted);
    assert_eq!(audio.volume(handle), Some(1.0));

    audio.fail_operation("set_rate");
    assert_err!(player.set_speed(2.0).await);
    assert_eq!(player.snapshot().speed_multiplier, 1.0);
    assert_err!(player.play_pause().await);
    assert!(!player.snapshot().is_playing);
    assert!(!player.is_polling());

    Ok(())
}
