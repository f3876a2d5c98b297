// Integration tests for the local notification store
//
// Persistence round-trips through a JSON file in a temp directory; the
// subscribe channel must reflect every mutation, newest first.

use voice_sos::audio::{AudioArtifact, StopReason};
use voice_sos::incident::Incident;
use voice_sos::store::{IncidentPatch, LocalStore, NotificationStore};

fn incident(user_id: &str, transcript: &str) -> Incident {
    let artifact = AudioArtifact::from_samples(
        &vec![500i16; 1600],
        16000,
        1,
        StopReason::SilenceTimeout,
    )
    .unwrap();
    Incident::from_artifact(&artifact, transcript, None, user_id)
}

#[tokio::test]
async fn test_incidents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("incidents.json");

    let first_id;
    {
        let store = LocalStore::open(&path).unwrap();
        store.create(incident("user-1", "help me")).await.unwrap();
        first_id = store.create(incident("user-1", "sos")).await.unwrap();
    }

    let reopened = LocalStore::open(&path).unwrap();
    let snapshot = reopened.subscribe().await.borrow().clone();

    assert_eq!(snapshot.len(), 2);
    // newest first, across restarts too
    assert_eq!(snapshot[0].id, first_id);
    assert_eq!(snapshot[0].incident.transcription, "sos");
    assert_eq!(snapshot[1].incident.transcription, "help me");
}

#[tokio::test]
async fn test_subscribers_see_new_incidents() {
    let store = LocalStore::new();
    let mut feed = store.subscribe().await;
    assert!(feed.borrow().is_empty());

    store.create(incident("user-2", "emergency")).await.unwrap();

    feed.changed().await.unwrap();
    let snapshot = feed.borrow().clone();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].incident.user_id, "user-2");
    assert!(!snapshot[0].incident.responded);
}

#[tokio::test]
async fn test_oversized_audio_is_rejected() {
    let store = LocalStore::new();

    let mut big = incident("user-3", "help");
    big.audio_size = 800 * 1024;

    let err = store.create(big).await.unwrap_err();
    assert!(err.to_string().contains("too large"));

    let snapshot = store.subscribe().await.borrow().clone();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_respond_patch_marks_incident() {
    let store = LocalStore::new();
    let id = store.create(incident("user-4", "help")).await.unwrap();

    store
        .update(&id, IncidentPatch::responded_by("volunteer-9"))
        .await
        .unwrap();

    let snapshot = store.subscribe().await.borrow().clone();
    let stored = &snapshot[0].incident;
    assert!(stored.responded);
    assert_eq!(stored.responder_id.as_deref(), Some("volunteer-9"));
    assert!(stored.responded_at.is_some());

    // unknown ids are an error, not a silent no-op
    assert!(store
        .update("missing", IncidentPatch::responded_by("volunteer-9"))
        .await
        .is_err());
}
