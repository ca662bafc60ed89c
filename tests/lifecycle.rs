//! Submission lifecycle properties, driven through the engine.

use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempDir;

use nazm::blob::MemoryBlobStore;
use nazm::engine::{
    EngineConfig, EngineError, NazmEngine, NewAccount, NewVerse, PageRequest, SubmissionDraft,
    SubmissionFilter, UploadedFile,
};
use nazm::model::{ArazStatus, Submission, SubmissionMethod, SubmissionType, User};

struct Harness {
    _dir: TempDir,
    blobs: Arc<MemoryBlobStore>,
    engine: NazmEngine,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let blobs = Arc::new(MemoryBlobStore::new());
    let engine = NazmEngine::open(EngineConfig::new(dir.path().to_path_buf()), blobs.clone())
        .await
        .unwrap();
    Harness {
        _dir: dir,
        blobs,
        engine,
    }
}

async fn register(engine: &mut NazmEngine, name: &str) -> User {
    engine
        .register(NewAccount {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "password123".to_string(),
            country: "Pakistan".to_string(),
        })
        .await
        .unwrap()
}

fn manual(kind: SubmissionType, content: &str) -> SubmissionDraft {
    SubmissionDraft {
        kind,
        submission_method: SubmissionMethod::Manual,
        language: "English".to_string(),
        content: Some(content.to_string()),
        inspired_by: None,
    }
}

async fn approved(engine: &mut NazmEngine, author: &User, kind: SubmissionType) -> Submission {
    let sub = engine
        .create_submission(author, manual(kind, "x"), None)
        .await
        .unwrap();
    engine.approve(sub.id, true).await.unwrap()
}

fn araz_file(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        bytes: Bytes::from_static(b"notes"),
    }
}

async fn all_submissions(engine: &NazmEngine) -> Vec<Submission> {
    engine
        .list_submissions(
            &SubmissionFilter::default(),
            PageRequest::new(Some(1), Some(100)).unwrap(),
        )
        .await
        .unwrap()
        .items
}

#[tokio::test]
async fn manual_submission_starts_pending() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;

    let sub = h
        .engine
        .create_submission(&author, manual(SubmissionType::Individual, "x"), None)
        .await
        .unwrap();

    assert_eq!(sub.status, ArazStatus::Pending);
    assert!(!sub.approved);
    assert_eq!(sub.author.user_id, author.id);
    assert_eq!(sub.author.name, "Amina");

    let fetched = h.engine.get_submission(sub.id).await.unwrap();
    assert_eq!(fetched.content.as_deref(), Some("x"));
}

#[tokio::test]
async fn repeated_approval_counts_once() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;
    let sub = h
        .engine
        .create_submission(&author, manual(SubmissionType::Full, "x"), None)
        .await
        .unwrap();

    h.engine.approve(sub.id, true).await.unwrap();
    h.engine.approve(sub.id, true).await.unwrap();

    let profile = h.engine.poet_profile(author.id).await.unwrap();
    assert_eq!(profile.poems_count, 1);

    let sub = h.engine.get_submission(sub.id).await.unwrap();
    assert_eq!(sub.status, ArazStatus::Done);
}

#[tokio::test]
async fn rating_bounds_and_approval_gate() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;

    let pending = h
        .engine
        .create_submission(&author, manual(SubmissionType::Individual, "x"), None)
        .await
        .unwrap();
    assert!(matches!(
        h.engine.rate(pending.id, 3.0).await,
        Err(EngineError::InvalidSubmissionState(_))
    ));
    assert!(h.engine.get_submission(pending.id).await.unwrap().rating.is_none());

    let sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;
    for bad in [0.3, 5.5, 1.3] {
        assert!(
            matches!(h.engine.rate(sub.id, bad).await, Err(EngineError::Validation(_))),
            "rating {bad} should be rejected"
        );
    }
    for good in [0.5, 2.5, 5.0] {
        let rated = h.engine.rate(sub.id, good).await.unwrap();
        assert_eq!(rated.rating.map(|r| r.stars()), Some(good));
    }
}

#[tokio::test]
async fn rerating_replaces_points() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;
    let sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;

    h.engine.rate(sub.id, 4.0).await.unwrap();
    assert_eq!(h.engine.poet_profile(author.id).await.unwrap().points, 80);

    h.engine.rate(sub.id, 2.5).await.unwrap();
    assert_eq!(h.engine.poet_profile(author.id).await.unwrap().points, 50);
}

#[tokio::test]
async fn unapproval_clears_rating_araz_and_profile() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;
    let sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;

    h.engine.rate(sub.id, 5.0).await.unwrap();
    let with_araz = h
        .engine
        .add_araz(sub.id, Some("Well metered".into()), Some(araz_file("notes.txt")))
        .await
        .unwrap();
    let araz_path = with_araz.araz_file_name.clone().unwrap();
    assert!(h.blobs.contains(&araz_path).await);
    h.engine.feature(sub.id, true).await.unwrap();

    let sub = h.engine.approve(sub.id, false).await.unwrap();

    assert!(!sub.approved);
    assert_eq!(sub.status, ArazStatus::Pending);
    assert!(sub.rating.is_none());
    assert!(sub.araz_content.is_none());
    assert!(sub.araz_file_name.is_none());
    assert!(!sub.featured);
    assert!(!h.blobs.contains(&araz_path).await);
    assert!(h.engine.featured_submission().await.unwrap().is_none());

    let profile = h.engine.poet_profile(author.id).await.unwrap();
    assert_eq!(profile.points, 0);
    assert_eq!(profile.poems_count, 0);
}

#[tokio::test]
async fn araz_requires_approval_and_input() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;

    let pending = h
        .engine
        .create_submission(&author, manual(SubmissionType::Individual, "x"), None)
        .await
        .unwrap();
    let result = h
        .engine
        .add_araz(pending.id, None, Some(araz_file("notes.pdf")))
        .await;
    assert!(matches!(result, Err(EngineError::InvalidSubmissionState(_))));
    assert!(h.blobs.paths().await.is_empty());

    let sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;
    let result = h.engine.add_araz(sub.id, Some("  ".into()), None).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    let sub = h
        .engine
        .add_araz(sub.id, None, Some(araz_file("notes.pdf")))
        .await
        .unwrap();
    assert_eq!(
        sub.araz_file_name,
        Some(format!("poems/{}/araz/notes.pdf", sub.id))
    );
    assert!(sub.araz_content.is_none());

    for s in all_submissions(&h.engine).await {
        if !s.approved {
            assert!(s.araz_content.is_none() && s.araz_file_name.is_none());
            assert!(s.rating.is_none());
        }
    }
}

#[tokio::test]
async fn featuring_keeps_a_single_winner() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;
    let a = approved(&mut h.engine, &author, SubmissionType::Individual).await;
    let b = approved(&mut h.engine, &author, SubmissionType::Full).await;

    h.engine.feature(a.id, true).await.unwrap();
    h.engine.feature(b.id, true).await.unwrap();
    // Re-featuring the holder keeps it featured.
    h.engine.feature(b.id, true).await.unwrap();

    let featured: Vec<_> = all_submissions(&h.engine)
        .await
        .into_iter()
        .filter(|s| s.featured)
        .collect();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].id, b.id);
    assert!(featured[0].featured_date.is_some());

    let current = h.engine.featured_submission().await.unwrap().unwrap();
    assert_eq!(current.id, b.id);

    h.engine.feature(b.id, false).await.unwrap();
    assert!(h.engine.featured_submission().await.unwrap().is_none());
    assert!(all_submissions(&h.engine).await.iter().all(|s| !s.featured));
}

#[tokio::test]
async fn featuring_requires_approval() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;
    let sub = h
        .engine
        .create_submission(&author, manual(SubmissionType::Individual, "x"), None)
        .await
        .unwrap();

    assert!(matches!(
        h.engine.feature(sub.id, true).await,
        Err(EngineError::InvalidSubmissionState(_))
    ));
    assert!(h.engine.featured_submission().await.unwrap().is_none());
}

#[tokio::test]
async fn leaderboard_groups_by_author() {
    let mut h = harness().await;
    let a = register(&mut h.engine, "Amina").await;
    let b = register(&mut h.engine, "Bilal").await;

    for (author, stars) in [(&a, 5.0), (&b, 3.0), (&a, 5.0)] {
        let sub = approved(&mut h.engine, author, SubmissionType::Individual).await;
        h.engine.rate(sub.id, stars).await.unwrap();
    }
    // Other type and unapproved work stays out.
    approved(&mut h.engine, &b, SubmissionType::Full).await;
    h.engine
        .create_submission(&b, manual(SubmissionType::Individual, "draft"), None)
        .await
        .unwrap();

    let entries = h.engine.leaderboard(SubmissionType::Individual).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].author_name, "Amina");
    assert_eq!(entries[0].total_stars, 10.0);
    assert_eq!(entries[0].submission_count, 2);
    assert_eq!(entries[1].author_name, "Bilal");
    assert_eq!(entries[1].total_stars, 3.0);
    assert_eq!(entries[1].submission_count, 1);
}

#[tokio::test]
async fn best_orders_by_rating() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;

    let mut ids = Vec::new();
    for stars in [2.0, 4.5, 3.0, 4.5] {
        let sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;
        h.engine.rate(sub.id, stars).await.unwrap();
        ids.push(sub.id);
    }
    approved(&mut h.engine, &author, SubmissionType::Individual).await;

    let best = h.engine.best_submissions(3).await.unwrap();
    let best_ids: Vec<_> = best.iter().map(|s| s.id).collect();
    assert_eq!(best_ids, vec![ids[1], ids[3], ids[2]]);
}

#[tokio::test]
async fn download_follows_artifact_order() {
    let mut h = harness().await;
    let author = register(&mut h.engine, "Amina").await;

    let manual_sub = approved(&mut h.engine, &author, SubmissionType::Individual).await;
    assert!(matches!(
        h.engine.download(manual_sub.id).await,
        Err(EngineError::Validation(_))
    ));

    // A manual poem with an araz file downloads the araz file.
    h.engine
        .add_araz(manual_sub.id, None, Some(araz_file("review.txt")))
        .await
        .unwrap();
    let link = h.engine.download(manual_sub.id).await.unwrap();
    assert!(link.url.starts_with(&format!("memory://poems/{}/araz/review.txt", manual_sub.id)));

    let upload = SubmissionDraft {
        kind: SubmissionType::Full,
        submission_method: SubmissionMethod::Upload,
        language: "Urdu".to_string(),
        content: None,
        inspired_by: None,
    };
    let file = UploadedFile {
        file_name: "ghazal.docx".to_string(),
        bytes: Bytes::from_static(b"PK"),
    };
    let sub = h
        .engine
        .create_submission(&author, upload, Some(file))
        .await
        .unwrap();
    let link = h.engine.download(sub.id).await.unwrap();
    assert!(link.url.starts_with(&format!("memory://poems/{}/ghazal.docx", sub.id)));
    assert!(link.expires_at > chrono::Utc::now());
}

#[tokio::test]
async fn verse_catalog_rules() {
    let mut h = harness().await;

    let verse = |day: i64, language: &str| NewVerse {
        content: "Opening line".to_string(),
        day,
        language: language.to_string(),
        author: None,
    };

    assert!(matches!(
        h.engine.create_verse(verse(11, "French")).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        h.engine.create_verse(verse(5, "Klingon")).await,
        Err(EngineError::Validation(_))
    ));
    let created = h.engine.create_verse(verse(5, "French")).await.unwrap();

    // Submissions may cite it.
    let author = register(&mut h.engine, "Amina").await;
    let mut draft = manual(SubmissionType::Individual, "reply");
    draft.inspired_by = Some(created.id.to_string());
    let sub = h.engine.create_submission(&author, draft, None).await.unwrap();
    assert_eq!(sub.inspired_by, Some(created.id));
}
