//! Direct store queries: listing, updates, lookups and dashboard counts.

mod common;

use common::{code, sample_grievance, TestFixture};
use refuge::model::{GrievanceStatus, GrievanceType, GrievanceUpdate, Locale, NewGrievance};
use refuge::now_millis;
use refuge::service::admin::load_stats;
use refuge::storage::{grievances, questionnaires};
use tokio_test::assert_ok;

async fn seed(fixture: &TestFixture, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let id = assert_ok!(
            grievances::insert(fixture.store(), &sample_grievance(&code(n)), now_millis()).await
        );
        ids.push(id);
    }
    ids
}

#[tokio::test]
async fn test_list_paginates_newest_first() {
    let fixture = TestFixture::new().await;
    seed(&fixture, 25).await;

    let page = grievances::list(fixture.store(), None, 2, 10).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.data.len(), 10);

    let last = grievances::list(fixture.store(), None, 3, 10).await.unwrap();
    assert_eq!(last.data.len(), 5);
    // The oldest row closes the last page.
    assert_eq!(last.data[4].tracking_code, code(0));

    let beyond = grievances::list(fixture.store(), None, 9, 10).await.unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn test_update_status_and_filter() {
    let fixture = TestFixture::new().await;
    let ids = seed(&fixture, 3).await;

    let changed = grievances::update(
        fixture.store(),
        ids[1],
        &GrievanceUpdate {
            status: Some(GrievanceStatus::Resolved),
            admin_notes: Some("referred to shelter".into()),
        },
    )
    .await
    .unwrap();
    assert!(changed);

    let resolved = grievances::list(fixture.store(), Some(GrievanceStatus::Resolved), 1, 20)
        .await
        .unwrap();
    assert_eq!(resolved.total, 1);
    let record = &resolved.data[0];
    assert_eq!(record.id, ids[1]);
    assert_eq!(record.admin_notes.as_deref(), Some("referred to shelter"));
    assert!(record.status_updated_at.is_some());

    let submitted = grievances::list(fixture.store(), Some(GrievanceStatus::Submitted), 1, 20)
        .await
        .unwrap();
    assert_eq!(submitted.total, 2);
}

#[tokio::test]
async fn test_notes_only_update_keeps_status() {
    let fixture = TestFixture::new().await;
    let ids = seed(&fixture, 1).await;

    grievances::update(
        fixture.store(),
        ids[0],
        &GrievanceUpdate {
            status: None,
            admin_notes: Some("left a voicemail".into()),
        },
    )
    .await
    .unwrap();

    let page = grievances::list(fixture.store(), None, 1, 20).await.unwrap();
    assert_eq!(page.data[0].status, GrievanceStatus::Submitted);
    assert!(page.data[0].status_updated_at.is_none());
    assert_eq!(page.data[0].admin_notes.as_deref(), Some("left a voicemail"));
}

#[tokio::test]
async fn test_update_missing_id_reports_no_match() {
    let fixture = TestFixture::new().await;
    seed(&fixture, 1).await;

    let changed = grievances::update(
        fixture.store(),
        9_999,
        &GrievanceUpdate {
            status: Some(GrievanceStatus::Closed),
            admin_notes: None,
        },
    )
    .await
    .unwrap();
    assert!(!changed);
}

#[tokio::test]
async fn test_tracking_lookup_ignores_case_and_whitespace() {
    let fixture = TestFixture::new().await;
    seed(&fixture, 1).await;

    let lookup = format!("  {}  ", code(0).to_lowercase());
    let found = grievances::find_by_tracking_code(fixture.store(), &lookup)
        .await
        .unwrap()
        .expect("grievance should be found");

    assert_eq!(found.tracking_code, code(0));
    assert_eq!(found.grievance_type, GrievanceType::Harassment);
    assert_eq!(found.status, GrievanceStatus::Submitted);
    assert!(found.is_anonymous);

    let missing = grievances::find_by_tracking_code(fixture.store(), "NOPE23456789")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_anonymous_grievance_stores_no_identity() {
    let fixture = TestFixture::new().await;
    let grievance = NewGrievance {
        complainant_name: Some("Layla".into()),
        complainant_email: Some("layla@example.org".into()),
        complainant_phone: Some("+961 1 234 567".into()),
        is_anonymous: true,
        ..sample_grievance(&code(1))
    }
    .anonymized();

    grievances::insert(fixture.store(), &grievance, now_millis())
        .await
        .unwrap();

    let page = grievances::list(fixture.store(), None, 1, 20).await.unwrap();
    let record = &page.data[0];
    assert!(record.is_anonymous);
    assert!(record.complainant_name.is_none());
    assert!(record.complainant_email.is_none());
    assert!(record.complainant_phone.is_none());
    assert_eq!(record.village_id.as_deref(), Some("11"));
}

#[tokio::test]
async fn test_identified_grievance_keeps_contact_details() {
    let fixture = TestFixture::new().await;
    let grievance = NewGrievance {
        complainant_name: Some("Layla".into()),
        complainant_phone: Some("+961 1 234 567".into()),
        is_anonymous: false,
        grievance_type: GrievanceType::EconomicAbuse,
        preferred_language: Locale::Fr,
        ..sample_grievance(&code(1))
    }
    .anonymized();

    grievances::insert(fixture.store(), &grievance, now_millis())
        .await
        .unwrap();

    let page = grievances::list(fixture.store(), None, 1, 20).await.unwrap();
    let record = &page.data[0];
    assert_eq!(record.complainant_name.as_deref(), Some("Layla"));
    assert_eq!(record.grievance_type, GrievanceType::EconomicAbuse);
    assert_eq!(record.preferred_language, Locale::Fr);
}

#[tokio::test]
async fn test_submission_time_is_preserved() {
    let fixture = TestFixture::new().await;
    // 2026-01-01T00:00:00Z
    grievances::insert(fixture.store(), &sample_grievance(&code(1)), 1_767_225_600_000)
        .await
        .unwrap();

    let page = grievances::list(fixture.store(), None, 1, 20).await.unwrap();
    assert_eq!(page.data[0].created_at, "2026-01-01 00:00:00");
}

#[tokio::test]
async fn test_stats_and_recent() {
    let fixture = TestFixture::new().await;
    let ids = seed(&fixture, 7).await;

    for (id, status) in [
        (ids[0], GrievanceStatus::UnderReview),
        (ids[1], GrievanceStatus::InProgress),
        (ids[2], GrievanceStatus::Resolved),
        (ids[3], GrievanceStatus::Closed),
    ] {
        grievances::update(
            fixture.store(),
            id,
            &GrievanceUpdate {
                status: Some(status),
                admin_notes: None,
            },
        )
        .await
        .unwrap();
    }
    questionnaires::insert(fixture.store(), &serde_json::json!({"q1": "yes"}), now_millis())
        .await
        .unwrap();

    let stats = load_stats(fixture.store()).await.unwrap();
    assert_eq!(stats.total, 7);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.under_review, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.questionnaires, 1);

    let recent = grievances::recent(fixture.store(), 5).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].tracking_code, code(6));
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let fixture = TestFixture::new().await;
    let stats = load_stats(fixture.store()).await.unwrap();
    assert_eq!(stats, Default::default());
}

#[tokio::test]
async fn test_questionnaire_list_returns_parsed_json() {
    let fixture = TestFixture::new().await;
    questionnaires::insert(
        fixture.store(),
        &serde_json::json!({"age_group": "25-34", "services": ["legal", "health"]}),
        now_millis(),
    )
    .await
    .unwrap();
    questionnaires::insert(fixture.store(), &serde_json::json!({"age_group": "18-24"}), now_millis())
        .await
        .unwrap();

    let records = questionnaires::list(fixture.store()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].response_data["age_group"], "18-24");
    assert_eq!(records[1].response_data["services"][1], "health");
    assert_eq!(questionnaires::count(fixture.store()).await.unwrap(), 2);
}
