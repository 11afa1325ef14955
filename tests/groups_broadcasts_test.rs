mod common;

use common::*;
use portal_messaging::models::direct_conversation_id;
use reqwest::StatusCode;

async fn create_group(app: &TestApp, name: &str, member_ids: &[uuid::Uuid]) -> serde_json::Value {
    let resp = app
        .post("/conversations/groups", DANA_TOKEN)
        .json(&serde_json::json!({ "name": name, "member_ids": member_ids }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn group_creation_is_staff_only() {
    let app = TestApp::spawn().await;

    let by_student = app
        .post("/conversations/groups", AMINA_TOKEN)
        .json(&serde_json::json!({ "name": "Paris cohort", "member_ids": [app.bogdan.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_student.status(), StatusCode::FORBIDDEN);

    let group = create_group(&app, "Paris cohort", &[app.amina.id, app.bogdan.id]).await;
    assert_eq!(group["kind"], "group");
    assert_eq!(group["title"], "Paris cohort");
    // Creator is always a member.
    let members = group["members"].as_array().unwrap();
    assert_eq!(members.len(), 3);
}

#[tokio::test]
async fn group_membership_add_is_idempotent_and_late_joiners_see_history_unread() {
    let app = TestApp::spawn().await;
    let group = create_group(&app, "Lisbon cohort", &[app.amina.id]).await;
    let group_id = group["id"].as_str().unwrap().to_string();

    app.send_text(DANA_TOKEN, &group_id, "welcome packet attached").await;

    // Chen joins after the message existed; it is unread for them.
    let add = app
        .post(&format!("/conversations/{group_id}/members"), DANA_TOKEN)
        .json(&serde_json::json!({ "member_ids": [app.chen.id, app.chen.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(add.status(), StatusCode::OK);
    let updated: serde_json::Value = add.json().await.unwrap();
    assert_eq!(updated["members"].as_array().unwrap().len(), 3);
    assert_eq!(app.unread(CHEN_TOKEN, &group_id).await, 1);

    // Re-adding an existing member changes nothing.
    let re_add = app
        .post(&format!("/conversations/{group_id}/members"), DANA_TOKEN)
        .json(&serde_json::json!({ "member_ids": [app.chen.id] }))
        .send()
        .await
        .unwrap();
    let same: serde_json::Value = re_add.json().await.unwrap();
    assert_eq!(same["members"].as_array().unwrap().len(), 3);
    assert_eq!(app.unread(CHEN_TOKEN, &group_id).await, 1);
}

#[tokio::test]
async fn only_groups_can_be_deleted() {
    let app = TestApp::spawn().await;
    let direct = app.open_direct(AMINA_TOKEN, app.bogdan.id).await;

    let direct_delete = app
        .delete(&format!("/conversations/{direct}"), AMINA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(direct_delete.status(), StatusCode::METHOD_NOT_ALLOWED);

    let group = create_group(&app, "Short-lived", &[app.amina.id]).await;
    let group_id = group["id"].as_str().unwrap();

    // A plain member cannot tear the group down.
    let by_member = app
        .delete(&format!("/conversations/{group_id}"), AMINA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(by_member.status(), StatusCode::FORBIDDEN);

    let by_creator = app
        .delete(&format!("/conversations/{group_id}"), DANA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(by_creator.status(), StatusCode::NO_CONTENT);

    let gone = app
        .get(&format!("/conversations/{group_id}"), DANA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn broadcast_fans_out_per_recipient_with_partial_success() {
    let app = TestApp::spawn().await;

    let by_student = app
        .post("/broadcasts", AMINA_TOKEN)
        .json(&serde_json::json!({ "name": "Visa deadline", "recipient_ids": [app.bogdan.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_student.status(), StatusCode::FORBIDDEN);

    // Dana lists herself as a recipient; that leg cannot be materialized and
    // must fail without dragging the others down.
    let created = app
        .post("/broadcasts", DANA_TOKEN)
        .json(&serde_json::json!({
            "name": "Visa deadline",
            "recipient_ids": [app.amina.id, app.bogdan.id, app.dana.id],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let broadcast: serde_json::Value = created.json().await.unwrap();
    let broadcast_id = broadcast["id"].as_str().unwrap().to_string();

    let report: serde_json::Value = app
        .post(&format!("/broadcasts/{broadcast_id}/send"), DANA_TOKEN)
        .json(&serde_json::json!({ "body": "Submit form DS-160 by Friday" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["delivered"].as_array().unwrap().len(), 2);
    let failures = report["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0]["recipient_id"].as_str().unwrap(),
        app.dana.id.to_string()
    );

    // Each leg is an ordinary two-party conversation from the recipient's side.
    let leg = direct_conversation_id(&app.amina.display_name, &app.dana.display_name);
    assert_eq!(app.unread(AMINA_TOKEN, &leg).await, 1);
    let leg_view: serde_json::Value = app
        .get(&format!("/conversations/{leg}"), AMINA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leg_view["kind"], "broadcast-leaf");

    // Replies stay private to the leg, invisible to sibling recipients.
    app.send_text(AMINA_TOKEN, &leg, "done already").await;
    let bogdan_leg = direct_conversation_id(&app.bogdan.display_name, &app.dana.display_name);
    assert_eq!(app.unread(BOGDAN_TOKEN, &bogdan_leg).await, 1);
}

#[tokio::test]
async fn resending_a_broadcast_duplicates_the_message() {
    let app = TestApp::spawn().await;
    let created: serde_json::Value = app
        .post("/broadcasts", DANA_TOKEN)
        .json(&serde_json::json!({ "name": "Reminder", "recipient_ids": [app.amina.id] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let broadcast_id = created["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = app
            .post(&format!("/broadcasts/{broadcast_id}/send"), DANA_TOKEN)
            .json(&serde_json::json!({ "body": "Orientation at 9am" }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let leg = direct_conversation_id(&app.amina.display_name, &app.dana.display_name);
    let history: serde_json::Value = app
        .get(&format!("/conversations/{leg}/messages"), AMINA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn broadcast_roster_grows_but_never_shrinks() {
    let app = TestApp::spawn().await;
    let created: serde_json::Value = app
        .post("/broadcasts", DANA_TOKEN)
        .json(&serde_json::json!({ "name": "Housing", "recipient_ids": [app.amina.id] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let broadcast_id = created["id"].as_str().unwrap().to_string();

    let grown: serde_json::Value = app
        .post(&format!("/broadcasts/{broadcast_id}/recipients"), DANA_TOKEN)
        .json(&serde_json::json!({ "recipient_ids": [app.bogdan.id, app.amina.id] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(grown["recipients"].as_array().unwrap().len(), 2);

    // Deleting the roster stops future sends but leaves delivered legs alone.
    app.post(&format!("/broadcasts/{broadcast_id}/send"), DANA_TOKEN)
        .json(&serde_json::json!({ "body": "lease signed" }))
        .send()
        .await
        .unwrap();
    let deleted = app
        .delete(&format!("/broadcasts/{broadcast_id}"), DANA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let resend = app
        .post(&format!("/broadcasts/{broadcast_id}/send"), DANA_TOKEN)
        .json(&serde_json::json!({ "body": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resend.status(), StatusCode::NOT_FOUND);

    let leg = direct_conversation_id(&app.amina.display_name, &app.dana.display_name);
    assert_eq!(app.unread(AMINA_TOKEN, &leg).await, 1);
}
