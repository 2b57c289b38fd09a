mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn health_returns_ok() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let resp = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

#[tokio::test]
async fn form_submission_persists_serialized_data() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [{ "name": "name", "label": "Name", "required": true }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let (body, status) = app.submit_form(form_id, &[("name", "Tester")]).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["post_ident"], Value::Null);

    let data: Value = sqlx::query_scalar("SELECT data FROM submissions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(
        data,
        json!([{ "name": "name", "label": "Name", "field_occurrence": 1, "value": "Tester" }])
    );
    assert_eq!(app.count_submissions(false).await, 1);
    assert_eq!(app.count_submissions(true).await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn validation_errors_are_reported_not_persisted() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [
                { "name": "name", "label": "Name", "required": true },
                { "name": "email", "label": "E-mail", "type": "email" },
            ],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let (body, status) = app.submit_json(form_id, &json!({ "email": "junk" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "ERROR");
    assert!(body["form"]["name"].as_array().is_some_and(|e| !e.is_empty()));
    assert!(body["form"]["email"].as_array().is_some_and(|e| !e.is_empty()));

    assert_eq!(app.count_submissions(false).await, 0);
    assert_eq!(app.count_submissions(true).await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn honeypot_submission_leaves_no_trace() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "honeypot_field": "website",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let (body, status) = app
        .submit_json(form_id, &json!({ "name": "Bot", "website": "http://spam.example" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUCCESS");

    assert_eq!(app.count_submissions(false).await, 0);
    assert_eq!(app.count_submissions(true).await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn multi_step_posts_share_one_pending_record() {
    let Some(app) = common::try_spawn_app_with(30).await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Survey",
            "multi_step": true,
            "fields": [{ "name": "answer", "label": "Answer" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let (body, status) = app.submit_json(form_id, &json!({ "answer": "one" })).await;
    assert_eq!(status, StatusCode::OK, "first step failed: {body}");
    let token = body["post_ident"].as_str().expect("no token returned").to_string();
    assert_eq!(token.len(), 64);

    let (body2, status2) = app
        .submit_json(
            form_id,
            &json!({ "answer": "two", "form_post_ident": token }),
        )
        .await;
    assert_eq!(status2, StatusCode::OK, "second step failed: {body2}");
    assert_eq!(body2["post_ident"].as_str(), Some(token.as_str()));

    assert_eq!(app.count_submissions(true).await, 1);
    assert_eq!(app.count_submissions(false).await, 0);

    let data: Value = sqlx::query_scalar("SELECT data FROM submissions WHERE pending")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let fields = data.as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["field_occurrence"], 1);
    assert_eq!(fields[0]["value"], "one");
    assert_eq!(fields[1]["field_occurrence"], 2);
    assert_eq!(fields[1]["value"], "two");

    common::cleanup(app).await;
}

#[tokio::test]
async fn finalize_sweep_delivers_webhook_exactly_once() {
    let Some(app) = common::try_spawn_app_with(30).await else {
        return;
    };
    let capture = common::spawn_capture_server().await;

    let webhook = app
        .create_webhook(&json!({ "name": "capture", "url": capture.url }))
        .await;
    let form = app
        .create_form(&json!({
            "name": "Survey",
            "multi_step": true,
            "fields": [{ "name": "answer", "label": "Answer" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();
    app.attach_webhook(form_id, webhook["id"].as_str().unwrap())
        .await;

    let (body, status) = app.submit_json(form_id, &json!({ "answer": "one" })).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");

    // Still inside the correlation window: nothing delivered, nothing claimed.
    let claimed = formgate::sweep::finalize_pending(&app.state).await.unwrap();
    assert_eq!(claimed, 0);
    assert!(capture.received.lock().await.is_empty());

    app.backdate_submissions().await;

    let claimed = formgate::sweep::finalize_pending(&app.state).await.unwrap();
    assert_eq!(claimed, 1);
    assert_eq!(app.count_submissions(true).await, 0);

    {
        let received = capture.received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["name"], "Survey");
        assert_eq!(received[0]["hostname"], "test.example.com");
        assert_eq!(received[0]["form_data"][0]["value"], "one");
    }

    // The claim removed the record; a second sweep has nothing to deliver.
    let claimed = formgate::sweep::finalize_pending(&app.state).await.unwrap();
    assert_eq!(claimed, 0);
    assert_eq!(capture.received.lock().await.len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn webhook_receives_transformed_payload() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let capture = common::spawn_capture_server().await;

    let webhook = app
        .create_webhook(&json!({
            "name": "crm",
            "url": capture.url,
            "transform": [
                { "dest": "visitor", "src": ".form_data[0].value" },
                { "dest": "source", "value": "contact-page" },
            ],
        }))
        .await;
    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();
    app.attach_webhook(form_id, webhook["id"].as_str().unwrap())
        .await;

    let (body, status) = app.submit_json(form_id, &json!({ "name": "Tester" })).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");

    let received = capture.received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        json!({ "visitor": "Tester", "source": "contact-page" })
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn submissions_api_lists_final_records_only() {
    let Some(app) = common::try_spawn_app_with(30).await else {
        return;
    };

    let plain = app
        .create_form(&json!({
            "name": "Contact",
            "language": "cs",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let stepped = app
        .create_form(&json!({
            "name": "Survey",
            "multi_step": true,
            "fields": [{ "name": "answer", "label": "Answer" }],
        }))
        .await;

    app.submit_json(plain["id"].as_str().unwrap(), &json!({ "name": "A" }))
        .await;
    app.submit_json(stepped["id"].as_str().unwrap(), &json!({ "answer": "B" }))
        .await;

    let (body, status) = app.get("/api/v1/submissions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["submissions"][0]["name"], "Contact");

    let (body, _) = app.get("/api/v1/submissions?language=cs").await;
    assert_eq!(body["total"], 1);
    let (body, _) = app.get("/api/v1/submissions?language=de").await;
    assert_eq!(body["total"], 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_submission_id_is_a_bad_request() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let id = uuid::Uuid::new_v4();
    let (body, status) = app.get(&format!("/api/v1/submissions/{id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    common::cleanup(app).await;
}

#[tokio::test]
async fn webhook_preview_collects_without_sending() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let capture = common::spawn_capture_server().await;

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    app.submit_json(form_id, &json!({ "name": "Tester" })).await;

    // Attached after the submission so the submit itself sends nothing.
    let webhook = app
        .create_webhook(&json!({
            "name": "crm",
            "url": capture.url,
            "transform": [{ "dest": "visitor", "src": ".form_data[0].value" }],
        }))
        .await;
    let webhook_id = webhook["id"].as_str().unwrap();
    app.attach_webhook(form_id, webhook_id).await;

    let (body, status) = app.get(&format!("/api/v1/webhooks/{webhook_id}/preview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "visitor": "Tester" }]));
    assert!(capture.received.lock().await.is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn expire_sweep_clears_correlation_tokens() {
    let Some(app) = common::try_spawn_app_with(30).await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    // A follow-up post of an already-finalized group: final record keeps the
    // presented token until the window elapses.
    let token = "a".repeat(64);
    let (body, status) = app
        .submit_json(form_id, &json!({ "name": "Tester", "form_post_ident": token }))
        .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");

    // Token still live, so the record stays out of the listing.
    let (body, _) = app.get("/api/v1/submissions").await;
    assert_eq!(body["total"], 0);

    app.backdate_submissions().await;
    formgate::sweep::expire_idents(&app.state).await.unwrap();

    let (body, _) = app.get("/api/v1/submissions").await;
    assert_eq!(body["total"], 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn form_creation_rejects_unknown_backend() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let resp = app
        .client
        .post(app.url("/api/v1/forms"))
        .json(&json!({ "name": "Contact", "action_backend": "bogus" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    common::cleanup(app).await;
}

#[tokio::test]
async fn webhook_creation_rejects_unknown_rule_function() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let resp = app
        .client
        .post(app.url("/api/v1/webhooks"))
        .json(&json!({
            "name": "bad",
            "url": "http://hook.test/x",
            "transform": [{ "dest": "x", "fnc": "no_such_function" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    common::cleanup(app).await;
}

#[tokio::test]
async fn email_only_backend_persists_nothing() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "action_backend": "email_only",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let (body, status) = app.submit_json(form_id, &json!({ "name": "Tester" })).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    assert_eq!(body["status"], "SUCCESS");

    assert_eq!(app.count_submissions(false).await, 0);
    assert_eq!(app.count_submissions(true).await, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn non_ajax_success_redirects_to_success_url() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Contact",
            "success_url": "https://site.test/thanks",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url(&format!("/v1/f/{form_id}")))
        .form(&[("name", "Tester")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get("location").unwrap().to_str().unwrap(),
        "https://site.test/thanks"
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn action_backend_choices_are_listed() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };

    let (body, status) = app.get("/api/v1/backends").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"default"));
    assert!(keys.contains(&"email_only"));
    assert!(keys.contains(&"none"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn racing_steps_with_one_token_share_a_pending_record() {
    let Some(app) = common::try_spawn_app_with(30).await else {
        return;
    };

    let form = app
        .create_form(&json!({
            "name": "Survey",
            "multi_step": true,
            "fields": [{ "name": "answer", "label": "Answer" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();
    let token = "a".repeat(64);

    // Neither post finds a pending record for the token, so both try to
    // create one; the loser of the insert race must merge, not error.
    let payload_a = json!({ "answer": "one", "form_post_ident": token });
    let payload_b = json!({ "answer": "two", "form_post_ident": token });
    let ((body_a, status_a), (body_b, status_b)) = tokio::join!(
        app.submit_json(form_id, &payload_a),
        app.submit_json(form_id, &payload_b),
    );
    assert_eq!(status_a, StatusCode::OK, "first racer failed: {body_a}");
    assert_eq!(status_b, StatusCode::OK, "second racer failed: {body_b}");
    assert_eq!(body_a["post_ident"].as_str(), Some(token.as_str()));
    assert_eq!(body_b["post_ident"].as_str(), Some(token.as_str()));

    assert_eq!(app.count_submissions(true).await, 1);
    assert_eq!(app.count_submissions(false).await, 0);

    let data: Value = sqlx::query_scalar("SELECT data FROM submissions WHERE pending")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(data.as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn form_encoded_webhook_receives_stringified_fields() {
    let Some(app) = common::try_spawn_app().await else {
        return;
    };
    let capture = common::spawn_capture_server().await;

    let webhook = app
        .create_webhook(&json!({
            "name": "legacy-crm",
            "url": capture.form_url,
            "method": "post",
            "transform": [
                { "dest": "visitor", "src": ".form_data[0].value" },
                { "dest": "count", "value": 3 },
            ],
        }))
        .await;
    let form = app
        .create_form(&json!({
            "name": "Contact",
            "fields": [{ "name": "name", "label": "Name" }],
        }))
        .await;
    let form_id = form["id"].as_str().unwrap();
    app.attach_webhook(form_id, webhook["id"].as_str().unwrap())
        .await;

    let (body, status) = app.submit_form(form_id, &[("name", "Tester")]).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");

    // Non-string values are stringified on the form wire.
    let received = capture.received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], json!({ "visitor": "Tester", "count": "3" }));

    common::cleanup(app).await;
}
