use bson::doc;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::Value;

use crate::fixtures::test_app::TestApp;

fn at(offset: Duration) -> String {
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn redeem(app: &TestApp, token: &str, code: &str, course_id: &str) -> (u16, Value) {
    let resp = app
        .auth_post("/api/access/redeem", token)
        .json(&serde_json::json!({ "code": code, "courseId": course_id }))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn check(app: &TestApp, token: &str, course_id: &str) -> Value {
    let resp = app
        .auth_get(&format!("/api/access/check/{}", course_id), token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    json["data"].clone()
}

#[tokio::test]
async fn admin_generates_a_batch_of_unique_codes() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[0];

    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({
            "courseId": course.id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(30)),
            "quantity": 25,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["statusCode"], 201);
    assert_eq!(json["success"], true);

    let codes = json["data"]["codes"].as_array().unwrap();
    assert_eq!(codes.len(), 25);
    let mut strings: Vec<&str> = codes.iter().map(|c| c["code"].as_str().unwrap()).collect();
    strings.sort();
    strings.dedup();
    assert_eq!(strings.len(), 25);
    assert!(codes.iter().all(|c| c["isUsed"] == false && c["courseId"] == course.id.as_str()));
    assert!(strings.iter().all(|s| s.len() == 10));
}

#[tokio::test]
async fn quantity_defaults_to_one_and_is_bounded() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[0];

    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({
            "courseId": course.id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(1)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["codes"].as_array().unwrap().len(), 1);

    for quantity in [0, 201] {
        let resp = app
            .auth_post("/api/access/admin/codes", &seed.admin.access_token)
            .json(&serde_json::json!({
                "courseId": course.id,
                "accessStartAt": at(Duration::zero()),
                "accessEndAt": at(Duration::days(1)),
                "quantity": quantity,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "quantity {quantity}");
    }
}

#[tokio::test]
async fn batch_limit_follows_configuration() {
    let app = TestApp::spawn_with_settings(|s| s.access.max_batch_size = 3).await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[0];

    for (quantity, expected) in [(4, 400), (3, 201)] {
        let resp = app
            .auth_post("/api/access/admin/codes", &seed.admin.access_token)
            .json(&serde_json::json!({
                "courseId": course.id,
                "accessStartAt": at(Duration::zero()),
                "accessEndAt": at(Duration::days(1)),
                "quantity": quantity,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), expected, "quantity {quantity}");
    }
}

#[tokio::test]
async fn generation_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;

    // Inverted window
    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({
            "courseId": seed.courses[0].id,
            "accessStartAt": at(Duration::days(2)),
            "accessEndAt": at(Duration::days(1)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Unknown course
    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({
            "courseId": bson::oid::ObjectId::new().to_hex(),
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(1)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"], "Course not found");

    // Malformed id and missing dates
    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({ "courseId": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_routes_enforce_roles() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;

    let resp = app
        .auth_post("/api/access/admin/codes", &seed.student.access_token)
        .json(&serde_json::json!({
            "courseId": seed.courses[0].id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(1)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/access/admin/codes", &seed.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .client
        .post(app.url("/api/access/redeem"))
        .json(&serde_json::json!({ "code": "ABC", "courseId": seed.courses[0].id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["statusCode"], 401);
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn end_to_end_redemption_flow() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let (c1, c2) = (&seed.courses[0], &seed.courses[1]);
    let token = &seed.student.access_token;
    let start = at(Duration::zero());
    let end = at(Duration::days(7));

    let codes = app
        .generate_codes(&seed.admin.access_token, &c1.id, &start, &end, 5)
        .await;
    assert_eq!(codes.len(), 5);

    assert_eq!(check(&app, token, &c1.id).await["hasAccess"], false);

    let (status, json) = redeem(&app, token, &codes[2], &c1.id).await;
    assert_eq!(status, 200);
    assert_eq!(json["data"]["access"]["courseId"], c1.id.as_str());
    assert_eq!(json["data"]["access"]["source"], "code");
    assert!(json["data"]["access"]["id"].is_string());

    let (status, json) = redeem(&app, token, &codes[2], &c1.id).await;
    assert_eq!(status, 400);
    assert_eq!(json["message"], "Invalid or expired code");

    let (status, json) = redeem(&app, token, &codes[0], &c2.id).await;
    assert_eq!(status, 400);
    assert_eq!(json["message"], "This code belongs to a different course");

    let (status, _) = redeem(&app, token, &codes[0], &c1.id).await;
    assert_eq!(status, 200);

    let access = check(&app, token, &c1.id).await;
    assert_eq!(access["hasAccess"], true);
    assert!(access["accessEndAt"].is_string());
    assert_eq!(check(&app, token, &c2.id).await["hasAccess"], false);
}

#[tokio::test]
async fn expired_window_and_expired_code_are_rejected() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[0];
    let token = &seed.student.access_token;

    let past = app
        .generate_codes(
            &seed.admin.access_token,
            &course.id,
            &at(Duration::days(-10)),
            &at(Duration::days(-1)),
            1,
        )
        .await;
    let (status, json) = redeem(&app, token, &past[0], &course.id).await;
    assert_eq!(status, 400);
    assert_eq!(json["message"], "The access window for this code has ended");

    let resp = app
        .auth_post("/api/access/admin/codes", &seed.admin.access_token)
        .json(&serde_json::json!({
            "courseId": course.id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(7)),
            "codeExpiresAt": at(Duration::hours(-1)),
        }))
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let stale = json["data"]["codes"][0]["code"].as_str().unwrap().to_string();

    let (status, json) = redeem(&app, token, &stale, &course.id).await;
    assert_eq!(status, 400);
    assert_eq!(json["message"], "Invalid or expired code");
}

#[tokio::test]
async fn redeeming_for_unknown_course_or_bad_id_fails() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let token = &seed.student.access_token;

    let (status, _) = redeem(&app, token, "DOESNOTEXIST", &seed.courses[0].id).await;
    assert_eq!(status, 400);

    let (status, json) = redeem(&app, token, "ANYCODE", "not-an-id").await;
    assert_eq!(status, 400);
    assert_eq!(json["message"], "Invalid courseId");

    let resp = app
        .auth_get("/api/access/check/not-an-id", token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn concurrent_redemptions_of_one_code_admit_exactly_one() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[0];
    let code = app
        .generate_codes(
            &seed.admin.access_token,
            &course.id,
            &at(Duration::zero()),
            &at(Duration::days(7)),
            1,
        )
        .await
        .remove(0);

    let mut tokens = Vec::new();
    for i in 0..8 {
        let user = app
            .register_user(&format!("racer{i}@coursegate.test"), "Racer", "Racer123!")
            .await;
        tokens.push(user.access_token);
    }

    let attempts = tokens
        .iter()
        .map(|token| redeem(&app, token, &code, &course.id));
    let results = futures::future::join_all(attempts).await;

    let successes = results.iter().filter(|(status, _)| *status == 200).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .filter(|(status, _)| *status != 200)
            .all(|(status, json)| *status == 400 && json["message"] == "Invalid or expired code")
    );

    let grants = app
        .db
        .collection::<bson::Document>("access_grants")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(grants, 1);
}

#[tokio::test]
async fn listing_filters_and_reports_redeemer() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let (c1, c2) = (&seed.courses[0], &seed.courses[1]);
    let admin = &seed.admin.access_token;
    let start = at(Duration::zero());
    let end = at(Duration::days(7));

    let c1_codes = app.generate_codes(admin, &c1.id, &start, &end, 3).await;
    app.generate_codes(admin, &c2.id, &start, &end, 2).await;
    let (status, _) = redeem(&app, &seed.student.access_token, &c1_codes[1], &c1.id).await;
    assert_eq!(status, 200);

    let resp = app.auth_get("/api/access/admin/codes", admin).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let all = json["data"]["codes"].as_array().unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0]["courseTitle"], c2.title.as_str());

    let resp = app
        .auth_get(
            &format!("/api/access/admin/codes?courseId={}&isUsed=true", c1.id),
            admin,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let used = json["data"]["codes"].as_array().unwrap();
    assert_eq!(used.len(), 1);
    assert_eq!(used[0]["code"], c1_codes[1].as_str());
    assert_eq!(used[0]["courseTitle"], c1.title.as_str());
    assert_eq!(used[0]["usedBy"]["id"], seed.student.id.as_str());
    assert_eq!(used[0]["usedBy"]["email"], seed.student.email.as_str());
    assert_eq!(used[0]["usedBy"]["displayName"], "Student One");

    let resp = app
        .auth_get("/api/access/admin/codes?isUsed=false", admin)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let unused = json["data"]["codes"].as_array().unwrap();
    assert_eq!(unused.len(), 4);
    assert!(unused.iter().all(|c| c["usedBy"].is_null()));

    let resp = app
        .auth_get("/api/access/admin/codes?courseId=bogus", admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn manual_grants_and_my_grants() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;
    let course = &seed.courses[1];

    let resp = app
        .auth_post("/api/access/admin/grants", &seed.admin.access_token)
        .json(&serde_json::json!({
            "userId": seed.student.id,
            "courseId": course.id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(3)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["access"]["source"], "manual");

    let resp = app
        .auth_post("/api/access/admin/grants", &seed.admin.access_token)
        .json(&serde_json::json!({
            "userId": bson::oid::ObjectId::new().to_hex(),
            "courseId": course.id,
            "accessStartAt": at(Duration::zero()),
            "accessEndAt": at(Duration::days(3)),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    assert_eq!(
        check(&app, &seed.student.access_token, &course.id).await["hasAccess"],
        true
    );

    let resp = app
        .auth_get("/api/access/me", &seed.student.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let grants = json["data"]["grants"].as_array().unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0]["courseTitle"], course.title.as_str());
    assert_eq!(grants[0]["isActive"], true);
}
