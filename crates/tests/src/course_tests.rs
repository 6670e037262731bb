use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn admin_creates_and_students_list_courses() {
    let app = TestApp::spawn().await;
    let seed = app.seed_catalog().await;

    let resp = app
        .auth_get("/api/courses", &seed.student.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    let courses = json["data"]["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 2);
    // Newest first
    assert_eq!(courses[0]["title"], "Async Rust");
    assert_eq!(courses[1]["title"], "Rust Fundamentals");

    let resp = app
        .auth_get(
            &format!("/api/courses/{}", seed.courses[0].id),
            &seed.student.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["title"], "Rust Fundamentals");
}

#[tokio::test]
async fn students_cannot_create_courses() {
    let app = TestApp::spawn().await;
    let student = app
        .register_user("eve@test.com", "Eve", "Password123!")
        .await;

    let resp = app
        .auth_post("/api/admin/courses", &student.access_token)
        .json(&serde_json::json!({ "title": "Sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn blank_title_and_unknown_course_are_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("admin@test.com", "Admin123!").await;

    let resp = app
        .auth_post("/api/admin/courses", &admin.access_token)
        .json(&serde_json::json!({ "title": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_get(
            &format!("/api/courses/{}", bson::oid::ObjectId::new().to_hex()),
            &admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
