mod support;

use support::{add_student, get, pay, spawn_app};

#[tokio::test]
async fn literal_placeholder_and_non_numeric_ids_are_client_errors() {
    let app = spawn_app().await;
    assert_eq!(get(app.addr, "/classes/:id").await.status, 400);
    assert_eq!(get(app.addr, "/classes/abc").await.status, 400);
    assert_eq!(get(app.addr, "/classes/999").await.status, 404);
}

#[tokio::test]
async fn query_parameter_redirects_to_the_path_form() {
    let app = spawn_app().await;
    let resp = get(app.addr, "/classes?classId=2").await;
    assert_eq!(resp.status, 303);
    assert_eq!(resp.location(), "/classes/2");

    let picker = get(app.addr, "/classes").await;
    assert_eq!(picker.status, 200);
    assert!(picker.text().contains("JSS2"));
}

#[tokio::test]
async fn class_view_totals_its_students() {
    let app = spawn_app().await;
    let ada = add_student(&app, "Ada", 1).await;
    let bola = add_student(&app, "Bola", 1).await;
    add_student(&app, "Elsewhere", 2).await;
    pay(&app, ada, "20000", "R-1").await;
    pay(&app, bola, "50000", "R-2").await;

    let page = get(app.addr, "/classes/1").await;
    assert_eq!(page.status, 200);
    let body = page.text();
    assert!(body.contains("Ada"));
    assert!(body.contains("Paid"));
    assert!(body.contains("Partial"));
    assert!(body.contains("100,000"));
    assert!(body.contains("70,000"));
    assert!(body.contains("30,000"));
    assert!(!body.contains("Elsewhere"));
}
