mod support;

use support::{get, post_form, scalar_i64, spawn_app};

const FEE_SQL: &str = "SELECT total_fees FROM classes WHERE id = ?";

#[tokio::test]
async fn malformed_fee_is_skipped_and_the_rest_apply() {
    let app = spawn_app().await;

    let resp = post_form(
        app.addr,
        "/update-fees",
        &[("1", "55000"), ("2", "-5"), ("3", "75000")],
    )
    .await;
    assert_eq!(resp.status, 303);
    assert_eq!(resp.location(), "/");

    assert_eq!(scalar_i64(&app, FEE_SQL, 1).await, 55_000);
    assert_eq!(scalar_i64(&app, FEE_SQL, 2).await, 60_000);
    assert_eq!(scalar_i64(&app, FEE_SQL, 3).await, 75_000);
}

#[tokio::test]
async fn non_numeric_values_and_ids_are_ignored() {
    let app = spawn_app().await;

    post_form(
        app.addr,
        "/update-fees",
        &[("1", "12abc"), ("two", "100"), ("2", " 61000 "), ("3", "")],
    )
    .await;

    assert_eq!(scalar_i64(&app, FEE_SQL, 1).await, 50_000);
    assert_eq!(scalar_i64(&app, FEE_SQL, 2).await, 61_000);
    assert_eq!(scalar_i64(&app, FEE_SQL, 3).await, 70_000);
}

#[tokio::test]
async fn fee_form_lists_current_schedule() {
    let app = spawn_app().await;
    let page = get(app.addr, "/edit-fees").await;
    assert_eq!(page.status, 200);
    let body = page.text();
    assert!(body.contains("JSS2"));
    assert!(body.contains("value=\"60000\""));
}
