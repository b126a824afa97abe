mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{TestApp, body_json, json_request};
use negocios::domain::Role;
use serde_json::json;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.send(json_request("GET", "/api/negocios", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing Authorization header");

    let response = app
        .send(json_request("GET", "/api/negocios", Some("garbage"), None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_role_cannot_mutate_products() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("ventas", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/productos",
            Some(&token),
            Some(json!({ "nombre": "Tótem", "precio_base": 1000.0 })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("create_products"));

    // Reading the library is allowed
    let response = app
        .send(json_request("GET", "/api/productos", Some(&token), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_role_cannot_run_maintenance() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("ventas", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/functions/business-state-maintenance",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_negocio_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let response = app
        .send(json_request("GET", "/api/negocios/999", Some(&token), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Negocio 999 not found");

    let response = app
        .send(json_request(
            "PUT",
            "/api/presupuestos/999",
            Some(&token),
            Some(json!({ "nombre": "x" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_bad_request() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/empresas",
            Some(&token),
            Some(json!({ "nombre": "Eventos SpA", "email": "no-es-correo" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/api/calculators/accreditation",
            Some(&token),
            Some(json!({
                "attendees": 100,
                "manualPercentage": 50.0,
                "expressQrPercentage": 50.0,
                "manualCapacity": 0,
                "expressQrCapacity": 95,
                "accreditorCost": 1.0,
                "supervisorCost": 1.0
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_functions_reject_wrong_method_with_json() {
    let app = TestApp::new().await;

    for (method, uri) in [
        ("GET", "/api/functions/business-state-maintenance"),
        ("POST", "/api/functions/hubspot-pipelines"),
        ("DELETE", "/api/functions/upload-brand-logo"),
    ] {
        let response = app.send(json_request(method, uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Method not allowed");
    }
}

#[tokio::test]
async fn test_cors_headers_on_responses_and_preflight() {
    let app = TestApp::new().await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/functions/upload-brand-logo")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.send(preflight).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS)
    );
}

#[tokio::test]
async fn test_register_only_while_empty() {
    let app = TestApp::new().await;
    let credentials = json!({ "username": "Admin", "password": "muy-secreta" });

    let response = app
        .send(json_request("POST", "/api/auth/register", None, Some(credentials.clone())))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["token"].as_str().is_some());

    let response = app
        .send(json_request("POST", "/api/auth/register", None, Some(credentials)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_contact_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let contacto = body_json(
        app.send(json_request(
            "POST",
            "/api/contactos",
            Some(&token),
            Some(json!({ "nombre": "Ana" })),
        ))
        .await,
    )
    .await;

    let response = app
        .send(json_request(
            "POST",
            "/api/negocios",
            Some(&token),
            Some(json!({ "contacto_id": contacto["id"], "evento_nombre": "Expo" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(json_request(
            "DELETE",
            &format!("/api/contactos/{}", contacto["id"]),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_numeric_deal_id_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let contacto = body_json(
        app.send(json_request(
            "POST",
            "/api/contactos",
            Some(&token),
            Some(json!({ "nombre": "Ana" })),
        ))
        .await,
    )
    .await;

    let response = app
        .send(json_request(
            "POST",
            "/api/negocios",
            Some(&token),
            Some(json!({
                "contacto_id": contacto["id"],
                "evento_nombre": "Expo",
                "hubspot_deal_id": "1/../2"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("hubspot_deal_id"));
}
