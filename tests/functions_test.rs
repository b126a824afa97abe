mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{TestApp, body_json, json_request};
use negocios::config::Config;
use negocios::domain::Role;
use serde_json::json;
use std::io::Cursor;

const BOUNDARY: &str = "negocios-test-boundary";

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_request(token: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/functions/upload-brand-logo")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn app_with_uploads(dir: &tempfile::TempDir) -> TestApp {
    let mut config = Config::in_memory();
    config.upload_dir = dir.path().to_path_buf();
    TestApp::with_config(config, "http://127.0.0.1:9").await
}

#[tokio::test]
async fn test_upload_logo_is_stored_and_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_uploads(&dir).await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let response = app.send(multipart_request(&token, "logo", &png_bytes(4, 3))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded = body_json(response).await;
    assert_eq!(uploaded["width"], 4);
    assert_eq!(uploaded["height"], 3);
    let logo_path = uploaded["logo_path"].as_str().unwrap().to_string();
    assert!(logo_path.starts_with("/uploads/logo-"));
    assert!(logo_path.ends_with(".png"));

    let brand = body_json(
        app.send(json_request("GET", "/api/configuracion/marca", Some(&token), None))
            .await,
    )
    .await;
    assert_eq!(brand["logo_path"], logo_path.as_str());

    let response = app
        .send(Request::builder().uri(&logo_path).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A second upload replaces the first file on disk
    let response = app.send(multipart_request(&token, "logo", &png_bytes(2, 2))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_upload_rejects_non_images_and_missing_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_uploads(&dir).await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let response = app
        .send(multipart_request(&token, "logo", b"definitely not a png"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request(&token, "archivo", &png_bytes(1, 1)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("logo"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_user_role_cannot_upload_logo() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_uploads(&dir).await;
    let (_, token) = app.login_as("ventas", Role::User).await;

    let response = app.send(multipart_request(&token, "logo", &png_bytes(1, 1))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_maintenance_expires_overdue_quotes_and_recalculates() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let contacto = body_json(
        app.send(json_request(
            "POST",
            "/api/contactos",
            Some(&token),
            Some(json!({ "nombre": "Pedro" })),
        ))
        .await,
    )
    .await;
    let negocio = body_json(
        app.send(json_request(
            "POST",
            "/api/negocios",
            Some(&token),
            Some(json!({ "contacto_id": contacto["id"], "evento_nombre": "Foro Retail" })),
        ))
        .await,
    )
    .await;
    let quote = body_json(
        app.send(json_request(
            "POST",
            "/api/presupuestos",
            Some(&token),
            Some(json!({
                "negocio_id": negocio["id"],
                "nombre": "Vencible",
                "fecha_vencimiento": "2020-01-31",
                "lineas": [ { "nombre": "Kiosco", "cantidad": 1, "precio_unitario": 100 } ]
            })),
        ))
        .await,
    )
    .await;
    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/presupuestos/{}/estado", quote["id"]),
            Some(&token),
            Some(json!({ "estado": "enviado" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(json_request(
            "POST",
            "/api/functions/business-state-maintenance",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["vencidos"]["expirados"], 1);
    assert_eq!(report["vencidos"]["negocios"][0], negocio["id"]);
    assert_eq!(report["recalculo"]["revisados"], 1);
    assert_eq!(report["recalculo"]["cambiados"], 1);
    assert!(report["audit"]["renumerados"].as_array().unwrap().is_empty());

    let detail = body_json(
        app.send(json_request(
            "GET",
            &format!("/api/negocios/{}", negocio["id"]),
            Some(&token),
            None,
        ))
        .await,
    )
    .await;
    assert_eq!(detail["estado"], "negocio_perdido");
    assert_eq!(detail["presupuestos"][0]["estado"], "vencido");

    // A second run finds nothing left to do
    let report = body_json(
        app.send(json_request(
            "POST",
            "/api/functions/business-state-maintenance",
            Some(&token),
            None,
        ))
        .await,
    )
    .await;
    assert_eq!(report["vencidos"]["expirados"], 0);
    assert_eq!(report["recalculo"]["cambiados"], 0);
}
