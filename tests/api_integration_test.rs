mod common;

use axum::http::{StatusCode, header};
use common::{TestApp, body_json, body_text, json_request};
use negocios::domain::Role;
use serde_json::{Value, json};

async fn create(app: &TestApp, token: &str, uri: &str, body: Value) -> Value {
    let response = app
        .send(json_request("POST", uri, Some(token), Some(body)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await
}

async fn get(app: &TestApp, token: &str, uri: &str) -> Value {
    let response = app.send(json_request("GET", uri, Some(token), None)).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    body_json(response).await
}

async fn put(app: &TestApp, token: &str, uri: &str, body: Value) -> Value {
    let response = app
        .send(json_request("PUT", uri, Some(token), Some(body)))
        .await;
    assert_eq!(response.status(), StatusCode::OK, "PUT {uri}");
    body_json(response).await
}

/// Contact plus negocio, returning the negocio JSON.
async fn new_negocio(app: &TestApp, token: &str, evento: &str) -> Value {
    let productora = create(
        app,
        token,
        "/api/empresas",
        json!({ "nombre": "Producciones Andes", "tipo": "productora" }),
    )
    .await;
    let contacto = create(
        app,
        token,
        "/api/contactos",
        json!({ "nombre": "Camila", "apellido": "Rojas", "empresa_id": productora["id"] }),
    )
    .await;
    create(
        app,
        token,
        "/api/negocios",
        json!({
            "contacto_id": contacto["id"],
            "productora_id": productora["id"],
            "evento_nombre": evento,
            "asistentes_esperados": 800
        }),
    )
    .await
}

#[tokio::test]
async fn test_login_and_me_report_permissions() {
    let app = TestApp::new().await;
    app.login_as("vendedora", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "vendedora", "password": "password-123" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let me = get(&app, &token, "/api/auth/me").await;
    assert_eq!(me["username"], "vendedora");
    assert_eq!(me["role"], "user");
    let permissions: Vec<&str> = me["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(permissions.contains(&"create_budgets"));
    assert!(!permissions.contains(&"create_products"));
}

#[tokio::test]
async fn test_negocios_get_sequential_numbers() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;

    let first = new_negocio(&app, &token, "Congreso Minero").await;
    let second = new_negocio(&app, &token, "Feria Gastronómica").await;
    assert_eq!(first["numero"], 1);
    assert_eq!(second["numero"], 2);
    assert_eq!(first["estado"], "oportunidad_creada");

    let report = get(&app, &token, "/api/negocios/numbering").await;
    assert_eq!(report["is_consistent"], true);

    let history = get(&app, &token, &format!("/api/negocios/{}/numbers", second["id"])).await;
    assert_eq!(history[0]["accion"], "assigned");
    assert_eq!(history[0]["numero"], 2);
}

#[tokio::test]
async fn test_quote_lifecycle_drives_business_state_and_value() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;
    let negocio = new_negocio(&app, &token, "Congreso Médico").await;
    let negocio_id = negocio["id"].as_i64().unwrap();

    let quote = create(
        &app,
        &token,
        "/api/presupuestos",
        json!({
            "negocio_id": negocio_id,
            "nombre": "Propuesta A",
            "lineas": [
                { "nombre": "Acreditador", "cantidad": 2, "precio_unitario": 1000, "descuento_porcentaje": 10 }
            ]
        }),
    )
    .await;
    assert_eq!(quote["estado"], "borrador");
    assert_eq!(quote["total"], 2142.0);
    assert_eq!(quote["totales"]["subtotalConDescuento"], 1800.0);
    assert_eq!(quote["totales"]["iva"], 342.0);
    // A fresh quote takes its expiry from the budget terms
    assert!(quote["fecha_vencimiento"].as_str().is_some());

    let quote_id = quote["id"].as_i64().unwrap();
    let sent = put(
        &app,
        &token,
        &format!("/api/presupuestos/{}/estado", quote_id),
        json!({ "estado": "enviado" }),
    )
    .await;
    assert_eq!(sent["negocio"]["estado"], "presupuesto_enviado");
    assert!(sent["presupuesto"]["fecha_envio"].as_str().is_some());

    let approved = put(
        &app,
        &token,
        &format!("/api/presupuestos/{}/estado", quote_id),
        json!({ "estado": "aprobado" }),
    )
    .await;
    assert_eq!(approved["negocio"]["estado"], "negocio_aceptado");
    // Accepted is not a closing state
    assert!(approved["negocio"]["fecha_cierre"].is_null());

    // Approved quotes are no longer editable
    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/presupuestos/{}", quote_id),
            Some(&token),
            Some(json!({ "nombre": "Cambio tardío" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let detail = get(&app, &token, &format!("/api/negocios/{}", negocio_id)).await;
    assert_eq!(detail["valor"], 2142.0);
    assert_eq!(detail["presupuestos"].as_array().unwrap().len(), 1);
    assert_eq!(detail["contacto"]["nombre"], "Camila");

    let dashboard = get(&app, &token, "/api/dashboard").await;
    assert_eq!(dashboard["total_negocios"], 1);
    assert_eq!(dashboard["valor_aprobado"], 2142.0);
    assert_eq!(dashboard["negocios_por_estado"]["negocio_aceptado"], 1);
}

#[tokio::test]
async fn test_state_changes_enqueue_one_coalesced_push() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;
    let negocio = new_negocio(&app, &token, "Lanzamiento").await;
    let uri = format!("/api/negocios/{}/estado", negocio["id"]);

    put(&app, &token, &uri, json!({ "estado": "facturado" })).await;
    put(&app, &token, &uri, json!({ "estado": "negocio_cerrado" })).await;

    let queue = get(&app, &token, "/api/sync/queue?status=pending").await;
    assert_eq!(queue["total"], 1);
    let item = &queue["items"][0];
    assert_eq!(item["operacion"], "update_stage");
    assert_eq!(item["prioridad"], 1);

    // Manual states survive recalculation
    let response = app
        .send(json_request(
            "POST",
            &format!("/api/negocios/{}/recalculate", negocio["id"]),
            Some(&token),
            None,
        ))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["changed"], false);
    assert_eq!(body["negocio"]["estado"], "negocio_cerrado");
}

#[tokio::test]
async fn test_library_lines_and_quote_document() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;
    let negocio = new_negocio(&app, &token, "Seminario").await;

    let producto = create(
        &app,
        &token,
        "/api/productos",
        json!({ "nombre": "Credencial PVC", "precio_base": 1500.0 }),
    )
    .await;

    let quote = create(
        &app,
        &token,
        "/api/presupuestos",
        json!({
            "negocio_id": negocio["id"],
            "nombre": "Credenciales",
            "lineas": [ { "producto_id": producto["id"], "cantidad": 100 } ]
        }),
    )
    .await;
    assert_eq!(quote["lineas"][0]["nombre"], "Credencial PVC");
    assert_eq!(quote["lineas"][0]["precio_unitario"], 1500.0);

    put(
        &app,
        &token,
        "/api/configuracion/marca",
        json!({ "nombre_empresa": "Acreditaciones Sur", "color_primario": "#112233" }),
    )
    .await;

    let doc = get(&app, &token, &format!("/api/presupuestos/{}/documento", quote["id"])).await;
    assert_eq!(doc["marca"]["nombre_empresa"], "Acreditaciones Sur");
    assert_eq!(doc["negocio"]["evento_nombre"], "Seminario");
    assert_eq!(doc["totales"]["subtotal"], 150000.0);
    assert!(doc["terminos"]["validez_dias"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_export_csv() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("admin", Role::Admin).await;
    new_negocio(&app, &token, "Feria, edición 2025").await;

    let response = app
        .send(json_request("GET", "/api/negocios/export", Some(&token), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );

    let csv = body_text(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "numero,evento_nombre,estado,contacto,evento_fecha,valor,hubspot_deal_id,created_at"
    );
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("1,\"Feria, edición 2025\",oportunidad_creada,Camila Rojas")
    );
}

#[tokio::test]
async fn test_quote_totals_calculator() {
    let app = TestApp::new().await;
    let (_, token) = app.login_as("ventas", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/calculators/quote-totals",
            Some(&token),
            Some(json!({
                "lineas": [
                    { "cantidad": 2, "precioUnitario": 1000, "descuentoPorcentaje": 10 },
                    { "cantidad": 1, "precioUnitario": 500 }
                ]
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let totals = body_json(response).await;
    assert_eq!(totals["subtotal"], 2500.0);
    assert_eq!(totals["descuento"], 200.0);
    assert_eq!(totals["iva"], 437.0);
    assert_eq!(totals["total"], 2737.0);
}

#[tokio::test]
async fn test_admin_manages_users_but_not_last_admin() {
    let app = TestApp::new().await;
    let (admin_id, token) = app.login_as("admin", Role::Admin).await;

    let created = create(
        &app,
        &token,
        "/api/users",
        json!({ "username": "nuevo", "password": "password-123" }),
    )
    .await;
    assert_eq!(created["role"], "user");
    assert!(created.get("password_hash").is_none());

    let listed = get(&app, &token, "/api/users").await;
    assert_eq!(listed["total"], 2);

    let response = app
        .send(json_request(
            "DELETE",
            &format!("/api/users/{}", admin_id),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
