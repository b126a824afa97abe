use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS empresas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        rut TEXT,
        giro TEXT,
        direccion TEXT,
        email TEXT,
        telefono TEXT,
        tipo TEXT NOT NULL DEFAULT 'cliente_final',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contactos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        apellido TEXT,
        email TEXT,
        telefono TEXT,
        cargo TEXT,
        empresa_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (empresa_id) REFERENCES empresas(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS negocios (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        numero INTEGER NOT NULL,
        contacto_id INTEGER NOT NULL,
        productora_id INTEGER,
        cliente_final_id INTEGER,
        evento_nombre TEXT NOT NULL,
        evento_tipo TEXT,
        evento_fecha TEXT,
        evento_ubicacion TEXT,
        asistentes_esperados INTEGER,
        estado TEXT NOT NULL DEFAULT 'oportunidad_creada',
        hubspot_deal_id TEXT,
        owner_id INTEGER,
        fecha_cierre TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (contacto_id) REFERENCES contactos(id) ON DELETE RESTRICT,
        FOREIGN KEY (productora_id) REFERENCES empresas(id) ON DELETE SET NULL,
        FOREIGN KEY (cliente_final_id) REFERENCES empresas(id) ON DELETE SET NULL,
        FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
    )
    "#,
    // Not UNIQUE: duplicates from imports or manual edits are repaired by the audit
    "CREATE INDEX IF NOT EXISTS idx_negocios_numero ON negocios (numero)",
    r#"
    CREATE TABLE IF NOT EXISTS presupuestos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        negocio_id INTEGER NOT NULL,
        nombre TEXT NOT NULL,
        estado TEXT NOT NULL DEFAULT 'borrador',
        total REAL NOT NULL DEFAULT 0,
        fecha_envio TEXT,
        fecha_aprobacion TEXT,
        fecha_rechazo TEXT,
        fecha_vencimiento TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (negocio_id) REFERENCES negocios(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS productos_presupuesto (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        presupuesto_id INTEGER NOT NULL,
        producto_id INTEGER,
        nombre TEXT NOT NULL,
        descripcion TEXT,
        cantidad REAL NOT NULL,
        precio_unitario REAL NOT NULL,
        descuento_porcentaje REAL NOT NULL DEFAULT 0,
        total REAL NOT NULL,
        comentarios TEXT,
        FOREIGN KEY (presupuesto_id) REFERENCES presupuestos(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lineas_producto (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL UNIQUE,
        descripcion TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS productos_biblioteca (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nombre TEXT NOT NULL,
        descripcion TEXT,
        precio_base REAL NOT NULL DEFAULT 0,
        linea_producto_id INTEGER,
        activo BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (linea_producto_id) REFERENCES lineas_producto(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hubspot_api_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE,
        api_key TEXT NOT NULL,
        activo BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hubspot_stage_mapping (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        estado_negocio TEXT NOT NULL,
        hubspot_stage_id TEXT NOT NULL,
        hubspot_pipeline_id TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, estado_negocio),
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS configuracion_marca (
        id INTEGER PRIMARY KEY,
        nombre_empresa TEXT NOT NULL,
        rut TEXT,
        direccion TEXT,
        telefono TEXT,
        email TEXT,
        sitio_web TEXT,
        logo_path TEXT,
        color_primario TEXT NOT NULL DEFAULT '#1f2937',
        color_secundario TEXT NOT NULL DEFAULT '#f59e0b',
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS budget_terms_config (
        id INTEGER PRIMARY KEY,
        condiciones_pago TEXT NOT NULL,
        validez_dias INTEGER NOT NULL DEFAULT 30,
        notas TEXT,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sync_queue (
        id TEXT PRIMARY KEY,
        negocio_id INTEGER NOT NULL,
        operacion TEXT NOT NULL,
        prioridad INTEGER NOT NULL DEFAULT 2,
        estado TEXT NOT NULL DEFAULT 'pending',
        payload TEXT,
        intentos INTEGER NOT NULL DEFAULT 0,
        max_intentos INTEGER NOT NULL DEFAULT 5,
        error_message TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sync_queue_estado ON sync_queue (estado, prioridad, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS sync_conflicts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        negocio_id INTEGER NOT NULL,
        estado_local TEXT NOT NULL,
        estado_remoto TEXT NOT NULL,
        hubspot_stage_remoto TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'abierto',
        resolucion TEXT,
        detected_at TEXT NOT NULL,
        resolved_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS business_number_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        negocio_id INTEGER NOT NULL,
        numero INTEGER NOT NULL,
        accion TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    // Single-row configuration tables
    r#"
    INSERT OR IGNORE INTO configuracion_marca (id, nombre_empresa, color_primario, color_secundario, updated_at)
    VALUES (1, 'Mi Empresa', '#1f2937', '#f59e0b', datetime('now'))
    "#,
    r#"
    INSERT OR IGNORE INTO budget_terms_config (id, condiciones_pago, validez_dias, notas, updated_at)
    VALUES (1, '50% al aprobar, 50% contra entrega', 30, NULL, datetime('now'))
    "#,
];

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    for sql in MIGRATIONS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await?;
    }

    tracing::debug!("Applied {} schema statements", MIGRATIONS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{budget_terms_config, configuracion_marca};
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn migrations_are_idempotent_and_seed_config_rows() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        run_migrations(&db).await.expect("Second run should be a no-op");

        let marca = configuracion_marca::Entity::find_by_id(1)
            .one(&db)
            .await
            .unwrap()
            .expect("brand row");
        assert_eq!(marca.nombre_empresa, "Mi Empresa");

        let terms = budget_terms_config::Entity::find_by_id(1)
            .one(&db)
            .await
            .unwrap()
            .expect("terms row");
        assert_eq!(terms.validez_dias, 30);
    }
}
