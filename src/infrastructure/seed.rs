//! Demo data for local runs (`SEED_DEMO=1`)

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::domain::{DomainError, EstadoPresupuesto};
use crate::models::negocio;
use crate::services::contacto_service::{self, ContactoInput};
use crate::services::empresa_service::{self, EmpresaInput, TipoEmpresa};
use crate::services::negocio_service::{self, CreateNegocioInput};
use crate::services::presupuesto_service::{self, CreatePresupuestoInput, LineInput};
use crate::services::producto_service::{self, LineaInput, ProductoInput};
use crate::services::user_service::{self, NewUserInput};

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    if negocio::Entity::find().count(db).await? > 0 {
        tracing::info!("Demo seed skipped: negocios already exist");
        return Ok(());
    }

    // 1. Users
    let admin_id = if user_service::count_users(db).await? == 0 {
        let admin = user_service::create_user(
            db,
            NewUserInput {
                username: "admin".into(),
                password: "admin-demo".into(),
                role: Some("admin".into()),
            },
        )
        .await?;
        user_service::create_user(
            db,
            NewUserInput {
                username: "ventas".into(),
                password: "ventas-demo".into(),
                role: Some("user".into()),
            },
        )
        .await?;
        admin.id
    } else {
        1
    };

    // 2. Catalog
    let linea = producto_service::create_linea(
        db,
        LineaInput {
            nombre: "Acreditación".into(),
            descripcion: Some("Registro y control de asistentes".into()),
        },
    )
    .await?;

    let mut productos = Vec::new();
    for (nombre, precio) in [
        ("Acreditador manual (jornada)", 45000.0),
        ("Tótem de autoacreditación QR", 90000.0),
        ("Credencial PVC impresa", 1200.0),
    ] {
        productos.push(
            producto_service::create_producto(
                db,
                ProductoInput {
                    nombre: nombre.into(),
                    descripcion: None,
                    precio_base: precio,
                    linea_producto_id: Some(linea.id),
                    activo: None,
                },
            )
            .await?,
        );
    }

    // 3. Companies and contacts
    let productora = empresa_service::create_empresa(
        db,
        EmpresaInput {
            nombre: "Producciones Cordillera".into(),
            rut: Some("76.543.210-K".into()),
            giro: Some("Producción de eventos".into()),
            direccion: None,
            email: Some("contacto@cordillera.cl".into()),
            telefono: None,
            tipo: Some(TipoEmpresa::Productora),
        },
    )
    .await?;

    let contacto = contacto_service::create_contacto(
        db,
        ContactoInput {
            nombre: "Valentina".into(),
            apellido: Some("Muñoz".into()),
            email: Some("valentina@cordillera.cl".into()),
            telefono: Some("+56 9 1234 5678".into()),
            cargo: Some("Jefa de producción".into()),
            empresa_id: Some(productora.id),
        },
    )
    .await?;

    // 4. Negocios with quotes
    for (evento, asistentes) in [("Congreso Médico Anual", 1200), ("Feria del Libro", 5000)] {
        let negocio = negocio_service::create_negocio(
            db,
            CreateNegocioInput {
                contacto_id: contacto.id,
                productora_id: Some(productora.id),
                cliente_final_id: None,
                evento_nombre: evento.into(),
                evento_tipo: Some("Congreso".into()),
                evento_fecha: None,
                evento_ubicacion: Some("Santiago".into()),
                asistentes_esperados: Some(asistentes),
                hubspot_deal_id: None,
                owner_id: None,
            },
            admin_id,
        )
        .await?;

        let lineas = productos
            .iter()
            .map(|p| LineInput {
                producto_id: Some(p.id),
                nombre: None,
                descripcion: None,
                cantidad: 2.0,
                precio_unitario: None,
                descuento_porcentaje: 0.0,
                comentarios: None,
            })
            .collect();

        let presupuesto = presupuesto_service::create_presupuesto(
            db,
            CreatePresupuestoInput {
                negocio_id: negocio.id,
                nombre: format!("{} - propuesta base", evento),
                fecha_vencimiento: None,
                lineas,
            },
        )
        .await?;

        presupuesto_service::change_presupuesto_state(
            db,
            presupuesto.presupuesto.id,
            EstadoPresupuesto::Enviado,
        )
        .await?;
    }

    tracing::info!("Demo data seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[tokio::test]
    async fn seed_is_idempotent() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();

        let negocios = negocio::Entity::find().all(&db).await.unwrap();
        assert_eq!(negocios.len(), 2);
        assert!(negocios.iter().all(|n| n.estado == "presupuesto_enviado"));
    }
}
