//! Brand configuration printed on quotes, including the logo upload
#![allow(clippy::needless_update)]

use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

use super::{clean, now_timestamp};
use crate::domain::DomainError;
use crate::domain::validation::validate_optional_email;
use crate::models::configuracion_marca;

const BRAND_ID: i32 = 1;
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color regex is valid"));

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBrandInput {
    pub nombre_empresa: Option<String>,
    pub rut: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub sitio_web: Option<String>,
    pub color_primario: Option<String>,
    pub color_secundario: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoUploaded {
    pub logo_path: String,
    pub width: u32,
    pub height: u32,
}

pub async fn get_brand<C: ConnectionTrait>(
    db: &C,
) -> Result<configuracion_marca::Model, DomainError> {
    configuracion_marca::Entity::find_by_id(BRAND_ID)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::Internal("brand configuration row is missing".to_string()))
}

fn check_color(field: &str, value: &str) -> Result<(), DomainError> {
    if HEX_COLOR_RE.is_match(value) {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{} must look like #1a2b3c", field)))
    }
}

pub async fn update_brand<C: ConnectionTrait>(
    db: &C,
    input: UpdateBrandInput,
) -> Result<configuracion_marca::Model, DomainError> {
    validate_optional_email(input.email.as_deref()).map_err(DomainError::Validation)?;

    let mut active: configuracion_marca::ActiveModel = get_brand(db).await?.into();

    if let Some(nombre) = input.nombre_empresa {
        let nombre = nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(DomainError::validation("nombre_empresa cannot be empty"));
        }
        active.nombre_empresa = Set(nombre);
    }
    if input.rut.is_some() {
        active.rut = Set(clean(input.rut));
    }
    if input.direccion.is_some() {
        active.direccion = Set(clean(input.direccion));
    }
    if input.telefono.is_some() {
        active.telefono = Set(clean(input.telefono));
    }
    if input.email.is_some() {
        active.email = Set(clean(input.email));
    }
    if input.sitio_web.is_some() {
        active.sitio_web = Set(clean(input.sitio_web));
    }
    if let Some(color) = input.color_primario {
        check_color("color_primario", &color)?;
        active.color_primario = Set(color);
    }
    if let Some(color) = input.color_secundario {
        check_color("color_secundario", &color)?;
        active.color_secundario = Set(color);
    }

    active.updated_at = Set(now_timestamp());
    Ok(active.update(db).await?)
}

/// Check that the bytes are a PNG or JPEG that actually decodes.
pub fn inspect_logo(bytes: &[u8]) -> Result<(ImageFormat, u32, u32), DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::validation("logo file is empty"));
    }
    if bytes.len() > MAX_LOGO_BYTES {
        return Err(DomainError::validation(format!(
            "logo is larger than {} bytes",
            MAX_LOGO_BYTES
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| DomainError::validation("logo must be a PNG or JPEG image"))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(DomainError::validation("logo must be a PNG or JPEG image"));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DomainError::validation(format!("logo could not be decoded: {}", e)))?;

    Ok((format, decoded.width(), decoded.height()))
}

/// Store a validated logo under `upload_dir` and point the brand row at it.
pub async fn save_logo<C: ConnectionTrait>(
    db: &C,
    upload_dir: &Path,
    bytes: &[u8],
) -> Result<LogoUploaded, DomainError> {
    let (format, width, height) = inspect_logo(bytes)?;
    let extension = match format {
        ImageFormat::Jpeg => "jpg",
        _ => "png",
    };

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| DomainError::Internal(format!("cannot create upload dir: {}", e)))?;

    let file_name = format!("logo-{}.{}", uuid::Uuid::new_v4(), extension);
    let path: PathBuf = upload_dir.join(&file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| DomainError::Internal(format!("cannot write logo: {}", e)))?;

    let previous = get_brand(db).await?;
    let logo_path = format!("/uploads/{}", file_name);

    let mut active: configuracion_marca::ActiveModel = previous.clone().into();
    active.logo_path = Set(Some(logo_path.clone()));
    active.updated_at = Set(now_timestamp());
    active.update(db).await?;

    if let Some(old) = previous
        .logo_path
        .as_deref()
        .and_then(|p| p.strip_prefix("/uploads/"))
        && let Err(e) = tokio::fs::remove_file(upload_dir.join(old)).await
    {
        tracing::warn!("Could not remove previous logo {}: {}", old, e);
    }

    tracing::info!("Brand logo stored at {} ({}x{})", path.display(), width, height);
    Ok(LogoUploaded {
        logo_path,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn accepts_real_png_and_rejects_garbage() {
        let (format, w, h) = inspect_logo(&tiny_png()).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((w, h), (3, 2));

        assert!(inspect_logo(b"not an image").is_err());
        assert!(inspect_logo(&[]).is_err());
        assert!(inspect_logo(&vec![0u8; MAX_LOGO_BYTES + 1]).is_err());
    }

    #[tokio::test]
    async fn logo_is_written_and_linked() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let dir = tempfile::tempdir().unwrap();

        let uploaded = save_logo(&db, dir.path(), &tiny_png()).await.unwrap();
        assert!(uploaded.logo_path.starts_with("/uploads/logo-"));

        let brand = get_brand(&db).await.unwrap();
        assert_eq!(brand.logo_path, Some(uploaded.logo_path.clone()));

        let file = uploaded.logo_path.trim_start_matches("/uploads/");
        assert!(dir.path().join(file).exists());
    }

    #[tokio::test]
    async fn rejects_bad_colors_and_emails() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");

        let bad_color = update_brand(
            &db,
            UpdateBrandInput {
                color_primario: Some("red".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(bad_color, Err(DomainError::Validation(_))));

        let bad_email = update_brand(
            &db,
            UpdateBrandInput {
                email: Some("a..b@x.cl".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(bad_email, Err(DomainError::Validation(_))));

        let ok = update_brand(
            &db,
            UpdateBrandInput {
                nombre_empresa: Some("Acreditaciones Sur".into()),
                color_primario: Some("#0a0B0c".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.nombre_empresa, "Acreditaciones Sur");
    }
}
