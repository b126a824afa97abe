use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use secrecy::SecretString;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::conflict;
use super::queue::{self, SyncOperation, SyncStatus};
use crate::domain::{DomainError, EstadoNegocio};
use crate::models::{negocio, sync_queue};
use crate::modules::integrations::hubspot::CrmClient;
use crate::services::hubspot_config_service;

/// What happened to one queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    Skipped(String),
    Failed(String),
    /// A pull found a divergence; the id is the open conflict
    Conflict(i32),
}

pub async fn run_processor(db: DatabaseConnection, crm: Arc<dyn CrmClient>, poll: Duration) {
    tracing::info!("HubSpot sync processor started");

    match queue::recover_interrupted(&db).await {
        Ok(0) => {}
        Ok(n) => tracing::warn!("Requeued {} sync items interrupted by a restart", n),
        Err(e) => tracing::error!("Could not recover interrupted sync items: {}", e),
    }

    loop {
        match process_next_item(&db, crm.as_ref()).await {
            Ok(Some(_)) => {
                // Keep draining while there is work
            }
            Ok(None) => tokio::time::sleep(poll).await,
            Err(e) => {
                tracing::error!("Error processing sync queue: {}", e);
                tokio::time::sleep(poll.max(Duration::from_secs(5))).await;
            }
        }
    }
}

/// Process the highest-priority pending item, if any.
pub async fn process_next_item(
    db: &DatabaseConnection,
    crm: &dyn CrmClient,
) -> Result<Option<ItemOutcome>, DomainError> {
    let item = loop {
        let Some(candidate) = queue::next_pending(db).await? else {
            return Ok(None);
        };
        // Another worker may have taken it between the read and the claim
        if let Some(item) = queue::claim(db, candidate).await? {
            break item;
        }
    };

    tracing::debug!(
        "Processing sync item {} ({} negocio {}, attempt {})",
        item.id,
        item.operacion,
        item.negocio_id,
        item.intentos
    );

    let result = match queue::operation_of(&item) {
        Some(SyncOperation::UpdateStage) => push_stage(db, crm, &item).await,
        Some(SyncOperation::PullStage) => pull_stage(db, crm, &item).await,
        None => Ok(ItemOutcome::Skipped(format!(
            "unknown operation '{}'",
            item.operacion
        ))),
    };

    // A local error must not leave the item stuck in `processing`
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Sync item {} aborted: {}", item.id, e);
            queue::finish(db, item, SyncStatus::Failed, Some(e.to_string())).await?;
            return Err(e);
        }
    };

    let (status, message) = match &outcome {
        ItemOutcome::Completed => (SyncStatus::Completed, None),
        ItemOutcome::Conflict(id) => (SyncStatus::Completed, Some(format!("conflict {}", id))),
        ItemOutcome::Skipped(reason) => {
            tracing::warn!("Skipping sync item {}: {}", item.id, reason);
            (SyncStatus::Skipped, Some(reason.clone()))
        }
        ItemOutcome::Failed(reason) => {
            tracing::error!("Sync item {} failed: {}", item.id, reason);
            (SyncStatus::Failed, Some(reason.clone()))
        }
    };

    queue::finish(db, item, status, message).await?;
    Ok(Some(outcome))
}

/// Everything a HubSpot call for this negocio needs, or the reason it can't happen.
struct Target {
    negocio: negocio::Model,
    estado: EstadoNegocio,
    deal_id: String,
    owner_id: i32,
    api_key: SecretString,
}

async fn load_target(
    db: &DatabaseConnection,
    negocio_id: i32,
) -> Result<Result<Target, String>, DomainError> {
    let Some(negocio) = negocio::Entity::find_by_id(negocio_id).one(db).await? else {
        return Ok(Err(format!("negocio {} no longer exists", negocio_id)));
    };
    let Some(deal_id) = negocio.hubspot_deal_id.clone().filter(|d| !d.is_empty()) else {
        return Ok(Err("negocio has no HubSpot deal id".to_string()));
    };
    let Some(owner_id) = negocio.owner_id else {
        return Ok(Err("negocio has no owner".to_string()));
    };
    let Some(api_key) = hubspot_config_service::active_api_key(db, owner_id).await? else {
        return Ok(Err(format!("user {} has no active HubSpot API key", owner_id)));
    };
    let Ok(estado) = EstadoNegocio::from_str(&negocio.estado) else {
        return Ok(Err(format!("unknown estado '{}'", negocio.estado)));
    };

    Ok(Ok(Target {
        negocio,
        estado,
        deal_id,
        owner_id,
        api_key,
    }))
}

async fn push_stage(
    db: &DatabaseConnection,
    crm: &dyn CrmClient,
    item: &sync_queue::Model,
) -> Result<ItemOutcome, DomainError> {
    let target = match load_target(db, item.negocio_id).await? {
        Ok(t) => t,
        Err(reason) => return Ok(ItemOutcome::Skipped(reason)),
    };

    // The negocio's current state wins over the one captured at enqueue time
    let Some(mapping) =
        hubspot_config_service::stage_for_estado(db, target.owner_id, target.estado).await?
    else {
        return Ok(ItemOutcome::Skipped(format!(
            "no HubSpot stage mapped for {}",
            target.estado
        )));
    };

    let result = crm
        .update_deal_stage(
            &target.api_key,
            &target.deal_id,
            &mapping.hubspot_stage_id,
            mapping.hubspot_pipeline_id.as_deref(),
        )
        .await;

    Ok(match result {
        Ok(()) => {
            tracing::info!(
                "Negocio {} pushed to deal {} as {}",
                target.negocio.numero,
                target.deal_id,
                mapping.hubspot_stage_id
            );
            ItemOutcome::Completed
        }
        Err(e) => ItemOutcome::Failed(e.to_string()),
    })
}

async fn pull_stage(
    db: &DatabaseConnection,
    crm: &dyn CrmClient,
    item: &sync_queue::Model,
) -> Result<ItemOutcome, DomainError> {
    let target = match load_target(db, item.negocio_id).await? {
        Ok(t) => t,
        Err(reason) => return Ok(ItemOutcome::Skipped(reason)),
    };

    if queue::has_pending_push(db, target.negocio.id).await? {
        return Ok(ItemOutcome::Skipped(
            "a local change is waiting to be pushed".to_string(),
        ));
    }

    let remote = match crm.get_deal_stage(&target.api_key, &target.deal_id).await {
        Ok(stage) => stage,
        Err(e) => return Ok(ItemOutcome::Failed(e.to_string())),
    };

    // Several local states may share one HubSpot stage, so compare stages
    let local_stage =
        hubspot_config_service::stage_for_estado(db, target.owner_id, target.estado).await?;
    if local_stage.is_some_and(|m| m.hubspot_stage_id == remote.stage_id) {
        conflict::close_converged(db, target.negocio.id).await?;
        return Ok(ItemOutcome::Completed);
    }

    let Some(remote_estado) =
        hubspot_config_service::estado_for_stage(db, target.owner_id, &remote.stage_id).await?
    else {
        return Ok(ItemOutcome::Skipped(format!(
            "HubSpot stage '{}' is not mapped",
            remote.stage_id
        )));
    };

    let conflict = conflict::record_conflict(
        db,
        target.negocio.id,
        target.estado,
        remote_estado,
        &remote.stage_id,
    )
    .await?;
    Ok(ItemOutcome::Conflict(conflict.id))
}

/// Enqueue a pull for every negocio linked to a HubSpot deal.
pub async fn schedule_pulls(db: &DatabaseConnection) -> Result<usize, DomainError> {
    let linked = negocio::Entity::find()
        .filter(negocio::Column::HubspotDealId.is_not_null())
        .filter(negocio::Column::HubspotDealId.ne(""))
        .all(db)
        .await?;

    for n in &linked {
        queue::enqueue_pull_stage(db, n.id).await?;
    }

    tracing::info!("Scheduled HubSpot pulls for {} negocios", linked.len());
    Ok(linked.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{contacto, hubspot_api_key, hubspot_stage_mapping, user};
    use crate::modules::integrations::hubspot::{CrmError, DealStage, Pipeline};
    use crate::services::now_timestamp;
    use async_trait::async_trait;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCrm {
        remote_stage: String,
        fail_updates: bool,
        pushed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CrmClient for FakeCrm {
        async fn update_deal_stage(
            &self,
            _api_key: &SecretString,
            deal_id: &str,
            stage_id: &str,
            _pipeline_id: Option<&str>,
        ) -> Result<(), CrmError> {
            if self.fail_updates {
                return Err(CrmError::Api {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.pushed
                .lock()
                .unwrap()
                .push((deal_id.to_string(), stage_id.to_string()));
            Ok(())
        }

        async fn get_deal_stage(
            &self,
            _api_key: &SecretString,
            deal_id: &str,
        ) -> Result<DealStage, CrmError> {
            // HubSpot reports whatever was last pushed to it
            let stage_id = self
                .pushed
                .lock()
                .unwrap()
                .last()
                .map(|(_, stage)| stage.clone())
                .unwrap_or_else(|| self.remote_stage.clone());
            Ok(DealStage {
                deal_id: deal_id.to_string(),
                stage_id,
                pipeline_id: Some("default".into()),
            })
        }

        async fn list_pipelines(&self, _api_key: &SecretString) -> Result<Vec<Pipeline>, CrmError> {
            Ok(vec![])
        }
    }

    /// A negocio owned by a user with a key and two stage mappings.
    async fn seed(db: &DatabaseConnection, with_key: bool) -> negocio::Model {
        let now = now_timestamp();
        let owner = user::ActiveModel {
            username: Set("ventas".into()),
            password_hash: Set("x".into()),
            role: Set("user".into()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        if with_key {
            hubspot_api_key::ActiveModel {
                user_id: Set(owner.id),
                api_key: Set("pat-na1-123".into()),
                activo: Set(true),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap();
        }

        for (estado, stage) in [
            (EstadoNegocio::PresupuestoEnviado, "presentationscheduled"),
            (EstadoNegocio::NegocioAceptado, "closedwon"),
        ] {
            hubspot_stage_mapping::ActiveModel {
                user_id: Set(owner.id),
                estado_negocio: Set(estado.to_string()),
                hubspot_stage_id: Set(stage.into()),
                hubspot_pipeline_id: Set(Some("default".into())),
                created_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap();
        }

        let contacto = contacto::ActiveModel {
            nombre: Set("Ana".into()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        negocio::ActiveModel {
            numero: Set(1),
            contacto_id: Set(contacto.id),
            evento_nombre: Set("Congreso".into()),
            estado: Set(EstadoNegocio::PresupuestoEnviado.to_string()),
            hubspot_deal_id: Set(Some("9009".into())),
            owner_id: Set(Some(owner.id)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn pushes_current_state_through_mapping() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, true).await;
        let crm = FakeCrm::default();

        queue::enqueue_update_stage(
            &db,
            negocio.id,
            EstadoNegocio::PresupuestoEnviado,
            queue::Priority::Normal,
        )
        .await
        .unwrap();

        let outcome = process_next_item(&db, &crm).await.unwrap();
        assert_eq!(outcome, Some(ItemOutcome::Completed));
        assert_eq!(
            crm.pushed.lock().unwrap().as_slice(),
            &[("9009".to_string(), "presentationscheduled".to_string())]
        );
        assert_eq!(process_next_item(&db, &crm).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_key_skips_instead_of_failing() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, false).await;
        let crm = FakeCrm::default();

        queue::enqueue_update_stage(
            &db,
            negocio.id,
            EstadoNegocio::PresupuestoEnviado,
            queue::Priority::Normal,
        )
        .await
        .unwrap();

        let outcome = process_next_item(&db, &crm).await.unwrap();
        assert!(matches!(outcome, Some(ItemOutcome::Skipped(_))));
        assert_eq!(queue::queue_stats(&db).await.unwrap().skipped, 1);
        assert!(crm.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn crm_errors_mark_item_failed() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, true).await;
        let crm = FakeCrm {
            fail_updates: true,
            ..Default::default()
        };

        queue::enqueue_update_stage(
            &db,
            negocio.id,
            EstadoNegocio::PresupuestoEnviado,
            queue::Priority::Normal,
        )
        .await
        .unwrap();

        let outcome = process_next_item(&db, &crm).await.unwrap();
        assert!(matches!(outcome, Some(ItemOutcome::Failed(_))));

        let failed = queue::list_items(
            &db,
            queue::QueueFilter {
                status: Some(SyncStatus::Failed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].intentos, 1);
        assert!(failed[0].error_message.as_deref().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn pull_detects_divergence_then_convergence() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, true).await;

        let won = FakeCrm {
            remote_stage: "closedwon".into(),
            ..Default::default()
        };
        queue::enqueue_pull_stage(&db, negocio.id).await.unwrap();
        let outcome = process_next_item(&db, &won).await.unwrap();
        assert!(matches!(outcome, Some(ItemOutcome::Conflict(_))));

        let open = conflict::open_conflict_for(&db, negocio.id)
            .await
            .unwrap()
            .expect("open conflict");
        assert_eq!(open.estado_remoto, "negocio_aceptado");

        let same = FakeCrm {
            remote_stage: "presentationscheduled".into(),
            ..Default::default()
        };
        queue::enqueue_pull_stage(&db, negocio.id).await.unwrap();
        assert_eq!(
            process_next_item(&db, &same).await.unwrap(),
            Some(ItemOutcome::Completed)
        );
        assert!(conflict::open_conflict_for(&db, negocio.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shared_stage_does_not_open_false_conflict() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, true).await;

        // Partially accepted shares `closedwon` with negocio_aceptado
        hubspot_stage_mapping::ActiveModel {
            user_id: Set(negocio.owner_id.unwrap()),
            estado_negocio: Set(EstadoNegocio::ParcialmenteAceptado.to_string()),
            hubspot_stage_id: Set("closedwon".into()),
            hubspot_pipeline_id: Set(Some("default".into())),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let mut active: negocio::ActiveModel = negocio.clone().into();
        active.estado = Set(EstadoNegocio::ParcialmenteAceptado.to_string());
        active.update(&db).await.unwrap();

        let crm = FakeCrm::default();
        queue::enqueue_update_stage(
            &db,
            negocio.id,
            EstadoNegocio::ParcialmenteAceptado,
            queue::Priority::High,
        )
        .await
        .unwrap();
        assert_eq!(
            process_next_item(&db, &crm).await.unwrap(),
            Some(ItemOutcome::Completed)
        );

        queue::enqueue_pull_stage(&db, negocio.id).await.unwrap();
        assert_eq!(
            process_next_item(&db, &crm).await.unwrap(),
            Some(ItemOutcome::Completed)
        );
        assert!(conflict::open_conflict_for(&db, negocio.id).await.unwrap().is_none());

        let stored = negocio::Entity::find_by_id(negocio.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.estado, "parcialmente_aceptado");
    }

    #[tokio::test]
    async fn local_errors_fail_the_item_instead_of_stranding_it() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let negocio = seed(&db, true).await;
        let crm = FakeCrm::default();

        queue::enqueue_update_stage(
            &db,
            negocio.id,
            EstadoNegocio::PresupuestoEnviado,
            queue::Priority::Normal,
        )
        .await
        .unwrap();
        db.execute_unprepared("DROP TABLE hubspot_stage_mapping")
            .await
            .unwrap();

        assert!(process_next_item(&db, &crm).await.is_err());

        let stats = queue::queue_stats(&db).await.unwrap();
        assert_eq!(stats.processing, 0);
        assert_eq!(stats.failed, 1);

        let failed = queue::list_items(
            &db,
            queue::QueueFilter {
                status: Some(SyncStatus::Failed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(failed[0].error_message.is_some());

        // Still retryable on demand
        assert_eq!(queue::retry_failed(&db).await.unwrap().requeued, 1);
        assert!(crm.pushed.lock().unwrap().is_empty());
    }
}
