use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorError, Profession, ProfessionRequest};

pub struct ProfessionService {
    supabase: SupabaseClient,
}

impl ProfessionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_professions(&self, auth_token: Option<&str>) -> Result<Vec<Profession>, DoctorError> {
        let rows: Vec<Profession> = self
            .supabase
            .request(Method::GET, "/rest/v1/professions?order=name.asc", auth_token, None)
            .await?;
        Ok(rows)
    }

    pub async fn get_profession(
        &self,
        profession_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Profession, DoctorError> {
        debug!("Fetching profession: {}", profession_id);

        let path = format!("/rest/v1/professions?id=eq.{}", profession_id);
        let rows: Vec<Profession> = self.supabase.request(Method::GET, &path, auth_token, None).await?;

        rows.into_iter().next().ok_or(DoctorError::ProfessionNotFound)
    }

    pub async fn create_profession(
        &self,
        request: ProfessionRequest,
        auth_token: &str,
    ) -> Result<Profession, DoctorError> {
        let name = validated_name(&request)?;
        let now = Utc::now().to_rfc3339();

        let rows: Vec<Profession> = self
            .supabase
            .write_returning(
                Method::POST,
                "/rest/v1/professions",
                Some(auth_token),
                Some(json!({ "name": name, "createdAt": now, "updatedAt": now })),
            )
            .await?;

        let profession = rows
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to create profession".to_string()))?;

        info!("Profession {} created", profession.id);
        Ok(profession)
    }

    pub async fn update_profession(
        &self,
        profession_id: Uuid,
        request: ProfessionRequest,
        auth_token: &str,
    ) -> Result<Profession, DoctorError> {
        let name = validated_name(&request)?;
        self.get_profession(profession_id, Some(auth_token)).await?;

        let path = format!("/rest/v1/professions?id=eq.{}", profession_id);
        let rows: Vec<Profession> = self
            .supabase
            .write_returning(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "name": name, "updatedAt": Utc::now().to_rfc3339() })),
            )
            .await?;

        rows.into_iter().next().ok_or(DoctorError::ProfessionNotFound)
    }

    pub async fn delete_profession(&self, profession_id: Uuid, auth_token: &str) -> Result<(), DoctorError> {
        self.get_profession(profession_id, Some(auth_token)).await?;

        let path = format!("/rest/v1/professions?id=eq.{}", profession_id);
        let _: Value = self.supabase.request(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Profession {} deleted", profession_id);
        Ok(())
    }
}

fn validated_name(request: &ProfessionRequest) -> Result<&str, DoctorError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(DoctorError::Validation("Profession name is required".to_string()));
    }
    Ok(name)
}
