// libs/directory-cell/src/services/directory.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, Patient, Provider};

/// Identity lookups for the two record owners the scheduling core
/// references but does not manage.
pub struct DirectoryService {
    supabase: Arc<SupabaseClient>,
}

impl DirectoryService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn lookup_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, DirectoryError> {
        debug!("Looking up patient {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(DirectoryError::PatientNotFound(patient_id))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn lookup_provider(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Provider, DirectoryError> {
        debug!("Looking up provider {}", provider_id);

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(DirectoryError::ProviderNotFound(provider_id))?;

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse provider: {}", e)))
    }
}
