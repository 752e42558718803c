// src/models/robot.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::TenantId;

// Chaves de configuração que o painel também lê.
pub const START_DATE_KEY: &str = "DATA_INICIAL_ROBO";
pub const END_DATE_KEY: &str = "DATA_FINAL_ROBO";

/// Período padrão dos relatórios, vindo da configuração do robô.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateWindow {
    // Janela aberta quando nada foi configurado.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2999, 12, 31).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RobotLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RobotJob {
    pub job_id: Uuid,
    pub tenant_id: TenantId,
    pub status: String,
}

/// `null` mantém o valor atual.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RobotSettingsPayload {
    #[validate(length(min = 1, message = "Informe ao menos uma configuração."))]
    pub settings: HashMap<String, Option<String>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Máximo de linhas (padrão 50)
    pub limit: Option<i64>,
}
