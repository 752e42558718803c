// src/models.rs

pub mod classification;
pub mod dashboard;
pub mod dataset;
pub mod filter;
pub mod import;
pub mod robot;

/// Identificador do apartamento (tenant).
pub type TenantId = i32;
