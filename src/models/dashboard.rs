// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::robot::DateWindow;

// 1. Resumo (os cards do topo)
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    #[schema(value_type = f64)]
    pub revenue: Decimal,
    #[schema(value_type = f64)]
    pub trip_cost: Decimal,
    #[schema(value_type = f64)]
    pub general_expenses: Decimal,
    #[schema(value_type = f64)]
    pub net_balance: Decimal,
    #[schema(value_type = f64)]
    pub margin_percent: Decimal,
    /// Contas a pagar em aberto (independe dos filtros)
    #[schema(value_type = f64)]
    pub pending_payables: Decimal,
    /// Contas a receber em aberto (independe dos filtros)
    #[schema(value_type = f64)]
    pub pending_receivables: Decimal,
    /// Despesas tipo D dos grupos marcados; fora do saldo líquido
    #[schema(value_type = f64)]
    pub type_d_expenses: Decimal,
    /// CT-es que compõem o faturamento
    pub invoiced_trips: Vec<String>,
}

// 2. Séries temporais
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Início do período (dia ou primeiro dia do mês)
    pub period: NaiveDate,
    pub label: String,
    #[schema(value_type = f64)]
    pub revenue: Decimal,
    #[schema(value_type = f64)]
    pub cost: Decimal,
    #[schema(value_type = f64)]
    pub expense: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

// 3. Rankings genéricos
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedValue {
    pub name: String,
    #[schema(value_type = f64)]
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

// 4. Análise de faturamento
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDashboard {
    pub evolution: Vec<SeriesPoint>,
    pub top_clients: Vec<NamedValue>,
    pub revenue_by_branch: Vec<NamedValue>,
    pub top_routes: Vec<NamedCount>,
    pub volume_by_route: Vec<NamedValue>,
    pub trips_by_vehicle: Vec<NamedCount>,
    pub revenue_by_driver: Vec<NamedValue>,
    pub revenue_by_cargo: Vec<NamedValue>,
}

// 5. Análise de despesas
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchCategoryTotals {
    pub branch: String,
    #[schema(value_type = f64)]
    pub trip_cost: Decimal,
    #[schema(value_type = f64)]
    pub general_expense: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FuelByVehicle {
    pub plate: String,
    #[schema(value_type = f64)]
    pub value: Decimal,
    #[schema(value_type = f64)]
    pub litres: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDashboard {
    pub by_branch_and_category: Vec<BranchCategoryTotals>,
    pub top_expense_groups: Vec<NamedValue>,
    pub expense_by_branch: Vec<NamedValue>,
    pub maintenance_by_vehicle: Vec<NamedValue>,
    pub fuel_by_item: Vec<NamedValue>,
    pub fuel_by_vehicle: Vec<FuelByVehicle>,
}

/// Grupo -> números de documento (nota ou CT-e), sem repetição.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseAudit {
    pub trip_costs: BTreeMap<String, Vec<String>>,
    pub general_expenses: BTreeMap<String, Vec<String>>,
}

// 6. Relatório de uma viagem
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripReport {
    pub num_conhec: String,
    pub trip_date: Option<NaiveDate>,
    pub plate: Option<String>,
    pub driver: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[schema(value_type = f64)]
    pub distance_km: Decimal,
    pub client: Option<String>,
    pub cargo: Option<String>,
    #[schema(value_type = f64)]
    pub weight_out: Decimal,
    #[schema(value_type = f64)]
    pub weight_in: Decimal,
    #[schema(value_type = f64)]
    pub breakage_kg: Decimal,
    #[schema(value_type = f64)]
    pub gross_freight: Decimal,
    #[schema(value_type = f64)]
    pub advances: Decimal,
    #[schema(value_type = f64)]
    pub extra_charges: Decimal,
    #[schema(value_type = f64)]
    pub discounts: Decimal,
    #[schema(value_type = BTreeMap<String, f64>)]
    pub cost_by_group: BTreeMap<String, Decimal>,
    #[schema(value_type = f64)]
    pub total_costs: Decimal,
    #[schema(value_type = f64)]
    pub profit: Decimal,
    #[schema(value_type = f64)]
    pub margin_percent: Decimal,
}

// 7. Opções dos filtros
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlateEntry {
    pub plate: String,
    /// Próprio, Terceiro, Agregado ou Apoio
    pub vehicle_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub branches: Vec<String>,
    pub plates: Vec<PlateEntry>,
    pub default_window: DateWindow,
}
