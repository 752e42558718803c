// src/services/dashboard_service.rs
//
// Carrega os dados do tenant, aplica os filtros e entrega ao motor de
// agregação. Cada requisição trabalha sobre o seu próprio snapshot.

use std::sync::Arc;

use crate::{
    common::error::AppError,
    config::registry::{ReportRegistry, ReportRole},
    db::TableStore,
    models::{
        classification::ClassificationFlags,
        dashboard::{
            ExpenseAudit, ExpenseDashboard, FilterOptions, FinancialSummary, RevenueDashboard,
            TimeSeries, TripReport,
        },
        dataset::Dataset,
        filter::ReportFilter,
        TenantId,
    },
    services::{
        aggregation::{self, Selection, Snapshot},
        classification_service::ClassificationService,
        robot_service::RobotService,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    tables: Arc<dyn TableStore>,
    registry: Arc<ReportRegistry>,
    classification: ClassificationService,
    robot: RobotService,
}

impl DashboardService {
    pub fn new(
        tables: Arc<dyn TableStore>,
        registry: Arc<ReportRegistry>,
        classification: ClassificationService,
        robot: RobotService,
    ) -> Self {
        Self { tables, registry, classification, robot }
    }

    async fn load_role(&self, role: ReportRole, tenant_id: TenantId) -> Result<Dataset, AppError> {
        match self.registry.by_role(role) {
            Some(report) => self.tables.load_table(&report.table, tenant_id).await,
            None => Ok(Dataset::empty()),
        }
    }

    pub async fn snapshot(&self, tenant_id: TenantId) -> Result<Snapshot, AppError> {
        Ok(Snapshot {
            trips: self.load_role(ReportRole::Trips, tenant_id).await?,
            invoices: self.load_role(ReportRole::Invoices, tenant_id).await?,
            expenses: self.load_role(ReportRole::Expenses, tenant_id).await?,
            payables: self.load_role(ReportRole::Payables, tenant_id).await?,
            receivables: self.load_role(ReportRole::Receivables, tenant_id).await?,
        })
    }

    async fn prepare(
        &self,
        tenant_id: TenantId,
        filter: &ReportFilter,
    ) -> Result<(Snapshot, Selection, ClassificationFlags), AppError> {
        let snapshot = self.snapshot(tenant_id).await?;
        let selection = aggregation::select(&snapshot, filter, &self.registry.filters);
        let flags = self.classification.get_all_flags(tenant_id).await?;
        tracing::debug!(
            "Apartamento {}: {} viagens, {} faturamentos, {} despesas após filtros",
            tenant_id,
            selection.trips.len(),
            selection.invoices.len(),
            selection.expenses.len()
        );
        Ok((snapshot, selection, flags))
    }

    pub async fn summary(&self, tenant_id: TenantId, filter: &ReportFilter) -> Result<FinancialSummary, AppError> {
        // Grupos recém-importados entram com as flags padrão.
        self.classification.sync(tenant_id).await?;
        let (snapshot, selection, flags) = self.prepare(tenant_id, filter).await?;
        let mut summary = aggregation::summary(&selection, &snapshot, &flags);
        summary.type_d_expenses = aggregation::type_d_total(&snapshot, &flags, filter, &self.registry.filters);
        Ok(summary)
    }

    pub async fn time_series(&self, tenant_id: TenantId, filter: &ReportFilter) -> Result<TimeSeries, AppError> {
        let (_, selection, flags) = self.prepare(tenant_id, filter).await?;
        Ok(aggregation::time_series(&selection, &flags, filter))
    }

    pub async fn revenue(&self, tenant_id: TenantId, filter: &ReportFilter) -> Result<RevenueDashboard, AppError> {
        let (_, selection, flags) = self.prepare(tenant_id, filter).await?;
        Ok(aggregation::revenue_dashboard(&selection, &flags, filter))
    }

    pub async fn expenses(&self, tenant_id: TenantId, filter: &ReportFilter) -> Result<ExpenseDashboard, AppError> {
        let (_, selection, flags) = self.prepare(tenant_id, filter).await?;
        Ok(aggregation::expense_dashboard(&selection, &flags))
    }

    pub async fn audit(&self, tenant_id: TenantId, filter: &ReportFilter) -> Result<ExpenseAudit, AppError> {
        let (_, selection, flags) = self.prepare(tenant_id, filter).await?;
        Ok(aggregation::expense_audit(&selection, &flags))
    }

    pub async fn trip_report(&self, tenant_id: TenantId, num_conhec: &str) -> Result<TripReport, AppError> {
        let snapshot = self.snapshot(tenant_id).await?;
        let flags = self.classification.get_all_flags(tenant_id).await?;
        aggregation::trip_report(&snapshot, &flags, num_conhec)
            .ok_or_else(|| AppError::NotFound(format!("viagem {}", num_conhec.trim())))
    }

    /// Filiais, placas e o período padrão para montar os filtros da tela.
    pub async fn filter_options(&self, tenant_id: TenantId) -> Result<FilterOptions, AppError> {
        let snapshot = self.snapshot(tenant_id).await?;
        let tables = [
            &snapshot.trips,
            &snapshot.invoices,
            &snapshot.expenses,
            &snapshot.payables,
            &snapshot.receivables,
        ];
        Ok(FilterOptions {
            branches: aggregation::branches(&tables),
            plates: aggregation::plates_with_types(&snapshot.trips, &snapshot.expenses),
            default_window: self.robot.date_window(tenant_id).await?,
        })
    }
}
