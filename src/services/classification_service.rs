// src/services/classification_service.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    common::error::AppError,
    config::registry::{ReportRegistry, ReportRole},
    db::{ExpenseGroupStore, TableStore},
    models::{
        classification::{ClassificationFlags, ExpenseGroupFlag, GroupUpdate, SYNTHETIC_GROUPS},
        TenantId,
    },
    services::aggregation::col,
};

#[derive(Clone)]
pub struct ClassificationService {
    groups: Arc<dyn ExpenseGroupStore>,
    tables: Arc<dyn TableStore>,
    registry: Arc<ReportRegistry>,
}

impl ClassificationService {
    pub fn new(
        groups: Arc<dyn ExpenseGroupStore>,
        tables: Arc<dyn TableStore>,
        registry: Arc<ReportRegistry>,
    ) -> Self {
        Self { groups, tables, registry }
    }

    /// Garante uma linha de flags para cada grupo conhecido. Só insere;
    /// classificações já gravadas ficam intactas.
    pub async fn sync(&self, tenant_id: TenantId) -> Result<u64, AppError> {
        let mut names: Vec<String> = SYNTHETIC_GROUPS.iter().map(|g| g.to_string()).collect();

        if let Some(report) = self.registry.by_role(ReportRole::Expenses) {
            let found = self.tables.distinct_values(&report.table, tenant_id, col::GROUP).await?;
            for name in found {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let inserted = self.groups.insert_missing(tenant_id, &names).await?;
        if inserted > 0 {
            tracing::info!("✅ {} grupo(s) de despesa novo(s) para o apartamento {}", inserted, tenant_id);
        }
        Ok(inserted)
    }

    pub async fn get_all_flags(&self, tenant_id: TenantId) -> Result<ClassificationFlags, AppError> {
        self.groups.flags(tenant_id).await
    }

    /// Grupos com algum lançamento VED = 'D' gravado.
    async fn type_d_groups(&self, tenant_id: TenantId) -> Result<HashSet<String>, AppError> {
        let Some(report) = self.registry.by_role(ReportRole::Expenses) else {
            return Ok(HashSet::new());
        };
        let expenses = self.tables.load_table(&report.table, tenant_id).await?;
        Ok((0..expenses.len())
            .filter(|&r| expenses.text(r, col::VED).as_deref() == Some("D"))
            .filter_map(|r| expenses.text(r, col::GROUP))
            .collect())
    }

    /// Linhas para a tela de classificação, por nome de grupo.
    pub async fn list(&self, tenant_id: TenantId) -> Result<Vec<ExpenseGroupFlag>, AppError> {
        let flags = self.groups.flags(tenant_id).await?;
        let type_d = self.type_d_groups(tenant_id).await?;
        let mut rows: Vec<ExpenseGroupFlag> = flags
            .iter()
            .map(|(name, f)| ExpenseGroupFlag::new(name.clone(), *f, type_d.contains(name)))
            .collect();
        rows.sort_by(|a, b| a.group_name.cmp(&b.group_name));
        Ok(rows)
    }

    pub async fn update_flags(
        &self,
        tenant_id: TenantId,
        updates: &HashMap<String, GroupUpdate>,
    ) -> Result<u64, AppError> {
        let current = self.groups.flags(tenant_id).await?;
        let changes: Vec<_> = updates
            .iter()
            .map(|(name, update)| (name.trim().to_string(), update))
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, update)| {
                // Sem a flag tipo D no pedido, vale a que já estava gravada.
                let type_d = update
                    .include_in_type_d()
                    .unwrap_or_else(|| current.get(&name).is_some_and(|f| f.include_in_type_d));
                let flags = update.classification().flags().with_type_d(type_d);
                (name, flags)
            })
            .collect();

        if changes.is_empty() {
            return Err(AppError::BadRequest("Nenhum grupo informado.".into()));
        }

        let saved = self.groups.save_flags(tenant_id, &changes).await?;
        tracing::info!("Classificação de {} grupo(s) atualizada (apartamento {})", saved, tenant_id);

        self.sync(tenant_id).await?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{
            classification::{Classification, GroupFlags, BREAKAGE_GROUP, COMMISSION_GROUP},
            dataset::{Dataset, Value},
        },
    };

    fn service(store: &Arc<MemoryStore>) -> ClassificationService {
        let registry = Arc::new(ReportRegistry::embedded().unwrap());
        ClassificationService::new(store.clone(), store.clone(), registry)
    }

    async fn seed_expenses(store: &MemoryStore, tenant_id: TenantId, groups: &[&str]) {
        let registry = ReportRegistry::embedded().unwrap();
        let schema = &registry.by_role(ReportRole::Expenses).unwrap().table;
        let mut data = Dataset::new(vec!["descGrupoD".into()]);
        for g in groups {
            data.push_row(vec![Value::Text(g.to_string())]);
        }
        store.replace_all(schema, tenant_id, &data).await.unwrap();
    }

    #[tokio::test]
    async fn sync_adds_synthetic_and_discovered_groups_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        seed_expenses(&store, 1, &["DIESEL", "PEDAGIO", "DIESEL"]).await;
        let svc = service(&store);

        assert_eq!(svc.sync(1).await.unwrap(), 4);
        let flags = svc.get_all_flags(1).await.unwrap();
        assert_eq!(flags.len(), 4);
        assert_eq!(flags.get("DIESEL"), Some(GroupFlags::default()));
        assert!(flags.get(BREAKAGE_GROUP).is_some());
        assert!(flags.get(COMMISSION_GROUP).is_some());
    }

    #[tokio::test]
    async fn sync_is_additive() {
        let store = Arc::new(MemoryStore::new());
        seed_expenses(&store, 1, &["DIESEL"]).await;
        let svc = service(&store);
        svc.sync(1).await.unwrap();

        let mut updates: HashMap<String, GroupUpdate> = HashMap::new();
        updates.insert("DIESEL".to_string(), Classification::CustoViagem.into());
        svc.update_flags(1, &updates).await.unwrap();

        // Nada novo: nada muda.
        assert_eq!(svc.sync(1).await.unwrap(), 0);
        let flags = svc.get_all_flags(1).await.unwrap();
        assert_eq!(flags.get("DIESEL"), Some(Classification::CustoViagem.flags()));

        // Um grupo novo: exatamente uma linha a mais.
        seed_expenses(&store, 1, &["DIESEL", "LAVAGEM"]).await;
        assert_eq!(svc.sync(1).await.unwrap(), 1);
        let flags = svc.get_all_flags(1).await.unwrap();
        assert_eq!(flags.len(), 4);
        assert_eq!(flags.get("DIESEL"), Some(Classification::CustoViagem.flags()));
    }

    #[tokio::test]
    async fn update_creates_unknown_groups_and_resyncs() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let mut updates: HashMap<String, GroupUpdate> = HashMap::new();
        updates.insert("  SEGURO ".to_string(), Classification::Nenhum.into());
        assert_eq!(svc.update_flags(7, &updates).await.unwrap(), 1);

        let rows = svc.list(7).await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.group_name.as_str()).collect();
        assert_eq!(names, vec![COMMISSION_GROUP, "SEGURO", BREAKAGE_GROUP]);
        let seguro = rows.iter().find(|r| r.group_name == "SEGURO").unwrap();
        assert_eq!(seguro.classification, Classification::Nenhum);
        assert!(!seguro.synthetic);

        // Outro tenant não enxerga nada.
        assert!(svc.get_all_flags(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_without_names_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut updates: HashMap<String, GroupUpdate> = HashMap::new();
        updates.insert("   ".to_string(), Classification::Despesa.into());
        let err = service(&store).update_flags(1, &updates).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn type_d_flag_is_kept_when_only_the_bucket_changes() {
        let store = Arc::new(MemoryStore::new());
        let registry = ReportRegistry::embedded().unwrap();
        let schema = &registry.by_role(ReportRole::Expenses).unwrap().table;
        let mut data = Dataset::new(vec!["descGrupoD".into(), "VED".into()]);
        data.push_row(vec![Value::Text("ALUGUEL".into()), Value::Text("D".into())]);
        data.push_row(vec![Value::Text("DIESEL".into()), Value::Text("V".into())]);
        store.replace_all(schema, 1, &data).await.unwrap();
        let svc = service(&store);

        let mut updates: HashMap<String, GroupUpdate> = HashMap::new();
        updates.insert(
            "ALUGUEL".to_string(),
            GroupUpdate::Detailed { classification: Classification::Nenhum, include_in_type_d: Some(true) },
        );
        svc.update_flags(1, &updates).await.unwrap();

        let mut updates: HashMap<String, GroupUpdate> = HashMap::new();
        updates.insert("ALUGUEL".to_string(), Classification::Despesa.into());
        svc.update_flags(1, &updates).await.unwrap();

        let flags = svc.get_all_flags(1).await.unwrap();
        assert_eq!(flags.get("ALUGUEL"), Some(Classification::Despesa.flags().with_type_d(true)));

        let rows = svc.list(1).await.unwrap();
        let aluguel = rows.iter().find(|r| r.group_name == "ALUGUEL").unwrap();
        assert!(aluguel.incluir_em_tipo_d);
        assert!(aluguel.has_tipo_d);
        let diesel = rows.iter().find(|r| r.group_name == "DIESEL").unwrap();
        assert!(!diesel.incluir_em_tipo_d);
        assert!(!diesel.has_tipo_d);
    }
}
