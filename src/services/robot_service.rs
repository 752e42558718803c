// src/services/robot_service.rs
//
// Lado do painel na integração com o robô de coleta: configurações,
// log de progresso e o processamento da pasta de downloads.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RobotStore,
    models::{
        import::ImportReport,
        robot::{DateWindow, RobotJob, RobotLogEntry, END_DATE_KEY, START_DATE_KEY},
        TenantId,
    },
    services::import_service::ImportService,
};

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct RobotService {
    store: Arc<dyn RobotStore>,
    imports: ImportService,
    downloads_dir: PathBuf,
    // Tenants com processamento em andamento.
    running: Arc<Mutex<HashSet<TenantId>>>,
}

// Libera o tenant quando o job termina (inclusive em pânico).
struct JobSlot {
    running: Arc<Mutex<HashSet<TenantId>>>,
    tenant_id: TenantId,
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.tenant_id);
        }
    }
}

fn parse_setting_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"))
}

impl RobotService {
    pub fn new(store: Arc<dyn RobotStore>, imports: ImportService, downloads_dir: PathBuf) -> Self {
        Self {
            store,
            imports,
            downloads_dir,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn settings(&self, tenant_id: TenantId) -> Result<HashMap<String, String>, AppError> {
        self.store.settings(tenant_id).await
    }

    /// Grava as chaves informadas; `None` mantém o valor atual.
    pub async fn save_settings(
        &self,
        tenant_id: TenantId,
        settings: HashMap<String, Option<String>>,
    ) -> Result<usize, AppError> {
        let values: Vec<(String, String)> = settings
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.trim().to_string(), v)))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        if !values.is_empty() {
            self.store.save_settings(tenant_id, &values).await?;
        }
        Ok(values.len())
    }

    /// Período padrão dos relatórios (datas configuradas para o robô).
    pub async fn date_window(&self, tenant_id: TenantId) -> Result<DateWindow, AppError> {
        let settings = self.store.settings(tenant_id).await?;
        let default = DateWindow::default();
        let read = |key: &str| settings.get(key).and_then(|v| parse_setting_date(v));

        Ok(DateWindow {
            start: read(START_DATE_KEY).unwrap_or(default.start),
            end: read(END_DATE_KEY).unwrap_or(default.end),
        })
    }

    pub async fn logs(&self, tenant_id: TenantId, limit: Option<i64>) -> Result<Vec<RobotLogEntry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
        self.store.logs(tenant_id, limit).await
    }

    pub fn is_running(&self, tenant_id: TenantId) -> bool {
        self.running.lock().map(|r| r.contains(&tenant_id)).unwrap_or(false)
    }

    fn acquire(&self, tenant_id: TenantId) -> Result<JobSlot, AppError> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("lock de jobs envenenado")))?;
        if !running.insert(tenant_id) {
            return Err(AppError::RobotBusy(tenant_id));
        }
        Ok(JobSlot { running: self.running.clone(), tenant_id })
    }

    /// Enfileira o processamento da pasta do tenant. Um job por tenant.
    pub async fn submit_job(&self, tenant_id: TenantId) -> Result<RobotJob, AppError> {
        let slot = self.acquire(tenant_id)?;
        let job_id = Uuid::new_v4();
        self.log(tenant_id, &format!("Processamento {} enfileirado", job_id)).await;

        let service = self.clone();
        tokio::spawn(async move {
            let _slot = slot;
            let imported = service.process_downloads(tenant_id).await;
            tracing::info!("Job {} do apartamento {} concluído: {} arquivo(s)", job_id, tenant_id, imported.len());
        });

        Ok(RobotJob { job_id, tenant_id, status: "queued".to_string() })
    }

    fn tenant_dir(&self, tenant_id: TenantId) -> PathBuf {
        self.downloads_dir.join(tenant_id.to_string())
    }

    /// Importa as planilhas reconhecidas e apaga cada uma após o sucesso.
    /// Falhas vão para o log e não interrompem os demais arquivos.
    pub async fn process_downloads(&self, tenant_id: TenantId) -> Vec<ImportReport> {
        let dir = self.tenant_dir(tenant_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Pasta de downloads {} indisponível: {}", dir.display(), e);
                self.log(tenant_id, &format!("Pasta de downloads não encontrada: {}", dir.display())).await;
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if is_spreadsheet(&path) {
                        files.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Erro ao listar {}: {}", dir.display(), e);
                    break;
                }
            }
        }
        files.sort();

        let mut imported = Vec::new();
        for path in files {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
            match self.imports.import_file(&path, tenant_id).await {
                Ok(report) => {
                    self.log(tenant_id, &format!("✅ {} importado ({} linhas)", name, report.rows_written)).await;
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::warn!("Não foi possível apagar {}: {}", path.display(), e);
                    }
                    imported.push(report);
                }
                Err(AppError::UnknownReport(_)) => {
                    self.log(tenant_id, &format!("Arquivo não reconhecido ignorado: {}", name)).await;
                }
                Err(e) => {
                    tracing::error!("Falha ao importar {}: {:?}", path.display(), e);
                    self.log(tenant_id, &format!("❌ Falha ao importar {}: {}", name, e)).await;
                }
            }
        }
        imported
    }

    // Log de progresso nunca derruba o job.
    async fn log(&self, tenant_id: TenantId, message: &str) {
        if let Err(e) = self.store.append_log(tenant_id, message).await {
            tracing::error!("Falha ao gravar log do robô: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::registry::ReportRegistry,
        db::MemoryStore,
        services::classification_service::ClassificationService,
    };

    fn service(store: &Arc<MemoryStore>, dir: PathBuf) -> RobotService {
        let registry = Arc::new(ReportRegistry::embedded().unwrap());
        let classification = ClassificationService::new(store.clone(), store.clone(), registry.clone());
        let imports = ImportService::new(store.clone(), registry, classification);
        RobotService::new(store.clone(), imports, dir)
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("painel-frete-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn settings_skip_nulls_and_feed_the_date_window() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, scratch_dir());

        assert_eq!(svc.date_window(1).await.unwrap(), DateWindow::default());

        let mut settings = HashMap::new();
        settings.insert(START_DATE_KEY.to_string(), Some("01/02/2024".to_string()));
        settings.insert(END_DATE_KEY.to_string(), Some("2024-02-29".to_string()));
        settings.insert("OUTRA".to_string(), None);
        assert_eq!(svc.save_settings(1, settings).await.unwrap(), 2);

        let window = svc.date_window(1).await.unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(!svc.settings(1).await.unwrap().contains_key("OUTRA"));
        assert!(svc.settings(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_dates_fall_back_to_the_default_window() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, scratch_dir());
        let mut settings = HashMap::new();
        settings.insert(START_DATE_KEY.to_string(), Some("ontem".to_string()));
        svc.save_settings(1, settings).await.unwrap();
        assert_eq!(svc.date_window(1).await.unwrap().start, DateWindow::default().start);
    }

    #[tokio::test]
    async fn one_job_per_tenant() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, scratch_dir());

        svc.submit_job(1).await.unwrap();
        let err = svc.submit_job(1).await.unwrap_err();
        assert!(matches!(err, AppError::RobotBusy(1)));
        // Outro tenant não espera.
        svc.submit_job(2).await.unwrap();

        for _ in 0..200 {
            if !svc.is_running(1) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!svc.is_running(1));
        svc.submit_job(1).await.unwrap();
    }

    #[tokio::test]
    async fn missing_folder_is_logged() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, scratch_dir());
        assert!(svc.process_downloads(3).await.is_empty());

        let logs = svc.logs(3, None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("não encontrada"));
    }

    #[tokio::test]
    async fn unknown_and_broken_files_are_kept() {
        let store = Arc::new(MemoryStore::new());
        let root = scratch_dir();
        let dir = root.join("5");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("outro.xls"), b"nada").unwrap();
        std::fs::write(dir.join("relFilViagensCliente.xls"), b"corrompido").unwrap();
        std::fs::write(dir.join("leia-me.txt"), b"texto").unwrap();

        let svc = service(&store, root.clone());
        assert!(svc.process_downloads(5).await.is_empty());

        assert!(dir.join("outro.xls").exists());
        assert!(dir.join("relFilViagensCliente.xls").exists());
        let logs = svc.logs(5, Some(10)).await.unwrap();
        // Mais recentes primeiro.
        assert!(logs[0].message.contains("relFilViagensCliente.xls"));
        assert!(logs[1].message.contains("outro.xls"));

        std::fs::remove_dir_all(root).unwrap();
    }
}
