//! In-memory stand-in for the remote collaborators, for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use worktally_core::{
    DateWindow, InstanceStatus, NewResult, Preset, ResultRecord, SurveyInstance, SurveyTemplate,
    WorkListsPayload,
};

use crate::SyncError;
use crate::api::{CatalogApi, InstanceApi, ResultApi};

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub templates: Mutex<Vec<SurveyTemplate>>,
    pub presets: Mutex<Vec<Preset>>,
    pub instances: Mutex<Vec<SurveyInstance>>,
    pub saved: Mutex<Vec<NewResult>>,
    pub results: Mutex<Vec<ResultRecord>>,
    pub discarded: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    offline: AtomicBool,
}

impl FakeRemote {
    pub fn with_templates(templates: Vec<SurveyTemplate>) -> Self {
        Self {
            templates: Mutex::new(templates),
            ..Self::default()
        }
    }

    /// Every following call fails as if the server were unreachable.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn call(&self) -> Result<(), SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Server {
                status: 503,
                message: "offline".into(),
            });
        }
        Ok(())
    }

    fn set_status(&self, instance_id: &str, status: InstanceStatus) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(inst) = instances.iter_mut().find(|i| i.id == instance_id) {
            inst.status = status;
        }
    }
}

fn template_from(id: String, payload: &WorkListsPayload) -> SurveyTemplate {
    SurveyTemplate {
        id,
        name: payload.name.clone(),
        no: payload.no.clone(),
        real_work: payload.real_work.clone(),
        incidental_work: payload.incidental_work.clone(),
        wasteful_work: payload.wasteful_work.clone(),
        created_at: None,
    }
}

#[async_trait]
impl CatalogApi for FakeRemote {
    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, SyncError> {
        self.call()?;
        Ok(self.templates.lock().unwrap().clone())
    }

    async fn create_template(&self, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.call()?;
        let mut templates = self.templates.lock().unwrap();
        let id = format!("t{}", templates.len() + 1);
        templates.push(template_from(id, payload));
        Ok(())
    }

    async fn update_template(&self, id: &str, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.call()?;
        let mut templates = self.templates.lock().unwrap();
        let slot = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SyncError::NotFound {
                kind: "template",
                id: id.to_string(),
            })?;
        *slot = template_from(id.to_string(), payload);
        Ok(())
    }

    async fn delete_templates(&self, ids: &[String]) -> Result<(), SyncError> {
        self.call()?;
        self.templates.lock().unwrap().retain(|t| !ids.contains(&t.id));
        Ok(())
    }

    async fn list_presets(&self) -> Result<Vec<Preset>, SyncError> {
        self.call()?;
        Ok(self.presets.lock().unwrap().clone())
    }

    async fn create_preset(&self, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.call()?;
        let mut presets = self.presets.lock().unwrap();
        let id = format!("p{}", presets.len() + 1);
        presets.push(Preset {
            id,
            name: payload.name.clone(),
            real_work: payload.real_work.clone(),
            incidental_work: payload.incidental_work.clone(),
            wasteful_work: payload.wasteful_work.clone(),
            created_at: None,
        });
        Ok(())
    }

    async fn update_preset(&self, _id: &str, _payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.call()
    }

    async fn delete_presets(&self, ids: &[String]) -> Result<(), SyncError> {
        self.call()?;
        self.presets.lock().unwrap().retain(|p| !ids.contains(&p.id));
        Ok(())
    }
}

#[async_trait]
impl InstanceApi for FakeRemote {
    async fn create_instance(&self, template_id: &str, template_name: &str) -> Result<String, SyncError> {
        self.call()?;
        let mut instances = self.instances.lock().unwrap();
        let id = format!("inst-{}", instances.len() + 1);
        instances.push(SurveyInstance {
            id: id.clone(),
            survey_template_id: template_id.to_string(),
            survey_template_name: Some(template_name.to_string()),
            status: InstanceStatus::InProgress,
            started_at: None,
        });
        Ok(id)
    }

    async fn list_in_progress(&self) -> Result<Vec<SurveyInstance>, SyncError> {
        self.call()?;
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status == InstanceStatus::InProgress)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResultApi for FakeRemote {
    async fn save_result(&self, result: &NewResult) -> Result<(), SyncError> {
        self.call()?;
        self.set_status(&result.instance_id, InstanceStatus::Completed);
        self.saved.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn discard_instance(&self, instance_id: &str) -> Result<(), SyncError> {
        self.call()?;
        self.set_status(instance_id, InstanceStatus::Discarded);
        self.discarded.lock().unwrap().push(instance_id.to_string());
        Ok(())
    }

    async fn query_results(&self, window: &DateWindow) -> Result<Vec<ResultRecord>, SyncError> {
        self.call()?;
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| window.contains(&r.surveyed_at))
            .cloned()
            .collect())
    }

    async fn list_all_results(&self) -> Result<Vec<ResultRecord>, SyncError> {
        self.call()?;
        Ok(self.results.lock().unwrap().clone())
    }

    async fn delete_results(&self, ids: &[String]) -> Result<(), SyncError> {
        self.call()?;
        self.results.lock().unwrap().retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}
