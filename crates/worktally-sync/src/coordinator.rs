//! Starting and resuming survey instances.
//!
//! The coordinator keeps the template list fetched from the catalog and
//! joins remote instances against it. Exactly one survey is active at a
//! time; its pointer lives in local storage so it survives a restart.

use tracing::{debug, info, warn};
use worktally_core::{SurveyInstance, SurveyTemplate};
use worktally_store::{ActiveSurvey, LocalStorage, clear_active, load_active, save_active};

use crate::SyncError;
use crate::api::{CatalogApi, InstanceApi};

/// Shown for in-progress instances whose template is gone.
pub const UNKNOWN_TEMPLATE_LABEL: &str = "unknown template";

/// An in-progress instance offered for resumption.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumableInstance {
    pub instance: SurveyInstance,
    pub display_name: String,
}

pub struct SurveyInstanceCoordinator<A, S> {
    api: A,
    storage: S,
    templates: Vec<SurveyTemplate>,
    active: Option<ActiveSurvey>,
}

impl<A, S> SurveyInstanceCoordinator<A, S>
where
    A: CatalogApi + InstanceApi,
    S: LocalStorage,
{
    /// Picks up the active survey left in `storage`, if any. Templates start
    /// empty until [`Self::refresh_templates`].
    pub fn new(api: A, storage: S) -> Result<Self, SyncError> {
        let active = load_active(&storage)?;
        if let Some(a) = &active {
            debug!(instance_id = %a.instance_id, "found active survey");
        }
        Ok(Self {
            api,
            storage,
            templates: Vec::new(),
            active,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn refresh_templates(&mut self) -> Result<&[SurveyTemplate], SyncError> {
        self.templates = self.api.list_templates().await?;
        info!(count = self.templates.len(), "templates refreshed");
        Ok(&self.templates)
    }

    pub fn templates(&self) -> &[SurveyTemplate] {
        &self.templates
    }

    pub fn find_template(&self, id: &str) -> Option<&SurveyTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// In-progress instances, each labelled with its template's name.
    pub async fn list_resumable(&self) -> Result<Vec<ResumableInstance>, SyncError> {
        let instances = self.api.list_in_progress().await?;
        Ok(instances
            .into_iter()
            .map(|instance| {
                let display_name = match self.find_template(&instance.survey_template_id) {
                    Some(t) => t.name.clone(),
                    None => UNKNOWN_TEMPLATE_LABEL.to_string(),
                };
                ResumableInstance {
                    instance,
                    display_name,
                }
            })
            .collect())
    }

    /// Open a new instance of `template` once `confirm` agrees. A declined
    /// confirmation makes no remote call and returns `None`.
    pub async fn start_new<F>(
        &mut self,
        template: &SurveyTemplate,
        confirm: F,
    ) -> Result<Option<ActiveSurvey>, SyncError>
    where
        F: FnOnce(&SurveyTemplate) -> bool,
    {
        if !confirm(template) {
            debug!(template_id = %template.id, "start declined");
            return Ok(None);
        }
        let instance_id = self
            .api
            .create_instance(&template.id, &template.name)
            .await?;
        info!(instance_id = %instance_id, template = %template.name, "survey started");
        let active = ActiveSurvey {
            instance_id,
            template: template.clone(),
        };
        self.activate(active.clone())?;
        Ok(Some(active))
    }

    /// Continue `instance` with its template from the fetched list.
    pub fn resume(&mut self, instance: &SurveyInstance) -> Result<ActiveSurvey, SyncError> {
        let Some(template) = self.find_template(&instance.survey_template_id) else {
            warn!(
                instance_id = %instance.id,
                template_id = %instance.survey_template_id,
                "cannot resume, template missing"
            );
            return Err(SyncError::NotFound {
                kind: "template",
                id: instance.survey_template_id.clone(),
            });
        };
        let active = ActiveSurvey {
            instance_id: instance.id.clone(),
            template: template.clone(),
        };
        info!(instance_id = %active.instance_id, template = %active.template.name, "survey resumed");
        self.activate(active.clone())?;
        Ok(active)
    }

    /// Resume by instance id, looking the instance up among the in-progress
    /// ones.
    pub async fn resume_by_id(&mut self, instance_id: &str) -> Result<ActiveSurvey, SyncError> {
        let instances = self.api.list_in_progress().await?;
        let instance = instances
            .iter()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| SyncError::NotFound {
                kind: "survey instance",
                id: instance_id.to_string(),
            })?;
        self.resume(instance)
    }

    pub fn active(&self) -> Option<&ActiveSurvey> {
        self.active.as_ref()
    }

    pub fn clear_active(&mut self) -> Result<(), SyncError> {
        clear_active(&self.storage)?;
        self.active = None;
        Ok(())
    }

    fn activate(&mut self, active: ActiveSurvey) -> Result<(), SyncError> {
        save_active(&self.storage, &active)?;
        self.active = Some(active);
        Ok(())
    }
}
