//! Command handlers. Each one opens what it needs, talks to the server
//! through [`ApiClient`], and prints through [`crate::display`].

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};
use worktally_core::aggregate::annotate;
use worktally_core::form::WorkListsDraft;
use worktally_core::{CategoryKey, Capabilities, DateWindow, PeriodReport, User};
use worktally_store::{ActiveSurvey, FileStorage, LocalStorage, SessionStore, load_active};
use worktally_sync::{
    ApiClient, AuthApi, CatalogApi, ResultApi, SurveyInstanceCoordinator, SyncError,
    commit_session, discard_session, find_result, period_report,
};

use crate::display;

pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, Copy)]
pub enum CatalogKind {
    Template,
    Preset,
}

#[derive(Debug, Clone, Copy)]
pub enum DeleteKind {
    Templates,
    Presets,
    Results,
}

/// Item lists and naming for a template or preset registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub no: Option<String>,
    pub real: Vec<String>,
    pub incidental: Vec<String>,
    pub wasteful: Vec<String>,
    pub from_preset: Option<String>,
    pub update: Option<String>,
}

/// Which results to show.
#[derive(Debug, Clone, Copy)]
pub enum Period {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
    All,
}

pub struct App {
    storage: Arc<FileStorage>,
    client: ApiClient,
}

impl App {
    pub fn open(api_url: String, data_dir: PathBuf) -> anyhow::Result<Self> {
        let storage = Arc::new(FileStorage::open(data_dir)?);
        let mut client = ApiClient::new(api_url);
        client.set_token(load_token(&*storage)?);
        Ok(Self { storage, client })
    }

    // ── Auth ──

    pub async fn login(&mut self, company: &str, user_id: &str, password: Option<String>) -> anyhow::Result<()> {
        let password = match password {
            Some(p) => p,
            None => prompt("Password: ")?,
        };
        let login = self.client.login(company, user_id, &password).await?;
        save_token(&*self.storage, &login.token)?;
        self.client.set_token(Some(login.token));
        display::print_user(&login.user);
        Ok(())
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.client.set_token(None);
        println!("Logged out.");
        Ok(())
    }

    pub async fn whoami(&self) -> anyhow::Result<()> {
        display::print_user(&self.current_user().await?);
        Ok(())
    }

    async fn current_user(&self) -> anyhow::Result<User> {
        let token = self.client.token().ok_or(SyncError::Unauthorized)?;
        Ok(self.client.verify_token(token).await?)
    }

    async fn require(&self, allowed: fn(&Capabilities) -> bool, action: &str) -> anyhow::Result<User> {
        let user = self.current_user().await?;
        if !allowed(&user.capabilities()) {
            bail!("{action} is not available to {:?} users", user.role);
        }
        Ok(user)
    }

    // ── Catalog ──

    pub async fn templates(&self) -> anyhow::Result<()> {
        display::print_templates(&self.client.list_templates().await?);
        Ok(())
    }

    pub async fn presets(&self) -> anyhow::Result<()> {
        display::print_presets(&self.client.list_presets().await?);
        Ok(())
    }

    pub async fn register(&self, kind: CatalogKind, reg: Registration) -> anyhow::Result<()> {
        self.require(|c| c.can_manage_templates, "registering").await?;

        let mut draft = match &reg.from_preset {
            Some(id) => {
                let presets = self.client.list_presets().await?;
                let preset = presets
                    .iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| SyncError::NotFound {
                        kind: "preset",
                        id: id.clone(),
                    })?;
                WorkListsDraft::from_preset(preset)
            }
            None => WorkListsDraft::default(),
        };
        draft.name = reg.name;
        draft.no = reg.no.unwrap_or_default();
        for (category, items) in [
            (CategoryKey::Real, reg.real),
            (CategoryKey::Incidental, reg.incidental),
            (CategoryKey::Wasteful, reg.wasteful),
        ] {
            let list = draft.list_mut(category);
            for item in items {
                list.push(item);
            }
        }

        match (kind, reg.update) {
            (CatalogKind::Template, None) => {
                self.client.create_template(&draft.to_template_payload()?).await?
            }
            (CatalogKind::Template, Some(id)) => {
                self.client.update_template(&id, &draft.to_template_payload()?).await?
            }
            (CatalogKind::Preset, None) => self.client.create_preset(&draft.to_preset_payload()?).await?,
            (CatalogKind::Preset, Some(id)) => {
                self.client.update_preset(&id, &draft.to_preset_payload()?).await?
            }
        }
        println!("Saved \"{}\".", draft.name.trim());
        Ok(())
    }

    pub async fn delete(&self, kind: DeleteKind, ids: &[String], yes: bool) -> anyhow::Result<()> {
        match kind {
            DeleteKind::Templates | DeleteKind::Presets => {
                self.require(|c| c.can_manage_templates, "deleting templates").await?
            }
            DeleteKind::Results => self.require(|c| c.can_manage_data, "deleting results").await?,
        };
        if !yes && !confirm(&format!("Delete {} item(s)?", ids.len()))? {
            println!("Cancelled.");
            return Ok(());
        }
        match kind {
            DeleteKind::Templates => self.client.delete_templates(ids).await?,
            DeleteKind::Presets => self.client.delete_presets(ids).await?,
            DeleteKind::Results => self.client.delete_results(ids).await?,
        }
        println!("Deleted {} item(s).", ids.len());
        Ok(())
    }

    // ── Counting ──

    fn coordinator(&self) -> anyhow::Result<SurveyInstanceCoordinator<ApiClient, Arc<FileStorage>>> {
        Ok(SurveyInstanceCoordinator::new(
            self.client.clone(),
            Arc::clone(&self.storage),
        )?)
    }

    pub async fn start(&self, template_id: &str, yes: bool) -> anyhow::Result<()> {
        let mut coordinator = self.coordinator()?;
        coordinator.refresh_templates().await?;
        let template = coordinator
            .find_template(template_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                kind: "template",
                id: template_id.to_string(),
            })?;

        let started = coordinator
            .start_new(&template, |t| {
                yes || confirm_or_decline(&mut io::stdin().lock(), &format!("Start a new \"{}\" survey?", t.name))
            })
            .await?;
        let Some(active) = started else {
            println!("Cancelled.");
            return Ok(());
        };
        self.show_active(&active)
    }

    pub async fn resume(&self, instance_id: Option<&str>) -> anyhow::Result<()> {
        let mut coordinator = self.coordinator()?;
        coordinator.refresh_templates().await?;
        match instance_id {
            None => {
                display::print_resumable(&coordinator.list_resumable().await?);
                Ok(())
            }
            Some(id) => {
                let active = coordinator.resume_by_id(id).await?;
                self.show_active(&active)
            }
        }
    }

    fn active(&self) -> anyhow::Result<ActiveSurvey> {
        load_active(&*self.storage)?
            .context("no active survey, run `worktally start` or `worktally resume` first")
    }

    fn open_session(&self, active: &ActiveSurvey) -> anyhow::Result<SessionStore<Arc<FileStorage>>> {
        let mut session = SessionStore::new(Arc::clone(&self.storage));
        session.initialize(&active.instance_id, &active.template)?;
        Ok(session)
    }

    fn show_active(&self, active: &ActiveSurvey) -> anyhow::Result<()> {
        let session = self.open_session(active)?;
        display::print_session_card(
            &active.instance_id,
            &active.template,
            &session.counts(),
            &session.metrics(),
        );
        Ok(())
    }

    pub fn count(&self, category: CategoryKey, item: &str, subtract: bool, times: u32) -> anyhow::Result<()> {
        let active = self.active()?;
        let mut session = self.open_session(&active)?;
        session.set_subtract_mode(subtract);
        let mut count = session.count(category, item);
        for _ in 0..times {
            count = session.tap(category, item)?;
        }
        debug!(instance_id = %active.instance_id, %category, item, count, "tapped");
        println!("{category}-{item}: {count} (total {})", session.total_count());
        Ok(())
    }

    pub fn show(&self) -> anyhow::Result<()> {
        self.show_active(&self.active()?)
    }

    pub async fn finish(&self) -> anyhow::Result<()> {
        let active = self.active()?;
        let mut session = self.open_session(&active)?;
        let metrics = session.metrics();
        let saved = commit_session(&mut session, &self.client).await?;
        println!("Saved result for \"{}\".", saved.survey_name);
        display::print_metrics(&metrics);
        Ok(())
    }

    pub async fn discard(&self, yes: bool) -> anyhow::Result<()> {
        let active = self.active()?;
        if !yes && !confirm(&format!("Discard the \"{}\" survey?", active.template.name))? {
            println!("Cancelled.");
            return Ok(());
        }
        let mut session = self.open_session(&active)?;
        let instance_id = discard_session(&mut session, &self.client).await?;
        println!("Discarded {instance_id}.");
        Ok(())
    }

    // ── Summary ──

    pub async fn results(&self, period: Period) -> anyhow::Result<()> {
        self.require(|c| c.can_view_summary, "the summary").await?;
        let templates = self.client.list_templates().await?;
        let report = match period {
            Period::All => {
                let records = self.client.list_all_results().await?;
                PeriodReport::build(annotate(records, &templates))
            }
            Period::Day(day) => {
                let window = DateWindow::day(day, &Local)?;
                period_report(&self.client, &templates, &window).await?
            }
            Period::Range(first, last) => {
                let window = DateWindow::range(first, last, &Local)?;
                period_report(&self.client, &templates, &window).await?
            }
        };
        info!(rows = report.rows.len(), columns = report.columns.len(), "period report");
        display::print_period_report(&report)
    }

    pub async fn result_detail(&self, result_id: &str) -> anyhow::Result<()> {
        self.require(|c| c.can_view_summary, "the summary").await?;
        let templates = self.client.list_templates().await?;
        let detail = find_result(&self.client, &templates, result_id).await?;
        display::print_result_detail(&detail);
        Ok(())
    }
}

pub fn load_token<S: LocalStorage + ?Sized>(storage: &S) -> anyhow::Result<Option<String>> {
    let Some(raw) = storage.get(TOKEN_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<String>(&raw) {
        Ok(token) => Ok(Some(token)),
        Err(_) => {
            debug!("stored token unreadable, ignoring");
            Ok(None)
        }
    }
}

pub fn save_token<S: LocalStorage + ?Sized>(storage: &S, token: &str) -> anyhow::Result<()> {
    storage.set(TOKEN_KEY, &serde_json::to_string(token)?)?;
    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> io::Result<bool> {
    confirm_with(&mut io::stdin().lock(), question)
}

fn confirm_with<R: BufRead>(input: &mut R, question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let answer = read_answer(input)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// For callers that cannot propagate the error: an unreadable answer counts
/// as "no", with a warning so the cancellation is not silent.
fn confirm_or_decline<R: BufRead>(input: &mut R, question: &str) -> bool {
    match confirm_with(input, question) {
        Ok(answer) => answer,
        Err(err) => {
            warn!(error = %err, "could not read confirmation, declining");
            false
        }
    }
}
