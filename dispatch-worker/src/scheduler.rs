//! Campaign scheduler - walks each campaign's recipients with pacing.
//!
//! Every tick reloads all collections from the store and processes the
//! campaigns in stored order. After each recipient the whole campaign
//! collection is written back, so a killed process resumes at the stored
//! cursor on its next tick.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::model::{Campaign, CampaignStatus, Identity, MessageTemplate, Pacing};
use crate::pacing::{pick_delay, Sleeper};
use crate::render::render;
use crate::store::Store;

/// Counters for one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub attempts: usize,
    pub failures: usize,
    pub completed: usize,
}

pub struct Scheduler<S, G, Z> {
    store: S,
    gateway: G,
    sleeper: Z,
    rng: StdRng,
    default_pacing: Pacing,
    interval: Duration,
}

/// Resolve the identities a campaign rotates through, in rotation order.
///
/// Explicit ids are matched against the pool by stable id and unknown ids
/// are dropped; no ids means the whole pool.
pub fn effective_identities(campaign: &Campaign, pool: &[Identity]) -> Vec<Identity> {
    if campaign.identity_ids.is_empty() {
        return pool.to_vec();
    }
    campaign
        .identity_ids
        .iter()
        .filter_map(|id| pool.iter().find(|identity| &identity.id == id))
        .cloned()
        .collect()
}

/// Template for the campaign, falling back to the first one.
fn select_template(templates: &[MessageTemplate], index: usize) -> Option<&MessageTemplate> {
    templates.get(index).or_else(|| templates.first())
}

impl<S, G, Z> Scheduler<S, G, Z>
where
    S: Store,
    G: Gateway,
    Z: Sleeper,
{
    pub fn new(store: S, gateway: G, sleeper: Z, rng: StdRng) -> Self {
        Self {
            store,
            gateway,
            sleeper,
            rng,
            default_pacing: Pacing::default(),
            interval: Duration::from_secs(3),
        }
    }

    pub fn with_default_pacing(mut self, pacing: Pacing) -> Self {
        self.default_pacing = pacing;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run ticks until `shutdown` flips to true. Errors from one tick are
    /// logged and the next tick starts after the scan interval.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "scheduler_started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.tick() => match result {
                    Ok(summary) if summary.attempts > 0 || summary.completed > 0 => info!(
                        attempts = summary.attempts,
                        failures = summary.failures,
                        completed = summary.completed,
                        "scheduler_tick_complete"
                    ),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "scheduler_tick_failed"),
                },
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.sleeper.sleep(self.interval) => {}
            }
        }

        info!("scheduler_stopped");
    }

    /// Load everything and advance every unfinished campaign.
    pub async fn tick(&mut self) -> Result<TickSummary> {
        let identities = self.store.load_identities()?;
        let templates = self.store.load_templates()?;
        let mut campaigns = self.store.load_campaigns()?;
        let mut summary = TickSummary::default();

        for idx in 0..campaigns.len() {
            if campaigns[idx].is_completed() {
                continue;
            }

            let Some(template) = select_template(&templates, campaigns[idx].template_index) else {
                warn!("scheduler_no_templates");
                break;
            };

            if campaigns[idx].recipients.is_empty() {
                campaigns[idx].status = CampaignStatus::Completed;
                self.store.save_campaigns(&campaigns)?;
                summary.completed += 1;
                info!(campaign = %campaigns[idx].name, "campaign_completed_empty");
                continue;
            }

            let rotation = effective_identities(&campaigns[idx], &identities);
            if rotation.is_empty() {
                warn!(campaign = %campaigns[idx].name, "scheduler_no_identities");
                continue;
            }

            self.run_campaign(&mut campaigns, idx, template, &rotation, &mut summary)
                .await?;
        }

        Ok(summary)
    }

    async fn run_campaign(
        &mut self,
        campaigns: &mut [Campaign],
        idx: usize,
        template: &MessageTemplate,
        rotation: &[Identity],
        summary: &mut TickSummary,
    ) -> Result<()> {
        let pacing = campaigns[idx].pacing.unwrap_or(self.default_pacing);
        let pause = campaigns[idx].pause;
        let total = campaigns[idx].recipients.len();

        if campaigns[idx].cursor > total {
            warn!(
                campaign = %campaigns[idx].name,
                cursor = campaigns[idx].cursor,
                total = total,
                "campaign_cursor_clamped"
            );
            campaigns[idx].cursor = total;
        }

        campaigns[idx].status = CampaignStatus::InProgress;
        info!(
            campaign = %campaigns[idx].name,
            cursor = campaigns[idx].cursor,
            total = total,
            identities = rotation.len(),
            "campaign_resuming"
        );

        for i in campaigns[idx].cursor..total {
            let identity = &rotation[i % rotation.len()];
            let recipient = campaigns[idx].recipients[i].clone();

            let outcome = match render(template) {
                Ok(message) => self.gateway.send(identity, &recipient, &message).await,
                Err(e) => Err(e),
            };
            let delivered = match outcome {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        campaign = %campaigns[idx].name,
                        identity = %identity.name,
                        recipient = %recipient,
                        error = %e,
                        "campaign_send_failed"
                    );
                    summary.failures += 1;
                    false
                }
            };

            campaigns[idx].record_attempt(delivered);
            summary.attempts += 1;
            self.store.save_campaigns(campaigns)?;

            if i + 1 == total {
                break;
            }

            let attempts = campaigns[idx].cursor as u64;
            let delay = if pause.is_due(attempts) {
                info!(
                    campaign = %campaigns[idx].name,
                    attempts = attempts,
                    pause_ms = pause.duration_ms,
                    "campaign_pausing"
                );
                Duration::from_millis(pause.duration_ms)
            } else {
                pick_delay(&mut self.rng, pacing)
            };
            self.sleeper.sleep(delay).await;
        }

        campaigns[idx].status = CampaignStatus::Completed;
        self.store.save_campaigns(campaigns)?;
        summary.completed += 1;

        info!(
            campaign = %campaigns[idx].name,
            success_count = campaigns[idx].success_count,
            failure_count = campaigns[idx].failure_count,
            "campaign_completed"
        );
        Ok(())
    }
}
