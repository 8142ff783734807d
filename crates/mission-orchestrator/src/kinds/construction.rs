//! Construction at the home settlement. No vehicle travel; light utility
//! vehicles may be held for the work.

use tracing::{debug, info, warn};

use mission_core::enums::*;
use mission_core::types::*;

use crate::context::MissionContext;
use crate::mission::{MissionCore, MissionStrategy};
use crate::{recruiter, vehicle};

const PHASES: &[MissionPhase] = &[
    MissionPhase::SelectSite,
    MissionPhase::PrepareSite,
    MissionPhase::Construction,
];

#[derive(Debug, Clone, Default)]
pub struct Construction {
    site: Option<SiteId>,
    stage: Option<String>,
    /// Last time work was added to the stage.
    last_progress: Option<MarsTime>,
}

impl Construction {
    pub fn site(&self) -> Option<SiteId> {
        self.site
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Pull the stage's materials from the settlement once all are in stock.
    fn prepare(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, site: SiteId) {
        let Some(info) = ctx.colony.construction_site(site) else {
            core.end_mission(MissionStatus::ConstructionSiteNotFoundOrCreated, ctx);
            return;
        };
        if info.materials_delivered {
            core.phases.end_phase();
            return;
        }
        let in_stock = info
            .materials
            .iter()
            .all(|(r, amount)| ctx.colony.settlement_amount(info.settlement, *r) + 1e-6 >= *amount);
        if in_stock {
            for (resource, amount) in &info.materials {
                ctx.colony.retrieve_from_settlement(info.settlement, *resource, *amount);
            }
            ctx.colony.mark_materials_delivered(site);
            debug!(mission = %core.id(), site = %site, "materials delivered");
            core.phases.end_phase();
        } else if core.phases.elapsed_in_phase(ctx.now()) > ctx.config.construction.stall_timeout_millisols {
            warn!(mission = %core.id(), site = %site, "materials never arrived");
            core.end_mission(MissionStatus::ConstructionStalled, ctx);
        }
    }

    fn build(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, site: SiteId) {
        let task = Task::Construct { site };
        let mut workers = 0;
        for agent in core.member_ids() {
            if ctx.colony.current_task(agent) != Some(task) {
                if let Err(err) = ctx.colony.assign_task(agent, task) {
                    debug!(mission = %core.id(), agent = %agent, error = %err, "cannot assign construction");
                    continue;
                }
            }
            workers += 1;
        }

        let now = ctx.now();
        if workers > 0 {
            ctx.colony
                .add_construction_work(site, workers as f64 * ctx.pulse.elapsed);
            self.last_progress = Some(now);
        }
        let Some(info) = ctx.colony.construction_site(site) else {
            core.end_mission(MissionStatus::ConstructionSiteNotFoundOrCreated, ctx);
            return;
        };
        if info.stage_complete() {
            ctx.colony.complete_construction_stage(site);
            for agent in core.member_ids() {
                if ctx.colony.current_task(agent) == Some(task) {
                    ctx.colony.clear_task(agent);
                }
            }
            info!(mission = %core.id(), site = %site, stage = ?self.stage, "stage complete");
            core.phases.end_phase();
            return;
        }
        let since = self.last_progress.unwrap_or_else(|| core.phases.started_at());
        if now.since(since) > ctx.config.construction.stall_timeout_millisols {
            warn!(mission = %core.id(), site = %site, "construction stalled");
            core.end_mission(MissionStatus::ConstructionStalled, ctx);
        }
    }
}

impl MissionStrategy for Construction {
    fn phases(&self) -> &'static [MissionPhase] {
        PHASES
    }

    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        core.capacity = core.capacity.min(ctx.config.construction.max_members);
        core.min_members = ctx.config.construction.min_members;
        if !recruiter::recruit(core, ctx) {
            return;
        }

        let site = core.home().and_then(|home| {
            ctx.colony
                .unfinished_construction_site(home)
                .or_else(|| ctx.colony.create_construction_site(home))
        });
        let Some(site) = site else {
            core.end_mission(MissionStatus::ConstructionSiteNotFoundOrCreated, ctx);
            return;
        };
        self.site = Some(site.id);
        self.stage = match &site.stage {
            Some(stage) if !site.stage_complete() => Some(stage.clone()),
            _ => ctx.colony.start_next_construction_stage(site.id),
        };
        if self.stage.is_none() {
            core.end_mission(MissionStatus::NewConstructionStageNotDetermined, ctx);
            return;
        }

        let config = &ctx.config.construction;
        let (luvs, luv_required) = (config.luvs, config.luv_required);
        let reserved = (0..luvs)
            .filter_map(|_| vehicle::reserve_luv(core, ctx))
            .count();
        if luv_required && reserved == 0 {
            core.end_mission(MissionStatus::LuvNotAvailable, ctx);
            return;
        }
        info!(mission = %core.id(), site = %site.id, stage = ?self.stage, luvs = reserved, "construction planned");
    }

    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>) {
        match core.phases.current() {
            MissionPhase::Reviewing => {
                core.set_phase(MissionPhase::SelectSite, "Selecting construction site", ctx);
            }
            MissionPhase::SelectSite => {
                core.set_phase(MissionPhase::PrepareSite, "Preparing construction site", ctx);
            }
            MissionPhase::PrepareSite => {
                let stage = self.stage.clone().unwrap_or_default();
                self.last_progress = None;
                core.set_phase(MissionPhase::Construction, format!("Building {stage}"), ctx);
            }
            _ => core.end_mission(MissionStatus::MissionAccomplished, ctx),
        }
    }

    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, _agent: AgentId) {
        let Some(site) = self.site else {
            core.end_mission(MissionStatus::ConstructionSiteNotFoundOrCreated, ctx);
            return;
        };
        match core.phases.current() {
            MissionPhase::SelectSite => core.phases.end_phase(),
            MissionPhase::PrepareSite => self.prepare(core, ctx, site),
            MissionPhase::Construction => self.build(core, ctx, site),
            _ => {}
        }
    }
}
