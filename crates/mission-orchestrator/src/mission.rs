//! The mission lifecycle shared by every mission kind.
//!
//! A [`Mission`] pairs a [`MissionCore`] (identity, phases, statuses,
//! members, plan, vehicle) with a boxed [`MissionStrategy`] that supplies
//! the kind-specific behavior. The core holds all ending and membership
//! logic so a strategy can end the mission or drop a member directly.

use tracing::{debug, info, warn};

use mission_core::config::MissionConfig;
use mission_core::enums::*;
use mission_core::events::MissionEventKind;
use mission_core::state::{MemberView, MissionView};
use mission_core::types::*;

use crate::context::{Colony, MissionContext};
use crate::kinds;
use crate::ledger::{self, ResourceLedger, TripDemand};
use crate::navigation::NavigationPlan;
use crate::phase::PhaseMachine;
use crate::status::StatusHistory;
use crate::vehicle::{self, Travel};

/// An agent on a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub agent: AgentId,
    pub role: MemberRole,
}

/// A mission plan awaiting or past review.
#[derive(Debug, Clone, Copy)]
pub struct MissionPlan {
    pub status: PlanStatus,
    pub submitted_at: MarsTime,
}

/// Kind-specific mission behavior.
///
/// Shared phases (`Reviewing`, and for vehicle missions `Embarking`,
/// `Travelling`, `Disembarking`) are performed by [`Mission`]; the strategy
/// performs its own phases and decides every transition.
pub trait MissionStrategy {
    /// Kind-specific phases, registered after the shared ones.
    fn phases(&self) -> &'static [MissionPhase];

    /// Reserve, recruit and plan. Ends the mission on failure.
    fn initialize(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>);

    /// Called when the current phase has ended.
    fn determine_new_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>);

    /// Perform one tick of a kind-specific phase.
    fn perform_phase(&mut self, core: &mut MissionCore, ctx: &mut MissionContext<'_>, agent: AgentId);

    /// Inputs for the remaining-trip estimate.
    fn demand(&self, _core: &MissionCore, _colony: &dyn Colony, _config: &MissionConfig) -> TripDemand {
        TripDemand::default()
    }
}

/// Missions that follow a navigation plan.
pub trait HasNavigation {
    fn navigation(&self) -> Option<&NavigationPlan>;
    fn vehicle(&self) -> Option<VehicleId>;
}

/// Missions that provision a vehicle for a trip.
pub trait HasResourceLedger {
    fn estimate_remaining_resources(&self, colony: &dyn Colony, config: &MissionConfig, use_buffer: bool) -> ResourceLedger;
    fn is_loadable(&self, colony: &dyn Colony, config: &MissionConfig) -> bool;
    fn is_loaded(&self, colony: &dyn Colony, config: &MissionConfig) -> bool;
}

/// State shared by all mission kinds.
pub struct MissionCore {
    id: MissionId,
    kind: MissionKind,
    name: String,
    description: String,
    pub(crate) phases: PhaseMachine,
    done: bool,
    statuses: StatusHistory,
    pub(crate) capacity: usize,
    pub(crate) min_members: usize,
    members: Vec<Member>,
    starter: AgentId,
    home: Option<SettlementId>,
    plan: Option<MissionPlan>,
    pub(crate) travel: Option<Travel>,
    /// Extra vehicles held for the mission (LUVs, rescue targets).
    pub(crate) reserved_vehicles: Vec<VehicleId>,
    pub(crate) claimed_sites: Vec<SiteId>,
    created_at: MarsTime,
}

impl MissionCore {
    fn new(id: MissionId, kind: MissionKind, starter: AgentId, home: Option<SettlementId>, now: MarsTime) -> Self {
        Self {
            id,
            kind,
            name: format!("{} {}", kind.name(), id.0),
            description: kind.name().to_string(),
            phases: PhaseMachine::default(),
            done: false,
            statuses: StatusHistory::default(),
            capacity: kind.default_capacity(),
            min_members: kind.default_min_members(),
            members: Vec::new(),
            starter,
            home,
            plan: None,
            travel: None,
            reserved_vehicles: Vec::new(),
            claimed_sites: Vec::new(),
            created_at: now,
        }
    }

    pub fn id(&self) -> MissionId {
        self.id
    }

    pub fn kind(&self) -> MissionKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn phase(&self) -> Option<MissionPhase> {
        self.phases.current_opt()
    }

    pub fn phase_description(&self) -> &str {
        self.phases.description()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn statuses(&self) -> &[MissionStatus] {
        self.statuses.as_slice()
    }

    pub fn has_status(&self, status: &MissionStatus) -> bool {
        self.statuses.contains(status)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<AgentId> {
        self.members.iter().map(|m| m.agent).collect()
    }

    pub fn is_member(&self, agent: AgentId) -> bool {
        self.members.iter().any(|m| m.agent == agent)
    }

    pub fn starter(&self) -> AgentId {
        self.starter
    }

    /// First member, falling back to the starter once disbanded.
    pub fn lead(&self) -> AgentId {
        self.members.first().map_or(self.starter, |m| m.agent)
    }

    pub fn home(&self) -> Option<SettlementId> {
        self.home
    }

    pub fn plan(&self) -> Option<&MissionPlan> {
        self.plan.as_ref()
    }

    pub fn travel(&self) -> Option<&Travel> {
        self.travel.as_ref()
    }

    pub fn vehicle(&self) -> Option<VehicleId> {
        self.travel.as_ref().map(|t| t.vehicle)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_members(&self) -> usize {
        self.min_members
    }

    pub fn created_at(&self) -> MarsTime {
        self.created_at
    }

    /// Enter a registered phase.
    ///
    /// # Panics
    /// If `phase` was not registered for this mission.
    pub fn set_phase(&mut self, phase: MissionPhase, description: impl Into<String>, ctx: &mut MissionContext<'_>) {
        let from = self.phases.set_phase(phase, description, ctx.now());
        info!(mission = %self.id, from = ?from, to = %phase, "phase changed");
        ctx.emit(self.id, MissionEventKind::PhaseChanged { from, to: phase });
    }

    /// Append a status tag unless present. No-op once the mission is done.
    pub fn add_status(&mut self, status: MissionStatus, ctx: &mut MissionContext<'_>) -> bool {
        if self.done {
            warn!(mission = %self.id, status = %status, "status ignored on a closed mission");
            return false;
        }
        if !self.statuses.add(status.clone()) {
            return false;
        }
        debug!(mission = %self.id, status = %status, "status added");
        ctx.emit(self.id, MissionEventKind::StatusAdded { status });
        true
    }

    /// Add a member. Fails for duplicates, closed missions, and agents the
    /// colony refuses to assign.
    pub fn add_member(&mut self, agent: AgentId, role: MemberRole, ctx: &mut MissionContext<'_>) -> bool {
        if self.done || self.is_member(agent) {
            return false;
        }
        if let Err(err) = ctx.colony.set_agent_mission(agent, Some(self.id)) {
            warn!(mission = %self.id, agent = %agent, error = %err, "cannot add member");
            return false;
        }
        self.members.push(Member { agent, role });
        debug!(mission = %self.id, agent = %agent, role = ?role, "member added");
        ctx.emit(self.id, MissionEventKind::MemberAdded { agent, role });
        true
    }

    /// Remove a member. Dropping below the minimum ends the mission with
    /// `NotEnoughMembers`, except for construction.
    pub fn remove_member(&mut self, agent: AgentId, ctx: &mut MissionContext<'_>) {
        let Some(index) = self.members.iter().position(|m| m.agent == agent) else {
            return;
        };
        self.members.remove(index);
        self.release_agent(agent, ctx);
        if !self.done && self.kind != MissionKind::Construction && self.members.len() < self.min_members {
            self.end_mission(MissionStatus::NotEnoughMembers, ctx);
        }
    }

    fn release_agent(&mut self, agent: AgentId, ctx: &mut MissionContext<'_>) {
        if let Err(err) = ctx.colony.set_agent_mission(agent, None) {
            warn!(mission = %self.id, agent = %agent, error = %err, "cannot clear mission reference");
        }
        ctx.colony.clear_task(agent);
        debug!(mission = %self.id, agent = %agent, "member removed");
        ctx.emit(self.id, MissionEventKind::MemberRemoved { agent });
    }

    /// Close the mission.
    ///
    /// The first call records `status`, releases every reserved vehicle and
    /// claimed site, disbands the members and emits `Completed`. Later calls
    /// only log a warning: statuses are immutable once done.
    pub fn end_mission(&mut self, status: MissionStatus, ctx: &mut MissionContext<'_>) {
        if self.done {
            warn!(mission = %self.id, status = %status, "end_mission called on a closed mission; ignored");
            return;
        }
        self.add_status(status.clone(), ctx);
        if status.is_success() && self.travel.is_some() && self.phases.is_registered(MissionPhase::Completed) {
            self.set_phase(MissionPhase::Completed, MissionPhase::Completed.name(), ctx);
        }
        self.done = true;

        self.release_resources(ctx);
        for member in std::mem::take(&mut self.members) {
            self.release_agent(member.agent, ctx);
        }

        info!(mission = %self.id, kind = %self.kind, status = %status, "mission ended");
        ctx.emit(
            self.id,
            MissionEventKind::Completed {
                statuses: self.statuses.as_slice().to_vec(),
            },
        );
    }

    fn release_resources(&mut self, ctx: &mut MissionContext<'_>) {
        if let Some(travel) = &self.travel {
            vehicle::release_vehicle(travel, ctx);
        }
        for luv in std::mem::take(&mut self.reserved_vehicles) {
            if let Err(err) = ctx.colony.set_vehicle_reserved(luv, false) {
                warn!(mission = %self.id, vehicle = %luv, error = %err, "cannot release vehicle");
            }
        }
        for site in std::mem::take(&mut self.claimed_sites) {
            ctx.colony.claim_site(site, false);
        }
    }

    /// Put the plan up for review and enter `Reviewing`.
    pub(crate) fn submit_plan(&mut self, ctx: &mut MissionContext<'_>) {
        self.plan = Some(MissionPlan {
            status: PlanStatus::Pending,
            submitted_at: ctx.now(),
        });
        self.set_phase(MissionPhase::Reviewing, "Awaiting plan approval", ctx);
    }

    /// Record a review decision on a pending plan.
    pub fn review_plan(&mut self, approve: bool, ctx: &mut MissionContext<'_>) {
        if self.done {
            return;
        }
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        if plan.status != PlanStatus::Pending {
            return;
        }
        plan.status = if approve {
            PlanStatus::Approved
        } else {
            PlanStatus::Rejected
        };
        let status = plan.status;
        info!(mission = %self.id, plan = ?status, "plan reviewed");
        ctx.emit(self.id, MissionEventKind::PlanReviewed { status });
    }

    fn perform_review(&mut self, ctx: &mut MissionContext<'_>) {
        let Some(plan) = self.plan else {
            self.phases.end_phase();
            return;
        };
        match plan.status {
            PlanStatus::Approved => self.phases.end_phase(),
            PlanStatus::Rejected => self.end_mission(MissionStatus::MissionNotApproved, ctx),
            PlanStatus::Pending => {
                if ctx.config.approval.auto_approve {
                    self.review_plan(true, ctx);
                    self.phases.end_phase();
                } else if ctx.now().since(plan.submitted_at) > ctx.config.approval.timeout_millisols {
                    warn!(mission = %self.id, "plan review timed out");
                    self.end_mission(MissionStatus::MissionNotApproved, ctx);
                }
            }
        }
    }
}

/// A mission: shared core plus kind-specific strategy.
pub struct Mission {
    core: MissionCore,
    strategy: Box<dyn MissionStrategy>,
}

impl Mission {
    /// Create a mission for `starter`.
    ///
    /// The returned mission may already be closed if reservation,
    /// recruitment or planning failed; its statuses say why.
    pub fn start(id: MissionId, kind: MissionKind, starter: AgentId, ctx: &mut MissionContext<'_>) -> Mission {
        let home = ctx.colony.agent_settlement(starter);
        let mut core = MissionCore::new(id, kind, starter, home, ctx.now());
        let strategy = kinds::strategy_for(kind);

        core.phases.register(MissionPhase::Reviewing);
        if kind.vehicle_kind().is_some() {
            for phase in vehicle::TRAVEL_PHASES {
                core.phases.register(phase);
            }
        }
        for phase in strategy.phases() {
            core.phases.register(*phase);
        }

        info!(mission = %id, kind = %kind, starter = %starter, "mission started");
        ctx.emit(
            id,
            MissionEventKind::Started {
                mission_kind: kind,
                starter,
            },
        );

        let role = match kind {
            MissionKind::Trade => MemberRole::Trader,
            MissionKind::Delivery => MemberRole::Pilot,
            _ => MemberRole::Lead,
        };
        if !core.add_member(starter, role, ctx) {
            core.end_mission(MissionStatus::NotEnoughMembers, ctx);
        }

        let mut mission = Mission { core, strategy };
        if !mission.core.done {
            mission.strategy.initialize(&mut mission.core, ctx);
        }
        if !mission.core.done {
            mission.core.submit_plan(ctx);
        }
        mission
    }

    pub fn core(&self) -> &MissionCore {
        &self.core
    }

    pub fn id(&self) -> MissionId {
        self.core.id
    }

    pub fn kind(&self) -> MissionKind {
        self.core.kind
    }

    pub fn is_done(&self) -> bool {
        self.core.done
    }

    pub fn statuses(&self) -> &[MissionStatus] {
        self.core.statuses()
    }

    pub fn phase(&self) -> Option<MissionPhase> {
        self.core.phase()
    }

    pub fn members(&self) -> &[Member] {
        self.core.members()
    }

    /// Advance the mission by one clock pulse.
    ///
    /// # Panics
    /// If the mission is open but has no phase set.
    pub fn perform_mission(&mut self, agent: AgentId, ctx: &mut MissionContext<'_>) {
        if self.core.done {
            return;
        }
        if self.core.phases.phase_ended() {
            self.strategy.determine_new_phase(&mut self.core, ctx);
        }
        if self.core.done {
            return;
        }

        let phase = self.core.phases.current();
        vehicle::consume_supplies(&self.core, ctx, phase);
        match phase {
            MissionPhase::Reviewing => self.core.perform_review(ctx),
            MissionPhase::Embarking | MissionPhase::Travelling | MissionPhase::Disembarking
                if self.core.travel.is_some() =>
            {
                let demand = self.strategy.demand(&self.core, &*ctx.colony, ctx.config);
                vehicle::perform_travel_phase(&mut self.core, ctx, phase, &demand, agent);
            }
            _ => self.strategy.perform_phase(&mut self.core, ctx, agent),
        }
    }

    /// Close the mission with `status`.
    pub fn end_mission(&mut self, status: MissionStatus, ctx: &mut MissionContext<'_>) {
        self.core.end_mission(status, ctx);
    }

    pub fn add_status(&mut self, status: MissionStatus, ctx: &mut MissionContext<'_>) -> bool {
        self.core.add_status(status, ctx)
    }

    pub fn add_member(&mut self, agent: AgentId, role: MemberRole, ctx: &mut MissionContext<'_>) -> bool {
        self.core.add_member(agent, role, ctx)
    }

    pub fn remove_member(&mut self, agent: AgentId, ctx: &mut MissionContext<'_>) {
        self.core.remove_member(agent, ctx);
    }

    pub fn review_plan(&mut self, approve: bool, ctx: &mut MissionContext<'_>) {
        self.core.review_plan(approve, ctx);
    }

    /// Abort on user request. A vehicle out in the field heads home first and
    /// the mission ends when it disembarks there.
    pub fn abort(&mut self, ctx: &mut MissionContext<'_>) {
        if self.core.done {
            return;
        }
        let in_field = self.core.travel.as_ref().is_some_and(|t| t.departed);
        let phase = self.core.phase();
        if in_field {
            self.core.add_status(MissionStatus::UserAbortedMission, ctx);
            if phase != Some(MissionPhase::Disembarking) {
                vehicle::return_home(&mut self.core, ctx);
            }
        } else {
            self.core.end_mission(MissionStatus::UserAbortedMission, ctx);
        }
    }

    /// Outside view of the mission.
    pub fn view(&self, colony: &dyn Colony) -> MissionView {
        let core = &self.core;
        let (waypoints, next_waypoint, remaining_distance_km) = match &core.travel {
            Some(travel) => {
                let from = colony.vehicle(travel.vehicle).map(|v| v.location);
                (
                    travel.nav.waypoints().to_vec(),
                    travel.nav.next_index(),
                    from.map_or(0.0, |f| travel.nav.remaining_distance(f)),
                )
            }
            None => (Vec::new(), 0, 0.0),
        };
        MissionView {
            id: core.id,
            kind: core.kind,
            name: core.name.clone(),
            phase: core.phase(),
            phase_description: core.phase_description().to_string(),
            done: core.done,
            statuses: core.statuses().to_vec(),
            members: core
                .members
                .iter()
                .map(|m| MemberView {
                    agent: m.agent,
                    role: m.role,
                })
                .collect(),
            plan: core.plan.map(|p| p.status),
            vehicle: core.vehicle(),
            waypoints,
            next_waypoint,
            remaining_distance_km,
        }
    }
}

impl HasNavigation for Mission {
    fn navigation(&self) -> Option<&NavigationPlan> {
        self.core.travel.as_ref().map(|t| &t.nav)
    }

    fn vehicle(&self) -> Option<VehicleId> {
        self.core.vehicle()
    }
}

impl HasResourceLedger for Mission {
    fn estimate_remaining_resources(&self, colony: &dyn Colony, config: &MissionConfig, use_buffer: bool) -> ResourceLedger {
        let demand = self.strategy.demand(&self.core, colony, config);
        match &self.core.travel {
            Some(travel) => ledger::estimate_trip(
                colony,
                config,
                travel.vehicle,
                &travel.nav,
                self.core.members().len(),
                &demand,
                use_buffer,
            ),
            None => demand.optional,
        }
    }

    fn is_loadable(&self, colony: &dyn Colony, config: &MissionConfig) -> bool {
        let Some(travel) = &self.core.travel else {
            return true;
        };
        let required = self.estimate_remaining_resources(colony, config, true);
        ledger::is_loadable(colony, travel.vehicle, travel.home, &required)
    }

    fn is_loaded(&self, colony: &dyn Colony, config: &MissionConfig) -> bool {
        let Some(travel) = &self.core.travel else {
            return true;
        };
        let required = self.estimate_remaining_resources(colony, config, true);
        ledger::is_loaded(colony, travel.vehicle, &required)
    }
}
