//! Member recruitment.
//!
//! Candidates are scored on qualification and the starter's opinion of them,
//! then invited greedily in score order up to a ceiling derived from the
//! settlement's population. Each invitation is accepted by roll.

use rand::Rng;
use tracing::{debug, info};

use mission_core::constants::*;
use mission_core::enums::{MemberRole, MissionStatus};
use mission_core::types::AgentId;

use crate::context::{Colony, MissionContext};
use crate::mission::MissionCore;

/// A scored recruitment candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub agent: AgentId,
    pub qualification: f64,
    pub score: f64,
}

/// Recruitment ceiling for a settlement population, before the random
/// reduction and the capacity clamp.
pub fn population_ceiling(population: usize) -> usize {
    POPULATION_CEILING_STEPS
        .iter()
        .position(|step| population < *step)
        .map_or(POPULATION_CEILING_STEPS.len() + 1, |i| i + 1)
}

/// Ceiling after the coin-flip reduction and the capacity clamp.
pub fn recruitment_ceiling<R: Rng + ?Sized>(rng: &mut R, population: usize, capacity: usize) -> usize {
    let mut ceiling = population_ceiling(population);
    if ceiling >= CEILING_REDUCTION_THRESHOLD && rng.gen_bool(0.5) {
        ceiling -= 1;
    }
    ceiling.min(capacity)
}

/// Eligible candidates sorted by descending score, ties by agent id.
pub fn score_candidates(core: &MissionCore, colony: &dyn Colony, same_settlement_only: bool) -> Vec<Candidate> {
    let starter = core.starter();
    let pool: Vec<AgentId> = match core.home() {
        Some(home) if same_settlement_only => colony.indoor_agents(home),
        Some(_) => colony
            .settlements()
            .into_iter()
            .flat_map(|s| colony.indoor_agents(s))
            .collect(),
        None => Vec::new(),
    };

    let mut candidates: Vec<Candidate> = pool
        .into_iter()
        .filter(|agent| *agent != starter && !core.is_member(*agent))
        .filter(|agent| colony.agent_mission(*agent).is_none())
        .filter(|agent| colony.is_fit_for_mission(*agent))
        .filter_map(|agent| {
            let qualification = colony.mission_qualification(agent, core.kind());
            if qualification <= 0.0 {
                return None;
            }
            let opinion = colony.opinion_of(starter, agent).unwrap_or(DEFAULT_OPINION);
            let score = (qualification * 100.0 + opinion) / 2.0;
            (score > 0.0).then_some(Candidate {
                agent,
                qualification,
                score,
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.agent.cmp(&b.agent)));
    candidates
}

/// Chance in percent that `candidate` accepts: the mean of qualification,
/// their opinion of the starter and their average opinion of the group.
pub fn acceptance_chance(core: &MissionCore, colony: &dyn Colony, candidate: &Candidate) -> f64 {
    let toward_starter = colony
        .opinion_of(candidate.agent, core.starter())
        .unwrap_or(DEFAULT_OPINION);
    let members = core.members();
    let toward_group = if members.is_empty() {
        DEFAULT_OPINION
    } else {
        members
            .iter()
            .map(|m| colony.opinion_of(candidate.agent, m.agent).unwrap_or(DEFAULT_OPINION))
            .sum::<f64>()
            / members.len() as f64
    };
    ((candidate.qualification * 100.0 + toward_starter + toward_group) / 3.0).clamp(0.0, 100.0)
}

/// Recruit members for `core`. Ends the mission with `NotEnoughMembers` and
/// returns false when fewer than the minimum join.
pub fn recruit(core: &mut MissionCore, ctx: &mut MissionContext<'_>) -> bool {
    let population = core
        .home()
        .and_then(|home| ctx.colony.settlement(home))
        .map_or(0, |s| s.population);
    let ceiling = recruitment_ceiling(ctx.rng, population, core.capacity());
    let candidates = score_candidates(core, &*ctx.colony, ctx.config.recruitment.same_settlement_only);
    debug!(
        mission = %core.id(),
        population,
        ceiling,
        candidates = candidates.len(),
        "recruiting"
    );

    for candidate in candidates {
        if core.members().len() >= ceiling {
            break;
        }
        let chance = acceptance_chance(core, &*ctx.colony, &candidate);
        let roll: f64 = ctx.rng.gen();
        if roll * 100.0 < chance {
            core.add_member(candidate.agent, MemberRole::Crew, ctx);
        } else {
            debug!(mission = %core.id(), agent = %candidate.agent, chance, "declined");
        }
    }

    if core.members().len() < core.min_members() {
        info!(
            mission = %core.id(),
            members = core.members().len(),
            min = core.min_members(),
            "not enough members"
        );
        core.end_mission(MissionStatus::NotEnoughMembers, ctx);
        return false;
    }
    true
}
