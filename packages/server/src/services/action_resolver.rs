use role_vault::ConfidentialValueAdapter;
use std::collections::{HashMap, HashSet};

use crate::error::GameError;
use crate::models::game::{GameSession, NightAction, Phase};
use crate::models::player::PlayerId;
use crate::models::role::{ActionKind, Role};

/// Deterministic result of one night.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightOutcome {
    /// Newly dead players, in join order.
    pub deaths: Vec<PlayerId>,
    pub protected: Vec<PlayerId>,
    /// `(seer, target)` pairs still to be sealed for the seer.
    pub investigations: Vec<(PlayerId, PlayerId)>,
    /// Hunter designations submitted this night.
    pub retaliations: HashMap<PlayerId, PlayerId>,
}

/// Checks a submission against the session without touching it.
///
/// The actor's capability is attested by the adapter; the role itself never leaves it.
pub async fn validate(
    session: &GameSession,
    adapter: &dyn ConfidentialValueAdapter,
    action: &NightAction,
) -> Result<(), GameError> {
    if session.phase() != Phase::Night {
        return Err(GameError::WrongPhase(session.phase()));
    }
    let actor = session.player(&action.actor)?;
    if !actor.alive {
        return Err(GameError::ActorDead(action.actor.clone()));
    }
    if !session.is_alive(&action.target) {
        return Err(GameError::InvalidTarget(action.target.clone()));
    }

    let handle = session.handle_of(&action.actor)?;
    let granted = adapter
        .matches_any(&handle, &[action.kind.granted_by().encode()])
        .await?;
    if !granted {
        return Err(GameError::RoleMismatch(action.kind));
    }
    Ok(())
}

/// Resolves validated night actions.
///
/// Order is fixed regardless of submission order: protections, then witch
/// potions, then the werewolf kill, then retaliation of dead hunters, and
/// investigations last. `roster` is `(id, alive)` in join order.
pub fn resolve(roster: &[(PlayerId, bool)], actions: &[NightAction]) -> NightOutcome {
    let index: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.as_str(), i))
        .collect();
    let alive: HashSet<&str> = roster
        .iter()
        .filter(|(_, alive)| *alive)
        .map(|(id, _)| id.as_str())
        .collect();

    // Only living actors acting on living targets take part.
    let mut valid: Vec<&NightAction> = actions
        .iter()
        .filter(|a| alive.contains(a.actor.as_str()) && alive.contains(a.target.as_str()))
        .collect();
    valid.sort_by_key(|a| index.get(a.actor.as_str()).copied().unwrap_or(usize::MAX));

    let of_kind = |kind: ActionKind| valid.iter().filter(move |a| a.kind == kind);

    let protected: HashSet<&str> = of_kind(ActionKind::Protect).map(|a| a.target.as_str()).collect();
    let healed: HashSet<&str> = of_kind(ActionKind::Heal).map(|a| a.target.as_str()).collect();
    let mut dead: HashSet<&str> = of_kind(ActionKind::Poison).map(|a| a.target.as_str()).collect();

    if let Some(victim) = kill_target(of_kind(ActionKind::Kill).copied(), &index) {
        if !protected.contains(victim) && !healed.contains(victim) {
            dead.insert(victim);
        }
    }

    let retaliations: HashMap<PlayerId, PlayerId> = of_kind(ActionKind::Retaliate)
        .map(|a| (a.actor.clone(), a.target.clone()))
        .collect();
    let triggered = chain_retaliations(
        &retaliations,
        dead.iter().map(|d| d.to_string()).collect(),
        |id| alive.contains(id),
    );
    for victim in triggered {
        if let Some((id, _)) = roster.iter().find(|(id, _)| *id == victim) {
            dead.insert(id.as_str());
        }
    }

    let mut deaths: Vec<PlayerId> = dead.into_iter().map(str::to_string).collect();
    deaths.sort_by_key(|id| index.get(id.as_str()).copied().unwrap_or(usize::MAX));

    let mut protected: Vec<PlayerId> = protected.into_iter().map(str::to_string).collect();
    protected.sort_by_key(|id| index.get(id.as_str()).copied().unwrap_or(usize::MAX));

    NightOutcome {
        deaths,
        protected,
        investigations: of_kind(ActionKind::Investigate)
            .map(|a| (a.actor.clone(), a.target.clone()))
            .collect(),
        retaliations,
    }
}

/// Majority target among werewolf submissions; ties go to the lowest join index.
fn kill_target<'a>(
    kills: impl Iterator<Item = &'a NightAction>,
    index: &HashMap<&str, usize>,
) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for kill in kills {
        *counts.entry(kill.target.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| {
            ca.cmp(cb).then_with(|| {
                let ia = index.get(a).copied().unwrap_or(usize::MAX);
                let ib = index.get(b).copied().unwrap_or(usize::MAX);
                ib.cmp(&ia)
            })
        })
        .map(|(target, _)| target)
}

/// Extra victims triggered by hunters in `dead`, following chains until stable.
///
/// A designation only fires at a target `is_alive` still accepts; already dead
/// targets neither die again nor pass the chain on.
pub fn chain_retaliations(
    retaliations: &HashMap<PlayerId, PlayerId>,
    dead: Vec<PlayerId>,
    is_alive: impl Fn(&str) -> bool,
) -> Vec<PlayerId> {
    let mut seen: HashSet<PlayerId> = dead.iter().cloned().collect();
    let mut pending = dead;
    let mut extra = Vec::new();
    while let Some(hunter) = pending.pop() {
        if let Some(target) = retaliations.get(&hunter) {
            if is_alive(target.as_str()) && seen.insert(target.clone()) {
                extra.push(target.clone());
                pending.push(target.clone());
            }
        }
    }
    extra
}

/// Number of living players whose concealed role can act at night.
pub async fn eligible_actor_count(
    session: &GameSession,
    adapter: &dyn ConfidentialValueAdapter,
) -> Result<usize, GameError> {
    Ok(adapter
        .count_matching(&session.living_handles(), &Role::encoded_capable())
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<(PlayerId, bool)> {
        (0..n).map(|i| (format!("p{}", i), true)).collect()
    }

    fn act(actor: &str, kind: ActionKind, target: &str) -> NightAction {
        NightAction {
            actor: actor.to_string(),
            kind,
            target: target.to_string(),
        }
    }

    #[test]
    fn test_no_actions_no_deaths() {
        assert_eq!(resolve(&roster(5), &[]), NightOutcome::default());
    }

    #[test]
    fn test_guard_blocks_kill() {
        let actions = vec![
            act("p0", ActionKind::Kill, "p3"),
            act("p2", ActionKind::Protect, "p3"),
        ];
        let outcome = resolve(&roster(5), &actions);
        assert!(outcome.deaths.is_empty());
        assert_eq!(outcome.protected, vec!["p3".to_string()]);
    }

    #[test]
    fn test_heal_cancels_only_the_kill() {
        let actions = vec![
            act("p0", ActionKind::Kill, "p3"),
            act("p1", ActionKind::Heal, "p3"),
        ];
        assert!(resolve(&roster(5), &actions).deaths.is_empty());

        let actions = vec![
            act("p0", ActionKind::Kill, "p3"),
            act("p1", ActionKind::Heal, "p4"),
        ];
        assert_eq!(resolve(&roster(5), &actions).deaths, vec!["p3".to_string()]);
    }

    #[test]
    fn test_poison_ignores_protection() {
        let actions = vec![
            act("p1", ActionKind::Poison, "p4"),
            act("p2", ActionKind::Protect, "p4"),
            act("p0", ActionKind::Kill, "p3"),
        ];
        assert_eq!(
            resolve(&roster(5), &actions).deaths,
            vec!["p3".to_string(), "p4".to_string()]
        );
    }

    #[test]
    fn test_werewolf_majority_and_tie_break() {
        let actions = vec![
            act("p0", ActionKind::Kill, "p5"),
            act("p1", ActionKind::Kill, "p5"),
            act("p2", ActionKind::Kill, "p3"),
        ];
        assert_eq!(resolve(&roster(6), &actions).deaths, vec!["p5".to_string()]);

        // 1-1 tie: lowest join index wins regardless of submission order.
        let actions = vec![
            act("p0", ActionKind::Kill, "p5"),
            act("p1", ActionKind::Kill, "p3"),
        ];
        assert_eq!(resolve(&roster(6), &actions).deaths, vec!["p3".to_string()]);
        let reversed: Vec<_> = actions.into_iter().rev().collect();
        assert_eq!(resolve(&roster(6), &reversed).deaths, vec!["p3".to_string()]);
    }

    #[test]
    fn test_hunter_retaliates_when_killed() {
        let actions = vec![
            act("p0", ActionKind::Kill, "p2"),
            act("p2", ActionKind::Retaliate, "p0"),
        ];
        assert_eq!(
            resolve(&roster(5), &actions).deaths,
            vec!["p0".to_string(), "p2".to_string()]
        );

        // Surviving hunter does nothing.
        let actions = vec![
            act("p0", ActionKind::Kill, "p3"),
            act("p2", ActionKind::Retaliate, "p0"),
        ];
        let outcome = resolve(&roster(5), &actions);
        assert_eq!(outcome.deaths, vec!["p3".to_string()]);
        assert_eq!(outcome.retaliations.get("p2"), Some(&"p0".to_string()));
    }

    #[test]
    fn test_dead_actors_and_targets_are_ignored() {
        let mut roster = roster(5);
        roster[0].1 = false;
        roster[4].1 = false;
        let actions = vec![
            act("p0", ActionKind::Kill, "p3"),
            act("p1", ActionKind::Kill, "p4"),
        ];
        assert!(resolve(&roster, &actions).deaths.is_empty());
    }

    #[test]
    fn test_investigation_is_reported_not_broadcast() {
        let actions = vec![act("p1", ActionKind::Investigate, "p0")];
        let outcome = resolve(&roster(5), &actions);
        assert!(outcome.deaths.is_empty());
        assert_eq!(
            outcome.investigations,
            vec![("p1".to_string(), "p0".to_string())]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let actions = vec![
            act("p0", ActionKind::Kill, "p4"),
            act("p1", ActionKind::Kill, "p3"),
            act("p2", ActionKind::Protect, "p1"),
            act("p5", ActionKind::Poison, "p6"),
            act("p6", ActionKind::Retaliate, "p1"),
            act("p7", ActionKind::Investigate, "p0"),
        ];
        let first = resolve(&roster(8), &actions);
        for _ in 0..10 {
            assert_eq!(resolve(&roster(8), &actions), first);
        }
        assert_eq!(
            first.deaths,
            vec!["p1".to_string(), "p3".to_string(), "p6".to_string()]
        );
    }

    #[test]
    fn test_retaliation_chain() {
        let mut designations = HashMap::new();
        designations.insert("a".to_string(), "b".to_string());
        designations.insert("b".to_string(), "c".to_string());
        designations.insert("c".to_string(), "a".to_string());
        let extra = chain_retaliations(&designations, vec!["a".to_string()], |_| true);
        assert_eq!(extra, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_retaliation_chain_stops_at_dead_targets() {
        let mut designations = HashMap::new();
        designations.insert("a".to_string(), "b".to_string());
        designations.insert("b".to_string(), "c".to_string());
        let extra = chain_retaliations(&designations, vec!["a".to_string()], |id| id != "b");
        assert!(extra.is_empty());
    }
}
