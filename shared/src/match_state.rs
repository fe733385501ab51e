//! Round/match state machine: heroSelect -> countdown -> active ->
//! roundBanner -> (heroSelect again, or matchOver).
//!
//! A pure state machine the host loop drives once per tick with a monotonic
//! clock rather than OS timers, so every phase transition is driven by wall-
//! clock comparisons the caller can feed a fake clock into for tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const HERO_SELECT_SECONDS_DEFAULT: u64 = 15;
pub const COUNTDOWN_MS: u64 = 3_000;
pub const ROUND_BANNER_MS_DEFAULT: u64 = 1_200;
/// Grace period past countdown-end during which fire input is suppressed,
/// preventing a stuck fire button from being honored the instant input
/// re-enables.
pub const WEAPON_ARMED_GRACE_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    HeroSelect,
    Countdown,
    Active,
    RoundBanner,
    MatchOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Victory is "last entity/team alive"; match ends at `rounds_to_win`.
    Elimination,
    /// Victory is a kill-count target; match ends at `kill_limit`.
    FreeForAll,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerScore {
    pub kills: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone)]
pub enum MatchEvent {
    StartHeroSelect,
    HeroesConfirmed,
    StartRound,
    RoundResult { winner: String, score: u32 },
    MatchOver { final_score: HashMap<String, u32> },
}

#[derive(Debug, Clone)]
pub struct Match {
    pub mode: Mode,
    pub phase: Phase,
    pub phase_entered_at: u64,
    pub hero_select_seconds: u64,
    pub round_banner_ms: u64,
    pub rounds_to_win: u32,
    pub kill_limit: u32,
    pub per_entity_score: HashMap<String, PlayerScore>,
    pub round_wins: HashMap<String, u32>,
}

impl Match {
    pub fn new(mode: Mode, rounds_to_win: u32, kill_limit: u32, now_ms: u64) -> Self {
        Self {
            mode,
            phase: Phase::HeroSelect,
            phase_entered_at: now_ms,
            hero_select_seconds: HERO_SELECT_SECONDS_DEFAULT,
            round_banner_ms: ROUND_BANNER_MS_DEFAULT,
            rounds_to_win: rounds_to_win.clamp(1, 10),
            kill_limit: kill_limit.clamp(1, 50),
            per_entity_score: HashMap::new(),
            round_wins: HashMap::new(),
        }
    }

    pub fn record_kill(&mut self, killer_id: &str, victim_id: &str) {
        self.per_entity_score.entry(killer_id.to_string()).or_default().kills += 1;
        self.per_entity_score.entry(victim_id.to_string()).or_default().deaths += 1;
    }

    fn transition(&mut self, phase: Phase, now_ms: u64) {
        self.phase = phase;
        self.phase_entered_at = now_ms;
    }

    fn match_over(&self) -> bool {
        match self.mode {
            Mode::Elimination => self.round_wins.values().any(|&v| v >= self.rounds_to_win),
            Mode::FreeForAll => self.per_entity_score.values().any(|s| s.kills >= self.kill_limit),
        }
    }

    /// Fire input is gated off outside the Active phase, and for
    /// `WEAPON_ARMED_GRACE_MS` after Active begins.
    pub fn fire_allowed(&self, now_ms: u64) -> bool {
        self.phase == Phase::Active && now_ms.saturating_sub(self.phase_entered_at) >= WEAPON_ARMED_GRACE_MS
    }

    pub fn input_enabled(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Advance timers one host tick. `all_heroes_confirmed` drives the
    /// heroSelect -> countdown early-exit; `round_winner` is supplied by the
    /// caller once its victory predicate (computed over live entities) is
    /// satisfied during the Active phase.
    pub fn tick(&mut self, now_ms: u64, all_heroes_confirmed: bool, round_winner: Option<(String, u32)>) -> Vec<MatchEvent> {
        let elapsed = now_ms.saturating_sub(self.phase_entered_at);
        match self.phase {
            Phase::HeroSelect => {
                if all_heroes_confirmed || elapsed >= self.hero_select_seconds * 1000 {
                    self.transition(Phase::Countdown, now_ms);
                    vec![MatchEvent::HeroesConfirmed]
                } else {
                    vec![]
                }
            }
            Phase::Countdown => {
                if elapsed >= COUNTDOWN_MS {
                    self.transition(Phase::Active, now_ms);
                    vec![MatchEvent::StartRound]
                } else {
                    vec![]
                }
            }
            Phase::Active => {
                if let Some((winner, score)) = round_winner {
                    *self.round_wins.entry(winner.clone()).or_insert(0) += 1;
                    self.transition(Phase::RoundBanner, now_ms);
                    vec![MatchEvent::RoundResult { winner, score }]
                } else {
                    vec![]
                }
            }
            Phase::RoundBanner => {
                if elapsed >= self.round_banner_ms {
                    if self.match_over() {
                        self.transition(Phase::MatchOver, now_ms);
                        vec![MatchEvent::MatchOver { final_score: self.round_wins.clone() }]
                    } else {
                        self.transition(Phase::HeroSelect, now_ms);
                        vec![MatchEvent::StartHeroSelect]
                    }
                } else {
                    vec![]
                }
            }
            Phase::MatchOver => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_hero_select() {
        let m = Match::new(Mode::FreeForAll, 3, 10, 0);
        assert_eq!(m.phase, Phase::HeroSelect);
    }

    #[test]
    fn hero_select_exits_on_all_confirmed() {
        let mut m = Match::new(Mode::FreeForAll, 3, 10, 0);
        let events = m.tick(500, true, None);
        assert_eq!(m.phase, Phase::Countdown);
        assert!(matches!(events[0], MatchEvent::HeroesConfirmed));
    }

    #[test]
    fn hero_select_exits_on_timeout() {
        let mut m = Match::new(Mode::FreeForAll, 3, 10, 0);
        let events = m.tick(15_000, false, None);
        assert_eq!(m.phase, Phase::Countdown);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn countdown_transitions_to_active_after_3s() {
        let mut m = Match::new(Mode::FreeForAll, 3, 10, 0);
        m.tick(0, true, None);
        assert!(m.tick(2_999, false, None).is_empty());
        let events = m.tick(3_000, false, None);
        assert_eq!(m.phase, Phase::Active);
        assert!(matches!(events[0], MatchEvent::StartRound));
    }

    #[test]
    fn fire_suppressed_during_armed_grace_window() {
        let mut m = Match::new(Mode::FreeForAll, 3, 10, 0);
        m.tick(0, true, None);
        m.tick(3_000, false, None);
        assert!(!m.fire_allowed(3_000));
        assert!(!m.fire_allowed(3_299));
        assert!(m.fire_allowed(3_300));
    }

    #[test]
    fn active_round_ends_on_winner_and_records_score() {
        let mut m = Match::new(Mode::Elimination, 2, 50, 0);
        m.tick(0, true, None);
        m.tick(3_000, false, None);
        let events = m.tick(10_000, false, Some(("teamA".to_string(), 1)));
        assert_eq!(m.phase, Phase::RoundBanner);
        assert_eq!(*m.round_wins.get("teamA").unwrap(), 1);
        assert!(matches!(&events[0], MatchEvent::RoundResult { winner, .. } if winner == "teamA"));
    }

    #[test]
    fn match_over_when_rounds_to_win_reached() {
        let mut m = Match::new(Mode::Elimination, 1, 50, 0);
        m.tick(0, true, None);
        m.tick(3_000, false, None);
        m.tick(10_000, false, Some(("teamA".to_string(), 1)));
        let events = m.tick(10_000 + ROUND_BANNER_MS_DEFAULT, false, None);
        assert_eq!(m.phase, Phase::MatchOver);
        assert!(matches!(events[0], MatchEvent::MatchOver { .. }));
    }

    #[test]
    fn round_banner_returns_to_hero_select_when_match_continues() {
        let mut m = Match::new(Mode::Elimination, 5, 50, 0);
        m.tick(0, true, None);
        m.tick(3_000, false, None);
        m.tick(10_000, false, Some(("teamA".to_string(), 1)));
        let events = m.tick(10_000 + ROUND_BANNER_MS_DEFAULT, false, None);
        assert_eq!(m.phase, Phase::HeroSelect);
        assert!(matches!(events[0], MatchEvent::StartHeroSelect));
    }

    #[test]
    fn free_for_all_match_over_at_kill_limit() {
        let mut m = Match::new(Mode::FreeForAll, 3, 2, 0);
        m.record_kill("p1", "p2");
        m.record_kill("p1", "p2");
        assert!(m.match_over());
    }

    #[test]
    fn match_over_is_terminal() {
        let mut m = Match::new(Mode::FreeForAll, 3, 1, 0);
        m.record_kill("p1", "p2");
        m.tick(0, true, None);
        m.tick(3_000, false, None);
        m.tick(10_000, false, Some(("p1".to_string(), 1)));
        m.tick(10_000 + ROUND_BANNER_MS_DEFAULT, false, None);
        assert_eq!(m.phase, Phase::MatchOver);
        assert!(m.tick(999_999, true, Some(("p1".to_string(), 1))).is_empty());
    }
}
