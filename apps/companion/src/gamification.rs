//! XP ranks and one-time achievements stored on the profile.

use serde::Serialize;

use crate::models::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rank {
    pub id: &'static str,
    pub name: &'static str,
    pub min_xp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub xp_reward: u64,
}

/// Ascending by `min_xp`; the first rank starts at zero.
pub const RANKS: [Rank; 6] = [
    Rank { id: "neophyte", name: "neophyte", min_xp: 0 },
    Rank { id: "apprentice", name: "apprentice", min_xp: 100 },
    Rank { id: "stoic", name: "stoic", min_xp: 500 },
    Rank { id: "philosopher", name: "philosopher", min_xp: 1500 },
    Rank { id: "sage", name: "sage", min_xp: 3000 },
    Rank { id: "emperor", name: "emperor", min_xp: 6000 },
];

pub const ACHIEVEMENTS: [Achievement; 6] = [
    Achievement { id: "first_step", title: "the awakening", xp_reward: 50 },
    Achievement { id: "week_streak", title: "consistency", xp_reward: 150 },
    Achievement { id: "lux_master", title: "illuminated", xp_reward: 300 },
    Achievement { id: "voice_explorer", title: "orator", xp_reward: 100 },
    Achievement { id: "visionary", title: "visionary", xp_reward: 200 },
    Achievement { id: "founder", title: "patron", xp_reward: 1000 },
];

pub const FOUNDER: &str = "founder";

pub fn achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

pub fn current_rank(xp: u64) -> &'static Rank {
    RANKS
        .iter()
        .rev()
        .find(|r| xp >= r.min_xp)
        .unwrap_or(&RANKS[0])
}

pub fn next_rank(xp: u64) -> Option<&'static Rank> {
    RANKS.iter().find(|r| r.min_xp > xp)
}

/// Percent of the way from the current rank to the next, 100 at the top.
pub fn progress_to_next(xp: u64) -> u8 {
    let current = current_rank(xp);
    let Some(next) = next_rank(xp) else {
        return 100;
    };
    let range = next.min_xp - current.min_xp;
    let progress = xp - current.min_xp;
    ((progress * 100) / range).min(100) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankStatus {
    pub xp: u64,
    pub rank: Rank,
    pub next: Option<Rank>,
    pub progress: u8,
}

pub fn rank_status(xp: u64) -> RankStatus {
    RankStatus {
        xp,
        rank: *current_rank(xp),
        next: next_rank(xp).copied(),
        progress: progress_to_next(xp),
    }
}

/// Adds the achievement and its XP once. Returns `false` if already unlocked.
pub fn unlock(profile: &mut Profile, achievement: &Achievement) -> bool {
    if !profile.unlocked_achievements.insert(achievement.id.to_string()) {
        return false;
    }
    profile.xp = profile.xp.saturating_add(achievement.xp_reward);
    true
}

/// Premium unlocks the spiritual mode and the founder achievement.
pub fn upgrade_to_premium(profile: &mut Profile) {
    profile.is_premium = true;
    profile.spiritual_mode = true;
    if let Some(founder) = achievement(FOUNDER) {
        unlock(profile, founder);
    }
}
