use rand::seq::SliceRandom;

/// Shown when a costed action is denied for lack of energy.
pub const DEPLETED_MESSAGES: [&str; 4] = [
    "Mental battery drained. Rest is part of the work.",
    "You have reached today's cognitive limit. Recharge tomorrow.",
    "Silence. Your mind needs time to process what it has lived.",
    "Energy limit reached. Come back at sunrise or unlock Supra Black.",
];

pub fn random_depleted_message() -> &'static str {
    DEPLETED_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEPLETED_MESSAGES[0])
}
