// Prompt text for every model call. Wording here is free to change; callers
// only depend on the function signatures.

use crate::models::profile::{Depth, Tone};
use crate::models::Profile;

const MENTOR_BASE: &str = "You are the mentor of a wellness app for young adults. \
    Your voice is modern stoic: pragmatic, empowering and without ornament. \
    You are not a clinical psychologist; you are a guide for small habits and mental strength. \
    If the user is anxious, offer a stoic view of what they can control. \
    Write in lowercase and answer in the language the user writes in.";

pub const TRANSCRIBE: &str =
    "Transcribe the following audio exactly as spoken. Return only the text.";

pub const VISION_DEFAULT: &str = "Analyze this image from a stoic and psychological perspective. \
    Briefly describe the emotional atmosphere it conveys and offer one deep reflection \
    of at most 15 words, in lowercase.";

/// System instruction for the mentor chat, shaped by the user's preferences.
pub fn mentor_system(profile: &Profile) -> String {
    let tone = match profile.ai_tone {
        Tone::Direct => "Be direct and brief; no hedging.",
        Tone::Empathetic => "Be warm and validating before giving advice.",
        Tone::Motivating => "Be energetic and push the user toward action.",
    };
    let depth = match profile.ai_depth {
        Depth::Brief => "Answer in at most two sentences.",
        Depth::Normal => "Answer in at most three short paragraphs.",
        Depth::Deep => "Go deeper: explore causes and offer one concrete practice.",
    };

    let mut system = format!("{MENTOR_BASE} {tone} {depth}");
    if profile.spiritual_mode {
        system.push_str(" The user welcomes spiritual and contemplative references.");
    }
    if !profile.ikigai.is_empty() {
        system.push_str(&format!(" The user's stated purpose is: \"{}\".", profile.ikigai));
    }
    if !profile.goals.is_empty() {
        system.push_str(&format!(" Their current goals: {}.", profile.goals.join(", ")));
    }
    system
}

pub fn ikigai(input: &str) -> String {
    format!(
        "The user wants to discover their ikigai (purpose in life) for a stoic app. \
         The user says: \"{input}\". \
         Distill the essence into ONE powerful, memorable, minimalist sentence (at most 15 words). \
         Tone: serious and deep, no clichés. Format: all lowercase. Return only the sentence."
    )
}

pub fn reflection(text: &str) -> String {
    format!(
        "Analyze this personal journal text: \"{text}\". \
         Act as a stoic, analytical mirror. \
         Reply ONLY with a valid JSON object of this exact shape: \
         {{\"mood\": \"one lowercase word naming the dominant emotion\", \
         \"insight\": \"one very short sentence (at most 12 words) offering stoic perspective, lowercase\"}}"
    )
}
