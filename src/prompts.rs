//! System instructions, canned companion lines, and static catalogs.
//!
//! The persona text forbids emojis and markdown because the TTS engine
//! rejects such input; the sanitizer in [`crate::speech`] is the second
//! line of defense.

use rand::seq::SliceRandom;

/// Crisis-safety preamble attached to every model call.
pub const SAFETY_SYSTEM_INSTRUCTION: &str = "You are an empathetic AI companion for emotional wellbeing. Your absolute top priority is user safety. If you detect any mention of self-harm, crisis, or immediate danger, you MUST immediately stop the current conversation flow and output ONLY the following text: 'It sounds like you are in crisis. Please reach out for immediate help. You can call or text 988 in the US and Canada, or call 111 in the UK. Help is available 24/7.' Do not add any other words.";

/// Conversational persona for chat and proactive check-ins.
pub const ANALYSIS_SYSTEM_INSTRUCTION: &str = "You are a Gen Z Wellbeing Companion - a friendly digital buddy who checks in with the user first, then helps them take a supportive action.\n\nYour behavior flow is:\n1. Start with a casual, friendly conversation. Ask how the user's day or mood is in a natural, human way.\n2. Then respond based on what the user says.\n- If they sound stressed, offer a small calm-down activity.\n- If they sound confident or happy, hype them up.\n- If they sound tired or drained, suggest something light.\n3. After conversation, suggest a supportive action. You can offer options like \"Meditate,\" \"Sleep,\" or suggest a \"Reset.\"\n\nTone Guidelines:\n- Keep it short, warm, and Gen Z casual.\n- ABSOLUTELY NO EMOJIS. The text-to-speech engine crashes if you use emojis.\n- Avoid a \"therapist\" or robotic tone. Speak like a buddy.\n- End messages with soft questions or action suggestions.\n- IMPORTANT: Output PLAIN TEXT ONLY. Do not use Markdown formatting (no bold, italics, lists, or headers). Do not use SSML tags.";

/// Persona for generated meditation scripts.
pub const MEDITATION_SYSTEM_INSTRUCTION: &str = "You are a gentle meditation guide. Your goal is to help the user relax, focus, or find peace depending on the theme.\nVoice: Calm, slow, soothing, and warm.\nStructure:\n1. Start by asking them to find a comfortable position and take a deep breath.\n2. Guide them through a visualization or breathing exercise related to the theme.\n3. End with a gentle return to awareness.\nFormat: Plain text only. No markdown. Keep it under 200 words.";

/// Persona for generated sleep stories.
pub const SLEEP_STORY_SYSTEM_INSTRUCTION: &str = "You are a soothing storyteller. Your goal is to help the user drift off to sleep with a calming narrative.\nVoice: Very slow, soft, monotonous but pleasant.\nStructure:\n1. Set a peaceful scene with sensory details (sights, sounds, smells).\n2. Tell a wandering, low-conflict story where nothing sudden happens.\n3. Gradually wind down to silence or a final restful thought.\nFormat: Plain text only. No markdown. Keep it under 300 words.";

/// Opening prompt for the proactive calendar check.
pub const PROACTIVE_PROMPT: &str = "Based on my calendar, start a conversation with me. Your first message should be a casual, friendly check-in asking how my day or mood is. Keep it plain text.";

/// Greeting used when no calendar connection exists.
pub const NO_CALENDAR_GREETING: &str = "Hello! I'm here to support you. For more personalized check-ins based on your schedule, you can connect your calendar. How are you feeling today?";

/// Greeting used when the proactive model turn produced nothing usable.
pub const EMPTY_CHECK_GREETING: &str = "Hello! Let's get started with your day. How are you feeling?";

/// Greeting used when the proactive check hit a service failure.
pub const SCHEDULE_TROUBLE_GREETING: &str = "Hello! I had some trouble checking your schedule, but I'm here to help. How are you feeling today?";

/// Fixed user-facing explanation for a missing API credential.
pub const AI_DISABLED_MESSAGE: &str = "AI features are disabled. The Google AI API key is not configured in your environment. For this application to work, the GEMINI_API_KEY environment variable must be set.";

/// Generic retry-oriented message for transient failures.
pub const GENERIC_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Appended exactly once when the session timer reaches zero.
pub const TIME_UP_MESSAGE: &str = "That's 8 minutes! We've completed our focused session time. Feel free to wrap up or continue if you need more time.";

/// Confirmation shown after a full session is summarized and saved.
pub const SESSION_SAVED_MESSAGE: &str = "Session and mood saved! You've earned 10 points. Ready for a new conversation when you are.";

/// Confirmation shown after a quick mood check-in.
pub const MOOD_LOGGED_MESSAGE: &str = "Got it! Your mood is logged. Great job checking in with yourself! You've earned 10 points.";

/// Combined system instruction for chat turns.
pub fn chat_system_instruction() -> String {
    format!("{SAFETY_SYSTEM_INSTRUCTION} \n {ANALYSIS_SYSTEM_INSTRUCTION}")
}

/// Quotes shown when the user is about to end a session.
pub const MOTIVATIONAL_QUOTES: &[&str] = &[
    "You are doing the best you can, and that is enough.",
    "Peace comes from within. Do not seek it without.",
    "Every breath is a new beginning.",
    "You are stronger than you know.",
    "Self-care is how you take your power back.",
    "It is okay to take a break.",
    "Progress is quiet and slow. Trust the process.",
    "Your mental health is a priority.",
    "Be kind to yourself. You are evolving.",
    "Small steps every day add up to big changes.",
];

/// Journal prompt catalog, grouped by theme.
pub const JOURNAL_PROMPTS: &[(&str, &[&str])] = &[
    (
        "Gratitude",
        &[
            "What is one small thing that brought you joy today?",
            "Who is someone you are grateful for and why?",
            "Describe a simple pleasure you recently enjoyed.",
            "What skill or ability are you grateful to have?",
        ],
    ),
    (
        "Stress Management",
        &[
            "What is currently weighing on your mind? Write it down to externalize it.",
            "Describe a stressful situation and one healthy way you could respond to it.",
            "What is one thing you can do right now to make your environment more calming?",
            "If you could delegate one task that is causing you stress, what would it be?",
        ],
    ),
    (
        "Self-Discovery",
        &[
            "When do you feel most like your authentic self?",
            "What is a personal value that you hold dear, and how did you live by it this week?",
            "Describe a time you felt proud of yourself recently.",
            "If you had an extra hour in your day, what would you spend it on, just for you?",
        ],
    ),
    (
        "Future Aspirations",
        &[
            "What is one small step you can take this week toward a long-term goal?",
            "Describe what a perfectly fulfilling day looks like for you.",
            "What is something new you would like to learn?",
            "Write a letter to your future self, one year from now.",
        ],
    ),
];

/// Pick a random motivational quote.
pub fn random_quote() -> &'static str {
    MOTIVATIONAL_QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MOTIVATIONAL_QUOTES[0])
}

/// Pick a random journal prompt from a random theme.
pub fn random_journal_prompt() -> &'static str {
    let mut rng = rand::thread_rng();
    JOURNAL_PROMPTS
        .choose(&mut rng)
        .and_then(|(_, prompts)| prompts.choose(&mut rng))
        .copied()
        .unwrap_or("What is on your mind today?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_instruction_combines_safety_and_persona() {
        let combined = chat_system_instruction();
        assert!(combined.starts_with(SAFETY_SYSTEM_INSTRUCTION));
        assert!(combined.ends_with(ANALYSIS_SYSTEM_INSTRUCTION));
    }

    #[test]
    fn random_picks_come_from_catalogs() {
        for _ in 0..20 {
            assert!(MOTIVATIONAL_QUOTES.contains(&random_quote()));
            let prompt = random_journal_prompt();
            assert!(
                JOURNAL_PROMPTS
                    .iter()
                    .any(|(_, prompts)| prompts.contains(&prompt))
            );
        }
    }
}
