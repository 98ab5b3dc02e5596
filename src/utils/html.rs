/// Clean free-text input (answer values, justifications) using the ammonia
/// library.
///
/// This employs a whitelist-based sanitization strategy: it preserves safe
/// tags while stripping dangerous tags (like <script>, <iframe>) and
/// malicious attributes (like onclick). Answer and justification texts are
/// rendered in the review panels, so they are sanitized at intake.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input)
}
