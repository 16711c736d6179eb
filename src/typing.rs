//! Synthetic keystroke simulation.
//!
//! Page frameworks validate login fields by listening for native-looking
//! input events, so a credential cannot simply be assigned to the element's
//! value. The simulation replays the full per-character sequence with a fixed
//! inter-character delay.

use std::time::Duration;

use crate::page::TypingTarget;

/// Delay used when no caller-specific delay applies.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(100);

/// Type `text` into `target` one character at a time.
///
/// Per character: key-down, append to the element value, input event carrying
/// the character, key-up, then `delay` before the next character. Runs on the
/// caller's task; schedule it under the owning realm's
/// [`Scheduler`](crate::schedule::Scheduler) so teardown cancels it
/// mid-sequence.
pub async fn simulate_typing(target: &dyn TypingTarget, text: &str, delay: Duration) {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        target.key_down(ch);
        target.append(ch);
        target.input(ch);
        target.key_up(ch);
        if chars.peek().is_some() {
            tokio::time::sleep(delay).await;
        }
    }
    tracing::debug!(len = text.chars().count(), "typing simulation completed");
}
