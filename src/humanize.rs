//! Human-interaction synthesis: typing and clicking with the timing
//! irregularities of a real user.
//!
//! All jitter comes from an injectable [`TimingPolicy`], so tests run with
//! [`TimingPolicy::instant`] and stay deterministic.

use crate::core::page::PageDriver;
use crate::errors::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Characters that slow a typist down inside an email address.
const SPECIAL_CHARS: &str = "@._-";

/// Delay buckets and probabilities for synthesized input. Ranges are
/// `(min_ms, max_ms)` and sampled uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Chance of typing a wrong character first (never on the first one).
    pub typo_probability: f64,
    /// Chance of an extra "thinking" pause after a character.
    pub thinking_probability: f64,

    /// Letter following another letter (fluent word typing).
    pub word_delay_ms: (u64, u64),
    pub digit_delay_ms: (u64, u64),
    /// Slow characters in an email address (`@ . _ -`).
    pub special_delay_ms: (u64, u64),
    pub default_delay_ms: (u64, u64),
    pub thinking_pause_ms: (u64, u64),

    /// Pause between a typo and noticing it.
    pub typo_notice_ms: (u64, u64),
    /// Pause after the correcting backspace.
    pub typo_fix_ms: (u64, u64),

    /// Pause between moving the pointer near a target and clicking it.
    pub pre_click_ms: (u64, u64),
    /// Pause before submitting a login form.
    pub pre_submit_ms: (u64, u64),
    /// Pause between scrolling a library entry into view and acting on it.
    pub post_scroll_ms: (u64, u64),
    /// Pause before clicking a library entry.
    pub pre_entry_click_ms: (u64, u64),
    /// Pause after a highlight panel reports ready.
    pub post_load_ms: (u64, u64),

    /// Pointer-move jitter around the chosen click point, in pixels.
    pub click_jitter_px: f64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            typo_probability: 0.03,
            thinking_probability: 0.05,
            word_delay_ms: (30, 80),
            digit_delay_ms: (80, 150),
            special_delay_ms: (100, 200),
            default_delay_ms: (50, 120),
            thinking_pause_ms: (300, 800),
            typo_notice_ms: (200, 500),
            typo_fix_ms: (100, 300),
            pre_click_ms: (100, 300),
            pre_submit_ms: (1_000, 2_000),
            post_scroll_ms: (300, 800),
            pre_entry_click_ms: (500, 1_500),
            post_load_ms: (300, 800),
            click_jitter_px: 2.0,
        }
    }
}

impl TimingPolicy {
    /// Zero-jitter policy for deterministic tests.
    pub fn instant() -> Self {
        Self {
            typo_probability: 0.0,
            thinking_probability: 0.0,
            word_delay_ms: (0, 0),
            digit_delay_ms: (0, 0),
            special_delay_ms: (0, 0),
            default_delay_ms: (0, 0),
            thinking_pause_ms: (0, 0),
            typo_notice_ms: (0, 0),
            typo_fix_ms: (0, 0),
            pre_click_ms: (0, 0),
            pre_submit_ms: (0, 0),
            post_scroll_ms: (0, 0),
            pre_entry_click_ms: (0, 0),
            post_load_ms: (0, 0),
            click_jitter_px: 0.0,
        }
    }

    pub fn sample(&self, (min, max): (u64, u64)) -> Duration {
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    /// Sleep for a duration drawn from `range`; zero ranges skip the sleep.
    pub async fn pause(&self, range: (u64, u64)) {
        let delay = self.sample(range);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    fn chance(&self, probability: f64) -> bool {
        probability > 0.0 && rand::rng().random::<f64>() < probability
    }
}

fn delay_bucket(policy: &TimingPolicy, ch: char, prev: Option<char>) -> (u64, u64) {
    if ch.is_ascii_alphabetic() && prev.is_some_and(|p| p.is_ascii_alphabetic()) {
        policy.word_delay_ms
    } else if ch.is_ascii_digit() {
        policy.digit_delay_ms
    } else if SPECIAL_CHARS.contains(ch) {
        policy.special_delay_ms
    } else {
        policy.default_delay_ms
    }
}

fn random_lowercase() -> char {
    (b'a' + rand::rng().random_range(0..26u8)) as char
}

/// Type `text` into the element at `selector`, one character at a time,
/// with occasional typo-and-fix sequences and class-dependent delays.
pub async fn human_type<D>(driver: &D, selector: &str, text: &str, policy: &TimingPolicy) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    debug!(selector, len = text.len(), "typing like a human");

    driver.click(selector).await?;
    driver.clear_value(selector).await?;

    let mut prev = None;
    for (i, ch) in text.chars().enumerate() {
        if i > 0 && policy.chance(policy.typo_probability) {
            let wrong = random_lowercase();
            driver.type_text(&wrong.to_string()).await?;
            policy.pause(policy.typo_notice_ms).await;
            driver.press_key("Backspace").await?;
            policy.pause(policy.typo_fix_ms).await;
        }

        driver.type_text(&ch.to_string()).await?;

        let mut delay = policy.sample(delay_bucket(policy, ch, prev));
        if policy.chance(policy.thinking_probability) {
            delay += policy.sample(policy.thinking_pause_ms);
        }
        if !delay.is_zero() {
            sleep(delay).await;
        }
        prev = Some(ch);
    }

    Ok(())
}

/// Click the element at `selector` at a random point inside its bounding
/// box, approaching it with a jittered pointer move first. Falls back to a
/// direct element click when no box is available.
pub async fn human_click<D>(driver: &D, selector: &str, policy: &TimingPolicy) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    let rect = driver.rect(selector).await?;
    match rect {
        Some(rect) if rect.width > 0.0 && rect.height > 0.0 => {
            // Somewhere inside the box, never the exact center.
            let (x, y, approach_x, approach_y) = {
                let mut rng = rand::rng();
                let x = rect.x + rng.random_range(0.2..0.8) * rect.width;
                let y = rect.y + rng.random_range(0.2..0.8) * rect.height;
                let jitter = policy.click_jitter_px;
                if jitter > 0.0 {
                    (
                        x,
                        y,
                        x + rng.random_range(-jitter..=jitter),
                        y + rng.random_range(-jitter..=jitter),
                    )
                } else {
                    (x, y, x, y)
                }
            };

            driver.move_mouse(approach_x, approach_y).await?;
            policy.pause(policy.pre_click_ms).await;
            driver.click_at(x, y).await?;
        }
        _ => {
            debug!(selector, "no bounding box, falling back to direct click");
            driver.click(selector).await?;
        }
    }

    Ok(())
}
