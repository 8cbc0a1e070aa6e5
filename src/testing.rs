//! Test support: a scripted [`PageDriver`] backed by static HTML snapshots.
//!
//! `FakeDriver` serves `content()` from an in-memory document, answers
//! presence checks by running real CSS selectors against it, and swaps the
//! document when configured click transitions fire. Every input action is
//! recorded so tests can assert on the exact interaction sequence.

use crate::core::page::{ElementRect, PageDriver};
use crate::errors::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto(String),
    WaitFor(String),
    Click(String),
    ClearValue(String),
    TypeText(String),
    PressKey(String),
    MoveMouse(f64, f64),
    ClickAt(f64, f64),
    Evaluate(String),
    Close,
}

#[derive(Default)]
struct FakeState {
    html: String,
    transitions: HashMap<String, String>,
    rects: HashMap<String, ElementRect>,
    eval_results: HashMap<String, Value>,
    actions: Vec<Action>,
    closed: bool,
}

/// Scripted page driver. Cloning shares the underlying state, so a test can
/// keep a handle while the session under test consumes its copy.
#[derive(Clone)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new(html: &str) -> Self {
        let state = FakeState {
            html: html.to_string(),
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// When `selector` is clicked, replace the document with `html`.
    pub fn with_transition(self, selector: &str, html: &str) -> Self {
        self.lock()
            .transitions
            .insert(selector.to_string(), html.to_string());
        self
    }

    pub fn with_rect(self, selector: &str, rect: ElementRect) -> Self {
        self.lock().rects.insert(selector.to_string(), rect);
        self
    }

    /// Scripts containing `key` evaluate to `value`; everything else is null.
    pub fn with_eval(self, key: &str, value: Value) -> Self {
        self.lock().eval_results.insert(key.to_string(), value);
        self
    }

    pub async fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub async fn current_html(&self) -> String {
        self.lock().html.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Replay recorded typing (characters and backspaces) into the string
    /// an input field would end up holding.
    pub async fn typed_text(&self) -> String {
        let mut text = String::new();
        for action in &self.lock().actions {
            match action {
                Action::TypeText(chunk) => text.push_str(chunk),
                Action::PressKey(key) if key == "Backspace" => {
                    text.pop();
                }
                Action::ClearValue(_) => text.clear(),
                _ => {}
            }
        }
        text
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn selector_matches(html: &str, selector: &str) -> Result<bool> {
    let parsed = Selector::parse(selector)
        .map_err(|_| ScrapeError::SelectorParse(selector.to_string()))?;
    let document = Html::parse_document(html);
    Ok(document.select(&parsed).next().is_some())
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.lock().actions.push(Action::Goto(url.to_string()));
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let html = {
            let mut state = self.lock();
            state.actions.push(Action::WaitFor(selector.to_string()));
            state.html.clone()
        };
        if selector_matches(&html, selector)? {
            Ok(())
        } else {
            Err(ScrapeError::Timeout {
                selector: selector.to_string(),
                timeout_ms,
            })
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let html = self.lock().html.clone();
        selector_matches(&html, selector)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.lock().html.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let mut state = self.lock();
        state.actions.push(Action::Evaluate(script.to_string()));
        let result = state
            .eval_results
            .iter()
            .find(|(key, _)| script.contains(key.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null);
        Ok(result)
    }

    async fn rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        Ok(self.lock().rects.get(selector).copied())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.lock();
        state.actions.push(Action::Click(selector.to_string()));
        if let Some(next) = state.transitions.get(selector).cloned() {
            state.html = next;
        }
        Ok(())
    }

    async fn clear_value(&self, selector: &str) -> Result<()> {
        self.lock()
            .actions
            .push(Action::ClearValue(selector.to_string()));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.lock().actions.push(Action::TypeText(text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.lock().actions.push(Action::PressKey(key.to_string()));
        Ok(())
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.lock().actions.push(Action::MoveMouse(x, y));
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.lock().actions.push(Action::ClickAt(x, y));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.actions.push(Action::Close);
        state.closed = true;
        Ok(())
    }
}
