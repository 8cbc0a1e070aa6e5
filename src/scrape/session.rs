//! Run orchestration: browser lifecycle, login, challenge gate, indexing,
//! per-book extraction, aggregation.

use super::challenge::probe_challenge;
use super::highlights::extract_book;
use super::library::index_library;
use crate::browser::ChromeDriver;
use crate::core::config::ScraperConfig;
use crate::core::page::PageDriver;
use crate::errors::{Result, ScrapeError};
use crate::humanize::human_type;
use crate::types::{BookResult, Credentials, RunOutcome};
use tracing::{info, warn};
use uuid::Uuid;

/// Launch a dedicated browser and run one full scrape. The browser is
/// released on every exit path, including Blocked and Failure.
pub async fn scrape_notebook(credentials: &Credentials, config: ScraperConfig) -> RunOutcome {
    let driver = match ChromeDriver::launch(&config.browser) {
        Ok(driver) => driver,
        Err(err) => return RunOutcome::Failure(err),
    };
    ScrapeSession::new(driver, config).run(credentials).await
}

/// One scraping run over one exclusively-owned page.
pub struct ScrapeSession<D: PageDriver> {
    driver: D,
    config: ScraperConfig,
    run_id: Uuid,
}

impl<D: PageDriver> ScrapeSession<D> {
    pub fn new(driver: D, config: ScraperConfig) -> Self {
        Self {
            driver,
            config,
            run_id: Uuid::new_v4(),
        }
    }

    /// Consume the session, producing the run outcome. Internal faults are
    /// folded into the outcome; the driver is always closed exactly once.
    pub async fn run(mut self, credentials: &Credentials) -> RunOutcome {
        let outcome = match self.execute(credentials).await {
            Ok(results) => RunOutcome::Success(results),
            Err(ScrapeError::Blocked(signal)) => RunOutcome::Blocked(signal),
            Err(err) => {
                warn!(run_id = %self.run_id, error = %err, "scrape run failed");
                RunOutcome::Failure(err)
            }
        };

        if let Err(err) = self.driver.close().await {
            warn!(run_id = %self.run_id, error = %err, "failed to release browser");
        }

        outcome
    }

    async fn execute(&self, credentials: &Credentials) -> Result<Vec<BookResult>> {
        info!(
            run_id = %self.run_id,
            url = %self.config.notebook_url,
            "starting notebook scrape"
        );

        self.driver.goto(&self.config.notebook_url).await?;
        self.login(credentials).await?;

        if self.config.manual_challenge {
            info!(
                run_id = %self.run_id,
                "manual challenge mode: detection skipped, extended library wait"
            );
        } else if let Some(signal) = probe_challenge(
            &self.driver,
            &self.config.challenge_indicators,
            self.config.timeouts.challenge_probe_ms,
        )
        .await?
        {
            return Err(ScrapeError::Blocked(signal));
        }

        let library_timeout = if self.config.manual_challenge {
            self.config.timeouts.library_manual_ms
        } else {
            self.config.timeouts.library_ms
        };
        self.driver
            .wait_for(&self.config.dom.library_entry, library_timeout)
            .await?;

        let entries = index_library(&self.driver, &self.config.dom).await?;

        let mut results = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            info!(
                run_id = %self.run_id,
                book = %entry.title,
                "processing book {}/{}",
                i + 1,
                entries.len()
            );
            if let Some(result) = extract_book(&self.driver, entry, &self.config).await? {
                results.push(result);
            }
        }

        info!(
            run_id = %self.run_id,
            books = results.len(),
            highlights = results.iter().map(|r| r.highlights.len()).sum::<usize>(),
            "scrape completed"
        );
        Ok(results)
    }

    /// Fill and submit the two-step login form with human-paced input.
    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let dom = &self.config.dom;
        let timing = &self.config.timing;
        let login_ms = self.config.timeouts.login_ms;

        self.driver.wait_for(&dom.email_input, login_ms).await?;
        human_type(&self.driver, &dom.email_input, &credentials.email, timing).await?;
        timing.pause(timing.pre_submit_ms).await;
        self.driver.click(&dom.continue_button).await?;

        self.driver.wait_for(&dom.password_input, login_ms).await?;
        human_type(
            &self.driver,
            &dom.password_input,
            &credentials.password,
            timing,
        )
        .await?;
        timing.pause(timing.pre_submit_ms).await;
        self.driver.click(&dom.signin_button).await?;

        info!("login form submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::TimingPolicy;
    use crate::testing::{Action, FakeDriver};

    const LOGIN_PAGE: &str = r#"
        <html><body>
        <input name="email" type="email">
        <input id="continue" type="submit">
        </body></html>
    "#;

    const PASSWORD_PAGE: &str = r#"
        <html><body>
        <input name="password" type="password">
        <input id="signInSubmit" type="submit">
        </body></html>
    "#;

    const CHALLENGE_PAGE: &str = r#"
        <html><body>
        <div class="cvf-widget-container"><p>Solve this puzzle</p></div>
        </body></html>
    "#;

    fn library_page(extra: &str) -> String {
        format!(
            r#"
            <html><body>
            <div class="a-scroller kp-notebook-scroller-addon a-scroller-vertical">
                <div class="kp-notebook-library-each-book" id="B001">
                    <h2 class="kp-notebook-searchable">First Book</h2>
                    <p class="a-spacing-base a-color-secondary">By: Jane Doe, John Smith</p>
                    <img class="kp-notebook-cover-image" src="https://img.example/1.jpg">
                    <span data-action="get-annotations-for-asin">View notes</span>
                </div>
                <div class="kp-notebook-library-each-book" id="B002">
                    <h2 class="kp-notebook-searchable">Second Book</h2>
                </div>
            </div>
            {extra}
            </body></html>
            "#
        )
    }

    fn first_book_panel() -> String {
        library_page(
            r#"
            <span id="kp-notebook-annotated-date">Sunday August 17, 2025</span>
            <div class="a-row a-spacing-base">
                <div class="kp-notebook-highlight"><span id="highlight">alpha</span></div>
            </div>
            <div class="a-row a-spacing-base">
                <div class="kp-notebook-highlight"><span id="highlight">beta</span></div>
            </div>
            <div class="a-row a-spacing-base">
                <div class="kp-notebook-highlight"><span id="highlight">gamma</span></div>
            </div>
            "#,
        )
    }

    fn test_config() -> ScraperConfig {
        let mut config = ScraperConfig {
            timing: TimingPolicy::instant(),
            ..ScraperConfig::default()
        };
        config.timeouts.challenge_probe_ms = 10;
        config
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "reader@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn login_flow(library: &str) -> FakeDriver {
        FakeDriver::new(LOGIN_PAGE)
            .with_transition("input#continue", PASSWORD_PAGE)
            .with_transition("input#signInSubmit", library)
    }

    #[tokio::test]
    async fn full_run_extracts_ordered_highlights() {
        let action_sel = r#"#B001 span[data-action="get-annotations-for-asin"]"#;
        let driver = login_flow(&library_page(""))
            .with_transition(action_sel, &first_book_panel())
            // Second book renders an empty panel.
            .with_transition("#B002", &library_page(""));
        let probe = driver.clone();

        let outcome = ScrapeSession::new(driver, test_config())
            .run(&credentials())
            .await;

        let RunOutcome::Success(results) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title, "First Book");
        assert_eq!(first.authors, vec!["Jane Doe", "John Smith"]);
        assert_eq!(first.cover_url.as_deref(), Some("https://img.example/1.jpg"));
        assert_eq!(first.date.as_deref(), Some("08-17-2025"));
        let texts: Vec<&str> = first.highlights.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);

        // Open policy decision: a zero-highlight book still yields a result.
        let second = &results[1];
        assert_eq!(second.title, "Second Book");
        assert_eq!(second.authors, vec!["Unknown Author"]);
        assert!(second.highlights.is_empty());

        // Both credentials typed character by character, browser released.
        let typed_chars = probe
            .actions()
            .await
            .iter()
            .filter(|a| matches!(a, Action::TypeText(_)))
            .count();
        assert_eq!(typed_chars, "reader@example.com".len() + "hunter2".len());
        // The password field was the last one cleared and filled.
        assert_eq!(probe.typed_text().await, "hunter2");
        assert!(probe.is_closed().await);
    }

    #[tokio::test]
    async fn challenge_blocks_with_no_results() {
        let driver = login_flow(CHALLENGE_PAGE);
        let probe = driver.clone();

        let mut config = test_config();
        config.timeouts.challenge_probe_ms = 50;
        let outcome = ScrapeSession::new(driver, config).run(&credentials()).await;

        assert!(matches!(outcome, RunOutcome::Blocked(_)));
        assert!(probe.is_closed().await);
    }

    #[tokio::test]
    async fn manual_mode_skips_challenge_probing() {
        // The library renders directly; with probing skipped the "puzzle"
        // text sitting in the page must not block the run.
        let library = library_page("<p>puzzle archive</p>");
        let driver = login_flow(&library)
            .with_transition(
                r#"#B001 span[data-action="get-annotations-for-asin"]"#,
                &first_book_panel(),
            )
            .with_transition("#B002", &library_page(""));

        let mut config = test_config();
        config.manual_challenge = true;
        let outcome = ScrapeSession::new(driver, config).run(&credentials()).await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn unprocessable_entry_is_skipped_not_fatal() {
        // Clicking the first book swaps to a panel where #B002 no longer
        // exists, so the second entry has no click target at all; the third
        // book must still be processed.
        let library = r#"
            <html><body>
            <div class="kp-notebook-library-each-book" id="B001">
                <h2 class="kp-notebook-searchable">First</h2>
            </div>
            <div class="kp-notebook-library-each-book" id="B002">
                <h2 class="kp-notebook-searchable">Vanishing</h2>
            </div>
            <div class="kp-notebook-library-each-book" id="B003">
                <h2 class="kp-notebook-searchable">Third</h2>
            </div>
            </body></html>
        "#;
        let after_first = r#"
            <html><body>
            <div class="kp-notebook-library-each-book" id="B001">
                <h2 class="kp-notebook-searchable">First</h2>
            </div>
            <div class="kp-notebook-library-each-book" id="B003">
                <h2 class="kp-notebook-searchable">Third</h2>
            </div>
            <div class="a-row a-spacing-base">
                <div class="kp-notebook-highlight"><span id="highlight">kept</span></div>
            </div>
            </body></html>
        "#;

        let driver = login_flow(library)
            .with_transition("#B001", after_first)
            .with_transition("#B003", after_first);

        let outcome = ScrapeSession::new(driver, test_config())
            .run(&credentials())
            .await;

        let RunOutcome::Success(results) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
    }

    #[tokio::test]
    async fn navigation_fault_is_failure_and_still_releases_browser() {
        // Login page without a password field: the wait after the continue
        // click times out, which is a run failure, not a block.
        let driver = FakeDriver::new(LOGIN_PAGE).with_transition("input#continue", "<html></html>");
        let probe = driver.clone();

        let mut config = test_config();
        config.timeouts.login_ms = 50;
        let outcome = ScrapeSession::new(driver, config).run(&credentials()).await;

        assert!(matches!(outcome, RunOutcome::Failure(_)));
        assert!(probe.is_closed().await);
        assert!(probe.actions().await.contains(&Action::Close));
    }
}
