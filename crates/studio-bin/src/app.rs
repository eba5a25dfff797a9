use std::sync::Arc;

use anyhow::Context;
use session_store::FileCookieJar;
use studio_auth::{Bootstrap, RecordingNavigator, SessionManager};
use studio_config_and_utils::{AppMode, Config, Paths};
use tracing::info;
use url::Url;

/// One session over the cookie file under `paths`.
pub struct App {
    config: Config,
    manager: Arc<SessionManager>,
    navigator: Arc<RecordingNavigator>,
}

impl App {
    pub fn open(config: Config, paths: &Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;
        let jar = Arc::new(FileCookieJar::new(paths.cookie_file()));
        let store = Arc::new(SessionManager::open_store(&config, jar));
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionManager::new(&config, store, navigator.clone())
            .context("failed to create session manager")?;

        Ok(Self {
            config,
            manager,
            navigator,
        })
    }

    pub async fn bootstrap(&self, entry_url: &str, watch: bool) -> anyhow::Result<()> {
        let url = Url::parse(entry_url).with_context(|| format!("invalid entry URL: {entry_url}"))?;
        let bootstrap = Bootstrap::new(self.manager.clone(), self.config.mode);
        let outcome = bootstrap.run(&url).await;

        match outcome.redirect.or_else(|| self.navigator.last_redirect()) {
            Some(target) => println!("redirect: {target}"),
            None => println!("staying on loading view"),
        }
        self.print_auth_error();

        if watch && self.manager.state().is_authenticated() {
            println!("watching session, Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            info!("Stopped watching session");
        }
        Ok(())
    }

    pub fn status(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.manager.snapshot())?);
        Ok(())
    }

    pub async fn refresh(&self) -> anyhow::Result<()> {
        let result = self.manager.refresh_tokens().await;
        self.print_auth_error();
        result.context("refresh failed")?;
        println!("session refreshed");
        Ok(())
    }

    pub fn logout(&self) {
        self.manager.logout();
        println!("logged out");
    }

    pub async fn authorize_url(&self) {
        if self.config.mode == AppMode::Remote {
            self.manager.load_site_config().await;
        }
        println!("{}", self.manager.authorize_url());
    }

    pub async fn confirm_otp(&self, email: &str, code: &str) -> anyhow::Result<()> {
        self.manager
            .confirm_otp(email, code)
            .await
            .context("signup confirmation failed")?;
        println!("signup confirmed");
        Ok(())
    }

    pub async fn resend_otp(&self, email: &str) -> anyhow::Result<()> {
        self.manager
            .resend_otp(email)
            .await
            .context("could not resend signup code")?;
        println!("signup code sent");
        Ok(())
    }

    fn print_auth_error(&self) {
        if let Some(message) = self.navigator.take_auth_error() {
            eprintln!("auth error: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_logout_removes_cookie_file_entry() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());
        let app = App::open(Config::default(), &paths).unwrap();

        app.manager.store().set("usercid", "abc");
        assert!(std::fs::read_to_string(paths.cookie_file())
            .unwrap()
            .contains("session="));

        app.logout();
        let reopened = App::open(Config::default(), &paths).unwrap();
        assert!(reopened.manager.store().get().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_bad_url() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());
        let app = App::open(Config::default(), &paths).unwrap();

        assert!(app.bootstrap("not a url", false).await.is_err());
    }
}
