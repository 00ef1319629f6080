//! Run modes: wiring of config, REST client, bus, sessions and stdin.
//!
//! Setup failures (bad config section, auth, first dial) are returned to
//! `main`. Once a mode is running, errors become lines on the sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use fishpi_core::error::{FishPiError, Result};

use crate::api::{FishPiApi, RestClient};
use crate::bus::EventBus;
use crate::chat::{ChatOptions, ChatSessionCore, RoomCommand, SendMode};
use crate::config::{ClientConfig, ConfigStore, Persist};
use crate::elves::Elves;
use crate::ice::{self, IceBridge};
use crate::liveness::{ApiScoreSync, LivenessTracker};
use crate::obs::{ClientMetrics, Sink};
use crate::transport::{SessionOptions, WebsocketSession};

/// Trimmed, non-blank stdin lines until Ctrl-C. A closed stdin keeps the
/// mode running until Ctrl-C.
pub struct Input {
    lines: Lines<BufReader<Stdin>>,
    eof: bool,
}

impl Input {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            eof: false,
        }
    }

    pub async fn next(&mut self) -> Option<String> {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => return None,
                line = self.lines.next_line(), if !self.eof => match line {
                    Ok(Some(l)) => {
                        let l = l.trim();
                        if !l.is_empty() {
                            return Some(l.to_string());
                        }
                    }
                    Ok(None) => self.eof = true,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        self.eof = true;
                    }
                },
            }
        }
    }
}

pub struct App {
    store: Arc<ConfigStore>,
    cfg: ClientConfig,
    sink: Arc<dyn Sink>,
    metrics: Arc<ClientMetrics>,
}

impl App {
    pub fn new(store: Arc<ConfigStore>, sink: Arc<dyn Sink>) -> Self {
        let cfg = store.snapshot();
        Self {
            store,
            cfg,
            sink,
            metrics: Arc::new(ClientMetrics::default()),
        }
    }

    fn show(&self, line: &str) {
        self.sink.show(line);
    }

    fn rest(&self) -> Result<Arc<RestClient>> {
        Ok(Arc::new(RestClient::from_config(&self.cfg.fish_pi)?))
    }

    fn bus(&self, name: &'static str) -> Arc<EventBus> {
        Arc::new(EventBus::with_metrics(name, self.metrics.clone()))
    }

    fn session_options(&self, url: String) -> SessionOptions {
        SessionOptions::new(url)
            .reconnect_interval(Duration::from_secs(self.cfg.settings.ws_interval))
            .max_retries(self.cfg.settings.ws_max_retries)
    }

    fn attach_elves(&self, bus: &EventBus) -> Result<()> {
        if let Some(token) = self.cfg.elves_token() {
            Elves::new(&self.cfg.fish_pi.username, token, self.sink.clone())?.attach(bus);
        }
        Ok(())
    }

    async fn tracker(&self, api: &Arc<RestClient>) -> Result<Arc<LivenessTracker>> {
        let score = match api.liveness().await {
            Ok(s) => s,
            Err(e) => {
                self.show(&format!("获取当前活跃度失败 {e}"));
                0.0
            }
        };
        self.show(&format!("当前活跃度：{score}"));
        let window = self.cfg.settings.window()?;
        Ok(Arc::new(LivenessTracker::new(score, window, self.sink.clone())))
    }

    /// Exchange credentials for a key and write it back to the config file.
    pub async fn login(&self) -> Result<()> {
        let f = &self.cfg.fish_pi;
        if f.password_md5.is_empty() {
            return Err(FishPiError::Config(
                "fishPi.password or fishPi.passwordMd5 is required to log in".into(),
            ));
        }
        let api = self.rest()?;
        let key = api
            .get_access_key(&f.username, &f.password_md5, &f.mfa_code)
            .await
            .map_err(|e| match e {
                FishPiError::Api { msg, .. } => FishPiError::AuthFailed(msg),
                other => other,
            })?;
        match self.store.persist_api_key(&key) {
            Ok(()) => self.show("更新成功！"),
            Err(e) => {
                tracing::warn!(error = %e, "persist api key failed");
                self.show(&format!("更新配置文件失败，请手动更新 apiKey: {key}"));
            }
        }
        Ok(())
    }

    /// Render the chat room. Stdin lines are room commands; with
    /// `interactive`, any other line goes through send mode.
    pub async fn chat_room(&self, interactive: bool) -> Result<()> {
        let api = self.rest()?;
        let bus = self.bus("chat-room");
        let session = WebsocketSession::new(self.session_options(api.ws_url()?), bus.clone());

        let mut opts = ChatOptions::new(self.cfg.fish_pi.username.clone());
        opts.cache_size = self.cfg.settings.msg_cache_num;
        opts.filter = self.cfg.settings.line_filter();
        opts.kaibai_token = self.cfg.elves_token().map(str::to_string);
        let core = ChatSessionCore::new(opts, api.clone(), bus.clone(), self.sink.clone());
        core.subscribe();
        self.attach_elves(&bus)?;

        let (send_mode, sync) = if interactive {
            let tracker = self.tracker(&api).await?;
            let sync = tracker.spawn_sync(Arc::new(ApiScoreSync(api.clone())));
            let sm = SendMode::new(api.clone(), bus.clone(), self.sink.clone()).with_tracker(tracker);
            (Some(sm), Some(sync))
        } else {
            (None, None)
        };

        core.show_history().await;
        session.start().await?;
        let keepalive = core.spawn_keepalive();

        let mut input = Input::stdin();
        while let Some(line) = input.next().await {
            match &send_mode {
                Some(sm) if !RoomCommand::parse(&line).is_valid() => sm.handle_input(&line).await,
                _ => {
                    core.handle_command(&line).await;
                }
            }
        }

        keepalive.abort();
        if let Some(sync) = sync {
            sync.abort();
        }
        if let Err(e) = session.stop().await {
            tracing::debug!(error = %e, "stop");
        }
        Ok(())
    }

    /// Send mode: every line is a command or a chat message.
    pub async fn send(&self) -> Result<()> {
        let api = self.rest()?;
        let tracker = self.tracker(&api).await?;
        let sync = tracker.spawn_sync(Arc::new(ApiScoreSync(api.clone())));
        let bus = self.bus("send");
        self.attach_elves(&bus)?;

        let sm = SendMode::new(api, bus, self.sink.clone()).with_tracker(tracker);
        let mut input = Input::stdin();
        while let Some(line) = input.next().await {
            sm.handle_input(&line).await;
        }
        sync.abort();
        Ok(())
    }

    pub async fn ice(&self) -> Result<()> {
        let cfg = self
            .cfg
            .ice
            .clone()
            .ok_or_else(|| FishPiError::Config("ice section is missing".into()))?;
        let bus = self.bus("ice");
        let session = WebsocketSession::new(self.session_options(cfg.url.clone()), bus.clone());
        let persist: Arc<dyn Persist> = self.store.clone();
        let bridge = IceBridge::new(&cfg, bus, self.sink.clone(), persist);
        bridge.subscribe();

        session.start().await?;
        let keepalive = bridge.spawn_keepalive(ice::KEEPALIVE_EVERY);

        let mut input = Input::stdin();
        while let Some(line) = input.next().await {
            if let Err(e) = bridge.handle_input(&line) {
                self.show(&e.to_string());
            }
        }

        keepalive.abort();
        if let Err(e) = session.stop().await {
            tracing::debug!(error = %e, "stop");
        }
        Ok(())
    }
}
