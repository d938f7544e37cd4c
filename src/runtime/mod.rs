//! Local game driver.
//!
//! One task owns the simulation and the session. Ticks, view commands and session
//! events are handled strictly one at a time, so network traffic only touches the
//! world between simulation passes.

use crate::config::{AppConfig, Mode};
use crate::game::simulation::{PlayerInput, Simulation, TickOutcome};
use crate::game::types::Skin;
use crate::protocol::{ViewCommand, ViewEvent};
use crate::session::{Session, SessionConfig, SessionError, SessionEvent, SessionEvents, SessionNotice};
use crate::shared::names::player_name_or_default;
use crate::transport::directory::{self, Directory};
use crate::transport::ws_session::ViewHub;
use anyhow::Context;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub fn session_config(config: &AppConfig) -> SessionConfig {
    SessionConfig {
        peer_bind: config.peer_bind,
        advertise_host: config.peer_advertise_host.clone(),
        join_timeout: config.game.join_timeout,
        player_update_period: config.game.player_update_period,
        game_state_period: config.game.game_state_period,
        max_update_segments: config.game.max_update_segments,
        remote_timeout: config.game.remote_timeout,
    }
}

pub struct Runtime {
    config: AppConfig,
    session: Session,
    hub: ViewHub,
    sim: Option<Simulation>,
    next_seed: u64,
}

impl Runtime {
    pub fn new(config: AppConfig, directory: Directory, hub: ViewHub) -> (Self, SessionEvents) {
        let (session, events) = Session::new(session_config(&config), directory);
        let next_seed = config.seed.unwrap_or_else(rand::random);
        let runtime = Self {
            config,
            session,
            hub,
            sim: None,
            next_seed,
        };
        (runtime, events)
    }

    #[cfg(test)]
    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn start_offline(&mut self, name: Option<String>, skin: Option<String>) {
        let (name, skin) = self.identity(name, skin);
        info!(%name, skin = %skin.name, "starting offline game");
        self.sim = Some(self.new_simulation(name, skin, true));
    }

    pub async fn start_host(
        &mut self,
        name: Option<String>,
        skin: Option<String>,
    ) -> Result<String, SessionError> {
        let (name, skin) = self.identity(name, skin);
        self.sim = Some(self.new_simulation(name.clone(), skin.clone(), false));
        match self.session.host(name, skin).await {
            Ok(token) => {
                self.hub.notify(&ViewEvent::SessionCreated {
                    token: token.clone(),
                });
                self.notify_players();
                Ok(token)
            }
            Err(error) => {
                self.fail_session(&error);
                Err(error)
            }
        }
    }

    pub async fn start_join(
        &mut self,
        name: Option<String>,
        skin: Option<String>,
        token: String,
    ) -> Result<(), SessionError> {
        let (name, skin) = self.identity(name, skin);
        self.sim = Some(self.new_simulation(name.clone(), skin.clone(), false));
        match self.session.join(name, skin, &token).await {
            Ok(()) => {
                let token = self.session.token().unwrap_or(token.as_str()).to_string();
                self.hub.notify(&ViewEvent::SessionJoined { token });
                Ok(())
            }
            Err(error) => {
                self.fail_session(&error);
                Err(error)
            }
        }
    }

    /// Ends any session and drops the current game.
    pub async fn leave(&mut self) {
        if self.session.is_active() {
            self.session.leave().await;
        }
        self.sim = None;
    }

    pub async fn on_command(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Play { name, skin } => {
                self.leave().await;
                self.start_offline(name, skin);
            }
            ViewCommand::Host { name, skin } => {
                self.leave().await;
                let _ = self.start_host(name, skin).await;
            }
            ViewCommand::Join { name, skin, token } => {
                self.leave().await;
                let _ = self.start_join(name, skin, token).await;
            }
            ViewCommand::Leave => {
                self.leave().await;
                self.notify_players();
            }
            ViewCommand::Input { heading, boost } => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.set_input(PlayerInput {
                        heading,
                        boost: boost.unwrap_or(false),
                    });
                }
            }
        }
    }

    pub async fn on_tick(&mut self, now: i64) {
        let Some(sim) = self.sim.as_mut() else { return };
        let remotes = self.session.remote_players();
        let outcome = sim.tick(now, 1.0, &remotes);
        if self.hub.has_clients() {
            self.hub.publish_frame(&ViewEvent::Frame(sim.frame(now, &remotes)));
        }

        match outcome {
            TickOutcome::Running { kills } => {
                for peer_id in kills.into_iter().filter_map(|kill| kill.remote_peer) {
                    self.session.mark_defeated(&peer_id);
                }
            }
            TickOutcome::GameOver(summary) => {
                self.hub.notify(&ViewEvent::GameOver(summary));
                if self.session.is_active() {
                    self.session.leave().await;
                    self.notify_players();
                }
            }
            TickOutcome::Idle => {}
        }
    }

    pub async fn on_session_event(&mut self, event: SessionEvent) {
        let Some(sim) = self.sim.as_mut() else {
            debug!(?event, "session event without a running game");
            return;
        };
        match self.session.handle_event(event, sim) {
            Some(SessionNotice::PlayersChanged) => self.notify_players(),
            Some(SessionNotice::HostLost) => {
                warn!("lost connection to host");
                self.session.leave().await;
                self.hub.notify(&ViewEvent::SessionError {
                    message: "Connection to host lost".to_string(),
                });
                self.notify_players();
            }
            None => {}
        }
    }

    fn identity(&self, name: Option<String>, skin: Option<String>) -> (String, Skin) {
        let name = player_name_or_default(Some(
            name.as_deref().unwrap_or(self.config.player_name.as_str()),
        ));
        let skin = Skin::by_name(skin.as_deref().unwrap_or(self.config.player_skin.as_str()));
        (name, skin)
    }

    fn new_simulation(&mut self, name: String, skin: Skin, with_bots: bool) -> Simulation {
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(1);
        Simulation::new(self.config.game.clone(), name, skin, with_bots, seed)
    }

    fn fail_session(&mut self, error: &SessionError) {
        warn!(%error, "session setup failed");
        self.sim = None;
        self.hub.notify(&ViewEvent::SessionError {
            message: error.to_string(),
        });
    }

    fn notify_players(&self) {
        self.hub.notify(&ViewEvent::Players {
            names: self.session.player_names(),
        });
    }
}

/// Runs the process in the configured mode until ctrl-c.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    if config.mode == Mode::Directory {
        return directory::run(config.directory_port).await;
    }

    let directory = match config.directory_url.as_deref() {
        Some(url) => Directory::http(url),
        None => Directory::memory(),
    };
    if let (Mode::Host, Directory::Memory(registry)) = (config.mode, &directory) {
        let registry = Arc::clone(registry);
        let port = config.directory_port;
        tokio::spawn(async move {
            if let Err(error) = directory::serve(registry, port).await {
                warn!(?error, "embedded peer directory stopped");
            }
        });
    }

    let (commands_tx, mut commands) = mpsc::unbounded_channel();
    let hub = ViewHub::new(commands_tx);
    let address = format!("0.0.0.0:{}", config.view_port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding view socket on {address}"))?;
    info!("view listening on {address}");
    let app = hub.clone().router();
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            warn!(?error, "view server stopped");
        }
    });

    let mode = config.mode;
    let room_token = config.room_token.clone();
    let tick = config.game.tick;
    let (mut runtime, mut session_events) = Runtime::new(config, directory, hub);
    match mode {
        Mode::Host => {
            let token = runtime.start_host(None, None).await?;
            info!(%token, "share this room token with other players");
        }
        Mode::Join => {
            let token = room_token.context("ROOM_TOKEN is required in join mode")?;
            runtime.start_join(None, None, token).await?;
        }
        Mode::Play | Mode::Directory => runtime.start_offline(None, None),
    }

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => runtime.on_tick(now_millis()).await,
            Some(command) = commands.recv() => runtime.on_command(command).await,
            Some(event) = session_events.recv() => runtime.on_session_event(event).await,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                runtime.leave().await;
                break;
            }
        }
    }
    Ok(())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
