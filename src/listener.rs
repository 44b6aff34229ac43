use crate::api::spotify_auth;
use crate::config::Config;
use crate::handler::MessageHandler;
use crate::models::ChatMessage;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Stand-in for the chat gateway: every input line is a user message, handled
/// on its own task. `/ping`, `/auth_spotify` and `/callback <redirect-url>`
/// are answered in-band.
///
/// Work spawned for a line is drained before [`Listener::run`] returns, so
/// end of input or a shutdown signal never drops a reply or a pending
/// authorization.
pub struct Listener {
    cfg: Arc<Config>,
    handler: Arc<MessageHandler>,
    sessions: Arc<SessionStore>,
    http: reqwest::Client,
    limiter: Option<Arc<Semaphore>>,
}

impl Listener {
    pub fn new(cfg: Config, handler: MessageHandler) -> Result<Self> {
        let http = cfg.http_client()?;
        let limiter = cfg
            .max_concurrent_messages
            .map(|n| Arc::new(Semaphore::new(n)));
        let sessions = handler.sessions().clone();
        Ok(Self {
            cfg: Arc::new(cfg),
            handler: Arc::new(handler),
            sessions,
            http,
            limiter,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Read lines from `input` until EOF or `shutdown` resolves, writing
    /// replies to `out` one per line.
    pub async fn run<R, W, S>(&self, input: R, out: Arc<Mutex<W>>, shutdown: S) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future,
    {
        let mut lines = BufReader::new(input).lines();
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);
        info!("listening for messages");

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("reading input")?,
                _ = &mut shutdown => {
                    info!("interrupted, stopping");
                    break;
                }
            };
            let Some(line) = line else { break };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            if line == "/ping" {
                emit(&out, "Pong!").await;
                continue;
            }
            if line == "/auth_spotify" {
                match spotify_auth::authorize_url(&self.cfg) {
                    Ok(url) => emit(&out, url.as_str()).await,
                    Err(e) => warn!("cannot build authorization url: {:#}", e),
                }
                continue;
            }
            if let Some(redirect) = line.strip_prefix("/callback ") {
                let (cfg, http, sessions) =
                    (self.cfg.clone(), self.http.clone(), self.sessions.clone());
                let redirect = redirect.to_string();
                let out = out.clone();
                tasks.spawn(async move {
                    let res = match spotify_auth::code_from_redirect(&redirect) {
                        Ok(code) => {
                            spotify_auth::complete_authorization(&http, &cfg, &sessions, &code)
                                .await
                        }
                        Err(e) => Err(e),
                    };
                    match res {
                        Ok(()) => emit(&out, "Spotify authentication complete.").await,
                        Err(e) => error!("authorization callback failed: {:#}", e),
                    }
                });
                continue;
            }

            let handler = self.handler.clone();
            let limiter = self.limiter.clone();
            let out = out.clone();
            tasks.spawn(async move {
                let _permit = match &limiter {
                    Some(sem) => match sem.clone().acquire_owned().await {
                        Ok(p) => Some(p),
                        Err(_) => return,
                    },
                    None => None,
                };
                for reply in handler.handle(&ChatMessage::from_user(line)).await {
                    emit(&out, &reply).await;
                }
            });
        }

        if !tasks.is_empty() {
            info!("waiting for {} in-flight task(s)", tasks.len());
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!("message task failed: {}", e);
            }
        }
        Ok(())
    }
}

async fn emit<W: AsyncWrite + Unpin>(out: &Mutex<W>, line: &str) {
    let mut w = out.lock().await;
    let res = async {
        w.write_all(line.as_bytes()).await?;
        w.write_all(b"\n").await?;
        w.flush().await
    }
    .await;
    if let Err(e) = res {
        warn!("failed to write reply: {}", e);
    }
}
