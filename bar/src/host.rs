use std::{
    cell::RefCell,
    io::ErrorKind,
    path::PathBuf,
    rc::Rc,
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::Context;
use rumqttc::{Event, EventLoop, Incoming};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use heater_common::{GroupSelector, HeaterWidget, HubConfig, RuntimeConfig};

use crate::{
    hub::HubSession,
    protocol::{parse_input_line, InputAction, StatusWriter},
};

struct ConfigStore {
    path: PathBuf,
}

/// What the MQTT task hands over to the widget loop.
#[derive(Debug)]
enum HubMessage {
    Connected,
    Publish { topic: String, payload: Vec<u8> },
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut config = store
        .load()
        .await
        .with_context(|| format!("failed to load config from {}", store.path.display()))?;
    apply_env_overrides(&mut config.hub);
    config.validate().context("invalid hub settings in environment")?;

    let widget = HeaterWidget::new(
        &config.widget,
        GroupSelector::new(config.hub.group_prefix.clone()),
        config.setpoint.clone(),
    )?;
    let widget = Rc::new(RefCell::new(widget));

    let (mut session, eventloop) = HubSession::init(&config.hub)?;
    let (mut hub_messages, hub_task) = spawn_hub_loop(eventloop);
    let mut hub_open = true;
    let subscription = {
        let widget = Rc::clone(&widget);
        session.subscribe(move |events| {
            widget.borrow_mut().handle_events(events);
        })
    };

    let mut status = StatusWriter::new(tokio::io::stdout());
    status.start().await.context("failed to write bar header")?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut poll = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("heater bar started");

    loop {
        let commit_due = widget.borrow().commit_due_ms();

        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = poll.tick() => {
                widget.borrow_mut().update_label(&session);
            }
            _ = sleep_until_ms(commit_due) => {
                widget.borrow_mut().on_commit_timer(&mut session, monotonic_ms());
            }
            message = hub_messages.recv(), if hub_open => match message {
                Some(HubMessage::Publish { topic, payload }) => {
                    if let Err(err) = session.handle_publish(&topic, &payload) {
                        warn!("hub message handling error on {topic}: {err}");
                    }
                }
                Some(HubMessage::Connected) => {
                    if let Err(err) = session.subscribe_topics() {
                        warn!("hub subscribe failed: {err}");
                    }
                }
                None => {
                    warn!("hub connection task stopped");
                    hub_open = false;
                }
            },
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => handle_input(&widget, &session, &line),
                Ok(None) => {
                    debug!("click event stream closed");
                    input_open = false;
                }
                Err(err) => {
                    warn!("click event read failed: {err}");
                    input_open = false;
                }
            },
        }

        let segments = widget.borrow().visible_segments();
        status
            .emit(&segments)
            .await
            .context("failed to write bar status")?;
    }

    session.unsubscribe(subscription);
    session.teardown();
    hub_task.abort();
    Ok(())
}

/// Drives the MQTT event loop on its own task, forwarding hub traffic to the
/// widget loop. Poll errors back off there, not in the widget loop.
fn spawn_hub_loop(mut eventloop: EventLoop) -> (mpsc::Receiver<HubMessage>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = tokio::spawn(async move {
        loop {
            let message = match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => HubMessage::Publish {
                    topic: message.topic,
                    payload: message.payload.to_vec(),
                },
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("hub connected");
                    HubMessage::Connected
                }
                Ok(_) => continue,
                Err(err) => {
                    warn!("hub poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            };
            if tx.send(message).await.is_err() {
                break;
            }
        }
    });
    (rx, handle)
}

fn handle_input(widget: &RefCell<HeaterWidget>, session: &HubSession, line: &str) {
    let Some(action) = parse_input_line(line) else {
        return;
    };
    let mut widget = widget.borrow_mut();
    match action {
        InputAction::Click(button) => widget.on_click(button, session),
        InputAction::Wheel(delta_y) => {
            widget.on_wheel(delta_y, monotonic_ms());
        }
    }
}

/// Sleeps until the monotonic deadline, or forever when there is none.
///
/// Re-evaluated on every loop turn, so a moved deadline replaces the old one.
async fn sleep_until_ms(deadline_ms: Option<u64>) {
    match deadline_ms {
        Some(deadline) => {
            let remaining = deadline.saturating_sub(monotonic_ms());
            tokio::time::sleep(Duration::from_millis(remaining)).await;
        }
        None => std::future::pending().await,
    }
}

fn apply_env_overrides(hub: &mut HubConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        hub.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        hub.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        hub.mqtt_user = user;
        hub.mqtt_pass = std::env::var("MQTT_PASS").unwrap_or_default();
    }
    if let Ok(prefix) = std::env::var("HEATER_GROUP") {
        hub.group_prefix = prefix;
    }
}

impl ConfigStore {
    fn new() -> Self {
        let path = std::env::var("HEATER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.heater/config.json"));
        Self { path }
    }

    async fn load(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(RuntimeConfig::from_json(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("no config at {}, using defaults", self.path.display());
                Ok(RuntimeConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
