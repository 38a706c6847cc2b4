use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tracing::{debug, info, warn};

use heater_common::{
    group_id_from_state_topic, group_set_point_topic, EventRegistry, GroupDirectory,
    GroupSelector, GroupSnapshot, HeatingHub, HubConfig, HubError, HubEvent, SubscriptionId,
    TemperatureReading, TOPIC_HUB_EVENTS, TOPIC_HUB_GROUP_STATE_FILTER,
};

const MAX_HUB_PAYLOAD_BYTES: usize = 16 * 1024;

static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// The process-wide hub connection shared by every widget in this bar.
pub struct HubSession {
    client: AsyncClient,
    directory: GroupDirectory,
    registry: EventRegistry,
    active: bool,
}

impl HubSession {
    /// Opens the hub session. Fails while another session is still alive.
    pub fn init(config: &HubConfig) -> Result<(Self, EventLoop), HubError> {
        if SESSION_ACTIVE.swap(true, Ordering::AcqRel) {
            return Err(HubError::AlreadyInitialized);
        }

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.mqtt_host.clone(),
            config.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        if !config.mqtt_user.is_empty() {
            options.set_credentials(config.mqtt_user.clone(), config.mqtt_pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, 64);
        info!(
            host = %config.mqtt_host,
            port = config.mqtt_port,
            "hub session initialized"
        );

        Ok((
            Self {
                client,
                directory: GroupDirectory::new(),
                registry: EventRegistry::new(),
                active: true,
            },
            eventloop,
        ))
    }

    /// Queues the hub subscriptions; called again after every reconnect.
    pub fn subscribe_topics(&self) -> Result<(), rumqttc::ClientError> {
        for topic in [TOPIC_HUB_GROUP_STATE_FILTER, TOPIC_HUB_EVENTS] {
            self.client.try_subscribe(topic, QoS::AtLeastOnce)?;
        }
        Ok(())
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&[HubEvent]) + 'static) -> SubscriptionId {
        self.registry.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    #[cfg(test)]
    pub fn directory(&self) -> &GroupDirectory {
        &self.directory
    }

    /// Folds an incoming hub message into the directory.
    ///
    /// Push-event batches are also dispatched to every subscriber. Returns the
    /// number of events dispatched.
    pub fn handle_publish(&mut self, topic: &str, payload: &[u8]) -> Result<usize, HubError> {
        if payload.len() > MAX_HUB_PAYLOAD_BYTES {
            warn!(
                "dropping oversized hub payload on topic {} ({} bytes)",
                topic,
                payload.len()
            );
            return Ok(0);
        }

        if topic == TOPIC_HUB_EVENTS {
            let events: Vec<HubEvent> = serde_json::from_slice(payload)?;
            let applied = self.directory.apply_events(&events);
            debug!(events = events.len(), applied, "hub event batch received");
            self.registry.dispatch(&events);
            return Ok(events.len());
        }

        if let Some(group_id) = group_id_from_state_topic(topic) {
            let mut snapshot: GroupSnapshot = serde_json::from_slice(payload)?;
            snapshot.id = group_id.to_string();
            debug!(group = %snapshot.id, label = %snapshot.label, "hub group state received");
            self.directory.upsert(snapshot);
        }
        Ok(0)
    }

    pub fn teardown(mut self) {
        if let Err(err) = self.client.try_disconnect() {
            warn!("hub disconnect failed: {err}");
        }
        self.release();
        info!("hub session closed");
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            SESSION_ACTIVE.store(false, Ordering::Release);
        }
    }
}

impl Drop for HubSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl HeatingHub for HubSession {
    fn reading(&self, group: &GroupSelector) -> Result<TemperatureReading, HubError> {
        self.directory.reading(group)
    }

    fn set_point_temperature(
        &mut self,
        group: &GroupSelector,
        target: f32,
    ) -> Result<(), HubError> {
        let group_id = self
            .directory
            .find(group)
            .map(|snapshot| snapshot.id.clone())
            .ok_or_else(|| HubError::GroupNotFound(group.prefix().to_string()))?;

        self.client
            .try_publish(
                group_set_point_topic(&group_id),
                QoS::AtLeastOnce,
                false,
                format!("{target:.1}"),
            )
            .map_err(|err| HubError::Command(err.to_string()))?;
        self.directory.record_set_point(&group_id, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use heater_common::{HeaterWidget, HeaterWidgetConfig, SetpointCommit, SetpointConfig};

    use super::*;

    fn config() -> HubConfig {
        HubConfig {
            client_id: "heater-bar-test".to_string(),
            ..HubConfig::default()
        }
    }

    // Sessions share one process-wide guard, so the lifecycle is covered in a
    // single test.
    #[test]
    fn session_lifecycle() {
        let (mut session, _eventloop) = HubSession::init(&config()).unwrap();
        assert!(matches!(
            HubSession::init(&config()),
            Err(HubError::AlreadyInitialized)
        ));

        let selector = GroupSelector::new("Simon");
        assert!(matches!(
            session.reading(&selector),
            Err(HubError::Unavailable)
        ));
        assert!(matches!(
            session.set_point_temperature(&selector, 21.0),
            Err(HubError::GroupNotFound(_))
        ));

        let state = br#"{"label":"Simon","actualTemperature":20.0,"setPointTemperature":21.0}"#;
        assert_eq!(
            session
                .handle_publish("heating/hub/groups/g1/state", state)
                .unwrap(),
            0
        );
        assert_eq!(session.directory().find(&selector).unwrap().id, "g1");
        assert_eq!(
            session.reading(&selector).unwrap(),
            TemperatureReading {
                actual: 20.0,
                target: 21.0
            }
        );

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let id = session.subscribe(move |events| sink.borrow_mut().extend_from_slice(events));

        let batch = br#"[
            {"eventType":"GROUP_CHANGED","data":{"id":"g1","label":"Simon","actualTemperature":19.0,"setPointTemperature":18.0}},
            {"eventType":"DEVICE_CHANGED","data":{}}
        ]"#;
        assert_eq!(session.handle_publish(TOPIC_HUB_EVENTS, batch).unwrap(), 2);
        assert_eq!(received.borrow().len(), 2);
        assert_eq!(
            session.reading(&selector).unwrap(),
            TemperatureReading {
                actual: 19.0,
                target: 18.0
            }
        );

        // A committed setpoint survives the next poll until the hub reports back.
        let mut widget = HeaterWidget::new(
            &HeaterWidgetConfig::default(),
            selector.clone(),
            SetpointConfig::default(),
        )
        .unwrap();
        widget.update_label(&session);
        assert!(widget.on_wheel(120, 0));
        assert_eq!(
            widget.on_commit_timer(&mut session, 5_000),
            Some(SetpointCommit { target: 18.5 })
        );
        widget.update_label(&session);
        assert_eq!(session.reading(&selector).unwrap().target, 18.5);
        assert!(widget.on_wheel(120, 6_000));
        assert_eq!(
            widget.on_commit_timer(&mut session, 11_000),
            Some(SetpointCommit { target: 19.0 })
        );

        assert!(matches!(
            session.handle_publish(TOPIC_HUB_EVENTS, b"not json"),
            Err(HubError::Payload(_))
        ));
        let oversized = vec![b' '; MAX_HUB_PAYLOAD_BYTES + 1];
        assert_eq!(session.handle_publish(TOPIC_HUB_EVENTS, &oversized).unwrap(), 0);

        assert!(session.unsubscribe(id));
        session.handle_publish(TOPIC_HUB_EVENTS, batch).unwrap();
        assert_eq!(received.borrow().len(), 2);

        session.teardown();

        let (again, _eventloop) = HubSession::init(&config()).unwrap();
        drop(again);
        assert!(HubSession::init(&config()).is_ok());
    }
}
