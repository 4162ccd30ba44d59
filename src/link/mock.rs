use crate::link::{LinkError, PublishChannel};

/// In-memory channel that records connects and publishes.
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    connected: bool,
    failures_before_connect: usize,
    fail_publish: bool,
    connect_attempts: Vec<String>,
    published: Vec<(String, String)>,
    polls: usize,
}

impl MockChannel {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Refuse the next `failures` connects, then accept.
    pub fn failing_then_connecting(failures: usize) -> Self {
        Self {
            failures_before_connect: failures,
            ..Self::default()
        }
    }

    /// Simulate the broker going away; the next `failures` reconnects are refused.
    pub fn go_offline(&mut self, failures: usize) {
        self.connected = false;
        self.failures_before_connect = failures;
    }

    pub fn drop_connection(&mut self) {
        self.connected = false;
    }

    pub fn set_fail_publish(&mut self, fail: bool) {
        self.fail_publish = fail;
    }

    pub fn connect_attempts(&self) -> &[String] {
        &self.connect_attempts
    }

    pub fn published(&self) -> &[(String, String)] {
        &self.published
    }

    /// Payloads published on `topic`, in order.
    pub fn payloads_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(published_topic, _)| published_topic == topic)
            .map(|(_, payload)| payload.as_str())
            .collect()
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl PublishChannel for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, client_id: &str) -> Result<(), LinkError> {
        self.connect_attempts.push(client_id.to_string());
        if self.failures_before_connect > 0 {
            self.failures_before_connect -= 1;
            return Err(LinkError::Refused("mock broker unavailable".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        if self.fail_publish {
            return Err(LinkError::Publish("mock publish failed".to_string()));
        }
        self.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn poll(&mut self) {
        self.polls += 1;
    }
}
