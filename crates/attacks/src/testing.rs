//! In-memory collaborators for module tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use bluefang_common::{
    AttackConfig, AttackKind, BdAddr, BlueError, BlueResult, BtSocket, CancelToken, DeviceInfo,
    Discovery, HciControl, PairingAgent, ServiceBrowser, SocketConnector, Toolkit, TraceProvider,
    TraceSource, Transport,
};

use crate::log::AttackLog;
use crate::module::AttackContext;

pub fn target() -> BdAddr {
    "AA:BB:CC:DD:EE:01".parse().unwrap()
}

/// How an accepted socket answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Every recv times out.
    Silent,
    /// Every recv returns the last frame sent.
    Echo,
    /// Every recv returns the same bytes.
    Fixed(Vec<u8>),
    /// Successive recvs on one socket pop from the front; each new socket
    /// starts from the top. Times out once drained.
    Script(Vec<Vec<u8>>),
    /// Peer closes right away.
    Closed,
}

#[derive(Debug)]
struct Listener {
    reply: Reply,
    /// Remaining accepted connects; `None` is unlimited.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct ConnState {
    listeners: HashMap<(Transport, u16), Listener>,
    denied: HashSet<(Transport, u16)>,
    sent: HashMap<(Transport, u16), Vec<Vec<u8>>>,
    connects: usize,
}

/// Connector that accepts only the channels it was told about and records
/// every frame sent through its sockets.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnState>>,
}

impl MockConnector {
    pub fn accept(self, transport: Transport, channel: u16, reply: Reply) -> Self {
        self.listen(transport, channel, reply, None)
    }

    /// Accept `times` connects, then refuse.
    pub fn accept_times(self, transport: Transport, channel: u16, reply: Reply, times: usize) -> Self {
        self.listen(transport, channel, reply, Some(times))
    }

    /// Fail connects to `channel` with EACCES, as a secured channel does.
    pub fn deny(self, transport: Transport, channel: u16) -> Self {
        self.state.lock().unwrap().denied.insert((transport, channel));
        self
    }

    fn listen(self, transport: Transport, channel: u16, reply: Reply, remaining: Option<usize>) -> Self {
        self.state
            .lock()
            .unwrap()
            .listeners
            .insert((transport, channel), Listener { reply, remaining });
        self
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn sent(&self, transport: Transport, channel: u16) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .sent
            .get(&(transport, channel))
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_sent(&self) -> usize {
        self.state.lock().unwrap().sent.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(
        &self,
        _addr: BdAddr,
        transport: Transport,
        channel: u16,
        _timeout: Duration,
    ) -> BlueResult<Box<dyn BtSocket>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        if state.denied.contains(&(transport, channel)) {
            return Err(BlueError::from_peer(
                &format!("{} {} connect", transport, channel),
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        let refused = || BlueError::Connectivity(format!("{} {} refused", transport, channel));
        let listener = state.listeners.get_mut(&(transport, channel)).ok_or_else(refused)?;
        match listener.remaining.as_mut() {
            Some(0) => return Err(refused()),
            Some(n) => *n -= 1,
            None => {}
        }
        let reply = listener.reply.clone();
        Ok(Box::new(MockSocket {
            key: (transport, channel),
            reply,
            last: Vec::new(),
            state: self.state.clone(),
        }))
    }
}

struct MockSocket {
    key: (Transport, u16),
    reply: Reply,
    last: Vec<u8>,
    state: Arc<Mutex<ConnState>>,
}

#[async_trait]
impl BtSocket for MockSocket {
    async fn send(&mut self, data: &[u8], _timeout: Duration) -> BlueResult<usize> {
        if matches!(self.reply, Reply::Closed) {
            return Err(BlueError::Connectivity("broken pipe".into()));
        }
        self.state
            .lock()
            .unwrap()
            .sent
            .entry(self.key)
            .or_default()
            .push(data.to_vec());
        self.last = data.to_vec();
        Ok(data.len())
    }

    async fn recv(&mut self, max: usize, _timeout: Duration) -> BlueResult<Vec<u8>> {
        let timed_out = || BlueError::Connectivity("recv timed out".into());
        let mut out = match &mut self.reply {
            Reply::Silent => return Err(timed_out()),
            Reply::Closed => return Ok(Vec::new()),
            Reply::Echo => self.last.clone(),
            Reply::Fixed(bytes) => bytes.clone(),
            Reply::Script(queue) => {
                if queue.is_empty() {
                    return Err(timed_out());
                }
                queue.remove(0)
            }
        };
        out.truncate(max);
        Ok(out)
    }
}

/// Provider that answers with fixed text, or fails when `None`.
#[derive(Debug, Clone, Default)]
pub struct TextProvider(pub Option<String>);

#[async_trait]
impl DeviceInfo for TextProvider {
    async fn info(&self, addr: BdAddr, _timeout: Duration) -> BlueResult<String> {
        self.0
            .clone()
            .ok_or_else(|| BlueError::Connectivity(format!("{} not reachable", addr)))
    }
}

#[async_trait]
impl ServiceBrowser for TextProvider {
    async fn browse(&self, addr: BdAddr, _timeout: Duration) -> BlueResult<String> {
        self.0
            .clone()
            .ok_or_else(|| BlueError::Connectivity(format!("no SDP answer from {}", addr)))
    }
}

struct NoDiscovery;

#[async_trait]
impl Discovery for NoDiscovery {
    async fn inquiry(&self, _timeout: Duration) -> BlueResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Agent that records every script and answers the first rule whose needle
/// appears in any script line.
#[derive(Debug, Default)]
pub struct MockAgent {
    rules: Vec<(String, String)>,
    scripts: Mutex<Vec<Vec<String>>>,
}

impl MockAgent {
    pub fn answering(rules: &[(&str, &str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(needle, out)| (needle.to_string(), out.to_string()))
                .collect(),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn scripts(&self) -> Vec<Vec<String>> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PairingAgent for MockAgent {
    async fn run(&self, commands: &[String], _timeout: Duration) -> BlueResult<String> {
        self.scripts.lock().unwrap().push(commands.to_vec());
        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| commands.iter().any(|c| c == needle))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| "Failed to pair: org.bluez.Error.AuthenticationFailed".to_string());
        Ok(answer)
    }
}

/// HCI endpoint that records frames and accepts or rejects them all.
#[derive(Debug, Default)]
pub struct MockHci {
    reject: bool,
    frames: Mutex<Vec<Vec<u8>>>,
}

impl MockHci {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl HciControl for MockHci {
    async fn command(&self, frame: &[u8], _timeout: Duration) -> BlueResult<String> {
        self.frames.lock().unwrap().push(frame.to_vec());
        if self.reject {
            Err(BlueError::Protocol("command rejected".into()))
        } else {
            Ok("< HCI Command: ogf 0x3f, ocf 0x0001, plen 1\n> HCI Event: 0x0e plen 4".into())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockTraces(pub Vec<String>);

struct LineSource(std::vec::IntoIter<String>);

#[async_trait]
impl TraceSource for LineSource {
    async fn next_line(&mut self) -> BlueResult<Option<String>> {
        Ok(self.0.next())
    }
}

#[async_trait]
impl TraceProvider for MockTraces {
    async fn open(&self) -> BlueResult<Box<dyn TraceSource>> {
        Ok(Box::new(LineSource(self.0.clone().into_iter())))
    }
}

/// Collaborator set for one test; unset fields behave like an absent peer.
#[derive(Default)]
pub struct Harness {
    pub connector: MockConnector,
    pub info: Option<String>,
    pub browse: Option<String>,
    pub agent: Arc<MockAgent>,
    pub hci: Arc<MockHci>,
    pub trace_lines: Vec<String>,
    pub config: AttackConfig,
}

impl Harness {
    pub fn toolkit(&self) -> Toolkit {
        Toolkit {
            discovery: Arc::new(NoDiscovery),
            device_info: Arc::new(TextProvider(self.info.clone())),
            services: Arc::new(TextProvider(self.browse.clone())),
            agent: self.agent.clone(),
            hci: self.hci.clone(),
            sockets: Arc::new(self.connector.clone()),
            traces: Arc::new(MockTraces(self.trace_lines.clone())),
        }
    }

    pub fn context(&self) -> AttackContext {
        AttackContext::new(
            self.toolkit(),
            self.config.clone(),
            CancelToken::new(),
            AttackLog::new(Uuid::new_v4(), AttackKind::VulnSweep),
        )
    }
}

pub fn context(connector: MockConnector) -> AttackContext {
    Harness {
        connector,
        ..Harness::default()
    }
    .context()
}
