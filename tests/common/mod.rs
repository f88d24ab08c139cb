//! Shared fixtures for the end-to-end tests: an in-process daemon bound to
//! an ephemeral port, a framing-aware client, and command fakes.
#![allow(dead_code)] // not every test binary uses every fixture

use anyhow::Result;
use async_trait::async_trait;
use commandd::command::{Command, CommandContext, FactoryRegistry};
use commandd::config::Config;
use commandd::process::{ProcessOutput, ProcessRunner};
use commandd::processor::CommandProcessor;
use commandd::transport::TcpReplyTransport;
use commandd_shared::codec::{self, FrameDecoder};
use commandd_shared::{CommandReply, CommandRequest, CommandType};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Process runner that records invocations instead of spawning anything
pub struct RecordingRunner {
    return_code: i32,
    invocations: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingRunner {
    pub fn succeeding() -> Self {
        Self {
            return_code: 0,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ProcessOutput> {
        self.invocations.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        Ok(ProcessOutput {
            return_code: self.return_code,
            output: "Success!".into(),
        })
    }
}

/// Fake handler mirroring the production TEST command: brief work, then a
/// fixed result
struct TestCommand {
    succeeds: bool,
}

#[async_trait]
impl Command for TestCommand {
    async fn execute(&self, _ctx: &CommandContext) -> Result<CommandReply> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.succeeds {
            Ok(CommandReply::ok("TestCommand"))
        } else {
            Ok(CommandReply::failure("TestCommandFails"))
        }
    }
}

pub fn test_command_factory(_request: CommandRequest) -> Arc<dyn Command> {
    Arc::new(TestCommand { succeeds: true })
}

pub fn failing_test_command_factory(_request: CommandRequest) -> Arc<dyn Command> {
    Arc::new(TestCommand { succeeds: false })
}

pub struct Daemon {
    pub addr: SocketAddr,
    pub runner: Arc<RecordingRunner>,
    shutdown: watch::Sender<bool>,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Spin up a daemon on an ephemeral port; `register` may override factory
/// table entries before serving starts.
pub async fn start_daemon(
    claim_ttl_ms: u64,
    register: impl FnOnce(&mut CommandProcessor),
) -> Daemon {
    let mut transport = TcpReplyTransport::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = transport.local_addr().expect("local addr");

    let mut config = Config::default();
    config.receive_timeout_ms = 50;
    config.claim_ttl_ms = claim_ttl_ms;
    let runner = Arc::new(RecordingRunner::succeeding());

    let mut processor = CommandProcessor::new(
        Arc::new(config),
        runner.clone(),
        FactoryRegistry::with_defaults(),
    );
    register(&mut processor);

    let (shutdown, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = processor.run(&mut transport, shutdown_rx).await;
    });

    Daemon {
        addr,
        runner,
        shutdown,
    }
}

pub struct TestClient {
    stream: TcpStream,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to daemon");
        Self {
            stream,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Send one framed request, wait for its reply
    pub async fn roundtrip(&mut self, request: &CommandRequest) -> CommandReply {
        let frame = codec::encode(request).expect("encode request");
        self.stream.write_all(&frame).await.expect("send request");
        self.read_reply().await
    }

    /// Send arbitrary bytes as a frame payload
    pub async fn send_raw(&mut self, payload: &[u8]) -> CommandReply {
        let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(payload);
        self.stream.write_all(&frame).await.expect("send raw frame");
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> CommandReply {
        loop {
            if let Some(payload) = self.decoder.decode_next().expect("well-formed reply frame")
            {
                return codec::decode_payload(&payload).expect("decodable reply");
            }
            let n = self.stream.read(&mut self.read_buf).await.expect("read reply");
            assert!(n > 0, "daemon closed the connection");
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    /// Poll a job until its terminal result arrives
    pub async fn poll_until_completed(&mut self, job_id: &str) -> CommandReply {
        for _ in 0..200 {
            let reply = self
                .roundtrip(&CommandRequest::status_query(job_id))
                .await;
            if reply.is_completed() {
                return reply;
            }
            assert_eq!(reply.result, "Command running");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never completed");
    }
}

pub fn async_request(cmd_type: CommandType) -> CommandRequest {
    let mut request = CommandRequest::new(cmd_type);
    request.r#async = true;
    request
}
