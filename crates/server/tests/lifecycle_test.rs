//! End-to-end tests over a real TCP listener.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use metaserver::{MetadataServer, SeedNode, ServerConfig, ServerError};
use protocol::codec::{decode_response, encode_request};
use protocol::{ErrorCode, Frame, FrameHeader, Request, Response, HEADER_SIZE};

fn test_config() -> ServerConfig {
    ServerConfig {
        listen_address: "127.0.0.1".into(),
        listen_port: 0,
        worker_pool_size: 2,
        max_connections: 16,
        ..ServerConfig::default()
    }
}

struct Client {
    stream: TcpStream,
    sequence: u32,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Self { stream, sequence: 0 }
    }

    fn send_raw(&mut self, wire: &[u8]) {
        self.stream.write_all(wire).unwrap();
    }

    fn read_frame(&mut self) -> std::io::Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        self.stream.read_exact(&mut header)?;
        let parsed = FrameHeader::parse(&header).unwrap();
        let mut payload = vec![0u8; parsed.payload_len()];
        self.stream.read_exact(&mut payload)?;
        Ok(Frame::from_parts(parsed, payload.into()).unwrap())
    }

    fn call(&mut self, request: Request) -> Response {
        self.sequence += 1;
        let env = encode_request(&request).unwrap();
        self.send_raw(&Frame::from_envelope(&env, self.sequence).encode());
        let reply = self.read_frame().unwrap();
        assert_eq!(reply.sequence(), self.sequence);
        decode_response(&reply.envelope()).unwrap()
    }
}

#[test]
fn test_scenario_over_tcp() {
    let mut server = MetadataServer::create(test_config()).unwrap();
    server.start().unwrap();
    let addr = server.local_addr().unwrap();
    assert_ne!(addr.port(), 0);

    let mut client = Client::connect(addr);
    assert_eq!(client.call(Request::Ping), Response::Pong);
    assert_eq!(
        client.call(Request::CreateFile { path: "/a.txt".into(), mode: 0o644 }),
        Response::ok()
    );
    let opened = client.call(Request::OpenFile { path: "/a.txt".into(), flags: 0 });
    assert_eq!(opened.inode(), Some(1));
    assert_eq!(
        client.call(Request::CreateFile { path: "/a.txt".into(), mode: 0o644 }),
        Response::Error(ErrorCode::FileExists)
    );
    assert_eq!(
        client.call(Request::DeleteFile { path: "/a.txt".into() }),
        Response::ok()
    );
    assert_eq!(
        client.call(Request::OpenFile { path: "/a.txt".into(), flags: 0 }),
        Response::Error(ErrorCode::FileNotFound)
    );

    server.stop().unwrap();
    assert!(!server.is_running());
    server.destroy();
}

#[test]
fn test_corrupted_frame_closes_connection() {
    let mut server = MetadataServer::create(test_config()).unwrap();
    server.start().unwrap();
    let mut client = Client::connect(server.local_addr().unwrap());

    let env = encode_request(&Request::DeleteFile { path: "/x".into() }).unwrap();
    let mut wire = Frame::from_envelope(&env, 1).encode().to_vec();
    let last = wire.len() - 1;
    wire[last] ^= 0xFF;
    client.send_raw(&wire);

    // The server drops the connection instead of answering.
    assert!(client.read_frame().is_err());
    assert!(server.store().is_empty());
    server.destroy();
}

#[test]
fn test_lifecycle_state_errors() {
    let mut server = MetadataServer::create(test_config()).unwrap();
    assert!(matches!(server.stop(), Err(ServerError::NotRunning)));

    server.start().unwrap();
    assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));
    server.stop().unwrap();
    assert!(matches!(server.stop(), Err(ServerError::NotRunning)));

    // Restart on a fresh ephemeral port with state intact.
    server.store().create("/kept", 0o644).unwrap();
    server.start().unwrap();
    assert!(server.store().contains("/kept"));
    server.destroy();
}

#[test]
fn test_invalid_config_fails_create() {
    let config = ServerConfig {
        worker_pool_size: 0,
        ..test_config()
    };
    assert!(matches!(
        MetadataServer::create(config),
        Err(ServerError::Config(_))
    ));

    let config = ServerConfig {
        seed_nodes: vec![SeedNode {
            node_id: String::new(),
            address: "10.0.0.1".into(),
            port: 9600,
            capacity: 0,
        }],
        ..test_config()
    };
    assert!(matches!(
        MetadataServer::create(config),
        Err(ServerError::Core(_))
    ));
}

#[test]
fn test_independent_instances() {
    let mut a = MetadataServer::create(test_config()).unwrap();
    let mut b = MetadataServer::create(test_config()).unwrap();
    a.start().unwrap();
    b.start().unwrap();
    assert_ne!(a.local_addr(), b.local_addr());

    let mut client_a = Client::connect(a.local_addr().unwrap());
    let mut client_b = Client::connect(b.local_addr().unwrap());
    client_a.call(Request::CreateFile { path: "/only-a".into(), mode: 0o644 });
    assert_eq!(
        client_b.call(Request::OpenFile { path: "/only-a".into(), flags: 0 }),
        Response::Error(ErrorCode::FileNotFound)
    );
    // Inodes are per instance.
    client_b.call(Request::CreateFile { path: "/only-b".into(), mode: 0o644 });
    assert_eq!(
        client_b.call(Request::OpenFile { path: "/only-b".into(), flags: 0 }).inode(),
        Some(1)
    );

    a.destroy();
    b.destroy();
}

#[test]
fn test_seed_nodes_drive_placement() {
    let seeds = (0..5)
        .map(|i| SeedNode {
            node_id: format!("storage-{}", i),
            address: "10.0.0.1".into(),
            port: 9600 + i,
            capacity: 1 << 30,
        })
        .collect();
    let server = MetadataServer::create(ServerConfig {
        seed_nodes: seeds,
        replica_count: 3,
        ..test_config()
    })
    .unwrap();

    assert_eq!(server.registry().len(), 5);
    let placement = server.placement("/data/file").unwrap();
    assert_eq!(placement.replicas.len(), 3);
    assert_eq!(placement, server.placement("/data/file").unwrap());
    server.destroy();
}
