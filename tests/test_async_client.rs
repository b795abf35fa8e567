#![cfg(feature = "async-radius")]

use radius_engine::client::{ Client, EngineConfig, Outcome, Server, ServerPool };
use radius_engine::protocol::crypto::response_authenticator;
use radius_engine::protocol::dictionary::{ ACCT_SESSION_ID, ACCT_STATUS_TYPE };
use radius_engine::protocol::radius_packet::{ RadiusAttribute, RadiusMsgType, RadiusPacket, TypeCode };

use futures::executor::block_on;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;


const SECRET: &[u8] = b"testing123";


#[test]
fn test_send_async_accounting() {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port   = socket.local_addr().unwrap().port();
    socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let server = thread::spawn(move || {
        let mut buffer       = [0u8; 4096];
        let (amount, source) = socket.recv_from(&mut buffer).unwrap();
        let request          = RadiusPacket::initialise_packet_from_bytes(&buffer[..amount]).unwrap();

        let reply     = RadiusPacket::initialise_packet(TypeCode::AccountingResponse, request.id(), [0; 16]);
        let mut bytes = reply.to_bytes().unwrap();
        let hash      = response_authenticator(&bytes, request.authenticator(), SECRET);
        bytes[4..20].copy_from_slice(&hash);

        socket.send_to(&bytes, source).unwrap();
    });

    let client   = Client::initialise_client(EngineConfig::default()).unwrap();
    let mut pool = ServerPool::new("accounting");
    pool.add_server(Server::new("127.0.0.1", SECRET).set_port(RadiusMsgType::ACCT, port)).unwrap();

    let attributes = vec![
        RadiusAttribute::from_integer(ACCT_STATUS_TYPE, 1),
        RadiusAttribute::from_string(ACCT_SESSION_ID, "0000002a").unwrap()
    ];

    assert_eq!(Outcome::Accepted(Vec::new()), block_on(client.send_async(&pool, TypeCode::AccountingRequest, attributes)).unwrap());
    server.join().unwrap();
}
