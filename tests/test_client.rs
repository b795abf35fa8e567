use radius_engine::client::{ Client, EngineConfig, Outcome, Server, ServerPool };
use radius_engine::protocol::crypto::{ recover_password, response_authenticator };
use radius_engine::protocol::dictionary::{ NAS_IP_ADDRESS, REPLY_MESSAGE, USER_NAME, USER_PASSWORD };
use radius_engine::protocol::error::RadiusError;
use radius_engine::protocol::radius_packet::{ RadiusAttribute, RadiusMsgType, RadiusPacket, TypeCode };

use std::net::{ Ipv4Addr, UdpSocket };
use std::sync::{ mpsc, Arc, Mutex };
use std::thread::{ self, JoinHandle };
use std::time::{ Duration, Instant };


const SECRET: &[u8] = b"testing123";


/// Loopback RADIUS server: accepts alice/secret123, rejects everybody else
fn spawn_server(replies: usize) -> (u16, JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port   = socket.local_addr().unwrap().port();
    socket.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let server = thread::spawn(move || {
        let mut buffer = [0u8; 4096];

        for _ in 0..replies {
            let (amount, source) = match socket.recv_from(&mut buffer) {
                Ok(received) => received,
                Err(_)       => return
            };
            let request  = RadiusPacket::initialise_packet_from_bytes(&buffer[..amount]).unwrap();
            let password = recover_password(request.attribute(USER_PASSWORD).unwrap().value(), SECRET, request.authenticator()).unwrap();

            let accepted = password.starts_with(b"secret123") && password[9..].iter().all(|byte| *byte == 0);
            let code     = if accepted { TypeCode::AccessAccept } else { TypeCode::AccessReject };

            let mut reply = RadiusPacket::initialise_packet(code, request.id(), [0; 16]);
            reply.set_attributes(vec![RadiusAttribute::from_string(REPLY_MESSAGE, if accepted { "welcome" } else { "go away" }).unwrap()]);

            let mut bytes = reply.to_bytes().unwrap();
            let hash      = response_authenticator(&bytes, request.authenticator(), SECRET);
            bytes[4..20].copy_from_slice(&hash);

            socket.send_to(&bytes, source).unwrap();
        }
    });

    (port, server)
}

fn pool(port: u16, timeout: Duration, retries: u16) -> ServerPool {
    let mut pool = ServerPool::new("loopback");
    pool.add_server(Server::new("127.0.0.1", SECRET)
        .set_port(RadiusMsgType::AUTH, port)
        .set_timeout(timeout)
        .set_retries(retries)).unwrap();
    pool
}

fn credentials(password: &str) -> Vec<RadiusAttribute> {
    vec![
        RadiusAttribute::from_string(USER_NAME,     "alice").unwrap(),
        RadiusAttribute::from_string(USER_PASSWORD, password).unwrap(),
        RadiusAttribute::from_ipv4(NAS_IP_ADDRESS,  Ipv4Addr::new(192, 168, 1, 10))
    ]
}


#[test]
fn test_send_and_receive_accept_and_reject() {
    let (port, server) = spawn_server(2);
    let client         = Client::initialise_client(EngineConfig::default()).unwrap();
    let pool           = pool(port, Duration::from_secs(2), 2);

    match client.send_and_receive(&pool, TypeCode::AccessRequest, credentials("secret123")) {
        Ok(Outcome::Accepted(attributes)) => assert_eq!(b"welcome", attributes[0].value()),
        other                             => panic!("unexpected result: {:?}", other)
    }
    match client.send_and_receive(&pool, TypeCode::AccessRequest, credentials("wrong")) {
        Ok(Outcome::Rejected(attributes)) => assert_eq!(b"go away", attributes[0].value()),
        other                             => panic!("unexpected result: {:?}", other)
    }

    server.join().unwrap();
    assert_eq!(0, client.manager().outstanding());
}

#[test]
fn test_silent_server_exhausts() {
    // bound, but never answers
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port   = silent.local_addr().unwrap().port();
    let client = Client::initialise_client(EngineConfig::default().set_tick(Duration::from_millis(20))).unwrap();
    let start  = Instant::now();

    match client.send_and_receive(&pool(port, Duration::from_millis(100), 1), TypeCode::AccessRequest, credentials("secret123")) {
        Ok(Outcome::Exhausted) => {},
        other                  => panic!("unexpected result: {:?}", other)
    }
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[test]
fn test_drop_cancels_pending_transactions() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port   = silent.local_addr().unwrap().port();
    let client = Client::initialise_client(EngineConfig::default()).unwrap();

    let (sender, receiver) = mpsc::channel();
    client.start_transaction(&pool(port, Duration::from_secs(5), 2), TypeCode::AccessRequest, credentials("secret123"), move |outcome| {
        let _ = sender.send(outcome);
    }).unwrap();
    assert_eq!(1, client.manager().outstanding());

    drop(client);
    assert!(receiver.recv().is_err());
}

#[test]
fn test_cancel_from_client() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port   = silent.local_addr().unwrap().port();
    let client = Client::initialise_client(EngineConfig::default()).unwrap();

    let handle = client.start_transaction(&pool(port, Duration::from_secs(5), 2), TypeCode::AccessRequest, credentials("secret123"), |_| {}).unwrap();

    assert!(client.cancel(handle));
    assert!(!client.cancel(handle));
    assert_eq!(0, client.manager().outstanding());
}

#[test]
fn test_unresolvable_server() {
    let client = Client::initialise_client(EngineConfig::default()).unwrap();
    let mut pool = ServerPool::new("broken");
    pool.add_server(Server::new("host.invalid", SECRET)).unwrap();

    match client.send_and_receive(&pool, TypeCode::AccessRequest, credentials("secret123")) {
        Err(RadiusError::SocketConnectionError(_)) | Err(RadiusError::SocketInvalidConnectionError { .. }) => {},
        other                                                                                            => panic!("unexpected result: {:?}", other)
    }
}

#[test]
fn test_client_dropped_from_its_own_callback() {
    let (port, server)     = spawn_server(1);
    let client             = Arc::new(Mutex::new(Some(Client::initialise_client(EngineConfig::default()).unwrap())));
    let (sender, receiver) = mpsc::channel();
    let owner              = Arc::clone(&client);

    client.lock().unwrap().as_ref().unwrap().start_transaction(&pool(port, Duration::from_secs(2), 2), TypeCode::AccessRequest, credentials("secret123"), move |outcome| {
        drop(owner.lock().unwrap().take());
        let _ = sender.send(outcome);
    }).unwrap();

    match receiver.recv_timeout(Duration::from_secs(5)) {
        Ok(Outcome::Accepted(_)) => {},
        other                    => panic!("unexpected result: {:?}", other)
    }
    assert!(client.lock().unwrap().is_none());
    server.join().unwrap();
}
