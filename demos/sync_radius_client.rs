//! An example on how to authenticate a user against a pool of two RADIUS servers with blocking
//! Client provided in this crate
//!
//! ```bash
//! cargo run --example sync_radius_client
//! ```


use radius_engine::client::{ Client, EngineConfig, Outcome, Server, ServerPool };
use radius_engine::protocol::dictionary::Dictionary;
use radius_engine::protocol::error::RadiusError;
use radius_engine::protocol::radius_packet::{ RadiusAttribute, TypeCode };
use radius_engine::tools::{ ipv4_string_to_bytes, integer_to_bytes };

use log::{ debug, LevelFilter };
use simple_logger::SimpleLogger;
use std::time::Duration;


fn main() -> Result<(), RadiusError> {
    SimpleLogger::new().with_level(LevelFilter::Debug).init().expect("Failed to create new logger");
    debug!("RADIUS Client started");

    let mut pool = ServerPool::new("corporate");
    pool.add_server(Server::new("127.0.0.1", b"secret")
        .set_name("primary")
        .set_timeout(Duration::from_secs(1))
        .set_retries(3))?;
    pool.add_server(Server::new("localhost", b"secret")
        .set_name("backup")
        .set_timeout(Duration::from_secs(2)))?;

    let client     = Client::initialise_client(EngineConfig::default())?;
    let dictionary = Dictionary::default();

    let attributes = vec![
        RadiusAttribute::create_by_name(&dictionary, "User-Name",          String::from("testing").into_bytes())?,
        RadiusAttribute::create_by_name(&dictionary, "User-Password",      String::from("very secret").into_bytes())?,
        RadiusAttribute::create_by_name(&dictionary, "NAS-IP-Address",     ipv4_string_to_bytes("192.168.1.10")?)?,
        RadiusAttribute::create_by_name(&dictionary, "NAS-Port",           integer_to_bytes(0))?,
        RadiusAttribute::create_by_name(&dictionary, "Service-Type",       integer_to_bytes(2))?,
        RadiusAttribute::create_by_name(&dictionary, "NAS-Identifier",     String::from("trillian").into_bytes())?,
        RadiusAttribute::create_by_name(&dictionary, "Called-Station-Id",  String::from("00-04-5F-00-0F-D1").into_bytes())?,
        RadiusAttribute::create_by_name(&dictionary, "Calling-Station-Id", String::from("00-01-24-80-B3-9C").into_bytes())?
    ];

    match client.send_and_receive(&pool, TypeCode::AccessRequest, attributes)? {
        Outcome::Accepted(attributes)   => println!("Access granted: {:?}", attributes),
        Outcome::Rejected(attributes)   => println!("Access denied: {:?}", attributes),
        Outcome::Challenged(attributes) => println!("Server wants more: {:?}", attributes),
        Outcome::Exhausted              => println!("No server in {} replied", pool.name())
    }

    debug!("RADIUS Client stopped");
    Ok(())
}
