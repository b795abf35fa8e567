//! An example on how to send Accounting-Request with Future based Client provided in this crate
//!
//! ```bash
//! cargo run --example async_radius_client --all-features
//! ```


use radius_engine::client::{ Client, EngineConfig, Outcome, Server, ServerPool };
use radius_engine::protocol::dictionary::{ ACCT_SESSION_ID, ACCT_STATUS_TYPE, EVENT_TIMESTAMP, NAS_IP_ADDRESS, USER_NAME };
use radius_engine::protocol::error::RadiusError;
use radius_engine::protocol::radius_packet::{ RadiusAttribute, TypeCode };

use async_std::task;
use log::{ debug, LevelFilter };
use simple_logger::SimpleLogger;
use std::net::Ipv4Addr;
use std::time::{ SystemTime, UNIX_EPOCH };


fn main() -> Result<(), RadiusError> {
    SimpleLogger::new().with_level(LevelFilter::Debug).init().expect("Failed to create new logger");
    debug!("Async RADIUS Client started");

    let mut pool = ServerPool::new("accounting");
    pool.add_server(Server::new("127.0.0.1", b"secret"))?;

    let client  = Client::initialise_client(EngineConfig::default())?;
    let now     = SystemTime::now().duration_since(UNIX_EPOCH).map(|since| since.as_secs() as u32).unwrap_or(0);

    let attributes = vec![
        RadiusAttribute::from_string(USER_NAME,         "testing")?,
        RadiusAttribute::from_integer(ACCT_STATUS_TYPE, 1),
        RadiusAttribute::from_string(ACCT_SESSION_ID,   "0000002a")?,
        RadiusAttribute::from_ipv4(NAS_IP_ADDRESS,      Ipv4Addr::new(192, 168, 1, 10)),
        RadiusAttribute::from_integer(EVENT_TIMESTAMP,  now)
    ];

    task::block_on(async {
        match client.send_async(&pool, TypeCode::AccountingRequest, attributes).await {
            Ok(Outcome::Accepted(_)) => println!("Accounting-Start recorded"),
            Ok(outcome)              => println!("Unexpected outcome: {:?}", outcome),
            Err(error)               => println!("{:?}", error)
        }
    });

    debug!("Async RADIUS Client stopped");
    Ok(())
}
