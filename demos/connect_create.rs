//! Connect-and-create demo - the smallest useful ChronoLog session.
//!
//! This example demonstrates:
//! - Building a client from an address and provider ID
//! - Opening a session and checking its status
//! - Creating a chronicle with attributes and reading one back
//! - Closing the session
//!
//! # Running
//!
//! ```text
//! cargo run --example connect_create -- tcp://127.0.0.1:5555 0
//! CHRONOLOG_SERVER_ADDRESS=na+sm:///tmp/chronolog.sock cargo run --example connect_create
//! ```
//!
//! Set `RUST_LOG=chronolog_client=debug` to see the handshake and binding.

use std::process::ExitCode;

use chronolog_client::{Attributes, ChronoLogClient, ClientConfig};
use tracing_subscriber::EnvFilter;

const ACCOUNT: u32 = 1234;
const LOCALHOST: u32 = 0x7F00_0001;

fn config_from_args() -> chronolog_client::Result<ClientConfig> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(address) => {
            let mut config = ClientConfig::new(address);
            if let Some(provider_id) = args.next().and_then(|p| p.parse().ok()) {
                config.provider_id = provider_id;
            }
            Ok(config)
        }
        None => ClientConfig::from_env(),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = match config_from_args().and_then(ChronoLogClient::from_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Cannot create client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Connected to {}", client.endpoint());

    let connected = client.connect(ACCOUNT, LOCALHOST, std::process::id());
    let Some(session) = connected.session() else {
        eprintln!("Connect failed with status {}", connected.status);
        return ExitCode::FAILURE;
    };
    println!("Session {}", session);

    let mut attrs = Attributes::new();
    attrs.insert("description".to_string(), "Test chronicle".to_string());
    let status = client.create_chronicle(session, "TestChronicle", &attrs, 0);
    println!("CreateChronicle returned {}", status);

    let description = client.get_chronicle_attr(session, "TestChronicle", "description");
    if description.status == 0 {
        println!("description = {}", description.value);
    } else {
        println!("GetChronicleAttr returned {}", description.status);
    }

    for name in client.show_chronicles(session) {
        println!("chronicle: {}", name);
    }

    println!("Disconnect returned {}", client.disconnect(session));
    ExitCode::SUCCESS
}
