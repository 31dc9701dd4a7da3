//! ilsgw-call: one-shot bus client
//!
//! Issues a single service-bus call, or a single permission resolution,
//! against the configured gateway endpoint and prints the result as JSON.
//!
//! ## Usage
//! ```text
//! ilsgw-call [--config PATH] call <service> <method> [param...]
//! ilsgw-call [--config PATH] perms <auth-token> <org-id|-> <PERM>...
//! ```
//!
//! Each `param` is parsed as JSON; anything that is not valid JSON is sent
//! as a string. No auth token is prepended for `call`; pass it as the
//! first param if the method expects one.
//!
//! ## Configuration
//! - ILSGW_CONFIG: YAML config file (see `ilsgw.yaml`)
//! - ILSGW_BUS__GATEWAY_URL: bus gateway endpoint
//! - ILSGW_LOG: tracing filter (logs go to stderr)

use serde_json::Value;
use tracing::error;

use ils_gateway::config::Config;
use ils_gateway::rpc::AuthParam;
use ils_gateway::utils::bootstrap::{init_tracing, parse_config_path};
use ils_gateway::IlsGateway;

const USAGE: &str = "usage:\n  ilsgw-call [--config PATH] call <service> <method> [param...]\n  ilsgw-call [--config PATH] perms <auth-token> <org-id|-> <PERM>...";

#[derive(Debug, PartialEq)]
enum Command {
    Call {
        service: String,
        method: String,
        params: Vec<Value>,
    },
    Perms {
        token: String,
        org_id: Option<i64>,
        perms: Vec<String>,
    },
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    match args {
        [cmd, service, method, params @ ..] if cmd == "call" => Ok(Command::Call {
            service: service.clone(),
            method: method.clone(),
            params: params.iter().map(String::as_str).map(parse_param).collect(),
        }),
        [cmd, token, org, perms @ ..] if cmd == "perms" && !perms.is_empty() => {
            let org_id: Option<i64> = match org.as_str() {
                "-" => None,
                org => Some(
                    org.parse()
                        .map_err(|_| format!("invalid org id '{org}'"))?,
                ),
            };
            Ok(Command::Perms {
                token: token.clone(),
                org_id,
                perms: perms.to_vec(),
            })
        }
        _ => Err(USAGE.to_string()),
    }
}

fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (config_path, args) = parse_config_path();
    let command = parse_command(&args)?;

    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    let gateway = IlsGateway::from_config(&config)?;

    let output = match command {
        Command::Call {
            service,
            method,
            params,
        } => {
            let response = gateway
                .invoke(&AuthParam::Omit, &service, &method, params)
                .await?;
            Value::Array(response.payload)
        }
        Command::Perms {
            token,
            org_id,
            perms,
        } => {
            let grants = gateway.resolve_permissions(&token, org_id, &perms).await?;
            serde_json::to_value(grants)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
