use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::Role;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "User id to put in the token subject")]
    pub user: Uuid,

    #[arg(long, default_value = "user", value_parser = parse_role, help = "user, admin or super_admin")]
    pub role: Role,
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value {
        "user" => Ok(Role::User),
        "admin" => Ok(Role::Admin),
        "super_admin" => Ok(Role::SuperAdmin),
        other => Err(format!("unknown role {}", other)),
    }
}

/// The server reloads the account on every request, so the token is only
/// useful for a user that exists in the store it talks to.
pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = Claims::new(args.user, args.role);
    let token = generate_jwt(&claims)?;

    output_success(
        output_format,
        "Token issued",
        Some(json!({
            "token": token,
            "user": args.user,
            "role": args.role.as_str(),
            "expiresInHours": config::config().security.jwt_expiry_hours,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_from_their_labels() {
        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            assert_eq!(parse_role(role.as_str()), Ok(role));
        }
        assert!(parse_role("root").is_err());
    }
}
