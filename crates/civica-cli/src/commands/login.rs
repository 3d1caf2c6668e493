use super::open_store;
use crate::config::ConfigPaths;
use civica_core::types::{User, UserRole};
use clap::Args;
use uuid::Uuid;

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Account role: citizen, authority, or worker
    #[arg(long, default_value = "citizen")]
    pub role: String,

    /// Stable account id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Avatar URI
    #[arg(long)]
    pub avatar: Option<String>,
}

pub fn run(args: &LoginArgs, paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let role = parse_role(&args.role)?;
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let user = User {
        id: id.clone(),
        name: args.name.clone(),
        role,
        points: 0,
        avatar: args
            .avatar
            .clone()
            .unwrap_or_else(|| format!("https://i.pravatar.cc/150?u={id}")),
    };

    let store = open_store(paths)?;
    store.save_user(&user)?;
    println!("logged in as {} ({})", user.name, args.role);
    Ok(())
}

pub fn logout(paths: &ConfigPaths) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(paths)?;
    store.clear_user()?;
    println!("logged out");
    Ok(())
}

fn parse_role(value: &str) -> Result<UserRole, String> {
    match value.to_ascii_lowercase().as_str() {
        "citizen" => Ok(UserRole::Citizen),
        "authority" => Ok(UserRole::Authority),
        "worker" => Ok(UserRole::Worker),
        other => Err(format!(
            "role must be citizen, authority, or worker (got {other})"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_role;
    use civica_core::types::UserRole;

    #[test]
    fn parse_role_accepts_any_case() {
        assert_eq!(parse_role("citizen").unwrap(), UserRole::Citizen);
        assert_eq!(parse_role("AUTHORITY").unwrap(), UserRole::Authority);
        assert_eq!(parse_role("Worker").unwrap(), UserRole::Worker);
        assert!(parse_role("admin").is_err());
    }
}
