use clap::{Parser, Subcommand};

/// Amounts must be finite and above zero
pub(crate) fn parse_amount(s: &str) -> Result<f64, String> {
    let amount: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}

/// Reject blank values for required text fields
pub(crate) fn parse_non_empty(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Err("value must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "groupsave", version, about = "Manage savings groups from the command line.")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Sign in and remember the session
    Login {
        /// Account email (falls back to GROUPSAVE_EMAIL, then the last used email)
        #[arg(long, value_parser = parse_non_empty)]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long, value_parser = parse_non_empty)]
        username: String,
        #[arg(long, value_parser = parse_non_empty)]
        email: String,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Update username, email or password
    Profile {
        #[arg(long, value_parser = parse_non_empty)]
        username: Option<String>,
        #[arg(long, value_parser = parse_non_empty)]
        email: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
    /// List your savings groups
    Groups,
    /// Show one group
    Group { id: i64 },
    /// Start a new savings group
    #[command(name = "create-group")]
    CreateGroup {
        #[arg(long, value_parser = parse_non_empty)]
        name: String,
        /// Savings target
        #[arg(long, value_parser = parse_amount)]
        target: f64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename a group or change its target or description
    #[command(name = "update-group")]
    UpdateGroup {
        id: i64,
        #[arg(long, value_parser = parse_non_empty)]
        name: Option<String>,
        #[arg(long, value_parser = parse_amount)]
        target: Option<f64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Join a group
    Join { id: i64 },
    /// Leave a group
    Leave { id: i64 },
    /// Delete a group you created
    #[command(name = "delete-group")]
    DeleteGroup { id: i64 },
    /// Contribute to a group
    Contribute {
        group: i64,
        #[arg(value_parser = parse_amount)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Request a withdrawal from a group
    Withdraw {
        group: i64,
        #[arg(value_parser = parse_amount)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Transaction history for a group
    Transactions { group: i64 },
    /// Approve a pending withdrawal
    Approve { transaction: i64 },
    /// Reject a pending withdrawal
    Reject { transaction: i64 },
}

impl Command {
    /// Commands that need a signed-in user
    pub(crate) fn requires_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1500"), Ok(1500.0));
        assert_eq!(parse_amount(" 12.5 "), Ok(12.5));
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn test_parse_non_empty() {
        assert_eq!(parse_non_empty("  a@b.com "), Ok("a@b.com".to_string()));
        assert!(parse_non_empty("   ").is_err());
    }

    #[test]
    fn test_contribute_args() {
        let cli = Cli::try_parse_from(["groupsave", "contribute", "3", "500", "--description", "May"])
            .expect("parse");
        match cli.command {
            Command::Contribute {
                group,
                amount,
                description,
            } => {
                assert_eq!(group, 3);
                assert_eq!(amount, 500.0);
                assert_eq!(description.as_deref(), Some("May"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(Cli::try_parse_from(["groupsave", "withdraw", "3", "--", "-10"]).is_err());
        assert!(Cli::try_parse_from(["groupsave", "withdraw", "3", "0"]).is_err());
    }

    #[test]
    fn test_kebab_case_names() {
        let cli = Cli::try_parse_from(["groupsave", "create-group", "--name", "Chama", "--target", "10000"])
            .expect("parse");
        assert!(matches!(cli.command, Command::CreateGroup { .. }));
        assert!(Cli::try_parse_from(["groupsave", "delete-group", "4"]).is_ok());
    }

    #[test]
    fn test_update_group_args() {
        let cli = Cli::try_parse_from(["groupsave", "update-group", "4", "--target", "12000"])
            .expect("parse");
        match cli.command {
            Command::UpdateGroup {
                id,
                name,
                target,
                description,
            } => {
                assert_eq!(id, 4);
                assert_eq!(target, Some(12000.0));
                assert!(name.is_none() && description.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["groupsave", "update-group", "4", "--target", "0"]).is_err());
    }

    #[test]
    fn test_protected_commands() {
        assert!(!Command::Logout.requires_session());
        assert!(!Command::Login { email: None }.requires_session());
        assert!(Command::Groups.requires_session());
        assert!(Command::Approve { transaction: 1 }.requires_session());
    }
}
