use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "seedapi")]
#[command(author, version, about = "SeedNote Mini App API: authorized file downloads and memo relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print init data signed with the configured bot token, for local testing
    Sign {
        /// Telegram user id to embed
        #[arg(long)]
        user_id: i64,

        /// auth_date to embed (defaults to now)
        #[arg(long)]
        auth_date: Option<i64>,

        /// Extra fields as key=value, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Verify init data against the configured bot token and print the user id
    Verify {
        /// Raw init data query string
        init_data: String,
    },

    /// Load configuration and print the effective values
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["seedapi"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_sign_with_fields() {
        let cli = Cli::try_parse_from([
            "seedapi",
            "sign",
            "--user-id",
            "42",
            "--field",
            "query_id=AAE",
            "--field",
            "start_param=a=b",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Commands::Sign {
                user_id: 42,
                auth_date: None,
                fields: vec![
                    ("query_id".to_string(), "AAE".to_string()),
                    ("start_param".to_string(), "a=b".to_string()),
                ],
            })
        );
    }

    #[test]
    fn test_bad_field_rejected() {
        assert!(Cli::try_parse_from(["seedapi", "sign", "--user-id", "42", "--field", "=x"]).is_err());
        assert!(Cli::try_parse_from(["seedapi", "sign", "--user-id", "42", "--field", "novalue"]).is_err());
    }
}
