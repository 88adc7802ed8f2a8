use clap::{Parser, Subcommand};

/// CLI surface definition. An operator/debug console for the encrypted ward
/// record store; the dashboard UI consumes the same store API.
#[derive(Parser, Debug)]
#[command(
    name = "wardvault",
    about = "Encrypted local store for ward patient records",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Session PIN. Falls back to the WARDVAULT_PIN environment variable.
    #[arg(long, global = true)]
    pub pin: Option<String>,

    /// Optional subcommand; defaults to listing the ward when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decrypt and print the ward list, newest admission first.
    List,
    /// Update a patient's handoff note.
    Note {
        /// Record id (hospital number).
        id: String,
        /// New note text; an empty string clears the note.
        text: String,
    },
    /// Rotate the PIN: re-encrypts every record under a fresh salt.
    ChangePin {
        /// The replacement PIN.
        new_pin: String,
    },
    /// Export a plaintext JSON backup of all records.
    Export {
        /// Output file path.
        file: String,
    },
    /// Replace the record set from a plaintext JSON backup.
    Import {
        /// Backup file path.
        file: String,
    },
    /// Factory reset: delete the database, salt included. Works without the
    /// PIN; this is the forgot-PIN escape hatch.
    Reset {
        /// Required confirmation; the reset is irreversible.
        #[arg(long)]
        yes: bool,
    },
    /// Unlock the store and report its health.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_list_when_missing_subcommand() {
        let cli = Cli::try_parse_from(["wardvault"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
        assert_eq!(cli.pin, None);
    }

    #[test]
    fn parses_global_pin_after_subcommand() {
        let cli = Cli::try_parse_from(["wardvault", "list", "--pin", "2468"])
            .expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::List));
        assert_eq!(cli.pin.as_deref(), Some("2468"));
    }

    #[test]
    fn parses_note_subcommand() {
        let cli = Cli::try_parse_from(["wardvault", "note", "MRN-1", "stable overnight"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Some(Command::Note {
                id: "MRN-1".into(),
                text: "stable overnight".into(),
            })
        );
    }

    #[test]
    fn reset_requires_explicit_yes_flag() {
        let cli = Cli::try_parse_from(["wardvault", "reset"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Reset { yes: false }));

        let cli =
            Cli::try_parse_from(["wardvault", "reset", "--yes"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Reset { yes: true }));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["wardvault", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));
    }
}
