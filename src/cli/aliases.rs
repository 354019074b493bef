//! Sub-commands with alias names
//!
//! Wraps a root `clap::Command` and keeps a handler per sub-command. Aliases
//! are registered as visible aliases so help shows one entry per command.

use crate::error::{Result, ToolboxError};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use tracing::{debug, instrument};

type Handler<T> = Box<dyn Fn(&ArgMatches) -> Result<T>>;

struct Registration<T> {
    name: String,
    aliases: Vec<String>,
    handler: Handler<T>,
}

/// A root command whose sub-commands can be reached by name or alias
pub struct AliasedSubcommands<T> {
    root: Command,
    registrations: Vec<Registration<T>>,
    /// name or alias -> index into `registrations`
    lookup: HashMap<String, usize>,
}

impl<T> AliasedSubcommands<T> {
    pub fn new(root: Command) -> Self {
        Self {
            root: root.subcommand_required(true),
            registrations: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Register `command` as sub-command `name`, reachable through `aliases`.
    ///
    /// Fails with `AliasConflict` when the name or any alias is already taken,
    /// including by another alias of the same call.
    pub fn add_parser<F>(
        &mut self,
        name: &str,
        aliases: &[&str],
        command: Command,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&ArgMatches) -> Result<T> + 'static,
    {
        let name = name.trim();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(ToolboxError::validation(format!(
                "Invalid sub-command name '{name}'"
            )));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(aliases.len() + 1);
        for candidate in std::iter::once(name).chain(aliases.iter().copied()) {
            if candidate.trim().is_empty()
                || candidate.starts_with('-')
                || candidate.contains(char::is_whitespace)
            {
                return Err(ToolboxError::validation(format!(
                    "Invalid alias '{candidate}' for '{name}'"
                )));
            }
            if let Some(existing) = self.resolve(candidate) {
                return Err(ToolboxError::alias_conflict(candidate, existing));
            }
            if seen.contains(&candidate) {
                return Err(ToolboxError::alias_conflict(candidate, name));
            }
            seen.push(candidate);
        }

        let aliases: Vec<String> = aliases.iter().map(|alias| alias.to_string()).collect();
        debug!("Registering sub-command '{}' with aliases {:?}", name, aliases);

        let sub = command
            .name(name.to_string())
            .visible_aliases(aliases.iter().cloned());
        let root = std::mem::take(&mut self.root);
        self.root = root.subcommand(sub);

        let index = self.registrations.len();
        for key in &seen {
            self.lookup.insert((*key).to_string(), index);
        }
        self.registrations.push(Registration {
            name: name.to_string(),
            aliases,
            handler: Box::new(handler),
        });

        Ok(self)
    }

    /// Register a sub-command whose arguments come from a `clap::Args` type
    pub fn add_args<A, F>(
        &mut self,
        name: &str,
        aliases: &[&str],
        about: &str,
        handler: F,
    ) -> Result<&mut Self>
    where
        A: Args + FromArgMatches + 'static,
        F: Fn(A) -> Result<T> + 'static,
        T: 'static,
    {
        let command = A::augment_args(Command::new(name.to_string()).about(about.to_string()));
        self.add_parser(name, aliases, command, move |matches| {
            handler(A::from_arg_matches(matches)?)
        })
    }

    /// Canonical name for a sub-command name or alias
    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.lookup
            .get(input)
            .map(|&index| self.registrations[index].name.as_str())
    }

    /// Parse `argv` (program name first) and run the matching handler.
    ///
    /// Clap reports the canonical name even when an alias was typed, so the
    /// handler lookup never sees aliases.
    #[instrument(skip(self, argv))]
    pub fn dispatch<I, S>(&self, argv: I) -> Result<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let matches = self.root.clone().try_get_matches_from(argv)?;

        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| ToolboxError::argument_parse("No sub-command given"))?;

        let registration = self
            .lookup
            .get(name)
            .map(|&index| &self.registrations[index])
            .ok_or_else(|| ToolboxError::argument_parse(format!("Unknown sub-command '{name}'")))?;

        debug!("Dispatching to '{}'", registration.name);
        (registration.handler)(sub_matches)
    }

    /// Help labels such as `remove (rm)`, in registration order
    pub fn choices(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|registration| {
                if registration.aliases.is_empty() {
                    registration.name.clone()
                } else {
                    format!("{} ({})", registration.name, registration.aliases.join(", "))
                }
            })
            .collect()
    }

    pub fn render_help(&self) -> String {
        self.root.clone().render_long_help().to_string()
    }

    pub fn command(&self) -> &Command {
        &self.root
    }
}

impl<T> fmt::Debug for AliasedSubcommands<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasedSubcommands")
            .field("root", &self.root.get_name())
            .field("choices", &self.choices())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Arg;

    #[derive(Args, Debug)]
    struct RemoveArgs {
        /// Item to remove
        target: String,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    }

    fn sample() -> AliasedSubcommands<String> {
        let mut cli = AliasedSubcommands::new(Command::new("toolbox"));
        cli.add_args("remove", &["rm", "del"], "Remove an item", |args: RemoveArgs| {
            Ok(format!("remove {} force={}", args.target, args.force))
        })
        .unwrap();
        cli.add_parser(
            "list",
            &[],
            Command::new("list")
                .about("List items")
                .arg(Arg::new("all").long("all").action(clap::ArgAction::SetTrue)),
            |matches| Ok(format!("list all={}", matches.get_flag("all"))),
        )
        .unwrap();
        cli
    }

    #[test]
    fn test_alias_routes_to_canonical_handler() {
        let cli = sample();
        assert_eq!(
            cli.dispatch(["toolbox", "rm", "foo", "--force"]).unwrap(),
            "remove foo force=true"
        );
        assert_eq!(
            cli.dispatch(["toolbox", "del", "bar"]).unwrap(),
            "remove bar force=false"
        );
        assert_eq!(
            cli.dispatch(["toolbox", "remove", "baz"]).unwrap(),
            "remove baz force=false"
        );
        assert_eq!(cli.dispatch(["toolbox", "list", "--all"]).unwrap(), "list all=true");
    }

    #[test]
    fn test_resolve() {
        let cli = sample();
        assert_eq!(cli.resolve("rm"), Some("remove"));
        assert_eq!(cli.resolve("remove"), Some("remove"));
        assert_eq!(cli.resolve("list"), Some("list"));
        assert_eq!(cli.resolve("ls"), None);
    }

    #[test]
    fn test_conflicts_rejected() {
        let mut cli = sample();

        let err = cli
            .add_parser("erase", &["rm"], Command::new("erase"), |_| Ok(String::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            ToolboxError::AliasConflict { ref alias, ref existing } if alias == "rm" && existing == "remove"
        ));

        assert!(matches!(
            cli.add_parser("list", &[], Command::new("list"), |_| Ok(String::new())),
            Err(ToolboxError::AliasConflict { .. })
        ));
        assert!(matches!(
            cli.add_parser("show", &["s", "s"], Command::new("show"), |_| Ok(String::new())),
            Err(ToolboxError::AliasConflict { .. })
        ));
        assert!(matches!(
            cli.add_parser("", &[], Command::new("x"), |_| Ok(String::new())),
            Err(ToolboxError::Validation { .. })
        ));

        assert!(matches!(
            cli.add_parser("prune", &["-p"], Command::new("prune"), |_| Ok(String::new())),
            Err(ToolboxError::Validation { .. })
        ));
        assert!(matches!(
            cli.add_parser("purge", &["--purge"], Command::new("purge"), |_| Ok(String::new())),
            Err(ToolboxError::Validation { .. })
        ));

        // failed registrations leave nothing behind
        assert_eq!(cli.resolve("erase"), None);
        assert_eq!(cli.resolve("show"), None);
        assert_eq!(cli.resolve("prune"), None);
        assert_eq!(cli.choices().len(), 2);
    }

    #[test]
    fn test_parse_failures() {
        let cli = sample();
        assert!(matches!(
            cli.dispatch(["toolbox", "frobnicate"]),
            Err(ToolboxError::ArgumentParse { .. })
        ));
        assert!(matches!(
            cli.dispatch(["toolbox"]),
            Err(ToolboxError::ArgumentParse { .. })
        ));
        assert!(matches!(
            cli.dispatch(["toolbox", "rm"]),
            Err(ToolboxError::ArgumentParse { .. })
        ));
    }

    #[test]
    fn test_choices_and_help() {
        let cli = sample();
        assert_eq!(cli.choices(), vec!["remove (rm, del)", "list"]);

        let help = cli.render_help();
        let remove_line = help
            .lines()
            .find(|line| line.trim_start().starts_with("remove"))
            .unwrap();
        assert!(remove_line.contains("rm"));
        assert!(remove_line.contains("del"));
        assert!(!help.lines().any(|line| line.trim_start().starts_with("rm ")));
    }
}
