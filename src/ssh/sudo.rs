// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Privilege-escalated execution.
//!
//! Escalation always requires exactly one deterministic prompt and
//! response, so the escalation watcher is built here and prepended to
//! whatever watchers the caller supplies for the command's own
//! prompts.

use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::Result;

use super::runner::{CommandOutput, RunOptions};
use super::session::Session;
use super::watcher::Watcher;

/// Identity sudo escalates to when none is given.
pub const DEFAULT_SUDO_USER: &str = "root";
/// Prompt text sudo is told to emit when none is given. Keeping it
/// fixed makes the escalation watcher deterministic.
pub const DEFAULT_SUDO_PROMPT: &str = "[sudo] password: ";

/// Options for a single [`Session::sudo_with_options`] call.
#[derive(Clone, Default)]
pub struct SudoOptions {
    /// Target identity; empty means `root`.
    pub user: String,
    /// Escalation credential; `None` falls back to the session's
    /// login password.
    pub password: Option<Zeroizing<String>>,
    /// Prompt text passed to sudo and watched for; empty means the
    /// default prompt.
    pub prompt: String,
    /// Watchers for prompts raised by the command itself, applied
    /// after the escalation watcher.
    pub watchers: Vec<Watcher>,
    /// Bounded wait for the whole escalated command.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for SudoOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SudoOptions")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("prompt", &self.prompt)
            .field("watchers", &self.watchers.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Wrap a command so it runs as `user` in a login shell from that
/// user's home directory, with sudo reading the password from stdin
/// and emitting exactly `prompt`. Remote shells depend on this exact
/// shape.
fn sudo_command(command: &str, prompt: &str, user: &str) -> String {
    format!("sudo -S -p '{prompt}' -H -u {user} /bin/bash -l -c \"cd; {command}\"")
}

/// Resolve defaults and build the full command plus watcher list.
fn build_escalation(
    command: &str,
    options: &SudoOptions,
    session_password: Option<&Zeroizing<String>>,
) -> (String, Vec<Watcher>) {
    let user = if options.user.is_empty() {
        DEFAULT_SUDO_USER
    } else {
        &options.user
    };
    let prompt = if options.prompt.is_empty() {
        DEFAULT_SUDO_PROMPT
    } else {
        &options.prompt
    };
    let password = options
        .password
        .as_ref()
        .or(session_password)
        .map(|p| p.as_str())
        .unwrap_or("");

    let mut watchers = Vec::with_capacity(options.watchers.len() + 1);
    watchers.push(Watcher::new(prompt, password));
    watchers.extend(options.watchers.iter().cloned());

    (sudo_command(command, prompt, user), watchers)
}

impl Session {
    /// Run a command as root, answering the sudo prompt with the
    /// session's login password.
    pub async fn sudo(&self, command: &str) -> Result<CommandOutput> {
        self.sudo_with_options(command, SudoOptions::default())
            .await
    }

    /// Run a command as another user via sudo.
    ///
    /// A watcher answering the escalation prompt with the escalation
    /// credential is prepended to `options.watchers`, then the whole
    /// request goes through the regular watched runner. A wrong
    /// credential surfaces as [`Error::CommandFailed`] carrying sudo's
    /// failure output.
    ///
    /// [`Error::CommandFailed`]: crate::Error::CommandFailed
    pub async fn sudo_with_options(
        &self,
        command: &str,
        options: SudoOptions,
    ) -> Result<CommandOutput> {
        let (full_command, watchers) = build_escalation(command, &options, self.password());
        let target = if options.user.is_empty() {
            DEFAULT_SUDO_USER
        } else {
            options.user.as_str()
        };
        tracing::debug!(host = %self.host(), user = %target, "executing escalated command");
        self.run_with_options(
            &full_command,
            RunOptions {
                watchers,
                timeout: options.timeout,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wrapping_is_reproduced_exactly() {
        assert_eq!(
            sudo_command("ls -l /root/", "[sudo] password: ", "root"),
            "sudo -S -p '[sudo] password: ' -H -u root /bin/bash -l -c \"cd; ls -l /root/\""
        );
    }

    #[test]
    fn defaults_fill_user_prompt_and_password() {
        let session_password = Zeroizing::new("login-secret".to_string());
        let (command, watchers) =
            build_escalation("whoami", &SudoOptions::default(), Some(&session_password));

        assert!(command.starts_with("sudo -S -p '[sudo] password: ' -H -u root "));
        assert_eq!(watchers.len(), 1);
        assert_eq!(watchers[0].pattern, DEFAULT_SUDO_PROMPT);
        assert_eq!(watchers[0].response, "login-secret");
    }

    #[test]
    fn explicit_options_override_defaults() {
        let options = SudoOptions {
            user: "postgres".into(),
            password: Some(Zeroizing::new("db-secret".into())),
            prompt: "pw? ".into(),
            ..SudoOptions::default()
        };
        let session_password = Zeroizing::new("login-secret".to_string());
        let (command, watchers) =
            build_escalation("pg_ctl reload", &options, Some(&session_password));

        assert_eq!(
            command,
            "sudo -S -p 'pw? ' -H -u postgres /bin/bash -l -c \"cd; pg_ctl reload\""
        );
        assert_eq!(watchers[0].pattern, "pw? ");
        assert_eq!(watchers[0].response, "db-secret");
    }

    #[test]
    fn escalation_watcher_is_prepended() {
        let options = SudoOptions {
            watchers: vec![Watcher::new("Overwrite?", "y")],
            ..SudoOptions::default()
        };
        let (_, watchers) = build_escalation("install.sh", &options, None);

        assert_eq!(watchers.len(), 2);
        assert_eq!(watchers[0].pattern, DEFAULT_SUDO_PROMPT);
        assert_eq!(watchers[1].pattern, "Overwrite?");
    }

    #[test]
    fn missing_password_everywhere_answers_with_empty_line() {
        let (_, watchers) = build_escalation("id", &SudoOptions::default(), None);
        assert_eq!(watchers[0].response, "");
        assert_eq!(watchers[0].response_line(), b"\n".to_vec());
    }

    #[test]
    fn debug_redacts_the_password() {
        let options = SudoOptions {
            password: Some(Zeroizing::new("hunter2".into())),
            ..SudoOptions::default()
        };
        let debug = format!("{options:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
