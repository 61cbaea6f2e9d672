//! Credential and push-status callbacks for remote operations.
use git2::{Cred, CredentialType, RemoteCallbacks};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::{cell::RefCell, rc::Rc};

/// libgit2 keeps asking for credentials as long as the callback hands some
/// out, so give up after a few rounds.
const MAX_CREDENTIAL_ATTEMPTS: usize = 4;

/// Ref update rejections reported by the remote during a push.
pub type Rejections = Rc<RefCell<Vec<String>>>;

/// Build callbacks that authenticate with, in order: the configured token
/// (HTTPS), the SSH agent, git credential helpers, and default credentials.
pub fn remote_callbacks<'r>(
    config: git2::Config,
    token: Option<SecretString>,
) -> RemoteCallbacks<'r> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(&format!(
                "authentication failed for {url}"
            )));
        }

        debug!("credentials requested for {url} (allowed: {allowed:?})");

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Some(token) = &token
        {
            let user = username
                .map(str::to_string)
                .or_else(|| config.get_string("user.name").ok())
                .unwrap_or_else(|| "git".into());
            return Cred::userpass_plaintext(&user, token.expose_secret());
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Cred::credential_helper(&config, url, username);
        }

        Cred::default()
    });

    callbacks
}

/// Callbacks for a push: credentials plus collection of per-ref rejections,
/// which libgit2 reports through a callback instead of an error.
pub fn push_callbacks<'r>(
    config: git2::Config,
    token: Option<SecretString>,
    rejections: Rejections,
) -> RemoteCallbacks<'r> {
    let mut callbacks = remote_callbacks(config, token);

    callbacks.push_update_reference(move |refname, status| {
        if let Some(status) = status {
            warn!("remote rejected {refname}: {status}");
            rejections.borrow_mut().push(format!("{refname}: {status}"));
        }
        Ok(())
    });

    callbacks
}
