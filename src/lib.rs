//! # Gatehouse
//!
//! Username and password authentication for server-rendered web apps:
//! registration, login, a session-guarded dashboard and logout.
//!
//! ## Credentials
//!
//! Passwords are hashed with bcrypt (cost 10) exactly once, when a record is
//! first saved with a new password. Usernames are unique and matched
//! case-sensitively; the Postgres unique index is the final arbiter when two
//! registrations race.
//!
//! ## Sessions
//!
//! The session cookie carries a random token; only its SHA-256 is stored.
//! Each session holds an optional identity and an optional one-shot flash
//! message which is cleared by the read that returns it. Login rotates the
//! token; logout deletes the session server-side and always redirects.
//!
//! ## Failures
//!
//! Every failure becomes a redirect back to the originating form with a
//! flash message. Store and hashing failures are logged with full detail and
//! shown to users only as a generic message. Store calls are bounded by a
//! timeout so a hung database cannot hold a request forever.

pub mod auth;
pub mod cli;
pub mod gatehouse;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
