//! POSIX shell command construction shared by the ssh and local
//! transports.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Quote a string for a POSIX shell.
pub fn quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@".contains(c));
    if plain {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Wrap a command for sudo escalation. `-S` reads the password from
/// stdin; the empty `-p` prompt keeps stderr clean.
pub fn become_wrap(command: &str) -> String {
    format!("sudo -S -p '' sh -c {}", quote(command))
}

/// Build the remote side of an upload: decode an embedded base64
/// payload into `dest`, then apply the file mode. The payload rides
/// in argv, which is fine for config-sized files.
pub fn upload_command(content: &[u8], dest: &str, mode: Option<&str>) -> String {
    let encoded = BASE64.encode(content);
    let mut cmd = format!(
        "printf '%s' {} | base64 -d > {}",
        quote(&encoded),
        quote(dest)
    );
    if let Some(mode) = mode {
        cmd.push_str(&format!(" && chmod {} {}", quote(mode), quote(dest)));
    }
    cmd
}
