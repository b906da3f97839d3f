//! Helpers for external media tools.

use std::process::Command;

/// Whether `binary` resolves to an executable on this system.
pub fn command_exists(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Collect a child's stderr on a background thread.
///
/// ffmpeg blocks once its stderr pipe fills, so the pipe must be drained
/// while stdout is being consumed.
pub fn drain_stderr(stderr: std::process::ChildStderr) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        use std::io::Read;
        let mut reader = std::io::BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read stderr: {err}>"),
        }
    })
}

/// Join a stderr drain started with [`drain_stderr`].
pub fn join_stderr(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .map(|h| {
            h.join()
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_is_reported() {
        assert!(!command_exists("signpose-definitely-not-installed"));
        assert!(!command_exists("/nonexistent/dir/ffmpeg"));
    }

    #[test]
    fn test_shell_is_found() {
        assert!(command_exists("sh"));
    }
}
