//! Recording identity fields used in output paths

/// Who is recording what. Immutable for the lifetime of a recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub server_id: String,
    pub stream_name: String,
    pub channel_name: String,
    pub stream_id: String,
    pub channel_id: String,
    /// Fully qualified hostname
    pub hostname: String,
}

impl Identity {
    /// Hostname up to the first dot
    pub fn hostname_short(&self) -> &str {
        self.hostname
            .split_once('.')
            .map(|(short, _)| short)
            .unwrap_or(&self.hostname)
    }
}

/// Hostname of the machine, or an empty string if it cannot be determined
pub fn system_hostname() -> String {
    lookup_hostname().unwrap_or_default()
}

#[cfg(unix)]
fn lookup_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec()).ok()
}

#[cfg(not(unix))]
fn lookup_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}
